//! Integration tests for the scan engine.
//!
//! - `harness.rs`    - Recording collaborators, station client, engine fixture
//! - `concurrency.rs` - Both channels submitting from parallel threads and tasks
//! - `pairing.rs`    - Pairing order, overwrite policy, buffer clearing
//! - `validation.rs` - Accept / reject scenarios and duplicate suppression
//! - `transport.rs`  - Real TCP stations feeding both listeners
//! - `lifecycle.rs`  - Start, stop, flush and reset

mod concurrency;
mod lifecycle;
