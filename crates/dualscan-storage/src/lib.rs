//! File persistence for accepted scan records.
//!
//! - [`BatchFileSink`] writes each flushed batch to its own timestamped file.
//! - [`SingleRecordWriter`] writes every accepted record as soon as it is
//!   accepted, when enabled.

mod batch;
mod error;
mod single;
mod unique;

pub use batch::{batch_file_name, BatchFileSink};
pub use error::{StorageError, StorageResult};
pub use single::{record_file_name, SingleRecordWriter, SINGLE_RECORD_DIR};

/// Timestamp format shared by every file name this crate produces.
pub(crate) const FILE_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
