//! Control handler implementations.

pub mod engine;
pub mod health;
