//! Configuration, paths, and logging setup for the dualscan daemon.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, DEFAULT_EXPECTED_AUX_COUNT, DEFAULT_LISTEN_HOST, DEFAULT_LOG_LEVEL, DEFAULT_PORT1,
    DEFAULT_PORT2,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
