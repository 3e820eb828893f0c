//! Logging utilities.
//!
//! Centralizes logger initialization. Intentionally small; the crate logs
//! through the standard `log` facade and imposes nothing else on callers.

mod init;

pub use init::{init_logging, LoggingConfig};
