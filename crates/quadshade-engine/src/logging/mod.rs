//! Logging setup.
//!
//! Everything in the engine logs through the `log` facade; hosts call
//! [`init_logging`] once to route it to `env_logger`.

mod init;

pub use init::{init_logging, LoggingConfig};
