//! Daemon startup errors

use thiserror::Error;
use tv_bridge::{ChannelError, ConfigError};

/// Errors that stop the daemon before the bridge runs
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Bad command line
    #[error("usage: {0}")]
    Usage(String),

    /// Bad or unreadable configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Opcode client could not be created
    #[error("opcode channel: {0}")]
    Channel(#[from] ChannelError),

    /// Config file could not be written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config could not be serialized
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
