//! Server-level error types

use crate::pool::PoolError;
use crate::protocol::SetupError;
use std::io;

/// Invalid server assembly or configuration, detected at startup
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("opcode {opcode} claimed by both {first} and {second}")]
    DuplicateOpcode {
        opcode: u8,
        first: &'static str,
        second: &'static str,
    },

    #[error("extension {0} registered twice")]
    DuplicateExtension(String),

    #[error("font {font}: {count} characters from {first} do not fit one row")]
    CharRange {
        font: String,
        first: u16,
        count: usize,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failure of a connection worker or the listener
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("connection setup failed: {0}")]
    Setup(#[from] SetupError),

    #[error("connection refused: {0}")]
    Refused(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pool(#[from] PoolError),
}
