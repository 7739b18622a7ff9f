//! Error types for display control protocol parsing and encoding

use thiserror::Error;

/// Errors that can occur while parsing protocol data
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Buffer is incomplete - need more data
    #[error("incomplete data: need {needed} more bytes")]
    Incomplete { needed: usize },

    /// Invalid frame structure
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Unknown or unsupported message type
    #[error("unknown message type: 0x{0:02X}")]
    UnknownMessageType(u8),

    /// A field that should be ASCII hex was not
    #[error("invalid hex field: {0:?}")]
    InvalidHex(String),

    /// Invalid monitor address byte
    #[error("invalid address: 0x{0:02X}")]
    InvalidAddress(u8),

    /// Check code mismatch
    #[error("check code mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    /// Message body did not have the expected shape
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),
}

/// Higher-level protocol errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Parse error
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Display reported the parameter as unsupported
    #[error("parameter {0} not supported by display")]
    Unsupported(String),

    /// Display rejected the request with a non-zero result code
    #[error("request rejected with result code {0:02X}")]
    Rejected(u8),

    /// Value outside the encodable range
    #[error("value out of range: {0}")]
    OutOfRange(String),
}
