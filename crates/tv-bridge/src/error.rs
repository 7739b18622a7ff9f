//! Error types for the bridge

use std::time::Duration;

use thiserror::Error;
use tv_protocol::{Opcode, ParseError, ProtocolError};

use crate::translation::InputPosition;

/// A failure talking to one hardware channel
#[derive(Debug, Error)]
pub enum ChannelError {
    /// I/O error on the underlying transport
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The call did not complete in time
    #[error("no response within {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The connection was closed by the other side
    #[error("connection closed")]
    Closed,

    /// Malformed data on the wire
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The display answered with a reply that does not belong to the request
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),

    /// The display refused the request
    #[error("display rejected {opcode} with result {result:02X}")]
    Rejected {
        /// Parameter the request addressed
        opcode: Opcode,
        /// Result code from the reply
        result: u8,
    },

    /// An external helper process failed
    #[error("{program} failed: {message}")]
    Process {
        /// Program that was run
        program: String,
        /// What went wrong
        message: String,
    },

    /// Serial port could not be opened
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),
}

impl ChannelError {
    /// Whether the display could not be reached at all
    ///
    /// A refusal or an odd reply still proves the link works.
    pub fn is_link_failure(&self) -> bool {
        matches!(
            self,
            ChannelError::Io(_)
                | ChannelError::Timeout(_)
                | ChannelError::Closed
                | ChannelError::Serial(_)
        )
    }
}

impl From<ParseError> for ChannelError {
    fn from(e: ParseError) -> Self {
        ChannelError::Protocol(ProtocolError::Parse(e))
    }
}

/// A lookup that has no entry in a translation table
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MappingMiss {
    /// Position outside `1..=N`
    #[error("input position {0} is not configured")]
    Position(InputPosition),

    /// Hardware reported an input code no source maps to
    #[error("input code {0} is not configured")]
    InputCode(u16),
}

/// Errors confined to the bridge boundary
///
/// Neither kind ever reaches the accessory facade; the bridge logs them and
/// substitutes a fallback.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Hardware channel failed
    #[error("transport error: {0}")]
    Transport(#[from] ChannelError),

    /// Code or position outside the translation tables
    #[error("mapping miss: {0}")]
    MappingMiss(#[from] MappingMiss),
}

/// Invalid bridge configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No input sources configured
    #[error("at least one input source must be configured")]
    NoInputs,

    /// Two input sources share a name
    #[error("duplicate input source name: {0}")]
    DuplicateName(String),

    /// Too many input sources for the identifier range
    #[error("{0} input sources configured, at most 255 are supported")]
    TooManyInputs(usize),

    /// Fallback input is not a configured position
    #[error("fallback input {0} is not a configured position")]
    InvalidFallback(u8),

    /// Poll interval must be positive
    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,

    /// Call timeout must be positive
    #[error("call timeout must be greater than zero")]
    ZeroCallTimeout,

    /// Monitor ID outside 1-100
    #[error("monitor id {0} out of range 1-100")]
    InvalidMonitorId(u8),

    /// Unknown built-in profile name
    #[error("unknown profile: {0}")]
    UnknownProfile(String),

    /// Config file could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that was read
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// Config file is not valid JSON for the schema
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File that was parsed
        path: String,
        /// Underlying error
        source: serde_json::Error,
    },
}
