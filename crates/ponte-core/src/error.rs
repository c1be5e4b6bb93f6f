//! Error types for ponte-core.

use thiserror::Error;

/// Error type for message, codec and translation operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("unsupported UMP message type: 0x{0:X}")]
    UnsupportedMessageType(u8),

    #[error("insufficient capacity: need {needed} words, have {available}")]
    InsufficientCapacity { needed: usize, available: usize },

    #[error("no translation defined for this message")]
    NotSupported,
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
