//! Error types for ponte-wire.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("datagram truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("unknown session packet kind: 0x{0:02X}")]
    UnknownPacketKind(u8),

    #[error("peer table full")]
    PeerTableFull,

    #[error("peer not in session")]
    NotConnected,

    #[error("timed out")]
    Timeout,

    #[error("i/o failure: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, Error>;
