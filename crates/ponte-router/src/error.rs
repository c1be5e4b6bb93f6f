//! Error types for ponte-router.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    #[error("router queue full")]
    QueueFull,

    #[error("transport sink failure: {0}")]
    Sink(String),

    #[error("i/o failure: {0}")]
    Io(String),

    #[error(transparent)]
    Core(#[from] ponte_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
