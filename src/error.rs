//! Centralized error type for the ponte umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate
//! boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] ponte_core::Error),

    #[error("router: {0}")]
    Router(#[from] ponte_router::Error),

    #[error("wire: {0}")]
    Wire(#[from] ponte_wire::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
