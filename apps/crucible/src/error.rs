//! Application-level error type.

use crate::explorer::ExploreError;
use crate::oracle::OracleError;
use crucible_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrucibleError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Explore(#[from] ExploreError),

    #[error("I/O error: {0}")]
    Io(String),
}
