//! # crucible
//!
//! The application layer: oracle client, explorer, configuration and CLI.
//! All persistence goes through `crucible-core`.

pub mod cli;
pub mod config;
pub mod error;
pub mod explorer;
pub mod oracle;

pub use config::{BackendKind, Config, open_cache, open_oracle, open_store};
pub use error::CrucibleError;
pub use explorer::{
    ExploreError, Explorer, ExplorerConfig, PairOutcome, RunHandle, RunState, RunSummary,
};
pub use oracle::{HttpOracle, Oracle, OracleError, OracleReply};
