//! # Crucible CLI Module
//!
//! This module implements the CLI interface for Crucible.
//!
//! ## Available Commands
//!
//! - `init` - Create the store (schema and default elements)
//! - `status` - Show element, combination and discovery counts
//! - `solve` - Run the explorer until Ctrl+C
//! - `combine` - Resolve a single pair
//! - `recipes` - List stored combinations yielding an element
//! - `sync` - Two-way merge with another store
//! - `repair` - Re-link stale combination results
//! - `cache` - Import from or export to the staging cache

mod commands;

use crate::CrucibleError;
use crate::config::{BackendKind, Config};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Crucible - element combination explorer
///
/// Pairs known elements, asks the oracle what they make, and remembers every
/// answer so no pair is asked twice.
#[derive(Parser, Debug)]
#[command(name = "crucible")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the configuration file (default: ./crucible.toml if present)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the store database
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<BackendKind>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the store and seed the default elements
    Init {
        /// Remove an existing store first
        #[arg(short, long)]
        force: bool,
    },

    /// Show store statistics
    Status,

    /// Explore combinations until Ctrl+C
    Solve {
        /// Fix the first operand to this element
        #[arg(short, long)]
        seed: Option<String>,

        /// Skip the cache sync at start and end
        #[arg(long)]
        skip_sync: bool,
    },

    /// Combine two elements once
    Combine {
        /// First element
        first: String,
        /// Second element
        second: String,
    },

    /// List stored combinations that yield an element
    Recipes {
        /// Result element text
        text: String,
    },

    /// Two-way merge with another store
    Sync {
        /// Backend of the other store
        #[arg(long, value_enum)]
        other_backend: BackendKind,

        /// Path of the other store
        #[arg(long)]
        other_path: PathBuf,

        /// Also merge combinations
        #[arg(long)]
        combinations: bool,
    },

    /// Re-link combinations whose result snapshot drifted
    Repair,

    /// Stage elements through the cache document
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum CacheAction {
    /// Copy cached elements missing from the store into it
    Import,
    /// Overwrite the cache with the store's elements
    Export,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

impl Cli {
    /// Effective configuration: file and environment, then CLI flags.
    pub fn resolve_config(&self) -> Result<Config, CrucibleError> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(database) = &self.database {
            config.storage.path = database.clone();
        }
        if let Some(backend) = self.backend {
            config.storage.backend = backend;
        }
        Ok(config)
    }
}

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), CrucibleError> {
    let mut config = cli.resolve_config()?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Init { force }) => cmd_init(&config, force),
        Some(Commands::Status) => cmd_status(&config, json_mode),
        Some(Commands::Solve { seed, skip_sync }) => {
            config.explorer.skip_sync |= skip_sync;
            cmd_solve(&config, json_mode, seed.as_deref()).await
        }
        Some(Commands::Combine { first, second }) => {
            cmd_combine(&config, json_mode, &first, &second).await
        }
        Some(Commands::Recipes { text }) => cmd_recipes(&config, json_mode, &text),
        Some(Commands::Sync {
            other_backend,
            other_path,
            combinations,
        }) => cmd_sync(&config, json_mode, other_backend, &other_path, combinations),
        Some(Commands::Repair) => cmd_repair(&config, json_mode),
        Some(Commands::Cache { action }) => cmd_cache(&config, json_mode, action),
        None => {
            // No subcommand - show status by default
            cmd_status(&config, json_mode)
        }
    }
}
