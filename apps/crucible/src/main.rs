//! # Crucible - Element Combination Explorer
//!
//! The main binary for the Crucible explorer.
//!
//! This application provides:
//! - The explorer loop (throttled oracle calls with rate-limit backoff)
//! - CLI commands for store inspection, sync and repair
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    apps/crucible (THE BINARY)                   │
//! │                                                                 │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────┐     │
//! │  │   CLI       │    │  Explorer   │    │  Oracle client   │     │
//! │  │  (clap)     │───▶│  (tokio)    │───▶│  (reqwest)       │     │
//! │  └──────┬──────┘    └──────┬──────┘    └──────────────────┘     │
//! │         │                  │                                    │
//! │         └──────────────────┤                                    │
//! │                            ▼                                    │
//! │                   ┌────────────────┐                            │
//! │                   │ crucible-core  │                            │
//! │                   │  (THE STORES)  │                            │
//! │                   └────────────────┘                            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Create the store
//! crucible init
//!
//! # Explore until Ctrl+C
//! crucible solve
//! crucible solve --seed Fire
//!
//! # One pair
//! crucible combine Water Fire
//! ```

use clap::Parser;
use crucible::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Initialize tracing — CRUCIBLE_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("CRUCIBLE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "crucible=info,crucible_core=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Display startup banner
    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Crucible startup banner.
fn print_banner() {
    println!(
        r#"
   ██████╗██████╗ ██╗   ██╗ ██████╗██╗██████╗ ██╗     ███████╗
  ██╔════╝██╔══██╗██║   ██║██╔════╝██║██╔══██╗██║     ██╔════╝
  ██║     ██████╔╝██║   ██║██║     ██║██████╔╝██║     █████╗
  ██║     ██╔══██╗██║   ██║██║     ██║██╔══██╗██║     ██╔══╝
  ╚██████╗██║  ██║╚██████╔╝╚██████╗██║██████╔╝███████╗███████╗
   ╚═════╝╚═╝  ╚═╝ ╚═════╝  ╚═════╝╚═╝╚═════╝ ╚══════╝╚══════╝

  Element Combination Explorer v{}

  Throttled • Resumable • Never asks twice
"#,
        env!("CARGO_PKG_VERSION")
    );
}
