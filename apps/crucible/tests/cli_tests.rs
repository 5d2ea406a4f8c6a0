//! CLI parsing and offline command tests.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use clap::Parser;
use crucible::cli::{CacheAction, Cli, Commands, execute};
use crucible::config::BackendKind;
use crucible::open_store;
use std::path::Path;

fn write_config(dir: &Path, backend: &str) -> std::path::PathBuf {
    let db = dir.join("crucible.db");
    let config = dir.join("crucible.toml");
    std::fs::write(
        &config,
        format!(
            "[storage]\nbackend = \"{backend}\"\npath = {db:?}\n\n[cache]\nenabled = true\n"
        ),
    )
    .unwrap();
    config
}

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("crucible").chain(args.iter().copied())).unwrap()
}

// =============================================================================
// PARSING
// =============================================================================

#[test]
fn solve_accepts_seed_and_skip_sync() {
    let cli = parse(&["solve", "--seed", "Fire", "--skip-sync"]);
    match cli.command {
        Some(Commands::Solve { seed, skip_sync }) => {
            assert_eq!(seed.as_deref(), Some("Fire"));
            assert!(skip_sync);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn global_flags_follow_the_subcommand() {
    let cli = parse(&["status", "-B", "relational", "-D", "other.db", "--json-mode"]);
    assert_eq!(cli.backend, Some(BackendKind::Relational));
    assert_eq!(cli.database.as_deref(), Some(Path::new("other.db")));
    assert!(cli.json_mode);
}

#[test]
fn combine_needs_two_operands() {
    assert!(Cli::try_parse_from(["crucible", "combine", "Fire"]).is_err());
    let cli = parse(&["combine", "Water", "Fire"]);
    assert!(matches!(
        cli.command,
        Some(Commands::Combine { ref first, ref second }) if first == "Water" && second == "Fire"
    ));
}

#[test]
fn cache_takes_an_action() {
    let cli = parse(&["cache", "export"]);
    assert!(matches!(
        cli.command,
        Some(Commands::Cache {
            action: CacheAction::Export
        })
    ));
}

#[test]
fn unknown_backend_is_rejected() {
    assert!(Cli::try_parse_from(["crucible", "-B", "postgres", "status"]).is_err());
}

// =============================================================================
// CONFIG RESOLUTION
// =============================================================================

#[test]
fn flags_override_the_config_file() {
    let temp = tempfile::tempdir().unwrap();
    let config = write_config(temp.path(), "indexed");
    let override_db = temp.path().join("override.db");

    let cli = parse(&[
        "-c",
        config.to_str().unwrap(),
        "-B",
        "relational",
        "-D",
        override_db.to_str().unwrap(),
        "status",
    ]);
    let resolved = cli.resolve_config().unwrap();
    assert_eq!(resolved.storage.backend, BackendKind::Relational);
    assert_eq!(resolved.storage.path, override_db);
}

#[test]
fn missing_explicit_config_is_an_error() {
    let cli = parse(&["-c", "/nonexistent/crucible.toml", "status"]);
    assert!(cli.resolve_config().is_err());
}

// =============================================================================
// OFFLINE COMMANDS
// =============================================================================

#[tokio::test]
async fn init_then_export_cache() {
    let temp = tempfile::tempdir().unwrap();
    let config = write_config(temp.path(), "relational");
    let config_arg = config.to_str().unwrap();

    execute(parse(&["-c", config_arg, "init"])).await.unwrap();
    assert!(temp.path().join("crucible.db").exists());

    // A second init without --force refuses to clobber the store.
    assert!(execute(parse(&["-c", config_arg, "init"])).await.is_err());

    execute(parse(&["-c", config_arg, "cache", "export"]))
        .await
        .unwrap();
    let document = std::fs::read_to_string(temp.path().join("infinite-craft-data.json")).unwrap();
    assert!(document.contains("\"Water\""));
}

#[tokio::test]
async fn sync_merges_across_backends() {
    let temp = tempfile::tempdir().unwrap();
    let config = write_config(temp.path(), "indexed");
    let other = temp.path().join("other.sqlite");

    {
        let store = open_store(&crucible::config::StorageConfig {
            backend: BackendKind::Relational,
            path: other.clone(),
        })
        .unwrap();
        store
            .save_element(&crucible_core::Element::new("Lava", "🌋", false))
            .unwrap();
    }

    execute(parse(&[
        "-c",
        config.to_str().unwrap(),
        "sync",
        "--other-backend",
        "relational",
        "--other-path",
        other.to_str().unwrap(),
    ]))
    .await
    .unwrap();

    let primary = open_store(&crucible::config::StorageConfig {
        backend: BackendKind::Indexed,
        path: temp.path().join("crucible.db"),
    })
    .unwrap();
    assert!(primary.get_element("Lava").unwrap().is_some());
}
