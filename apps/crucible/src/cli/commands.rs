//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::config::{BackendKind, Config, StorageConfig, open_cache, open_oracle, open_store};
use crate::explorer::{Explorer, PairOutcome};
use crate::{CrucibleError, HttpOracle};
use crucible_core::{
    Store, import_elements, relink_stale_results, sync_combinations, sync_elements,
};
use std::path::Path;
use std::sync::Arc;

use super::CacheAction;

/// Print a JSON value the way every command does in `--json-mode`.
fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn build_explorer(config: &Config) -> Result<Explorer<HttpOracle>, CrucibleError> {
    let store = open_store(&config.storage)?;
    let oracle = open_oracle(&config.oracle)?;
    Ok(Explorer::new(
        store,
        open_cache(config),
        oracle,
        config.explorer.to_explorer_config(),
    ))
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Create the store, running migrations and seeding.
pub fn cmd_init(config: &Config, force: bool) -> Result<(), CrucibleError> {
    let path = &config.storage.path;
    if path.exists() {
        if !force {
            return Err(CrucibleError::Config(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        if !path.is_file() {
            return Err(CrucibleError::Io(format!(
                "'{}' is not a regular file",
                path.display()
            )));
        }
        std::fs::remove_file(path)
            .map_err(|e| CrucibleError::Io(format!("Cannot remove {}: {e}", path.display())))?;
    }

    let store = open_store(&config.storage)?;
    let stats = store.stats()?;
    println!(
        "Initialized new {} store at {:?} with {} elements",
        config.storage.backend.as_str(),
        path,
        stats.element_count
    );
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show store statistics.
pub fn cmd_status(config: &Config, json_mode: bool) -> Result<(), CrucibleError> {
    let store = open_store(&config.storage)?;
    let stats = store.stats()?;

    if json_mode {
        print_json(&serde_json::json!({
            "database": config.storage.path.to_string_lossy(),
            "backend": config.storage.backend.as_str(),
            "elements": stats.element_count,
            "combinations": stats.combination_count,
            "discoveries": stats.discovery_count,
        }));
        return Ok(());
    }

    println!("Crucible Store Status");
    println!("=====================");
    println!("Database: {:?}", config.storage.path);
    println!("Backend:  {}", config.storage.backend.as_str());
    println!();
    println!("Elements:     {}", stats.element_count);
    println!("Combinations: {}", stats.combination_count);
    println!("Discoveries:  {}", stats.discovery_count);

    Ok(())
}

// =============================================================================
// SOLVE COMMAND
// =============================================================================

/// Run the explorer until Ctrl+C or a fatal error.
pub async fn cmd_solve(
    config: &Config,
    json_mode: bool,
    seed: Option<&str>,
) -> Result<(), CrucibleError> {
    let explorer = build_explorer(config)?;
    let handle = match seed {
        Some(seed) => explorer.solve_for(seed)?,
        None => explorer.solve()?,
    };

    if !json_mode {
        println!("Exploring with the {} store", config.storage.backend.as_str());
        println!("  Oracle: {}", config.oracle.base_url);
        println!("  Delay:  {} ms", config.explorer.delay_ms);
        if let Some(seed) = seed {
            println!("  Seed:   {}", seed);
        }
        println!();
        println!("Press Ctrl+C to stop");
        println!();
    }

    let token = handle.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl+C received; finishing in-flight calls");
            token.cancel();
        }
    });

    let summary = handle.wait().await?;

    if json_mode {
        print_json(&serde_json::to_value(summary).unwrap_or_default());
        return Ok(());
    }

    println!();
    println!("Run finished");
    println!("  Rounds:       {}", summary.rounds);
    println!("  Oracle calls: {}", summary.dispatched);
    println!("  Cache hits:   {}", summary.cached);
    println!("  Crafted:      {}", summary.crafted);
    println!("  New elements: {}", summary.new_elements);
    println!("  Skipped:      {}", summary.skipped);
    println!("  Rate limits:  {}", summary.rate_limits);
    println!("  Final delay:  {} ms", summary.final_delay_ms);
    Ok(())
}

// =============================================================================
// COMBINE COMMAND
// =============================================================================

/// Resolve one pair, from the store if known.
pub async fn cmd_combine(
    config: &Config,
    json_mode: bool,
    first: &str,
    second: &str,
) -> Result<(), CrucibleError> {
    let explorer = build_explorer(config)?;
    let outcome = explorer.solve_single(first, second).await?;
    let combination = outcome.combination();
    let result = &combination.result;

    if json_mode {
        print_json(&serde_json::json!({
            "first": combination.first,
            "second": combination.second,
            "result": result,
            "cached": outcome.is_cached(),
        }));
        return Ok(());
    }

    let source = match &outcome {
        PairOutcome::Cached(_) => "store",
        PairOutcome::Crafted { .. } => "oracle",
    };
    println!(
        "{} + {} = {} {} (from {})",
        combination.first, combination.second, result.emoji, result.text, source
    );
    if let PairOutcome::Crafted {
        new_element: true, ..
    } = outcome
    {
        if result.discovered {
            println!("NEW DISCOVERY!");
        } else {
            println!("New element!");
        }
    }
    Ok(())
}

// =============================================================================
// RECIPES COMMAND
// =============================================================================

/// List every stored combination that yields `text`.
pub fn cmd_recipes(config: &Config, json_mode: bool, text: &str) -> Result<(), CrucibleError> {
    let store = open_store(&config.storage)?;
    let mut recipes = store.combinations_yielding(text)?;
    recipes.sort_by(|a, b| a.key().cmp(&b.key()));

    if json_mode {
        let pairs: Vec<_> = recipes
            .iter()
            .map(|c| serde_json::json!({ "first": c.first, "second": c.second }))
            .collect();
        print_json(&serde_json::json!({ "result": text, "recipes": pairs }));
        return Ok(());
    }

    if recipes.is_empty() {
        println!("No stored recipe yields {}", text);
        return Ok(());
    }
    println!("{} recipe(s) for {}:", recipes.len(), text);
    for combination in &recipes {
        println!("  {} + {}", combination.first, combination.second);
    }
    Ok(())
}

// =============================================================================
// SYNC COMMAND
// =============================================================================

/// Two-way merge between the configured store and another one.
pub fn cmd_sync(
    config: &Config,
    json_mode: bool,
    other_backend: BackendKind,
    other_path: &Path,
    combinations: bool,
) -> Result<(), CrucibleError> {
    let other_config = StorageConfig {
        backend: other_backend,
        path: other_path.to_path_buf(),
    };
    if other_config == config.storage {
        return Err(CrucibleError::Config(
            "Cannot sync a store with itself".to_string(),
        ));
    }

    let store = open_store(&config.storage)?;
    let other = open_store(&other_config)?;

    let elements = sync_elements(store.as_ref(), other.as_ref())?;
    let combos = if combinations {
        Some(sync_combinations(store.as_ref(), other.as_ref())?)
    } else {
        None
    };

    if json_mode {
        print_json(&serde_json::json!({
            "elements": elements,
            "combinations": combos,
        }));
        return Ok(());
    }

    println!(
        "Elements:     {} copied in, {} copied out",
        elements.into_a.copied, elements.into_b.copied
    );
    if let Some(combos) = combos {
        println!(
            "Combinations: {} copied in, {} copied out",
            combos.into_a.copied, combos.into_b.copied
        );
    }
    Ok(())
}

// =============================================================================
// REPAIR COMMAND
// =============================================================================

/// Run the maintenance re-link pass.
pub fn cmd_repair(config: &Config, json_mode: bool) -> Result<(), CrucibleError> {
    let store = open_store(&config.storage)?;
    let report = relink_stale_results(store.as_ref())?;

    if json_mode {
        print_json(&serde_json::to_value(report).unwrap_or_default());
        return Ok(());
    }

    println!("Scanned:  {}", report.scanned);
    println!("Relinked: {}", report.relinked);
    println!("Restored: {}", report.restored);
    Ok(())
}

// =============================================================================
// CACHE COMMAND
// =============================================================================

/// Explicit staging through the cache document.
pub fn cmd_cache(
    config: &Config,
    json_mode: bool,
    action: CacheAction,
) -> Result<(), CrucibleError> {
    let Some(cache) = open_cache(config) else {
        return Err(CrucibleError::Config(
            "The cache is disabled in the configuration".to_string(),
        ));
    };
    let store: Arc<dyn Store> = open_store(&config.storage)?;

    let (verb, count) = match action {
        CacheAction::Import => {
            let counts = import_elements(store.as_ref(), cache.as_ref())?;
            ("imported", counts.copied)
        }
        CacheAction::Export => {
            let written = cache.overwrite_from(store.as_ref())?;
            let count = if written { store.stats()?.element_count } else { 0 };
            ("exported", count)
        }
    };

    if json_mode {
        print_json(&serde_json::json!({
            "cache": cache.path().to_string_lossy(),
            verb: count,
        }));
        return Ok(());
    }
    println!("{} {} element(s) ({:?})", verb, count, cache.path());
    Ok(())
}
