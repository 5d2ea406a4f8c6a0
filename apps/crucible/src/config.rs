//! # Configuration
//!
//! `crucible.toml`, every field optional:
//!
//! ```toml
//! [storage]
//! backend = "indexed"      # or "relational"
//! path = "crucible.db"
//!
//! [cache]
//! enabled = true
//! path = "infinite-craft-data.json"
//!
//! [oracle]
//! base_url = "https://neal.fun/api/infinite-craft"
//! timeout_secs = 300
//!
//! [explorer]
//! delay_ms = 1000
//! delay_increment_ms = 250
//! grace_secs = 30
//! default_retry_after_secs = 300
//! min_batch_size = 100
//! skip_sync = false
//! ```
//!
//! Precedence: defaults < file < environment (`CRUCIBLE_DB`,
//! `CRUCIBLE_BACKEND`, `CRUCIBLE_ORACLE_URL`, `CRUCIBLE_DELAY_MS`) < CLI flags.

use crate::CrucibleError;
use crate::explorer::ExplorerConfig;
use crate::explorer::backoff::BackoffPolicy;
use crate::oracle::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT, HttpOracle};
use crucible_core::primitives::CACHE_DOCUMENT_KEY;
use crucible_core::{FlatCache, IndexedStore, RelationalStore, Store, StoreError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "crucible.toml";

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// SECTIONS
// =============================================================================

/// Full application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub cache: CacheConfig,
    pub oracle: OracleConfig,
    pub explorer: ExplorerSettings,
}

/// Which persistent store backs the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// redb keyed store with secondary indexes
    #[default]
    Indexed,
    /// SQLite tables joined on read
    Relational,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Indexed => "indexed",
            Self::Relational => "relational",
        }
    }
}

impl FromStr for BackendKind {
    type Err = CrucibleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "indexed" | "redb" => Ok(Self::Indexed),
            "relational" | "sqlite" => Ok(Self::Relational),
            other => Err(CrucibleError::Config(format!("unknown backend '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: BackendKind,
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Indexed,
            path: PathBuf::from("crucible.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Defaults to the fixed cache key next to the store.
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerSettings {
    pub delay_ms: u64,
    pub delay_increment_ms: u64,
    pub grace_secs: u64,
    pub default_retry_after_secs: u64,
    pub min_batch_size: usize,
    pub skip_sync: bool,
}

impl Default for ExplorerSettings {
    fn default() -> Self {
        let policy = BackoffPolicy::default();
        let explorer = ExplorerConfig::default();
        Self {
            delay_ms: policy.delay.as_millis() as u64,
            delay_increment_ms: policy.delay_increment.as_millis() as u64,
            grace_secs: policy.grace.as_secs(),
            default_retry_after_secs: policy.default_retry_after.as_secs(),
            min_batch_size: explorer.min_batch_size,
            skip_sync: explorer.skip_sync,
        }
    }
}

impl ExplorerSettings {
    pub fn to_explorer_config(&self) -> ExplorerConfig {
        ExplorerConfig {
            backoff: BackoffPolicy {
                delay: Duration::from_millis(self.delay_ms),
                delay_increment: Duration::from_millis(self.delay_increment_ms),
                grace: Duration::from_secs(self.grace_secs),
                default_retry_after: Duration::from_secs(self.default_retry_after_secs),
            },
            min_batch_size: self.min_batch_size.max(1),
            skip_sync: self.skip_sync,
        }
    }
}

// =============================================================================
// LOADING
// =============================================================================

impl Config {
    /// Load from `path`, or from `crucible.toml` if it exists, then apply
    /// environment overrides.
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, CrucibleError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, CrucibleError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            CrucibleError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(CrucibleError::Config(format!(
                "{} is {} bytes, limit is {}",
                path.display(),
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CrucibleError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&contents)
            .map_err(|e| CrucibleError::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Apply `CRUCIBLE_*` overrides from `lookup`. Invalid values are
    /// logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        if let Some(raw) = value("CRUCIBLE_DB") {
            self.storage.path = PathBuf::from(raw);
        }
        if let Some(raw) = value("CRUCIBLE_BACKEND") {
            match raw.parse::<BackendKind>() {
                Ok(backend) => self.storage.backend = backend,
                Err(err) => tracing::warn!("invalid CRUCIBLE_BACKEND, ignoring: {err}"),
            }
        }
        if let Some(raw) = value("CRUCIBLE_ORACLE_URL") {
            self.oracle.base_url = raw;
        }
        if let Some(raw) = value("CRUCIBLE_DELAY_MS") {
            match raw.parse::<u64>() {
                Ok(delay) => self.explorer.delay_ms = delay,
                Err(err) => tracing::warn!("invalid CRUCIBLE_DELAY_MS, ignoring: {err}"),
            }
        }
    }

    /// Resolved cache document path, or `None` when the cache is disabled.
    pub fn cache_path(&self) -> Option<PathBuf> {
        if !self.cache.enabled {
            return None;
        }
        Some(match &self.cache.path {
            Some(path) => path.clone(),
            None => {
                let dir = self
                    .storage
                    .path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or(Path::new("."));
                dir.join(format!("{CACHE_DOCUMENT_KEY}.json"))
            }
        })
    }
}

// =============================================================================
// FACTORIES
// =============================================================================

/// Open the configured persistent store.
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn Store>, StoreError> {
    tracing::debug!(
        backend = config.backend.as_str(),
        path = %config.path.display(),
        "Opening store"
    );
    Ok(match config.backend {
        BackendKind::Indexed => Arc::new(IndexedStore::open(&config.path)?),
        BackendKind::Relational => Arc::new(RelationalStore::open(&config.path)?),
    })
}

/// Open the staging cache, if enabled.
pub fn open_cache(config: &Config) -> Option<Arc<FlatCache>> {
    config.cache_path().map(|path| Arc::new(FlatCache::new(path)))
}

/// Build the HTTP oracle client.
pub fn open_oracle(config: &OracleConfig) -> Result<HttpOracle, CrucibleError> {
    Ok(HttpOracle::new(
        config.base_url.clone(),
        Duration::from_secs(config.timeout_secs),
    )?)
}
