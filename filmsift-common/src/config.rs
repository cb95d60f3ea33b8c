//! Configuration loading for filmsift
//!
//! Two layers, resolved once at startup:
//! 1. **TOML bootstrap**: cache location, logging, provider access, thresholds
//! 2. **Environment overrides**: provider API key, config file location
//!
//! Missing TOML files never terminate the process: a warning is logged and the
//! compiled defaults are used. A TOML file that exists but cannot be parsed is
//! a configuration error.
//!
//! # Config file priority
//!
//! 1. Command-line argument (`--config`)
//! 2. Environment variable (`FILMSIFT_CONFIG`)
//! 3. Platform config dir (`~/.config/filmsift/config.toml` on Linux)
//! 4. Compiled defaults

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "FILMSIFT_CONFIG";

/// Environment variable holding the provider API key
pub const API_KEY_ENV_VAR: &str = "FILMSIFT_OMDB_API_KEY";

const APP_DIR: &str = "filmsift";
const CONFIG_FILE_NAME: &str = "config.toml";
const CACHE_FILE_NAME: &str = "omdb_cache.json";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Cache file location (defaults to the platform data dir)
    pub cache_path: Option<PathBuf>,

    /// Maximum number of items resolved concurrently
    pub concurrency: usize,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Provider access and lookup tuning
    pub provider: ProviderConfig,

    /// Classification thresholds
    pub thresholds: ScoringThresholds,

    /// Misidentification sensitivity
    pub misidentification: MisidentificationThresholds,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            cache_path: None,
            concurrency: 4,
            logging: LoggingConfig::default(),
            provider: ProviderConfig::default(),
            thresholds: ScoringThresholds::default(),
            misidentification: MisidentificationThresholds::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Provider access configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API key; `FILMSIFT_OMDB_API_KEY` takes precedence
    pub api_key: Option<String>,

    /// Provider endpoint
    pub base_url: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Wait after a rate-limit signal before retrying, in seconds
    pub rate_limit_wait_secs: u64,

    /// Retries allowed while rate-limited before the provider is disabled
    pub max_retries: u32,

    /// Retries for timeouts and connection failures
    pub network_retries: u32,

    /// Base delay for network retry backoff, in milliseconds
    pub network_backoff_ms: u64,

    /// Optional proactive pacing (requests per second)
    pub requests_per_second: Option<u32>,

    /// Refetch cached entries that carry no rating data (including "not found")
    pub retry_empty_cache: bool,

    /// Payload error string that signals rate limiting
    pub rate_limit_sentinel: String,

    /// Minimum title similarity (0.0-1.0) to accept a title lookup
    pub min_title_similarity: f64,

    /// Minimum heuristic score to accept a free-text search candidate
    pub min_search_score: f64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://www.omdbapi.com/".to_string(),
            request_timeout_secs: 10,
            rate_limit_wait_secs: 60,
            max_retries: 1,
            network_retries: 3,
            network_backoff_ms: 500,
            requests_per_second: None,
            retry_empty_cache: false,
            rate_limit_sentinel: "Request limit reached!".to_string(),
            min_title_similarity: 0.6,
            min_search_score: 2.0,
        }
    }
}

/// One tier of the year-dependent vote minimum table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotesByYear {
    /// Tier applies to items released up to and including this year
    pub up_to_year: i32,
    /// Vote minimum for KEEP in this tier
    pub min_votes: u64,
}

/// Thresholds consumed by the scoring engine
///
/// Values are external configuration; the engine hardcodes none of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringThresholds {
    pub keep_min_rating: f64,
    pub keep_min_votes: u64,
    pub keep_min_rating_with_secondary: f64,
    pub secondary_keep_min: u32,
    pub delete_max_rating: f64,
    pub delete_max_votes: u64,
    pub delete_max_votes_no_secondary: u64,

    /// Bayesian DELETE rule is disabled when unset
    pub bayes_delete_max_score: Option<f64>,

    /// Prior mean (C) for the Bayesian score
    pub bayes_global_mean: f64,

    /// Cached ratings required before the cache mean replaces `bayes_global_mean`
    pub bayes_min_titles_for_global_mean: usize,

    /// Year-dependent replacement for `keep_min_votes`; empty disables it
    pub votes_by_year: Vec<VotesByYear>,

    /// Percentile (0.0-1.0) of cached ratings that replaces `keep_min_rating`
    pub auto_keep_rating_percentile: f64,

    /// Percentile (0.0-1.0) of cached ratings that replaces `delete_max_rating`
    pub auto_delete_rating_percentile: f64,

    /// Cached ratings required before the percentile thresholds apply
    pub rating_min_titles_for_auto: usize,
}

impl Default for ScoringThresholds {
    fn default() -> Self {
        Self {
            keep_min_rating: 7.0,
            keep_min_votes: 30_000,
            keep_min_rating_with_secondary: 6.0,
            secondary_keep_min: 55,
            delete_max_rating: 5.5,
            delete_max_votes: 1_000,
            delete_max_votes_no_secondary: 2_000,
            bayes_delete_max_score: None,
            bayes_global_mean: 6.0,
            bayes_min_titles_for_global_mean: 200,
            votes_by_year: [(1980, 500), (2000, 2_000), (2010, 5_000), (9999, 10_000)]
                .into_iter()
                .map(|(up_to_year, min_votes)| VotesByYear {
                    up_to_year,
                    min_votes,
                })
                .collect(),
            auto_keep_rating_percentile: 0.70,
            auto_delete_rating_percentile: 0.01,
            rating_min_titles_for_auto: 300,
        }
    }
}

impl ScoringThresholds {
    /// Vote minimum for an item released in `year`
    ///
    /// Walks the ascending `votes_by_year` table and returns the first tier
    /// whose `up_to_year` covers `year`. A missing year, or a year past the
    /// last tier, uses the last (strictest) tier. An empty table falls back
    /// to `keep_min_votes`.
    pub fn votes_needed_for_year(&self, year: Option<i32>) -> u64 {
        let mut table = self.votes_by_year.clone();
        table.sort_by_key(|tier| tier.up_to_year);

        let Some(last) = table.last() else {
            return self.keep_min_votes;
        };

        match year {
            Some(y) => table
                .iter()
                .find(|tier| y <= tier.up_to_year)
                .unwrap_or(last)
                .min_votes,
            None => last.min_votes,
        }
    }

    /// Thresholds with `keep_min_votes` resolved for `year`
    pub fn for_year(&self, year: Option<i32>) -> ScoringThresholds {
        ScoringThresholds {
            keep_min_votes: self.votes_needed_for_year(year),
            ..self.clone()
        }
    }
}

/// Misidentification sensitivity thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MisidentificationThresholds {
    /// Title similarity (0.0-1.0) below which titles are flagged as divergent
    pub title_similarity_min: f64,
    /// Largest tolerated year difference
    pub max_year_delta: i32,
    /// Rating at or below this, with many votes, looks like a different title
    pub low_rating: f64,
    /// Vote count that marks a title as well known
    pub known_min_votes: u64,
    /// Secondary score at or below this, with many votes, is suspicious
    pub secondary_floor: u32,
}

impl Default for MisidentificationThresholds {
    fn default() -> Self {
        Self {
            title_similarity_min: 0.60,
            max_year_delta: 1,
            low_rating: 3.0,
            known_min_votes: 100,
            secondary_floor: 20,
        }
    }
}

impl TomlConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make classification meaningless
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::Config("concurrency must be at least 1".to_string()));
        }

        let t = &self.thresholds;
        for (name, value) in [
            ("keep_min_rating", t.keep_min_rating),
            ("keep_min_rating_with_secondary", t.keep_min_rating_with_secondary),
            ("delete_max_rating", t.delete_max_rating),
            ("bayes_global_mean", t.bayes_global_mean),
        ] {
            if !(0.0..=10.0).contains(&value) {
                return Err(Error::Config(format!(
                    "thresholds.{} must be within 0-10, got {}",
                    name, value
                )));
            }
        }

        for (name, value) in [
            ("thresholds.auto_keep_rating_percentile", t.auto_keep_rating_percentile),
            ("thresholds.auto_delete_rating_percentile", t.auto_delete_rating_percentile),
            ("provider.min_title_similarity", self.provider.min_title_similarity),
            (
                "misidentification.title_similarity_min",
                self.misidentification.title_similarity_min,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "{} must be within 0.0-1.0, got {}",
                    name, value
                )));
            }
        }

        if self.provider.request_timeout_secs == 0 {
            return Err(Error::Config(
                "provider.request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.provider.requests_per_second == Some(0) {
            return Err(Error::Config(
                "provider.requests_per_second must be greater than 0 when set".to_string(),
            ));
        }

        Ok(())
    }

    /// Apply environment overrides on top of file values
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV_VAR) {
            if is_valid_key(&key) {
                if self.provider.api_key.is_some() {
                    warn!(
                        "Provider API key found in both TOML and {}. Using environment.",
                        API_KEY_ENV_VAR
                    );
                }
                self.provider.api_key = Some(key.trim().to_string());
            }
        }
    }

    /// Cache file location, falling back to the platform default
    pub fn resolved_cache_path(&self) -> PathBuf {
        self.cache_path.clone().unwrap_or_else(default_cache_path)
    }

    /// Provider API key, if a usable one is configured
    pub fn api_key(&self) -> Option<&str> {
        self.provider
            .api_key
            .as_deref()
            .filter(|key| is_valid_key(key))
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Locate the config file following the priority order above
///
/// Returns `None` when no candidate exists; the caller then uses defaults.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config dir
    dirs::config_dir()
        .map(|d| d.join(APP_DIR).join(CONFIG_FILE_NAME))
        .filter(|p| p.exists())
}

/// Load configuration: file (if any) → env overrides → validation
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    let mut config = match resolve_config_path(cli_arg) {
        Some(path) if path.exists() => {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
            let config = TomlConfig::from_toml_str(&content)
                .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
            info!("Configuration loaded from {}", path.display());
            config
        }
        Some(path) => {
            warn!(
                "Config file {} not found; using compiled defaults",
                path.display()
            );
            TomlConfig::default()
        }
        None => {
            info!("No config file found; using compiled defaults");
            TomlConfig::default()
        }
    };

    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

/// Write configuration atomically (temp file in the same directory + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
    temp.write_all(content.as_bytes())?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    Ok(())
}

/// Platform default cache file location
pub fn default_cache_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR).join(CACHE_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(CACHE_FILE_NAME))
}
