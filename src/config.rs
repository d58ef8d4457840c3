use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::flow::DEFAULT_RECENT_LIMIT;

pub const DB_PATH_VAR: &str = "DIAMOND_DB_PATH";
pub const SEED_PATH_VAR: &str = "DIAMOND_SEED_PATH";
pub const MODEL_PATH_VAR: &str = "DIAMOND_MODEL_PATH";
pub const FEATURES_PATH_VAR: &str = "DIAMOND_FEATURES_PATH";
pub const BIND_ADDR_VAR: &str = "DIAMOND_BIND_ADDR";
pub const RECENT_LIMIT_VAR: &str = "DIAMOND_RECENT_LIMIT";

/// Application configuration.
///
/// Resolved as built-in defaults, then environment variables (a `.env` file
/// in the working directory is honored), then command-line flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// SQLite database file
    pub db_path: PathBuf,

    /// Seed CSV, read only when the database is first created
    pub seed_path: PathBuf,

    /// Serialized regressor
    pub model_path: PathBuf,

    /// Ordered feature column list
    pub features_path: PathBuf,

    /// Listen address for the HTTP server
    pub bind_addr: String,

    /// Number of recent records shown after each prediction
    pub recent_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: PathBuf::from("diamonds.db"),
            seed_path: PathBuf::from("diamonds2.csv"),
            model_path: PathBuf::from("model.json"),
            features_path: PathBuf::from("features.json"),
            bind_addr: "127.0.0.1:3000".to_string(),
            recent_limit: DEFAULT_RECENT_LIMIT,
        }
    }
}

impl Config {
    /// Loads configuration from the process environment.
    ///
    /// Optional environment variables:
    /// - `DIAMOND_DB_PATH` (default: `diamonds.db`)
    /// - `DIAMOND_SEED_PATH` (default: `diamonds2.csv`)
    /// - `DIAMOND_MODEL_PATH` (default: `model.json`)
    /// - `DIAMOND_FEATURES_PATH` (default: `features.json`)
    /// - `DIAMOND_BIND_ADDR` (default: `127.0.0.1:3000`)
    /// - `DIAMOND_RECENT_LIMIT` (default: `10`)
    ///
    /// # Errors
    ///
    /// Returns an error if `DIAMOND_RECENT_LIMIT` is not a number.
    pub fn from_env() -> Result<Self> {
        // Load .env file
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(path) = lookup(DB_PATH_VAR) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(SEED_PATH_VAR) {
            config.seed_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(MODEL_PATH_VAR) {
            config.model_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(FEATURES_PATH_VAR) {
            config.features_path = PathBuf::from(path);
        }
        if let Some(addr) = lookup(BIND_ADDR_VAR) {
            config.bind_addr = addr;
        }
        if let Some(limit) = lookup(RECENT_LIMIT_VAR) {
            config.recent_limit = limit
                .trim()
                .parse()
                .with_context(|| format!("{} must be a non-negative integer, got '{}'", RECENT_LIMIT_VAR, limit))?;
        }

        Ok(config)
    }

    /// Log file written while the terminal UI owns the screen
    pub fn log_path(&self) -> PathBuf {
        self.db_path.with_extension("log")
    }
}
