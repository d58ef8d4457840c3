// 🔧 Schema Bootstrapper
// Makes sure the store exists, and fills a brand-new store from seed data.

use crate::db::{count_diamonds, ensure_schema, insert_diamonds, SchemaState};
use crate::error::SeedError;
use crate::seed::load_seed_csv;
use anyhow::{Context, Result};
use rusqlite::Connection;
use std::fmt;
use std::path::Path;
use tracing::{error, info, warn};

/// What happened to the seed file on this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    /// Rows appended to the store
    Loaded(usize),
    /// No seed file; the store stays empty
    Missing,
    /// Seed file present but unusable; nothing was appended
    Failed(String),
    /// Store already had rows, or was not created on this run
    Skipped,
}

impl SeedOutcome {
    /// Notice for the user, if this outcome deserves one
    pub fn notice(&self) -> Option<String> {
        match self {
            SeedOutcome::Loaded(n) => Some(format!("Initial data loaded into database ({} rows).", n)),
            SeedOutcome::Missing => Some("Seed data not found. Database initialized empty.".to_string()),
            SeedOutcome::Failed(reason) => Some(format!("Error loading initial data: {}", reason)),
            SeedOutcome::Skipped => None,
        }
    }
}

impl fmt::Display for SeedOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeedOutcome::Loaded(n) => write!(f, "loaded {} rows", n),
            SeedOutcome::Missing => write!(f, "seed file missing"),
            SeedOutcome::Failed(reason) => write!(f, "failed: {}", reason),
            SeedOutcome::Skipped => write!(f, "skipped"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    pub schema: SchemaState,
    pub seed: SeedOutcome,
}

/// Seed the store from `seed_path`, but only while it holds no rows.
///
/// Never fails on seed problems: a missing or malformed file is reported in
/// the returned outcome and the store is left untouched. Storage errors still
/// propagate.
pub fn seed_if_empty(conn: &mut Connection, seed_path: &Path) -> Result<SeedOutcome> {
    if count_diamonds(conn)? > 0 {
        return Ok(SeedOutcome::Skipped);
    }

    let records = match load_seed_csv(seed_path) {
        Ok(records) => records,
        Err(SeedError::NotFound(path)) => {
            warn!(path = %path.display(), "Seed file not found, store left empty");
            return Ok(SeedOutcome::Missing);
        }
        Err(e) => {
            error!(path = %seed_path.display(), error = %e, "Seed file could not be parsed");
            return Ok(SeedOutcome::Failed(e.to_string()));
        }
    };

    match insert_diamonds(conn, &records) {
        Ok(n) => {
            info!(rows = n, path = %seed_path.display(), "Seed data loaded");
            Ok(SeedOutcome::Loaded(n))
        }
        Err(e) => {
            error!(error = %e, "Seed data could not be stored");
            Ok(SeedOutcome::Failed(format!("{:#}", e)))
        }
    }
}

/// Open (creating if needed) the store at `db_path`, ensure its schema, and
/// seed it when this call is the one that created the table.
pub fn bootstrap(db_path: &Path, seed_path: &Path) -> Result<BootstrapReport> {
    let mut conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let schema = ensure_schema(&mut conn)
        .with_context(|| format!("Failed to initialize database {}", db_path.display()))?;

    let seed = match schema {
        SchemaState::Created => seed_if_empty(&mut conn, seed_path)?,
        SchemaState::Existing => SeedOutcome::Skipped,
    };

    info!(db = %db_path.display(), ?schema, seed = %seed, "Store ready");

    Ok(BootstrapReport { schema, seed })
}
