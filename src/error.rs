// Typed errors for startup artifacts and seed data.
// Everything else propagates as anyhow::Error with context.

use std::path::PathBuf;
use thiserror::Error;

/// Problems loading the model or its feature list.
///
/// Any of these at startup is fatal: no input is accepted without a model.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("model artifact not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed artifact {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("feature list is empty")]
    EmptyFeatureVector,

    #[error("feature list contains '{0}' more than once")]
    DuplicateColumn(String),

    #[error("model expects {expected} features but the feature list has {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("invalid model: {0}")]
    InvalidModel(String),
}

/// Problems reading the seed CSV. Always non-fatal for the application.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("seed file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("seed file has no '{0}' column")]
    MissingColumn(&'static str),

    #[error("seed file has unexpected column '{0}'")]
    UnexpectedColumn(String),

    #[error("seed file has column '{0}' more than once")]
    DuplicateColumn(String),

    #[error("line {line}, column '{column}': {message}")]
    InvalidValue {
        line: u64,
        column: &'static str,
        message: String,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),
}
