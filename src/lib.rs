// Diamond Price Estimator - Core Library
// Exposes all modules for use in CLI, TUI, API server, and tests

pub mod catalog;    // Grades, numeric bounds, input/record types
pub mod error;      // Typed errors: model artifacts, seed data
pub mod db;         // Persistence Gateway
pub mod seed;       // Seed CSV parsing
pub mod bootstrap;  // Schema Bootstrapper
pub mod features;   // Feature Aligner
pub mod model;      // Model artifacts + regressors
pub mod flow;       // Prediction Flow
pub mod form;       // Interactive form state
pub mod config;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use catalog::{
    Bounds, Clarity, Color, Cut, DiamondInput, DiamondRecord, Grade, InputError, NumericField,
};
pub use error::{ArtifactError, SeedError};
pub use db::{
    Store, SchemaState,
    ensure_schema, insert_diamond, insert_diamonds,
    get_all_diamonds, get_recent_diamonds, count_diamonds,
};
pub use seed::{load_seed_csv, read_seed, SEED_COLUMNS};
pub use bootstrap::{bootstrap, seed_if_empty, BootstrapReport, SeedOutcome};
pub use features::{FeatureAligner, FeatureVector};
pub use model::{
    Aggregation, LinearModel, ModelArtifacts, RegressionTree, Regressor, TrainedModel,
    TreeEnsemble,
};
pub use flow::{Prediction, PriceEstimator, DEFAULT_RECENT_LIMIT};
pub use form::{FormField, FormState};
pub use config::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Load artifacts and open the store: everything a prediction surface needs.
///
/// Artifacts are loaded first so a missing model halts startup before the
/// store is touched.
pub fn startup(config: &Config) -> anyhow::Result<(PriceEstimator, BootstrapReport)> {
    let artifacts = ModelArtifacts::load(&config.model_path, &config.features_path)?;
    let report = bootstrap(&config.db_path, &config.seed_path)?;

    let estimator = PriceEstimator::new(artifacts, Store::new(&config.db_path))
        .with_recent_limit(config.recent_limit);

    Ok((estimator, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_startup_halts_without_artifacts() {
        let dir = tempdir().unwrap();
        let config = Config {
            db_path: dir.path().join("diamonds.db"),
            seed_path: dir.path().join("diamonds2.csv"),
            model_path: dir.path().join("model.json"),
            features_path: dir.path().join("features.json"),
            ..Config::default()
        };

        let Err(err) = startup(&config) else {
            panic!("startup succeeded without model artifacts");
        };

        let artifact_error = err.downcast_ref::<ArtifactError>().unwrap();
        assert!(matches!(artifact_error, ArtifactError::Missing(_)));
        assert!(err.to_string().contains("model.json"));
        // Nothing was created
        assert!(!config.db_path.exists());
    }

    #[test]
    fn test_startup_end_to_end() {
        let dir = tempdir().unwrap();
        let config = Config {
            db_path: dir.path().join("diamonds.db"),
            seed_path: dir.path().join("diamonds2.csv"),
            model_path: dir.path().join("model.json"),
            features_path: dir.path().join("features.json"),
            recent_limit: 2,
            ..Config::default()
        };
        fs::write(
            &config.model_path,
            r#"{"kind": "linear", "intercept": 10.0, "coefficients": [3000.0, 400.0]}"#,
        )
        .unwrap();
        fs::write(&config.features_path, r#"["carat", "cut_Premium"]"#).unwrap();
        fs::write(
            &config.seed_path,
            "carat,cut,color,clarity,depth,table,price,x,y,z\n\
             0.3,Fair,J,I1,64.0,58,400,4.2,4.2,2.7\n\
             0.4,Good,H,SI2,63.0,57,600,4.6,4.6,2.9\n",
        )
        .unwrap();

        let (estimator, report) = startup(&config).unwrap();
        assert_eq!(report.seed, SeedOutcome::Loaded(2));

        let prediction = estimator
            .submit(DiamondInput {
                carat: 1.0,
                cut: Cut::Premium,
                ..DiamondInput::default()
            })
            .unwrap();

        assert_eq!(prediction.record.price, 3410.0);
        assert_eq!(prediction.recent.len(), 2);
        assert_eq!(prediction.recent[0].price, 600.0);
        assert_eq!(prediction.recent[1], prediction.record);
    }
}
