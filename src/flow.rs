// 💰 Prediction Flow
// align -> predict -> persist -> reload, one submission at a time.

use crate::catalog::{DiamondInput, DiamondRecord};
use crate::db::Store;
use crate::features::FeatureAligner;
use crate::model::{ModelArtifacts, Regressor};
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// How many stored records a submission reports back
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// Result of one submission
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    /// The stored record, with its assigned key
    pub record: DiamondRecord,
    /// Most recent records after the insert, oldest first
    pub recent: Vec<DiamondRecord>,
    pub predicted_at: DateTime<Utc>,
}

/// Everything a submission needs, built once at startup and never mutated.
pub struct PriceEstimator {
    model: Arc<dyn Regressor>,
    aligner: FeatureAligner,
    store: Store,
    recent_limit: usize,
    fingerprint: String,
}

impl fmt::Debug for PriceEstimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriceEstimator")
            .field("model", &self.model.name())
            .field("store", &self.store)
            .field("recent_limit", &self.recent_limit)
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

impl PriceEstimator {
    pub fn new(artifacts: ModelArtifacts, store: Store) -> Self {
        let aligner = FeatureAligner::new(&artifacts.features);
        let fingerprint = artifacts.short_fingerprint().to_string();
        PriceEstimator {
            model: Arc::new(artifacts.model),
            aligner,
            store,
            recent_limit: DEFAULT_RECENT_LIMIT,
            fingerprint,
        }
    }

    /// Build around any regressor (tests, alternative model families)
    pub fn with_model(model: Arc<dyn Regressor>, aligner: FeatureAligner, store: Store) -> Self {
        PriceEstimator {
            model,
            aligner,
            store,
            recent_limit: DEFAULT_RECENT_LIMIT,
            fingerprint: String::new(),
        }
    }

    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit;
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn recent_limit(&self) -> usize {
        self.recent_limit
    }

    /// Price an input without storing it
    pub fn estimate(&self, input: &DiamondInput) -> Result<f64> {
        let row = self.aligner.align(input);
        if row.len() != self.aligner.width() {
            bail!("aligned row has {} columns, expected {}", row.len(), self.aligner.width());
        }

        let price = self.model.predict(&row)?;
        if !price.is_finite() {
            bail!("model produced a non-finite price ({})", price);
        }

        Ok(price)
    }

    /// Run the full flow for one submission.
    pub fn submit(&self, input: DiamondInput) -> Result<Prediction> {
        let price = self.estimate(&input)?;

        let mut record = input.with_price(price);
        record.id = Some(self.store.save(&record)?);

        info!(
            id = ?record.id,
            price,
            cut = %input.cut,
            color = %input.color,
            clarity = %input.clarity,
            carat = input.carat,
            "Prediction saved"
        );

        let recent = self.store.load_recent(self.recent_limit)?;

        Ok(Prediction {
            record,
            recent,
            predicted_at: Utc::now(),
        })
    }

    pub fn recent(&self) -> Result<Vec<DiamondRecord>> {
        self.store.load_recent(self.recent_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::bootstrap;
    use crate::catalog::{Clarity, Color, Cut, Grade, NumericField};
    use crate::features::FeatureVector;
    use crate::model::{LinearModel, TrainedModel};
    use tempfile::{tempdir, TempDir};

    /// Store, feature list, and a hand-written linear model
    fn fixture() -> (TempDir, PriceEstimator) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("diamonds.db");
        bootstrap(&db_path, &dir.path().join("none.csv")).unwrap();

        let mut columns: Vec<String> = NumericField::ALL.iter().map(|f| f.name().to_string()).collect();
        columns.extend(["cut_Ideal", "color_E", "clarity_SI1"].map(String::from));
        let features = FeatureVector::new(columns).unwrap();

        // 4000 per carat, +500 for Ideal, +300 for E, +200 for SI1
        let model = TrainedModel::Linear(LinearModel {
            intercept: 100.0,
            coefficients: vec![4000.0, 0.0, 0.0, 0.0, 0.0, 0.0, 500.0, 300.0, 200.0],
        });
        let artifacts = ModelArtifacts::from_parts(model, features, "ab".repeat(32)).unwrap();

        let estimator = PriceEstimator::new(artifacts, Store::new(db_path));
        (dir, estimator)
    }

    fn ideal_input() -> DiamondInput {
        DiamondInput {
            carat: 0.5,
            depth: 61.5,
            table: 55.0,
            x: 5.1,
            y: 5.1,
            z: 3.1,
            cut: Cut::Ideal,
            color: Color::E,
            clarity: Clarity::SI1,
        }
    }

    #[test]
    fn test_submit_predicts_persists_and_reloads() {
        let (_dir, estimator) = fixture();

        let prediction = estimator.submit(ideal_input()).unwrap();

        assert_eq!(prediction.record.price, 100.0 + 2000.0 + 500.0 + 300.0 + 200.0);
        assert!(prediction.record.id.is_some());
        assert_eq!(prediction.recent.len(), 1);
        assert_eq!(prediction.recent[0], prediction.record);
    }

    #[test]
    fn test_categories_outside_feature_list_add_nothing() {
        let (_dir, estimator) = fixture();
        let input = DiamondInput {
            cut: Cut::Fair,
            color: Color::J,
            clarity: Clarity::I1,
            ..ideal_input()
        };

        assert_eq!(estimator.estimate(&input).unwrap(), 2100.0);
    }

    #[test]
    fn test_recent_is_capped() {
        let (_dir, estimator) = fixture();

        let mut last = None;
        for i in 0..12 {
            let input = DiamondInput {
                carat: 0.1 * (i + 1) as f64,
                cut: Cut::ALL[i % Cut::ALL.len()],
                ..ideal_input()
            };
            last = Some(estimator.submit(input).unwrap());
        }

        let last = last.unwrap();
        assert_eq!(last.recent.len(), DEFAULT_RECENT_LIMIT);
        assert_eq!(last.recent.last().unwrap().id, last.record.id);
        assert_eq!(estimator.store().count().unwrap(), 12);
        assert!(last.recent.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn test_non_finite_price_is_rejected_and_not_stored() {
        struct Broken;
        impl Regressor for Broken {
            fn predict(&self, _row: &[f64]) -> Result<f64> {
                Ok(f64::NAN)
            }
            fn name(&self) -> &str {
                "broken"
            }
            fn input_width(&self) -> usize {
                0
            }
        }

        let (_dir, fixture) = fixture();
        let features = FeatureVector::new(vec!["carat".into()]).unwrap();
        let estimator = PriceEstimator::with_model(
            Arc::new(Broken),
            FeatureAligner::new(&features),
            fixture.store().clone(),
        );

        assert!(estimator.submit(ideal_input()).is_err());
        assert_eq!(estimator.store().count().unwrap(), 0);
    }

    #[test]
    fn test_fingerprint_is_shortened() {
        let (_dir, estimator) = fixture();

        assert_eq!(estimator.fingerprint(), "abababababab");
        assert_eq!(estimator.model_name(), "linear");

        let debug = format!("{:?}", estimator);
        assert!(debug.contains("\"linear\""));
        assert!(debug.contains("abababababab"));
    }
}
