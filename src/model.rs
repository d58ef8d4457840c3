// 🤖 Model Artifacts
// Loads the trained regressor and its feature list, once, at startup.
//
// Artifacts are plain JSON exported from the training side:
//   model.json    - {"kind": "linear", ...} or {"kind": "tree_ensemble", ...}
//   features.json - ["carat", "depth", ..., "cut_Ideal", ...]

use crate::error::ArtifactError;
use crate::features::FeatureVector;
use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

// ============================================================================
// REGRESSOR INTERFACE
// ============================================================================

/// A trained model that maps one aligned feature row to a price.
pub trait Regressor: Send + Sync {
    fn predict(&self, row: &[f64]) -> Result<f64>;

    /// Model family, for display
    fn name(&self) -> &str;

    /// Minimum row width this model reads
    fn input_width(&self) -> usize;
}

// ============================================================================
// LINEAR MODEL
// ============================================================================

/// `intercept + Σ coefficients[i] * row[i]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl Regressor for LinearModel {
    fn predict(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.coefficients.len() {
            bail!(
                "linear model expects {} features, got {}",
                self.coefficients.len(),
                row.len()
            );
        }

        let dot: f64 = self
            .coefficients
            .iter()
            .zip(row)
            .map(|(coef, value)| coef * value)
            .sum();

        Ok(self.intercept + dot)
    }

    fn name(&self) -> &str {
        "linear"
    }

    fn input_width(&self) -> usize {
        self.coefficients.len()
    }
}

// ============================================================================
// TREE ENSEMBLE
// ============================================================================

/// One regression tree in flat array form.
///
/// Node `i` is a leaf when `children_left[i] == -1`; otherwise go left when
/// `row[feature[i]] <= threshold[i]`.
///
/// Deserializing runs the same structural checks as artifact loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TreeArrays")]
pub struct RegressionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<f64>,
}

/// Unchecked wire form of `RegressionTree`
#[derive(Deserialize)]
struct TreeArrays {
    children_left: Vec<i64>,
    children_right: Vec<i64>,
    feature: Vec<i64>,
    threshold: Vec<f64>,
    value: Vec<f64>,
}

impl TryFrom<TreeArrays> for RegressionTree {
    type Error = ArtifactError;

    fn try_from(arrays: TreeArrays) -> Result<Self, Self::Error> {
        let tree = RegressionTree {
            children_left: arrays.children_left,
            children_right: arrays.children_right,
            feature: arrays.feature,
            threshold: arrays.threshold,
            value: arrays.value,
        };
        tree.validate()?;
        Ok(tree)
    }
}

impl RegressionTree {
    fn node_count(&self) -> usize {
        self.children_left.len()
    }

    fn validate(&self) -> Result<(), ArtifactError> {
        let n = self.node_count();
        if n == 0 {
            return Err(ArtifactError::InvalidModel("tree has no nodes".into()));
        }
        let lengths = [
            self.children_right.len(),
            self.feature.len(),
            self.threshold.len(),
            self.value.len(),
        ];
        if lengths.iter().any(|len| *len != n) {
            return Err(ArtifactError::InvalidModel(
                "tree arrays have different lengths".into(),
            ));
        }

        for i in 0..n {
            let (left, right) = (self.children_left[i], self.children_right[i]);
            if left == -1 {
                continue;
            }
            let in_range = |child: i64| child > i as i64 && (child as usize) < n;
            if !in_range(left) || !in_range(right) {
                return Err(ArtifactError::InvalidModel(format!(
                    "node {} has out-of-range children ({}, {})",
                    i, left, right
                )));
            }
            if self.feature[i] < 0 {
                return Err(ArtifactError::InvalidModel(format!(
                    "split node {} has negative feature index",
                    i
                )));
            }
        }

        Ok(())
    }

    /// Highest feature index any split reads, plus one
    fn width(&self) -> usize {
        self.children_left
            .iter()
            .zip(&self.feature)
            .filter(|(left, _)| **left != -1)
            .filter_map(|(_, feature)| usize::try_from(*feature).ok())
            .map(|feature| feature + 1)
            .max()
            .unwrap_or(0)
    }

    /// Walk from the root to a leaf.
    ///
    /// Fields are public, so a tree built by hand may skip `validate`; every
    /// lookup is checked and a path longer than the node count is an error.
    fn predict(&self, row: &[f64]) -> Result<f64> {
        let mut node = 0usize;

        for _ in 0..self.node_count() {
            let left = self.children_left[node];
            if left == -1 {
                return self
                    .value
                    .get(node)
                    .copied()
                    .ok_or_else(|| anyhow!("leaf {} has no value", node));
            }

            let feature = self
                .feature
                .get(node)
                .and_then(|f| usize::try_from(*f).ok())
                .ok_or_else(|| anyhow!("split node {} has no valid feature index", node))?;
            let value = row
                .get(feature)
                .ok_or_else(|| anyhow!("split node {} reads feature {} of a {}-column row", node, feature, row.len()))?;
            let threshold = self
                .threshold
                .get(node)
                .ok_or_else(|| anyhow!("split node {} has no threshold", node))?;

            let next = if value <= threshold {
                left
            } else {
                *self
                    .children_right
                    .get(node)
                    .ok_or_else(|| anyhow!("split node {} has no right child", node))?
            };

            node = usize::try_from(next)
                .ok()
                .filter(|child| *child < self.node_count())
                .ok_or_else(|| anyhow!("node {} points at missing child {}", node, next))?;
        }

        bail!("tree walk did not reach a leaf within {} nodes", self.node_count())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Random forest style
    Mean,
    /// Gradient boosting style (learning rate already folded into leaves)
    Sum,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub aggregation: Aggregation,
    #[serde(default)]
    pub base_score: f64,
    pub trees: Vec<RegressionTree>,
}

impl Regressor for TreeEnsemble {
    fn predict(&self, row: &[f64]) -> Result<f64> {
        if row.len() < self.input_width() {
            bail!(
                "tree ensemble reads {} features, got {}",
                self.input_width(),
                row.len()
            );
        }

        let mut total = 0.0;
        for tree in &self.trees {
            total += tree.predict(row)?;
        }
        let combined = match self.aggregation {
            Aggregation::Mean => total / self.trees.len() as f64,
            Aggregation::Sum => total,
        };

        Ok(self.base_score + combined)
    }

    fn name(&self) -> &str {
        match self.aggregation {
            Aggregation::Mean => "random forest",
            Aggregation::Sum => "gradient boosting",
        }
    }

    fn input_width(&self) -> usize {
        self.trees.iter().map(RegressionTree::width).max().unwrap_or(0)
    }
}

// ============================================================================
// SERIALIZED MODEL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrainedModel {
    Linear(LinearModel),
    TreeEnsemble(TreeEnsemble),
}

impl TrainedModel {
    fn validate(&self) -> Result<(), ArtifactError> {
        match self {
            TrainedModel::Linear(model) => {
                if model.coefficients.is_empty() {
                    return Err(ArtifactError::InvalidModel("linear model has no coefficients".into()));
                }
            }
            TrainedModel::TreeEnsemble(ensemble) => {
                if ensemble.trees.is_empty() {
                    return Err(ArtifactError::InvalidModel("tree ensemble has no trees".into()));
                }
                for tree in &ensemble.trees {
                    tree.validate()?;
                }
            }
        }
        Ok(())
    }

    fn inner(&self) -> &dyn Regressor {
        match self {
            TrainedModel::Linear(model) => model,
            TrainedModel::TreeEnsemble(ensemble) => ensemble,
        }
    }
}

impl Regressor for TrainedModel {
    fn predict(&self, row: &[f64]) -> Result<f64> {
        self.inner().predict(row)
    }

    fn name(&self) -> &str {
        self.inner().name()
    }

    fn input_width(&self) -> usize {
        self.inner().input_width()
    }
}

// ============================================================================
// ARTIFACT LOADING
// ============================================================================

/// The regressor and feature list, checked against each other.
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub model: TrainedModel,
    pub features: FeatureVector,
    fingerprint: String,
}

impl ModelArtifacts {
    /// Load both artifacts. Either file missing is `ArtifactError::Missing`.
    pub fn load(model_path: &Path, features_path: &Path) -> Result<Self, ArtifactError> {
        let model_bytes = read_artifact(model_path)?;
        let features_bytes = read_artifact(features_path)?;

        let model: TrainedModel =
            serde_json::from_slice(&model_bytes).map_err(|source| ArtifactError::Malformed {
                path: model_path.to_path_buf(),
                source,
            })?;
        let columns: Vec<String> =
            serde_json::from_slice(&features_bytes).map_err(|source| ArtifactError::Malformed {
                path: features_path.to_path_buf(),
                source,
            })?;

        let mut hasher = Sha256::new();
        hasher.update(&model_bytes);
        hasher.update(&features_bytes);
        let fingerprint = format!("{:x}", hasher.finalize());

        let artifacts = Self::from_parts(model, FeatureVector::new(columns)?, fingerprint)?;

        info!(
            model = artifacts.model.name(),
            features = artifacts.features.len(),
            fingerprint = artifacts.short_fingerprint(),
            "Model artifacts loaded"
        );

        Ok(artifacts)
    }

    /// Assemble from already-parsed parts, running the same consistency checks
    pub fn from_parts(
        model: TrainedModel,
        features: FeatureVector,
        fingerprint: String,
    ) -> Result<Self, ArtifactError> {
        model.validate()?;

        let expected = model.input_width();
        let shape_ok = match &model {
            TrainedModel::Linear(_) => expected == features.len(),
            TrainedModel::TreeEnsemble(_) => expected <= features.len(),
        };
        if !shape_ok {
            return Err(ArtifactError::ShapeMismatch {
                expected,
                actual: features.len(),
            });
        }

        Ok(ModelArtifacts {
            model,
            features,
            fingerprint,
        })
    }

    /// SHA-256 over both artifact files
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn short_fingerprint(&self) -> &str {
        &self.fingerprint[..self.fingerprint.len().min(12)]
    }
}

fn read_artifact(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    fs::read(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            ArtifactError::Missing(PathBuf::from(path))
        } else {
            ArtifactError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}
