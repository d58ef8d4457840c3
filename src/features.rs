// 🧮 Feature Aligner
// Maps one diamond input onto the exact column layout the model was trained on.
//
// The model has no column-name introspection at inference time, so the output
// row must follow the FeatureVector order. Categorical grades are one-hot
// encoded as `{field}_{label}` columns; anything the vector does not list is
// dropped, anything the input does not touch is 0.

use crate::catalog::{Clarity, Color, Cut, DiamondInput, Grade, NumericField};
use crate::error::ArtifactError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

// ============================================================================
// FEATURE VECTOR
// ============================================================================

/// Ordered model input columns, fixed at training time.
///
/// Serialized as a bare JSON array; deserializing goes through `new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureVector {
    columns: Vec<String>,
}

impl TryFrom<Vec<String>> for FeatureVector {
    type Error = ArtifactError;

    fn try_from(columns: Vec<String>) -> Result<Self, Self::Error> {
        FeatureVector::new(columns)
    }
}

impl From<FeatureVector> for Vec<String> {
    fn from(features: FeatureVector) -> Self {
        features.columns
    }
}

impl FeatureVector {
    /// Build from column names, rejecting empty or duplicated lists
    pub fn new(columns: Vec<String>) -> Result<Self, ArtifactError> {
        if columns.is_empty() {
            return Err(ArtifactError::EmptyFeatureVector);
        }

        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(ArtifactError::DuplicateColumn(column.clone()));
            }
        }

        Ok(FeatureVector { columns })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }
}

// ============================================================================
// ALIGNER
// ============================================================================

/// Lookup table from input attributes to feature vector slots.
///
/// Built once per loaded FeatureVector. `align` only writes through this
/// table, so every slot the table does not reach stays 0.
#[derive(Debug, Clone)]
pub struct FeatureAligner {
    width: usize,
    // (position in `DiamondInput::numerics`, feature index)
    numeric_slots: Vec<(usize, usize)>,
    one_hot_slots: HashMap<(&'static str, String), usize>,
    unmapped: Vec<String>,
}

impl FeatureAligner {
    pub fn new(features: &FeatureVector) -> Self {
        let mut numeric_slots = Vec::new();
        let mut one_hot_slots = HashMap::new();
        let mut unmapped = Vec::new();

        // Every (field, label) pair the typed input can produce
        let known: HashMap<String, (&'static str, &'static str)> = one_hot_domain()
            .map(|(field, label)| (format!("{}_{}", field, label), (field, label)))
            .collect();

        for (index, column) in features.columns().iter().enumerate() {
            if let Some(position) = NumericField::ALL.iter().position(|f| f.name() == column.as_str()) {
                numeric_slots.push((position, index));
            } else if let Some((field, label)) = known.get(column) {
                one_hot_slots.insert((*field, (*label).to_string()), index);
            } else {
                unmapped.push(column.clone());
            }
        }

        if !unmapped.is_empty() {
            warn!(
                columns = ?unmapped,
                "Feature columns not produced by any input; they will always be 0"
            );
        }

        debug!(
            width = features.len(),
            numeric = numeric_slots.len(),
            one_hot = one_hot_slots.len(),
            "Feature aligner built"
        );

        FeatureAligner {
            width: features.len(),
            numeric_slots,
            one_hot_slots,
            unmapped,
        }
    }

    /// Output row width (= FeatureVector length)
    pub fn width(&self) -> usize {
        self.width
    }

    /// Feature columns that no input can ever set
    pub fn unmapped_columns(&self) -> &[String] {
        &self.unmapped
    }

    /// Align a typed input row.
    pub fn align(&self, input: &DiamondInput) -> Vec<f64> {
        self.align_labels(
            &input.numerics(),
            &[
                (Cut::FIELD, input.cut.label()),
                (Color::FIELD, input.color.label()),
                (Clarity::FIELD, input.clarity.label()),
            ],
        )
    }

    /// Align a row whose categorical values are free-form labels.
    ///
    /// A label with no matching feature column contributes nothing, so that
    /// field encodes as all zeros.
    pub fn align_labels(&self, numerics: &[f64; 6], categoricals: &[(&str, &str)]) -> Vec<f64> {
        let mut row = vec![0.0; self.width];

        for (position, index) in &self.numeric_slots {
            row[*index] = numerics[*position];
        }

        for (field, label) in categoricals {
            let slot = canonical_field(field)
                .and_then(|f| self.one_hot_slots.get(&(f, (*label).to_string())));
            match slot {
                Some(index) => row[*index] = 1.0,
                None => debug!(field = *field, label = *label, "No feature column for categorical value"),
            }
        }

        row
    }
}

/// All (field, label) pairs across the three grade domains
fn one_hot_domain() -> impl Iterator<Item = (&'static str, &'static str)> {
    let cuts = Cut::ALL.iter().map(|g| (Cut::FIELD, g.label()));
    let colors = Color::ALL.iter().map(|g| (Color::FIELD, g.label()));
    let clarities = Clarity::ALL.iter().map(|g| (Clarity::FIELD, g.label()));
    cuts.chain(colors).chain(clarities)
}

fn canonical_field(field: &str) -> Option<&'static str> {
    [Cut::FIELD, Color::FIELD, Clarity::FIELD]
        .into_iter()
        .find(|f| *f == field)
}
