// 💎 Catalog - Diamond attributes
// Enumerated grades, numeric field bounds, and the input/record types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// INPUT ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("unknown {field} '{label}' (expected one of: {expected})")]
    UnknownLabel {
        field: &'static str,
        label: String,
        expected: String,
    },
}

// ============================================================================
// ENUMERATED GRADES
// ============================================================================

/// Shared behavior of the three categorical attributes.
///
/// `label()` is the canonical text used everywhere a grade leaves the
/// process: the store, the seed file, and one-hot column names.
pub trait Grade: Sized + Copy + 'static {
    /// Attribute name, also the one-hot column prefix
    const FIELD: &'static str;

    /// Full domain, in display order
    const ALL: &'static [Self];

    fn label(&self) -> &'static str;

    /// Exact-match parse on the canonical label (surrounding whitespace ignored)
    fn from_label(label: &str) -> Result<Self, InputError> {
        let wanted = label.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|grade| grade.label() == wanted)
            .ok_or_else(|| InputError::UnknownLabel {
                field: Self::FIELD,
                label: wanted.to_string(),
                expected: Self::ALL
                    .iter()
                    .map(|g| g.label())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    /// Next grade in the domain, wrapping around
    fn cycle_next(&self) -> Self {
        let i = self.position();
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    /// Previous grade in the domain, wrapping around
    fn cycle_previous(&self) -> Self {
        let i = self.position();
        Self::ALL[(i + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    fn position(&self) -> usize {
        let label = self.label();
        Self::ALL
            .iter()
            .position(|g| g.label() == label)
            .unwrap_or(0)
    }

    /// One-hot column name for this grade, e.g. `cut_Very Good`
    fn column_name(&self) -> String {
        format!("{}_{}", Self::FIELD, self.label())
    }
}

/// Generates a grade enum with its label table and the string conversions
/// the rest of the crate leans on (serde, clap, rusqlite all go through labels).
macro_rules! grade_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal {
            $($variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant),+
        }

        impl Grade for $name {
            const FIELD: &'static str = $field;
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(self.label())
            }
        }

        impl FromStr for $name {
            type Err = InputError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$name as Grade>::from_label(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.label())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let label = String::deserialize(deserializer)?;
                <$name as Grade>::from_label(&label).map_err(serde::de::Error::custom)
            }
        }
    };
}

grade_enum! {
    /// Cut quality, worst to best
    Cut, "cut" {
        Fair => "Fair",
        Good => "Good",
        VeryGood => "Very Good",
        Premium => "Premium",
        Ideal => "Ideal",
    }
}

grade_enum! {
    /// Color grade, D (colorless) through J
    Color, "color" {
        D => "D",
        E => "E",
        F => "F",
        G => "G",
        H => "H",
        I => "I",
        J => "J",
    }
}

grade_enum! {
    /// Clarity grade, I1 (included) through IF (internally flawless)
    Clarity, "clarity" {
        I1 => "I1",
        SI2 => "SI2",
        SI1 => "SI1",
        VS2 => "VS2",
        VS1 => "VS1",
        VVS2 => "VVS2",
        VVS1 => "VVS1",
        IF => "IF",
    }
}

// ============================================================================
// NUMERIC FIELDS
// ============================================================================

/// The six pass-through numeric attributes, in form and feature order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericField {
    Carat,
    Depth,
    Table,
    X,
    Y,
    Z,
}

/// Bounds and widget defaults for one numeric input
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
    pub default: f64,
    pub step: f64,
}

impl Bounds {
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl NumericField {
    pub const ALL: [NumericField; 6] = [
        NumericField::Carat,
        NumericField::Depth,
        NumericField::Table,
        NumericField::X,
        NumericField::Y,
        NumericField::Z,
    ];

    /// Column name in the store, the seed file, and the feature vector
    pub fn name(&self) -> &'static str {
        match self {
            NumericField::Carat => "carat",
            NumericField::Depth => "depth",
            NumericField::Table => "table",
            NumericField::X => "x",
            NumericField::Y => "y",
            NumericField::Z => "z",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }

    pub fn bounds(&self) -> Bounds {
        match self {
            NumericField::Carat => Bounds { min: 0.0, max: 5.0, default: 0.5, step: 0.01 },
            NumericField::Depth => Bounds { min: 50.0, max: 70.0, default: 61.5, step: 0.1 },
            NumericField::Table => Bounds { min: 50.0, max: 70.0, default: 55.0, step: 0.5 },
            NumericField::X => Bounds { min: 0.0, max: 10.0, default: 5.1, step: 0.01 },
            NumericField::Y => Bounds { min: 0.0, max: 10.0, default: 5.1, step: 0.01 },
            NumericField::Z => Bounds { min: 0.0, max: 10.0, default: 3.1, step: 0.01 },
        }
    }

    /// Reject values the input widgets would not allow
    pub fn check(&self, value: f64) -> Result<f64, InputError> {
        let bounds = self.bounds();
        if bounds.contains(value) {
            Ok(value)
        } else {
            Err(InputError::OutOfRange {
                field: self.name(),
                value,
                min: bounds.min,
                max: bounds.max,
            })
        }
    }
}

// ============================================================================
// INPUT & RECORD
// ============================================================================

/// The nine user-entered attributes of a diamond.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiamondInput {
    pub carat: f64,
    pub depth: f64,
    pub table: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub cut: Cut,
    pub color: Color,
    pub clarity: Clarity,
}

impl Default for DiamondInput {
    fn default() -> Self {
        DiamondInput {
            carat: NumericField::Carat.bounds().default,
            depth: NumericField::Depth.bounds().default,
            table: NumericField::Table.bounds().default,
            x: NumericField::X.bounds().default,
            y: NumericField::Y.bounds().default,
            z: NumericField::Z.bounds().default,
            cut: Cut::ALL[0],
            color: Color::ALL[0],
            clarity: Clarity::ALL[0],
        }
    }
}

impl DiamondInput {
    pub fn numeric(&self, field: NumericField) -> f64 {
        match field {
            NumericField::Carat => self.carat,
            NumericField::Depth => self.depth,
            NumericField::Table => self.table,
            NumericField::X => self.x,
            NumericField::Y => self.y,
            NumericField::Z => self.z,
        }
    }

    pub fn set_numeric(&mut self, field: NumericField, value: f64) {
        match field {
            NumericField::Carat => self.carat = value,
            NumericField::Depth => self.depth = value,
            NumericField::Table => self.table = value,
            NumericField::X => self.x = value,
            NumericField::Y => self.y = value,
            NumericField::Z => self.z = value,
        }
    }

    /// The six numerics in `NumericField::ALL` order
    pub fn numerics(&self) -> [f64; 6] {
        NumericField::ALL.map(|field| self.numeric(field))
    }

    /// Range-check every numeric field, reporting the first violation
    pub fn validate(&self) -> Result<(), InputError> {
        for field in NumericField::ALL {
            field.check(self.numeric(field))?;
        }
        Ok(())
    }

    pub fn with_price(self, price: f64) -> DiamondRecord {
        DiamondRecord {
            id: None,
            input: self,
            price,
        }
    }
}

/// One persisted row: the input plus the price attached to it.
///
/// `id` is the store's surrogate key, `None` until inserted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiamondRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    #[serde(flatten)]
    pub input: DiamondInput,

    pub price: f64,
}

impl DiamondRecord {
    /// Compare the ten non-key attributes, ignoring `id`
    pub fn same_attributes(&self, other: &DiamondRecord) -> bool {
        self.input == other.input && self.price == other.price
    }
}
