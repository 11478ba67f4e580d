//! Quantity units and conversion between them
//!
//! Mass units convert through grams. Household count units (piece, serving,
//! slice, medium) have no mass, so any conversion touching one of them passes
//! the quantity through unchanged and is flagged approximate.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A quantity unit as written by the user or stored on a food record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Unit {
    Gram,
    Kilogram,
    Ounce,
    Pound,
    /// Liquid cup (240 g)
    Cup,
    /// Composite unit used by per-100g records
    Per100g,
    Piece,
    Serving,
    Slice,
    Medium,
    /// Anything else; treated as a count unit
    Other(String),
}

impl Unit {
    /// Parse a unit token (case-insensitive, singular or plural)
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "g" | "gram" | "grams" => Self::Gram,
            "kg" | "kilogram" | "kilograms" => Self::Kilogram,
            "oz" | "ounce" | "ounces" => Self::Ounce,
            "lb" | "lbs" | "pound" | "pounds" => Self::Pound,
            "cup" | "cups" => Self::Cup,
            "100g" => Self::Per100g,
            "piece" | "pieces" => Self::Piece,
            "serving" | "servings" => Self::Serving,
            "slice" | "slices" => Self::Slice,
            "medium" => Self::Medium,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Gram => "g",
            Self::Kilogram => "kg",
            Self::Ounce => "oz",
            Self::Pound => "lb",
            Self::Cup => "cup",
            Self::Per100g => "100g",
            Self::Piece => "piece",
            Self::Serving => "serving",
            Self::Slice => "slice",
            Self::Medium => "medium",
            Self::Other(s) => s,
        }
    }

    /// Grams in one of this unit, or None for count units
    pub fn grams_per_unit(&self) -> Option<f64> {
        match self {
            Self::Gram => Some(1.0),
            Self::Kilogram => Some(1000.0),
            Self::Ounce => Some(28.35),
            Self::Pound => Some(453.59),
            Self::Cup => Some(240.0),
            Self::Per100g => Some(100.0),
            Self::Piece | Self::Serving | Self::Slice | Self::Medium | Self::Other(_) => None,
        }
    }

    pub fn is_count(&self) -> bool {
        self.grams_per_unit().is_none()
    }
}

impl From<String> for Unit {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<Unit> for String {
    fn from(unit: Unit) -> Self {
        unit.as_str().to_string()
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a unit conversion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversion {
    pub value: f64,
    /// True when the pair had no physical conversion and the quantity passed through
    pub approximate: bool,
}

/// Convert a quantity between units
///
/// Identical units return the quantity. Two mass units go through grams, so
/// 250 g against a `100g` record yields 2.5. A pair involving a count unit
/// returns the quantity unchanged.
pub fn convert(quantity: f64, from: &Unit, to: &Unit) -> Conversion {
    if from == to {
        return Conversion {
            value: quantity,
            approximate: false,
        };
    }

    match (from.grams_per_unit(), to.grams_per_unit()) {
        (Some(f), Some(t)) => Conversion {
            value: quantity * f / t,
            approximate: false,
        },
        _ => Conversion {
            value: quantity,
            approximate: !(from.is_count() && to.is_count()),
        },
    }
}

/// Convert a quantity to grams, if the unit has a mass
pub fn to_grams(quantity: f64, unit: &Unit) -> Option<f64> {
    unit.grams_per_unit().map(|g| quantity * g)
}
