//! Shared domain types.
//!
//! Every categorical field of a canonical record is drawn from a closed
//! vocabulary, except the brand which stays free text (case/whitespace
//! normalized). The closed vocabularies are enums here; their `label()` strings
//! are what the encoders see and what gets persisted.

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Market-segment tier derived from a device model string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    Entry,
    Mid,
    High,
    Unknown,
}

impl Tier {
    /// Tiers in classification order: the first tier with a matching pattern wins.
    pub const ORDERED: [Tier; 3] = [Tier::Entry, Tier::Mid, Tier::High];

    pub fn label(self) -> &'static str {
        match self {
            Tier::Entry => "Entry Level",
            Tier::Mid => "Mid Level",
            Tier::High => "High Level",
            Tier::Unknown => "Unknown",
        }
    }
}

/// Repair cost bucket (the model's target).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CostCategory {
    Cheap,
    Medium,
    Expensive,
}

impl CostCategory {
    pub const ALL: [CostCategory; 3] = [CostCategory::Cheap, CostCategory::Medium, CostCategory::Expensive];

    pub fn label(self) -> &'static str {
        match self {
            CostCategory::Cheap => "Cheap",
            CostCategory::Medium => "Medium",
            CostCategory::Expensive => "Expensive",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }
}

/// Coarse turnaround category derived from a duration estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpeedCategory {
    Fast,
    Medium,
    Slow,
    Unknown,
}

impl SpeedCategory {
    pub fn label(self) -> &'static str {
        match self {
            SpeedCategory::Fast => "Fast (< 1 hour)",
            SpeedCategory::Medium => "Medium (1 - 4 hours)",
            SpeedCategory::Slow => "Slow (> 4 hours)",
            SpeedCategory::Unknown => "Unknown",
        }
    }
}

/// The categorical columns that get a fitted encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Brand,
    Tier,
    Damage,
    CostCategory,
}

impl Column {
    /// Feature columns in model input order.
    pub const FEATURES: [Column; 3] = [Column::Brand, Column::Tier, Column::Damage];

    pub fn name(self) -> &'static str {
        match self {
            Column::Brand => "brand",
            Column::Tier => "tier",
            Column::Damage => "damage",
            Column::CostCategory => "cost_category",
        }
    }

    /// Name of the estimate request field this column is derived from.
    pub fn request_field(self) -> &'static str {
        match self {
            Column::Brand => "brand",
            Column::Tier => "type",
            Column::Damage => "damage",
            Column::CostCategory => "cost",
        }
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Cost breakpoints (inclusive upper bounds of the two lower buckets).
///
/// Buckets partition `[0, ∞)`: `[0, cheap_max]`, `(cheap_max, medium_max]`,
/// `(medium_max, ∞)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostBreakpoints {
    pub cheap_max: f64,
    pub medium_max: f64,
}

impl Default for CostBreakpoints {
    fn default() -> Self {
        Self {
            cheap_max: 250_000.0,
            medium_max: 500_000.0,
        }
    }
}

impl CostBreakpoints {
    pub fn validate(&self) -> Result<(), AppError> {
        let ok = self.cheap_max.is_finite()
            && self.medium_max.is_finite()
            && self.cheap_max >= 0.0
            && self.cheap_max < self.medium_max;
        if !ok {
            return Err(AppError::new(
                2,
                format!(
                    "Invalid cost breakpoints: cheap_max={}, medium_max={} (need 0 <= cheap_max < medium_max).",
                    self.cheap_max, self.medium_max
                ),
            ));
        }
        Ok(())
    }
}

/// One historical repair transaction as read from the bulk input.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub brand: String,
    pub model: String,
    pub damage: String,
    pub cost: f64,
    pub date: Option<NaiveDate>,
}

/// A raw record after normalization and feature derivation.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    pub brand: String,
    pub tier: Tier,
    pub damage: String,
    pub cost: f64,
    pub cost_category: CostCategory,
    pub duration: String,
    pub speed: SpeedCategory,
    pub date: Option<NaiveDate>,
}

/// Where the model and encoder blobs live.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub encoders: PathBuf,
}

/// A full training run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags and environment (plus defaults).
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub data_path: PathBuf,
    pub tables_path: Option<PathBuf>,
    pub artifacts: ArtifactPaths,

    /// Minimum row count a damage category needs to stay in the training set.
    pub min_support: usize,
    pub breakpoints: CostBreakpoints,

    /// Fraction of rows held out for evaluation.
    pub test_size: f64,
    /// Seed for the train/test shuffle.
    pub seed: u64,
    pub max_depth: Option<usize>,

    pub report_json: Option<PathBuf>,
}

impl TrainConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        self.breakpoints.validate()?;
        if self.min_support == 0 {
            return Err(AppError::new(2, "Minimum category support must be >= 1."));
        }
        if !(self.test_size.is_finite() && self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(AppError::new(
                2,
                format!("Invalid test size {} (must be in (0, 1)).", self.test_size),
            ));
        }
        if self.max_depth == Some(0) {
            return Err(AppError::new(2, "Max depth must be >= 1 when set."));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_labels_round_trip() {
        for c in CostCategory::ALL {
            assert_eq!(CostCategory::from_label(c.label()), Some(c));
        }
        assert_eq!(CostCategory::from_label("Murah"), None);
    }

    #[test]
    fn breakpoints_must_be_ordered() {
        let bad = CostBreakpoints {
            cheap_max: 500_000.0,
            medium_max: 250_000.0,
        };
        assert_eq!(bad.validate().unwrap_err().exit_code(), 2);
        assert!(CostBreakpoints::default().validate().is_ok());
    }
}
