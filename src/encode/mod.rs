//! Categorical label ↔ integer-code encoders.
//!
//! A `LabelEncoder` assigns codes by sorted label order (code = index into the
//! sorted vocabulary), so codes depend on the whole training vocabulary and are
//! not portable across training runs. The `EncoderSet` fitted by a training
//! run must be used together with the model from the same run.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::{CanonicalRecord, Column};
use crate::error::EstimateError;

/// Bidirectional label ↔ code mapping for one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit on the distinct labels of `labels`.
    pub fn fit<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: BTreeSet<String> = labels.into_iter().map(|s| s.as_ref().to_string()).collect();
        Self {
            classes: set.into_iter().collect(),
        }
    }

    /// Known labels in code order.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn code(&self, label: &str) -> Option<u32> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .ok()
            .map(|idx| idx as u32)
    }

    pub fn label(&self, code: u32) -> Option<&str> {
        self.classes.get(code as usize).map(String::as_str)
    }

    /// Deserialized encoders must still be sorted and duplicate-free.
    fn is_well_formed(&self) -> bool {
        self.classes.windows(2).all(|w| w[0] < w[1])
    }
}

/// One fitted encoder per categorical column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderSet {
    pub brand: LabelEncoder,
    pub tier: LabelEncoder,
    pub damage: LabelEncoder,
    pub cost_category: LabelEncoder,
}

impl EncoderSet {
    /// Fit all four encoders over the (already filtered) training frame.
    pub fn fit(records: &[CanonicalRecord]) -> Self {
        Self {
            brand: LabelEncoder::fit(records.iter().map(|r| r.brand.as_str())),
            tier: LabelEncoder::fit(records.iter().map(|r| r.tier.label())),
            damage: LabelEncoder::fit(records.iter().map(|r| r.damage.as_str())),
            cost_category: LabelEncoder::fit(records.iter().map(|r| r.cost_category.label())),
        }
    }

    pub fn get(&self, column: Column) -> &LabelEncoder {
        match column {
            Column::Brand => &self.brand,
            Column::Tier => &self.tier,
            Column::Damage => &self.damage,
            Column::CostCategory => &self.cost_category,
        }
    }

    /// Code for `label` in `column`; labels never seen in training are rejected.
    pub fn encode(&self, column: Column, label: &str) -> Result<u32, EstimateError> {
        self.get(column)
            .code(label)
            .ok_or_else(|| EstimateError::UnknownCategory {
                column,
                label: label.to_string(),
            })
    }

    pub fn decode(&self, column: Column, code: u32) -> Result<&str, EstimateError> {
        self.get(column).label(code).ok_or_else(|| {
            EstimateError::Artifact(format!("code {code} is out of range for the {column} encoder"))
        })
    }

    /// Encode a record's feature columns in model input order.
    pub fn encode_features(&self, brand: &str, tier: &str, damage: &str) -> Result<[u32; 3], EstimateError> {
        Ok([
            self.encode(Column::Brand, brand)?,
            self.encode(Column::Tier, tier)?,
            self.encode(Column::Damage, damage)?,
        ])
    }

    pub fn validate(&self) -> Result<(), EstimateError> {
        for column in [Column::Brand, Column::Tier, Column::Damage, Column::CostCategory] {
            let enc = self.get(column);
            if enc.is_empty() || !enc.is_well_formed() {
                return Err(EstimateError::Artifact(format!(
                    "{column} encoder is empty or not sorted/unique"
                )));
            }
        }
        Ok(())
    }
}
