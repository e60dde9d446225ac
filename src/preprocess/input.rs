//! Single-record (inference-time) transformation.

use crate::domain::{SpeedCategory, Tier};
use crate::features::{categorize_speed, estimate_duration};
use crate::preprocess::canonical_fields;
use crate::tables::LookupTables;

/// A live request after the same normalization training applies.
///
/// `duration` and `speed` are descriptive only; they are not model features.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedInput {
    pub brand: String,
    pub tier: Tier,
    pub damage: String,
    pub speed: SpeedCategory,
    pub duration: String,
}

pub fn preprocess_input(tables: &LookupTables, brand: &str, model_text: &str, damage: &str) -> PreparedInput {
    let fields = canonical_fields(tables, brand, model_text, damage);
    let duration = estimate_duration(tables, &fields.damage);
    PreparedInput {
        brand: fields.brand,
        tier: fields.tier,
        damage: fields.damage,
        speed: categorize_speed(&duration),
        duration,
    }
}
