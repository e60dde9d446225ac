//! Preprocessing pipeline shared by training and inference.
//!
//! Both entry points run the same per-record derivation (`canonical_fields`):
//! text cleaning, damage normalization, tier classification. Training adds
//! row filtering (invalid markers, rare damage categories) and cost bucketing;
//! inference adds the informational duration/speed lookup.

pub mod input;
pub mod training;

pub use input::*;
pub use training::*;

use crate::domain::Tier;
use crate::features::{classify_tier, clean_text, normalize_damage};
use crate::tables::LookupTables;

/// The normalized feature triple of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalFields {
    pub brand: String,
    pub tier: Tier,
    pub damage: String,
}

/// Derive the model features from raw brand/model/damage text.
pub fn canonical_fields(tables: &LookupTables, brand: &str, model_text: &str, damage: &str) -> CanonicalFields {
    let brand = clean_text(brand);
    let model = clean_text(model_text);
    let damage = normalize_damage(tables, damage);
    // The classifier uppercases internally, so the lowercased text is fine here.
    let tier = classify_tier(tables, &brand, &model);
    CanonicalFields { brand, tier, damage }
}
