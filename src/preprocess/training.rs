//! Bulk (training-time) transformation.
//!
//! Stages, in order:
//! 1. drop rows with a blank text field or an invalid cost
//! 2. drop rows whose cleaned text contains a reserved invalid-data marker
//! 3. derive canonical fields (damage category, tier) per row
//! 4. drop damage categories below the minimum support
//! 5. derive cost category, duration estimate and speed category
//!
//! Dropped rows are not errors; they are counted per stage.

use std::collections::HashMap;

use rayon::prelude::*;
use serde::Serialize;

use crate::domain::{CanonicalRecord, CostBreakpoints, RawRecord};
use crate::features::{categorize_cost, categorize_speed, clean_text, estimate_duration};
use crate::preprocess::{CanonicalFields, canonical_fields};
use crate::tables::LookupTables;

/// Punctuation that marks malformed shop entries.
pub const INVALID_MARKERS: [char; 3] = ['?', ',', '+'];

/// Default minimum row count for a damage category to stay in training.
pub const DEFAULT_MIN_SUPPORT: usize = 9;

#[derive(Debug, Clone)]
pub struct PreprocessOptions {
    pub min_support: usize,
    pub breakpoints: CostBreakpoints,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            min_support: DEFAULT_MIN_SUPPORT,
            breakpoints: CostBreakpoints::default(),
        }
    }
}

/// Row counts before/after one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageCount {
    pub name: &'static str,
    pub rows_in: usize,
    pub rows_out: usize,
}

impl StageCount {
    pub fn dropped(&self) -> usize {
        self.rows_in - self.rows_out
    }
}

/// Per-stage statistics of a bulk transformation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageReport {
    pub stages: Vec<StageCount>,
    /// Damage categories removed by the support filter, with their row counts.
    pub rare_categories: Vec<(String, usize)>,
}

impl StageReport {
    pub fn push(&mut self, name: &'static str, rows_in: usize, rows_out: usize) {
        tracing::info!(stage = name, rows_in, rows_out, dropped = rows_in - rows_out, "preprocess stage");
        self.stages.push(StageCount { name, rows_in, rows_out });
    }

    pub fn total_dropped(&self) -> usize {
        self.stages.iter().map(StageCount::dropped).sum()
    }
}

/// Output of the bulk transformation.
#[derive(Debug, Clone)]
pub struct TrainingFrame {
    pub records: Vec<CanonicalRecord>,
    pub report: StageReport,
}

/// Transform raw records into the filtered canonical training frame.
pub fn preprocess_training(
    records: &[RawRecord],
    tables: &LookupTables,
    opts: &PreprocessOptions,
) -> TrainingFrame {
    let mut report = StageReport::default();

    let complete: Vec<&RawRecord> = records.iter().filter(|r| is_complete(r)).collect();
    report.push("missing fields", records.len(), complete.len());

    let complete_len = complete.len();
    let valid: Vec<&RawRecord> = complete.into_iter().filter(|r| !has_invalid_marker(r)).collect();
    report.push("invalid markers", complete_len, valid.len());

    let derived: Vec<(CanonicalFields, &RawRecord)> = valid
        .par_iter()
        .map(|r| (canonical_fields(tables, &r.brand, &r.model, &r.damage), *r))
        .collect();

    let (kept, rare_categories) = filter_min_support(derived, opts.min_support);
    report.push("damage support", valid.len(), kept.len());
    report.rare_categories = rare_categories;

    let records = kept
        .into_iter()
        .map(|(fields, raw)| {
            let duration = estimate_duration(tables, &fields.damage);
            CanonicalRecord {
                brand: fields.brand,
                tier: fields.tier,
                damage: fields.damage,
                cost: raw.cost,
                cost_category: categorize_cost(raw.cost, &opts.breakpoints),
                speed: categorize_speed(&duration),
                duration,
                date: raw.date,
            }
        })
        .collect();

    TrainingFrame { records, report }
}

fn is_complete(r: &RawRecord) -> bool {
    !r.brand.trim().is_empty()
        && !r.model.trim().is_empty()
        && !r.damage.trim().is_empty()
        && r.cost.is_finite()
        && r.cost >= 0.0
}

fn has_invalid_marker(r: &RawRecord) -> bool {
    [&r.brand, &r.model, &r.damage]
        .into_iter()
        .any(|field| clean_text(field).contains(INVALID_MARKERS))
}

/// Keep rows whose damage category occurs at least `min_support` times.
///
/// Returns the kept rows (input order preserved) and the removed categories
/// sorted by name.
fn filter_min_support<T>(
    rows: Vec<(CanonicalFields, T)>,
    min_support: usize,
) -> (Vec<(CanonicalFields, T)>, Vec<(String, usize)>) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for (fields, _) in &rows {
        *counts.entry(fields.damage.clone()).or_insert(0) += 1;
    }

    let kept = rows
        .into_iter()
        .filter(|(fields, _)| counts.get(&fields.damage).copied().unwrap_or(0) >= min_support)
        .collect();

    let mut rare: Vec<(String, usize)> = counts.into_iter().filter(|(_, n)| *n < min_support).collect();
    rare.sort();
    (kept, rare)
}
