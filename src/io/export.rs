//! Exports: the canonical training frame as CSV and the training report as JSON.
//!
//! The CSV is meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::domain::CanonicalRecord;
use crate::error::AppError;
use crate::report::TrainingSummary;

#[derive(Serialize)]
struct ExportRow<'a> {
    brand: &'a str,
    tier: &'a str,
    damage: &'a str,
    cost: f64,
    cost_category: &'a str,
    duration: &'a str,
    speed: &'a str,
    date: String,
}

/// Write canonical records to a CSV file.
pub fn write_records_csv(path: &Path, records: &[CanonicalRecord]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;

    for r in records {
        writer
            .serialize(ExportRow {
                brand: &r.brand,
                tier: r.tier.label(),
                damage: &r.damage,
                cost: r.cost,
                cost_category: r.cost_category.label(),
                duration: &r.duration,
                speed: r.speed.label(),
                date: r.date.map(|d| d.to_string()).unwrap_or_default(),
            })
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

/// Write the training summary (metrics, stage counts, run metadata) as JSON.
pub fn write_report_json(path: &Path, summary: &TrainingSummary) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create report JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, summary)
        .map_err(|e| AppError::new(2, format!("Failed to write report JSON: {e}")))?;
    Ok(())
}
