//! CSV ingest of historical repair records.
//!
//! This module turns a shop export into typed `RawRecord`s. The schema is
//! enforced here, at the boundary:
//! - **Required columns** (brand, type, damage, cost) must exist (exit code 2)
//! - **Row-level validation**: rows with a blank required value or an
//!   unparseable/negative cost are skipped and reported as `RowError`s
//! - The date column is optional and never fails a row (unparseable → absent)
//!
//! No normalization happens here; that is the preprocessing pipeline's job.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;

use crate::domain::RawRecord;
use crate::error::AppError;

const BRAND_NAMES: &[&str] = &["brand", "merek"];
const MODEL_NAMES: &[&str] = &["type", "model", "tipe unit", "tipe_unit", "tipe"];
const DAMAGE_NAMES: &[&str] = &["damage", "kerusakan"];
const COST_NAMES: &[&str] = &["cost", "biaya"];
const DATE_NAMES: &[&str] = &["date", "tanggal"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: typed records + row errors.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub records: Vec<RawRecord>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    brand: usize,
    model: usize,
    damage: usize,
    cost: usize,
    date: Option<usize>,
}

/// Load raw records from a CSV file.
pub fn load_raw_records(path: &Path) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open dataset '{}': {e}", path.display())))?;
    read_raw_records(file)
}

/// Read raw records from any CSV source.
pub fn read_raw_records<R: Read>(source: R) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let columns = resolve_columns(&build_header_map(&headers))?;

    let mut records = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header line; CSV lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let parsed = result
            .map_err(|e| format!("CSV parse error: {e}"))
            .and_then(|record| parse_row(&record, columns));
        match parsed {
            Ok(r) => records.push(r),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    tracing::info!(rows_read, rows_ok = records.len(), row_errors = row_errors.len(), "dataset ingested");

    Ok(IngestedData {
        records,
        row_errors,
        rows_read,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often carry a UTF-8 BOM on the first header.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_lowercase()
}

fn resolve_columns(header_map: &HashMap<String, usize>) -> Result<Columns, AppError> {
    let find = |names: &[&str]| names.iter().find_map(|n| header_map.get(*n).copied());
    let require = |names: &[&str]| {
        find(names).ok_or_else(|| {
            AppError::new(
                2,
                format!("Missing required column: `{}` (or `{}`)", names[0], names[1..].join("`, `")),
            )
        })
    };

    Ok(Columns {
        brand: require(BRAND_NAMES)?,
        model: require(MODEL_NAMES)?,
        damage: require(DAMAGE_NAMES)?,
        cost: require(COST_NAMES)?,
        date: find(DATE_NAMES),
    })
}

fn parse_row(record: &StringRecord, columns: Columns) -> Result<RawRecord, String> {
    let brand = get_required(record, columns.brand, "brand")?.to_string();
    let model = get_required(record, columns.model, "type")?.to_string();
    let damage = get_required(record, columns.damage, "damage")?.to_string();
    let cost = parse_cost(get_required(record, columns.cost, "cost")?)?;
    let date = columns
        .date
        .and_then(|idx| get_optional(record, idx))
        .and_then(parse_date);

    Ok(RawRecord {
        brand,
        model,
        damage,
        cost,
        date,
    })
}

fn get_required<'a>(record: &'a StringRecord, idx: usize, name: &str) -> Result<&'a str, String> {
    get_optional(record, idx).ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a cost amount.
///
/// Accepts plain numbers (`150000`, `150000.5`) and shop formatting with an
/// optional `Rp` prefix and `.`/`,` thousands grouping (`Rp 150.000`, `1,250,000`).
pub fn parse_cost(s: &str) -> Result<f64, String> {
    let mut t = s.trim();
    if t.get(..2).is_some_and(|p| p.eq_ignore_ascii_case("rp")) {
        t = t[2..].trim_start_matches('.').trim();
    }

    let value = if is_grouped_integer(t) {
        t.chars()
            .filter(char::is_ascii_digit)
            .collect::<String>()
            .parse::<f64>()
            .ok()
    } else {
        t.parse::<f64>().ok()
    };

    match value {
        Some(v) if v.is_finite() && v >= 0.0 => Ok(v),
        Some(_) => Err(format!("Invalid cost '{s}' (must be a finite, non-negative amount).")),
        None => Err(format!("Invalid cost '{s}'.")),
    }
}

/// `1.250.000` / `1,250,000`: 1-3 leading digits, then groups of exactly three.
fn is_grouped_integer(t: &str) -> bool {
    let mut parts = t.split(['.', ',']);
    let Some(head) = parts.next() else {
        return false;
    };
    let mut groups = 0;
    for part in parts {
        if part.len() != 3 || !part.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
        groups += 1;
    }
    groups > 0 && (1..=3).contains(&head.len()) && head.chars().all(|c| c.is_ascii_digit())
}

/// Parse a day-first date; anything unparseable is treated as absent.
fn parse_date(s: &str) -> Option<NaiveDate> {
    const DATE_FMTS: [&str; 5] = ["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d", "%Y/%m/%d", "%d/%m/%y"];
    const DATETIME_FMTS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%d/%m/%Y %H:%M"];

    DATE_FMTS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FMTS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}
