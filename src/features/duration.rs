//! Repair duration estimate and speed category.
//!
//! Duration estimates are shop-authored Indonesian text ("30 Menit - 1 Jam",
//! "2 - 5 Hari"); the speed category is read off unit markers in that text.

use crate::domain::SpeedCategory;
use crate::tables::LookupTables;

/// Duration label for damage categories missing from the duration table.
pub const UNKNOWN_DURATION: &str = "Tidak Diketahui";

const HOUR_MARKERS: [&str; 4] = ["1 jam", "2 jam", "3 jam", "4 jam"];

/// Look up the duration estimate for a canonical damage category.
pub fn estimate_duration(tables: &LookupTables, damage_category: &str) -> String {
    tables
        .duration(damage_category)
        .unwrap_or(UNKNOWN_DURATION)
        .to_string()
}

/// Classify a duration estimate into a speed category.
///
/// Checked in order: minute markers (`menit`, `<`) → fast, one-to-four hour
/// markers → medium, day markers (`hari`) → slow, anything else → unknown.
pub fn categorize_speed(duration: &str) -> SpeedCategory {
    let v = duration.to_lowercase();
    if v.contains("menit") || v.contains('<') {
        SpeedCategory::Fast
    } else if HOUR_MARKERS.iter().any(|m| v.contains(m)) {
        SpeedCategory::Medium
    } else if v.contains("hari") {
        SpeedCategory::Slow
    } else {
        SpeedCategory::Unknown
    }
}
