//! Damage-description normalization.

use crate::tables::LookupTables;

/// Lowercase and trim free text.
pub fn clean_text(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Map a free-text damage description to its canonical category.
///
/// The text is lowercased and trimmed, then the variant table is scanned in
/// order; the first pattern contained in the text decides the category.
/// Text matching no pattern passes through (lowercased/trimmed) and becomes
/// its own category.
pub fn normalize_damage(tables: &LookupTables, raw: &str) -> String {
    let text = clean_text(raw);
    tables
        .damage_variants()
        .iter()
        .find(|v| text.contains(v.pattern.as_str()))
        .map(|v| v.category.clone())
        .unwrap_or(text)
}
