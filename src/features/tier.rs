//! Tier classification of device model strings.
//!
//! Matching is plain substring containment on uppercased text, so a short
//! pattern can match inside an unrelated model number (a REDMI pattern `"5"`
//! matches `"NOTE 5A"` as well as `"15C"`). The tables are hand-authored with
//! this in mind; the semantics here stay exactly substring-based.

use crate::domain::Tier;
use crate::tables::LookupTables;

/// Classify `(brand, model_text)` into a tier.
///
/// Both inputs are uppercased. Unknown brands, and model strings matching no
/// pattern of their brand, yield `Tier::Unknown`. Tiers are tried in
/// `Tier::ORDERED` order; the first tier with any contained pattern wins.
pub fn classify_tier(tables: &LookupTables, brand: &str, model_text: &str) -> Tier {
    let brand = brand.to_uppercase();
    let model = model_text.to_uppercase();

    let Some(tiers) = tables.brand(&brand) else {
        return Tier::Unknown;
    };

    Tier::ORDERED
        .into_iter()
        .find(|&tier| tiers.patterns(tier).iter().any(|p| model.contains(p.as_str())))
        .unwrap_or(Tier::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> LookupTables {
        LookupTables::embedded().unwrap()
    }

    #[test]
    fn samsung_a03_core_is_entry_level() {
        assert_eq!(classify_tier(&tables(), "SAMSUNG", "GALAXY A03 CORE"), Tier::Entry);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(classify_tier(&tables(), "vivo", "y21"), Tier::Entry);
        assert_eq!(classify_tier(&tables(), "Vivo", "x100 pro"), Tier::High);
    }

    #[test]
    fn brand_is_not_trimmed_by_the_classifier() {
        // Callers clean text first; the classifier only changes case.
        assert_eq!(classify_tier(&tables(), " samsung ", "A03"), Tier::Unknown);
    }

    #[test]
    fn unknown_brand_or_model_is_unknown() {
        assert_eq!(classify_tier(&tables(), "NOKIO", "A03"), Tier::Unknown);
        assert_eq!(classify_tier(&tables(), "SAMSUNG", "GALAXY Z FOLD"), Tier::Unknown);
    }

    #[test]
    fn entry_beats_mid_when_both_match() {
        let json = r#"{
            "brand_tiers": [{"brand": "ACME", "entry": ["ONE"], "mid": ["PRO"], "high": ["MAX"]}],
            "damage_variants": [],
            "durations": []
        }"#;
        let t = LookupTables::from_json(json).unwrap();
        assert_eq!(classify_tier(&t, "acme", "one pro max"), Tier::Entry);
        assert_eq!(classify_tier(&t, "acme", "pro max"), Tier::Mid);
        assert_eq!(classify_tier(&t, "acme", "max"), Tier::High);
    }
}
