//! Hand-curated lookup tables.
//!
//! The tables are a data asset, not code: a JSON document embedded into the
//! binary (`assets/lookup_tables.json`), optionally replaced at startup by an
//! external file with the same schema. They hold:
//!
//! - brand → tier → model-substring patterns (tier classification)
//! - damage-text variant → canonical damage category (ordered, first match wins)
//! - canonical damage category → duration estimate
//!
//! Tables are validated once when loaded and are read-only afterwards. A
//! training run records the tables it used in the model artifact, so the
//! estimate path normalizes requests with exactly the same tables.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::Tier;
use crate::error::EstimateError;
use crate::features::normalize_damage;

const EMBEDDED_TABLES: &str = include_str!("../../assets/lookup_tables.json");

/// The JSON schema of a tables document.
#[derive(Debug, Serialize, Deserialize)]
pub struct TableFile {
    brand_tiers: Vec<BrandTierEntry>,
    damage_variants: Vec<DamageVariant>,
    durations: Vec<DurationEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BrandTierEntry {
    brand: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    entry: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    mid: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    high: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DurationEntry {
    category: String,
    estimate: String,
}

/// One damage-text variant and the canonical category it maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageVariant {
    /// Lowercase substring looked for in the normalized damage text.
    pub pattern: String,
    pub category: String,
}

/// Model-substring patterns per tier for one brand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrandTiers {
    pub entry: Vec<String>,
    pub mid: Vec<String>,
    pub high: Vec<String>,
}

impl BrandTiers {
    pub fn patterns(&self, tier: Tier) -> &[String] {
        match tier {
            Tier::Entry => &self.entry,
            Tier::Mid => &self.mid,
            Tier::High => &self.high,
            Tier::Unknown => &[],
        }
    }
}

/// Validated, read-only lookup tables.
///
/// Serializes to the same JSON schema it is loaded from; deserializing
/// re-runs the integrity checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TableFile", into = "TableFile")]
pub struct LookupTables {
    brands: HashMap<String, BrandTiers>,
    damage_variants: Vec<DamageVariant>,
    durations: HashMap<String, String>,
}

impl LookupTables {
    /// Tables compiled into the binary.
    pub fn embedded() -> Result<Self, EstimateError> {
        Self::from_json(EMBEDDED_TABLES)
    }

    /// Load tables from an external JSON file.
    pub fn from_path(path: &Path) -> Result<Self, EstimateError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            EstimateError::TableIntegrity(format!("failed to read tables '{}': {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    /// Load from `path` when given, else the embedded tables.
    pub fn load(path: Option<&Path>) -> Result<Self, EstimateError> {
        let tables = match path {
            Some(p) => Self::from_path(p)?,
            None => Self::embedded()?,
        };
        tracing::debug!(
            brands = tables.brand_count(),
            damage_variants = tables.damage_variants.len(),
            durations = tables.durations.len(),
            external = path.is_some(),
            "lookup tables loaded"
        );
        Ok(tables)
    }

    pub fn from_json(text: &str) -> Result<Self, EstimateError> {
        let file: TableFile = serde_json::from_str(text)
            .map_err(|e| EstimateError::TableIntegrity(format!("invalid tables JSON: {e}")))?;
        Self::try_from(file)
    }

    pub fn brand(&self, brand_upper: &str) -> Option<&BrandTiers> {
        self.brands.get(brand_upper)
    }

    pub fn damage_variants(&self) -> &[DamageVariant] {
        &self.damage_variants
    }

    pub fn duration(&self, category: &str) -> Option<&str> {
        self.durations.get(category).map(String::as_str)
    }

    pub fn brand_count(&self) -> usize {
        self.brands.len()
    }

    fn validate(&self) -> Result<(), EstimateError> {
        self.validate_brand_tiers()?;
        self.validate_damage_variants()
    }

    fn validate_brand_tiers(&self) -> Result<(), EstimateError> {
        for (brand, tiers) in &self.brands {
            if brand.is_empty() || *brand != brand.trim().to_uppercase() {
                return Err(EstimateError::TableIntegrity(format!(
                    "brand key '{brand}' must be non-empty, trimmed and uppercase"
                )));
            }

            // tier that first declared each pattern
            let mut owner: HashMap<&str, Tier> = HashMap::new();
            for tier in Tier::ORDERED {
                for pattern in tiers.patterns(tier) {
                    if pattern.is_empty() || *pattern != pattern.trim().to_uppercase() {
                        return Err(EstimateError::TableIntegrity(format!(
                            "{brand}/{}: pattern '{pattern}' must be non-empty, trimmed and uppercase",
                            tier.label()
                        )));
                    }
                    if let Some(first) = owner.get(pattern.as_str()) {
                        if *first != tier {
                            return Err(EstimateError::TableIntegrity(format!(
                                "{brand}: pattern '{pattern}' appears in both {} and {}",
                                first.label(),
                                tier.label()
                            )));
                        }
                    } else {
                        owner.insert(pattern.as_str(), tier);
                    }
                }
            }
        }
        Ok(())
    }

    fn validate_damage_variants(&self) -> Result<(), EstimateError> {
        let mut seen = HashSet::new();
        for variant in &self.damage_variants {
            let pattern = variant.pattern.as_str();
            if pattern.is_empty() || pattern != pattern.trim().to_lowercase() {
                return Err(EstimateError::TableIntegrity(format!(
                    "damage pattern '{pattern}' must be non-empty, trimmed and lowercase"
                )));
            }
            if !seen.insert(pattern) {
                return Err(EstimateError::TableIntegrity(format!(
                    "damage pattern '{pattern}' is listed more than once"
                )));
            }

            // A canonical category must normalize to itself, otherwise
            // normalization would not be idempotent.
            let category = variant.category.as_str();
            let again = normalize_damage(self, category);
            if again != category {
                return Err(EstimateError::TableIntegrity(format!(
                    "category '{category}' (from '{pattern}') re-normalizes to '{again}'"
                )));
            }
            if self.duration(category).is_none() {
                return Err(EstimateError::TableIntegrity(format!(
                    "category '{category}' has no duration estimate"
                )));
            }
        }
        Ok(())
    }
}

impl TryFrom<TableFile> for LookupTables {
    type Error = EstimateError;

    fn try_from(file: TableFile) -> Result<Self, Self::Error> {
        let mut brands = HashMap::with_capacity(file.brand_tiers.len());
        for entry in file.brand_tiers {
            let tiers = BrandTiers {
                entry: entry.entry,
                mid: entry.mid,
                high: entry.high,
            };
            if brands.insert(entry.brand.clone(), tiers).is_some() {
                return Err(EstimateError::TableIntegrity(format!(
                    "brand '{}' is listed more than once",
                    entry.brand
                )));
            }
        }

        let mut durations = HashMap::with_capacity(file.durations.len());
        for d in file.durations {
            if durations.insert(d.category.clone(), d.estimate).is_some() {
                return Err(EstimateError::TableIntegrity(format!(
                    "duration for '{}' is listed more than once",
                    d.category
                )));
            }
        }

        let tables = LookupTables {
            brands,
            damage_variants: file.damage_variants,
            durations,
        };
        tables.validate()?;
        Ok(tables)
    }
}

impl From<LookupTables> for TableFile {
    fn from(tables: LookupTables) -> Self {
        let mut brand_tiers: Vec<BrandTierEntry> = tables
            .brands
            .into_iter()
            .map(|(brand, tiers)| BrandTierEntry {
                brand,
                entry: tiers.entry,
                mid: tiers.mid,
                high: tiers.high,
            })
            .collect();
        brand_tiers.sort_by(|a, b| a.brand.cmp(&b.brand));

        let mut durations: Vec<DurationEntry> = tables
            .durations
            .into_iter()
            .map(|(category, estimate)| DurationEntry { category, estimate })
            .collect();
        durations.sort_by(|a, b| a.category.cmp(&b.category));

        TableFile {
            brand_tiers,
            damage_variants: tables.damage_variants,
            durations,
        }
    }
}
