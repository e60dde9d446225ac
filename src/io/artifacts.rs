//! Persist and reload the model snapshot.
//!
//! A snapshot is stored as two JSON documents: the fitted tree (with the
//! cost breakpoints and lookup tables of its training run) and the encoder
//! set. Both carry the `run_id` of the training run that produced
//! them; on load the ids must match, otherwise the pair is rejected as
//! unavailable rather than silently mixing vocabularies.
//!
//! Each document is written to a sibling temp file and renamed into place.
//! Encoders go first and the model last, so a crash in between leaves an old
//! model next to new encoders, which the `run_id` check then refuses.

use std::collections::hash_map::DefaultHasher;
use std::fs::{self, File};
use std::hash::{Hash, Hasher};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::{ArtifactPaths, CostBreakpoints};
use crate::encode::EncoderSet;
use crate::error::EstimateError;
use crate::snapshot::ModelSnapshot;
use crate::tables::LookupTables;
use crate::tree::DecisionTree;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub run_id: String,
    pub trained_at: DateTime<Utc>,
    pub breakpoints: CostBreakpoints,
    pub tables: LookupTables,
    pub tree: DecisionTree,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderArtifact {
    pub run_id: String,
    pub trained_at: DateTime<Utc>,
    pub encoders: EncoderSet,
}

/// Build a run id from the training timestamp and a fingerprint of the run.
pub fn new_run_id(trained_at: DateTime<Utc>, fingerprint: impl Hash) -> String {
    let mut hasher = DefaultHasher::new();
    trained_at.timestamp_nanos_opt().hash(&mut hasher);
    fingerprint.hash(&mut hasher);
    format!(
        "{}-{:08x}",
        trained_at.format("%Y%m%dT%H%M%SZ"),
        hasher.finish() as u32
    )
}

/// Write both halves of `snapshot` (encoders first).
pub fn save_artifacts(paths: &ArtifactPaths, snapshot: &ModelSnapshot) -> Result<(), EstimateError> {
    let encoders = EncoderArtifact {
        run_id: snapshot.run_id.clone(),
        trained_at: snapshot.trained_at,
        encoders: snapshot.encoders.clone(),
    };
    let model = ModelArtifact {
        run_id: snapshot.run_id.clone(),
        trained_at: snapshot.trained_at,
        breakpoints: snapshot.breakpoints,
        tables: snapshot.tables.clone(),
        tree: snapshot.model.clone(),
    };

    write_json_atomic(&paths.encoders, &encoders)?;
    write_json_atomic(&paths.model, &model)?;

    tracing::info!(
        run_id = %snapshot.run_id,
        model = %paths.model.display(),
        encoders = %paths.encoders.display(),
        "artifacts saved"
    );
    Ok(())
}

/// Load and cross-check the persisted pair.
pub fn load_artifacts(paths: &ArtifactPaths) -> Result<ModelSnapshot, EstimateError> {
    let model: ModelArtifact = read_json(&paths.model, "model")?;
    let encoders: EncoderArtifact = read_json(&paths.encoders, "encoders")?;

    if model.run_id != encoders.run_id {
        return Err(EstimateError::ModelUnavailable {
            reason: format!(
                "model ({}) and encoders ({}) come from different training runs",
                model.run_id, encoders.run_id
            ),
        });
    }

    let snapshot = ModelSnapshot {
        run_id: model.run_id,
        trained_at: model.trained_at,
        breakpoints: model.breakpoints,
        tables: model.tables,
        model: model.tree,
        encoders: encoders.encoders,
    };
    snapshot.validate()?;

    tracing::debug!(run_id = %snapshot.run_id, "artifacts loaded");
    Ok(snapshot)
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T, EstimateError> {
    if !path.exists() {
        return Err(EstimateError::ModelUnavailable {
            reason: format!("{what} file '{}' not found", path.display()),
        });
    }
    let file = File::open(path)
        .map_err(|e| EstimateError::Artifact(format!("failed to open {what} '{}': {e}", path.display())))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|e| EstimateError::Artifact(format!("invalid {what} JSON '{}': {e}", path.display())))
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), EstimateError> {
    let io_err = |e: std::io::Error| EstimateError::Artifact(format!("failed to write '{}': {e}", path.display()));

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(io_err)?;
    }

    let tmp = temp_path(path);
    {
        let file = File::create(&tmp).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)
            .map_err(|e| EstimateError::Artifact(format!("failed to serialize '{}': {e}", path.display())))?;
        writer.flush().map_err(io_err)?;
        writer.get_ref().sync_all().map_err(io_err)?;
    }
    fs::rename(&tmp, path).map_err(io_err)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::tests::sample_snapshot;
    use crate::tree::Classifier;

    fn paths_in(dir: &Path) -> ArtifactPaths {
        ArtifactPaths {
            model: dir.join("model").join("model.json"),
            encoders: dir.join("model").join("encoders.json"),
        }
    }

    #[test]
    fn saved_snapshot_loads_back_identically() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        let snap = sample_snapshot("20260101T000000Z-0000abcd");

        save_artifacts(&paths, &snap).unwrap();
        let loaded = load_artifacts(&paths).unwrap();

        assert_eq!(loaded.run_id, snap.run_id);
        assert_eq!(loaded.encoders, snap.encoders);
        assert_eq!(loaded.model.predict(&[0, 0, 1]), snap.model.predict(&[0, 0, 1]));
        assert!(!temp_path(&paths.model).exists());
    }

    #[test]
    fn missing_files_mean_model_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_artifacts(&paths_in(dir.path())).unwrap_err();
        assert!(matches!(err, EstimateError::ModelUnavailable { .. }));
    }

    #[test]
    fn mismatched_run_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        save_artifacts(&paths, &sample_snapshot("run-a")).unwrap();

        // Simulate a run that crashed after writing only its encoders.
        let newer = sample_snapshot("run-b");
        write_json_atomic(
            &paths.encoders,
            &EncoderArtifact {
                run_id: newer.run_id.clone(),
                trained_at: newer.trained_at,
                encoders: newer.encoders,
            },
        )
        .unwrap();

        let err = load_artifacts(&paths).unwrap_err();
        assert!(matches!(err, EstimateError::ModelUnavailable { .. }));
    }

    #[test]
    fn corrupt_json_is_an_artifact_error() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        save_artifacts(&paths, &sample_snapshot("run")).unwrap();
        fs::write(&paths.model, "{ not json").unwrap();

        let err = load_artifacts(&paths).unwrap_err();
        assert!(matches!(err, EstimateError::Artifact(_)));
    }

    #[test]
    fn run_ids_are_timestamped_and_fingerprinted() {
        let at = DateTime::parse_from_rfc3339("2026-03-01T08:30:00Z").unwrap().with_timezone(&Utc);
        let a = new_run_id(at, (120usize, 42u64));
        let b = new_run_id(at, (121usize, 42u64));
        assert!(a.starts_with("20260301T083000Z-"));
        assert_ne!(a, b);
    }

    #[test]
    fn training_tables_travel_with_the_model() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        let mut snap = sample_snapshot("run");
        snap.tables = LookupTables::from_json(
            r#"{"brand_tiers": [{"brand": "ACME", "entry": ["X1"]}], "damage_variants": [], "durations": []}"#,
        )
        .unwrap();

        save_artifacts(&paths, &snap).unwrap();
        let loaded = load_artifacts(&paths).unwrap();
        assert_eq!(loaded.tables, snap.tables);
        assert!(loaded.tables.brand("ACME").is_some());
    }

    #[test]
    fn tree_with_out_of_range_feature_is_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());
        save_artifacts(&paths, &sample_snapshot("run")).unwrap();

        let text = fs::read_to_string(&paths.model).unwrap();
        assert!(text.contains("\"feature\": 2"));
        fs::write(&paths.model, text.replace("\"feature\": 2", "\"feature\": 7")).unwrap();

        let err = load_artifacts(&paths).unwrap_err();
        assert!(matches!(err, EstimateError::Artifact(ref m) if m.contains("feature 7")));
    }
}
