//! Shared pipeline logic used by the `train` and `preprocess` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! CSV ingest -> preprocessing -> encoding -> split -> fit -> evaluate -> persist -> publish
//!
//! The command handlers can then focus on presentation.

use std::path::Path;

use chrono::Utc;
use rand::prelude::*;
use rand::rngs::StdRng;

use crate::domain::{CanonicalRecord, Column, TrainConfig};
use crate::encode::EncoderSet;
use crate::error::{AppError, EstimateError};
use crate::io::{RowError, load_raw_records, new_run_id, save_artifacts};
use crate::preprocess::{PreprocessOptions, StageCount, TrainingFrame, preprocess_training};
use crate::report::{TrainingSummary, VocabularySizes, evaluate};
use crate::snapshot::{ModelSnapshot, SnapshotStore};
use crate::tables::LookupTables;
use crate::tree::{Classifier, DecisionTree, FeatureRow, TreeParams};

/// Ingest + preprocessing output.
#[derive(Debug, Clone)]
pub struct PreprocessRun {
    pub rows_read: usize,
    pub row_errors: Vec<RowError>,
    pub frame: TrainingFrame,
}

/// All outputs of a single `repest train` run.
#[derive(Debug, Clone)]
pub struct TrainingRun {
    pub summary: TrainingSummary,
    pub row_errors: Vec<RowError>,
}

/// Load the dataset and run the training-time preprocessing stages.
pub fn run_preprocess(
    data_path: &Path,
    tables: &LookupTables,
    opts: &PreprocessOptions,
) -> Result<PreprocessRun, AppError> {
    let ingest = load_raw_records(data_path)?;

    let mut frame = preprocess_training(&ingest.records, tables, opts);
    // Ingest rejects are the first filtering stage.
    frame.report.stages.insert(
        0,
        StageCount {
            name: "schema",
            rows_in: ingest.rows_read,
            rows_out: ingest.records.len(),
        },
    );

    Ok(PreprocessRun {
        rows_read: ingest.rows_read,
        row_errors: ingest.row_errors,
        frame,
    })
}

/// Execute the full training pipeline, persist the artifacts and publish the
/// new snapshot into `store`.
pub fn run_training(config: &TrainConfig, store: &SnapshotStore) -> Result<TrainingRun, AppError> {
    config.validate()?;
    let tables = LookupTables::load(config.tables_path.as_deref())?;

    // 1) Ingest + preprocess.
    let opts = PreprocessOptions {
        min_support: config.min_support,
        breakpoints: config.breakpoints,
    };
    let prep = run_preprocess(&config.data_path, &tables, &opts)?;
    let records = &prep.frame.records;
    if records.len() < 2 {
        return Err(AppError::new(
            3,
            format!(
                "Not enough usable rows to train ({} after preprocessing; need at least 2).",
                records.len()
            ),
        ));
    }

    // 2) Fit encoders and encode the frame.
    let encoders = EncoderSet::fit(records);
    tracing::info!(
        brand = encoders.brand.len(),
        tier = encoders.tier.len(),
        damage = encoders.damage.len(),
        cost_category = encoders.cost_category.len(),
        "encoders fitted"
    );
    let (x, y) = encode_frame(&encoders, records)?;

    // 3) Seeded split.
    let (train_idx, test_idx) = split_indices(records.len(), config.test_size, config.seed)?;
    let x_train: Vec<FeatureRow> = train_idx.iter().map(|&i| x[i]).collect();
    let y_train: Vec<u32> = train_idx.iter().map(|&i| y[i]).collect();
    let x_test: Vec<FeatureRow> = test_idx.iter().map(|&i| x[i]).collect();
    let y_test: Vec<u32> = test_idx.iter().map(|&i| y[i]).collect();

    // 4) Fit + evaluate.
    let params = TreeParams {
        max_depth: config.max_depth,
        ..TreeParams::default()
    };
    let model = DecisionTree::fit(&x_train, &y_train, encoders.cost_category.len(), params)?;
    let y_pred = model.predict_many(&x_test);
    let evaluation = evaluate(&y_test, &y_pred, encoders.cost_category.classes());
    tracing::info!(
        accuracy = evaluation.accuracy,
        n_train = x_train.len(),
        n_test = x_test.len(),
        depth = model.depth(),
        "model evaluated"
    );

    // 5) Persist, then publish.
    let trained_at = Utc::now();
    let run_id = new_run_id(trained_at, (records.len(), config.seed, encoders.damage.classes()));
    let summary = TrainingSummary {
        run_id: run_id.clone(),
        trained_at,
        rows_read: prep.rows_read,
        row_errors: prep.row_errors.len(),
        total_data: records.len(),
        n_train: x_train.len(),
        n_test: x_test.len(),
        tree_depth: model.depth(),
        tree_leaves: model.leaf_count(),
        vocabulary: VocabularySizes {
            brand: encoders.brand.len(),
            tier: encoders.tier.len(),
            damage: encoders.damage.len(),
            cost_category: encoders.cost_category.len(),
        },
        preprocessing: prep.frame.report.clone(),
        evaluation,
    };

    let snapshot = ModelSnapshot {
        run_id,
        trained_at,
        breakpoints: config.breakpoints,
        tables,
        model,
        encoders,
    };
    save_artifacts(&config.artifacts, &snapshot)?;
    store.publish(snapshot);

    Ok(TrainingRun {
        summary,
        row_errors: prep.row_errors,
    })
}

fn encode_frame(
    encoders: &EncoderSet,
    records: &[CanonicalRecord],
) -> Result<(Vec<FeatureRow>, Vec<u32>), AppError> {
    // Encoders were fitted on these exact records, so a miss is a bug.
    let internal = |e: EstimateError| AppError::new(4, format!("Failed to encode the training frame: {e}"));

    let mut x = Vec::with_capacity(records.len());
    let mut y = Vec::with_capacity(records.len());
    for r in records {
        x.push(
            encoders
                .encode_features(&r.brand, r.tier.label(), &r.damage)
                .map_err(internal)?,
        );
        y.push(
            encoders
                .encode(Column::CostCategory, r.cost_category.label())
                .map_err(internal)?,
        );
    }
    Ok((x, y))
}

/// Shuffle `0..n` with a seeded RNG and hold out `ceil(test_size * n)` rows.
///
/// Returns `(train, test)`, each sorted.
pub fn split_indices(n: usize, test_size: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>), AppError> {
    let n_test = (test_size * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(AppError::new(
            3,
            format!("Cannot split {n} rows with test size {test_size}: one side would be empty."),
        ));
    }

    let mut idx: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    idx.shuffle(&mut rng);

    let mut test = idx[..n_test].to_vec();
    let mut train = idx[n_test..].to_vec();
    test.sort_unstable();
    train.sort_unstable();
    Ok((train, test))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ArtifactPaths, CostBreakpoints};
    use crate::estimate::{EstimateRequest, Estimator};
    use crate::io::load_artifacts;
    use std::fmt::Write as _;
    use std::sync::Arc;

    fn write_dataset(path: &Path) {
        let mut csv = String::from("tanggal,merek,tipe unit,kerusakan,biaya\n");
        for i in 0..10 {
            writeln!(csv, "0{}/02/2024,Vivo,Y21,Ganti LCD,150.000", i % 9 + 1).unwrap();
            writeln!(csv, "0{}/02/2024,Samsung,Galaxy A03 Core,Ganti Baterai,300000", i % 9 + 1).unwrap();
            writeln!(csv, "0{}/02/2024,Oppo,A5s,Mati Total,750000", i % 9 + 1).unwrap();
        }
        for _ in 0..3 {
            writeln!(csv, "01/03/2024,Oppo,A5s,IC Gambar,900000").unwrap();
        }
        writeln!(csv, "01/03/2024,Oppo,A5s??,Ganti LCD,100000").unwrap();
        writeln!(csv, "01/03/2024,Oppo,A5s,Ganti LCD,gratis").unwrap();
        std::fs::write(path, csv).unwrap();
    }

    fn config_in(dir: &Path) -> TrainConfig {
        TrainConfig {
            data_path: dir.join("dataset.csv"),
            tables_path: None,
            artifacts: ArtifactPaths {
                model: dir.join("model").join("model.json"),
                encoders: dir.join("model").join("encoders.json"),
            },
            min_support: 9,
            breakpoints: CostBreakpoints::default(),
            test_size: 0.3,
            seed: 42,
            max_depth: None,
            report_json: None,
        }
    }

    #[test]
    fn train_then_estimate_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        write_dataset(&dir.path().join("dataset.csv"));
        let config = config_in(dir.path());
        let store = Arc::new(SnapshotStore::new());

        let run = run_training(&config, &store).unwrap();
        let s = &run.summary;
        assert_eq!(s.rows_read, 35);
        assert_eq!(s.row_errors, 1);
        assert_eq!(s.total_data, 30);
        assert_eq!(s.n_test, 9);
        assert_eq!(s.n_train, 21);
        assert_eq!(s.vocabulary.damage, 3);
        assert_eq!(s.preprocessing.rare_categories, vec![("ic gambar".to_string(), 3)]);
        assert_eq!(s.evaluation.accuracy, 1.0);
        assert_eq!(s.preprocessing.stages[0].name, "schema");
        assert_eq!(s.preprocessing.stages[0].dropped(), 1);

        let estimator = Estimator::new(Arc::clone(&store));
        let estimate = estimator
            .estimate(&EstimateRequest::new("Vivo", "Y21", "ganti lcd"))
            .unwrap();
        assert_eq!(estimate.price_range, "Rp. 0 - 250.000");
        assert_eq!(estimate.run_id, s.run_id);

        // A fresh process sees the same pair from disk.
        let reloaded = load_artifacts(&config.artifacts).unwrap();
        assert_eq!(reloaded.run_id, s.run_id);
        let fresh = Estimator::new(Arc::new(SnapshotStore::with_snapshot(reloaded)));
        let again = fresh
            .estimate(&EstimateRequest::new("oppo", "a5s", "mati total"))
            .unwrap();
        assert_eq!(again.price_range, "> Rp. 500.000");
    }

    #[test]
    fn custom_training_tables_are_used_by_a_reloaded_estimator() {
        let dir = tempfile::tempdir().unwrap();
        let mut csv = String::from("brand,type,damage,cost\n");
        for _ in 0..10 {
            csv.push_str("Acme,X1,ganti lcd,150000\n");
            csv.push_str("Acme,X1 Pro,ganti baterai,400000\n");
        }
        std::fs::write(dir.path().join("dataset.csv"), csv).unwrap();
        let tables_path = dir.path().join("tables.json");
        std::fs::write(
            &tables_path,
            r#"{"brand_tiers": [{"brand": "ACME", "entry": ["X1"], "high": ["PRO"]}], "damage_variants": [], "durations": []}"#,
        )
        .unwrap();
        let config = TrainConfig {
            tables_path: Some(tables_path),
            ..config_in(dir.path())
        };
        run_training(&config, &SnapshotStore::new()).unwrap();

        let reloaded = load_artifacts(&config.artifacts).unwrap();
        let estimator = Estimator::new(Arc::new(SnapshotStore::with_snapshot(reloaded)));
        let estimate = estimator
            .estimate(&EstimateRequest::new("Acme", "X1", "ganti lcd"))
            .unwrap();
        assert_eq!(estimate.tier, crate::domain::Tier::Entry);
        assert_eq!(estimate.price_range, "Rp. 0 - 250.000");
    }

    #[test]
    fn too_few_rows_is_insufficient_data() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("dataset.csv"),
            "brand,type,damage,cost\nvivo,y21,ganti lcd,100000\n",
        )
        .unwrap();
        let config = config_in(dir.path());

        let err = run_training(&config, &SnapshotStore::new()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(!config.artifacts.model.exists());
    }

    #[test]
    fn split_is_seeded_and_disjoint() {
        let (train_a, test_a) = split_indices(10, 0.3, 42).unwrap();
        let (train_b, test_b) = split_indices(10, 0.3, 42).unwrap();
        assert_eq!((&train_a, &test_a), (&train_b, &test_b));
        assert_eq!(test_a.len(), 3);
        assert_eq!(train_a.len(), 7);
        assert!(test_a.iter().all(|i| !train_a.contains(i)));

        assert_eq!(split_indices(2, 0.6, 42).unwrap_err().exit_code(), 3);
    }
}
