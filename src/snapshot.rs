//! The model snapshot: a fitted classifier together with the encoder set and
//! lookup tables it was trained against.
//!
//! The parts are only meaningful together, so they are published and
//! read as one value. A reader holding an `Arc<ModelSnapshot>` keeps using it
//! even if a newer training run is published mid-request; it never sees a
//! model from one run with encoders from another.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use crate::domain::{ArtifactPaths, CostBreakpoints};
use crate::encode::EncoderSet;
use crate::error::EstimateError;
use crate::tables::LookupTables;
use crate::tree::DecisionTree;

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSnapshot {
    pub run_id: String,
    pub trained_at: DateTime<Utc>,
    /// Breakpoints the target was bucketed with; price ranges are shown from these.
    pub breakpoints: CostBreakpoints,
    /// Tables the training rows were normalized with; requests use the same.
    pub tables: LookupTables,
    pub model: DecisionTree,
    pub encoders: EncoderSet,
}

impl ModelSnapshot {
    /// Check that the model can be evaluated and agrees with the encoders.
    pub fn validate(&self) -> Result<(), EstimateError> {
        self.encoders.validate()?;
        self.model
            .check_structure()
            .map_err(|e| EstimateError::Artifact(format!("malformed model tree: {e}")))?;
        let n_targets = self.encoders.cost_category.len();
        if self.model.n_classes != n_targets {
            return Err(EstimateError::Artifact(format!(
                "model predicts {} classes but the cost category encoder has {n_targets}",
                self.model.n_classes
            )));
        }
        Ok(())
    }
}

/// Holder of the currently published snapshot.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Option<Arc<ModelSnapshot>>>,
}

impl SnapshotStore {
    /// An empty store; `current()` fails until something is published.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: ModelSnapshot) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(snapshot))),
        }
    }

    /// Replace the current snapshot, returning the previous one.
    pub fn publish(&self, snapshot: ModelSnapshot) -> Option<Arc<ModelSnapshot>> {
        let next = Arc::new(snapshot);
        tracing::info!(run_id = %next.run_id, "model snapshot published");
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        guard.replace(next)
    }

    /// The snapshot to use for one request.
    pub fn current(&self) -> Result<Arc<ModelSnapshot>, EstimateError> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        guard.clone().ok_or_else(|| EstimateError::ModelUnavailable {
            reason: "no model has been loaded".to_string(),
        })
    }

    /// Load the persisted pair from disk and publish it.
    pub fn load_from(&self, paths: &ArtifactPaths) -> Result<Arc<ModelSnapshot>, EstimateError> {
        let snapshot = crate::io::load_artifacts(paths)?;
        self.publish(snapshot);
        self.current()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::encode::LabelEncoder;
    use crate::tree::{Node, TreeParams};

    /// A tiny snapshot: vivo/oppo, ganti lcd/ganti baterai → Cheap/Medium.
    pub(crate) fn sample_snapshot(run_id: &str) -> ModelSnapshot {
        let encoders = EncoderSet {
            brand: LabelEncoder::fit(["oppo", "vivo"]),
            tier: LabelEncoder::fit(["Entry Level", "Mid Level"]),
            damage: LabelEncoder::fit(["ganti baterai", "ganti lcd"]),
            cost_category: LabelEncoder::fit(["Cheap", "Medium"]),
        };
        // Damage code 1 (ganti lcd) is Medium, everything else Cheap.
        let x = vec![[0, 0, 0], [0, 0, 1], [1, 1, 0], [1, 1, 1]];
        let y = vec![0, 1, 0, 1];
        let model = DecisionTree::fit(&x, &y, 2, TreeParams::default()).unwrap();
        ModelSnapshot {
            run_id: run_id.to_string(),
            trained_at: Utc::now(),
            breakpoints: CostBreakpoints::default(),
            tables: LookupTables::embedded().unwrap(),
            model,
            encoders,
        }
    }

    #[test]
    fn empty_store_reports_model_unavailable() {
        let store = SnapshotStore::new();
        assert!(matches!(
            store.current(),
            Err(EstimateError::ModelUnavailable { .. })
        ));
    }

    #[test]
    fn publish_swaps_whole_snapshots() {
        let store = SnapshotStore::with_snapshot(sample_snapshot("run-a"));
        let held = store.current().unwrap();

        let previous = store.publish(sample_snapshot("run-b"));
        assert_eq!(previous.unwrap().run_id, "run-a");
        assert_eq!(held.run_id, "run-a");
        assert_eq!(store.current().unwrap().run_id, "run-b");
    }

    #[test]
    fn readers_never_observe_a_partial_swap() {
        let store = SnapshotStore::with_snapshot(sample_snapshot("run-0"));
        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 1..50 {
                    store.publish(sample_snapshot(&format!("run-{i}")));
                }
            });
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..200 {
                        let snap = store.current().unwrap();
                        assert!(snap.validate().is_ok());
                        assert!(snap.run_id.starts_with("run-"));
                    }
                });
            }
        });
        assert_eq!(store.current().unwrap().run_id, "run-49");
    }

    #[test]
    fn class_count_mismatch_is_an_artifact_error() {
        let mut snap = sample_snapshot("run");
        snap.encoders.cost_category = LabelEncoder::fit(["Cheap", "Expensive", "Medium"]);
        assert!(matches!(snap.validate(), Err(EstimateError::Artifact(_))));
    }

    #[test]
    fn out_of_range_split_feature_is_an_artifact_error() {
        let mut snap = sample_snapshot("run");
        if let Node::Split { feature, .. } = &mut snap.model.root {
            *feature = 7;
        }
        assert!(matches!(snap.validate(), Err(EstimateError::Artifact(ref m)) if m.contains("feature 7")));
    }
}
