//! The model collaborator: a classifier over integer-coded features.
//!
//! The pipeline only relies on the `Classifier` contract (three encoded
//! features in, one encoded class out). `DecisionTree` is the concrete model:
//! an entropy-criterion CART with threshold splits.

pub mod decision;
pub mod split;

pub use decision::*;

/// Number of model features (brand, tier, damage).
pub const N_FEATURES: usize = 3;

/// One encoded feature row.
pub type FeatureRow = [u32; N_FEATURES];

pub trait Classifier {
    /// Predict the class code of one encoded row.
    fn predict(&self, row: &FeatureRow) -> u32;

    fn predict_many(&self, rows: &[FeatureRow]) -> Vec<u32> {
        rows.iter().map(|r| self.predict(r)).collect()
    }
}
