//! Entropy-criterion decision tree classifier.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::tree::split::{best_split, entropy};
use crate::tree::{Classifier, FeatureRow, N_FEATURES};

/// Tree growth limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeParams {
    /// Maximum depth (root = depth 0); `None` grows until leaves are pure.
    pub max_depth: Option<usize>,
    /// Nodes with fewer samples become leaves.
    pub min_samples_split: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        class: u32,
        /// Training samples per class that reached this leaf.
        counts: Vec<usize>,
    },
    Split {
        feature: usize,
        /// Rows with `feature <= threshold` go left.
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// A fitted decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub params: TreeParams,
    pub n_classes: usize,
    pub root: Node,
}

impl DecisionTree {
    /// Fit a tree on encoded rows `x` with class codes `y` in `0..n_classes`.
    pub fn fit(x: &[FeatureRow], y: &[u32], n_classes: usize, params: TreeParams) -> Result<Self, AppError> {
        if x.is_empty() {
            return Err(AppError::new(3, "No training rows to fit."));
        }
        if x.len() != y.len() {
            return Err(AppError::new(
                4,
                format!("Feature/target length mismatch: {} rows vs {} targets.", x.len(), y.len()),
            ));
        }
        if let Some(bad) = y.iter().find(|&&c| c as usize >= n_classes) {
            return Err(AppError::new(
                4,
                format!("Target code {bad} is outside 0..{n_classes}."),
            ));
        }

        let builder = Builder {
            x,
            y,
            n_classes,
            params,
        };
        let indices: Vec<usize> = (0..x.len()).collect();
        let root = builder.build(&indices, 0);

        Ok(Self {
            params,
            n_classes,
            root,
        })
    }

    pub fn depth(&self) -> usize {
        fn walk(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        walk(&self.root)
    }

    /// Check that every node can be evaluated: split features index into a
    /// `FeatureRow`, thresholds are finite, and leaves hold a class in
    /// `0..n_classes` with one count per class.
    ///
    /// A tree from `fit` always passes; this guards trees read from disk.
    pub fn check_structure(&self) -> Result<(), String> {
        fn walk(node: &Node, n_classes: usize) -> Result<(), String> {
            match node {
                Node::Leaf { class, counts } => {
                    if *class as usize >= n_classes {
                        return Err(format!("leaf class {class} is outside 0..{n_classes}"));
                    }
                    if counts.len() != n_classes {
                        return Err(format!(
                            "leaf has {} class counts, expected {n_classes}",
                            counts.len()
                        ));
                    }
                    Ok(())
                }
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= N_FEATURES {
                        return Err(format!("split on feature {feature}, but rows have {N_FEATURES}"));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("split on feature {feature} has threshold {threshold}"));
                    }
                    walk(left, n_classes)?;
                    walk(right, n_classes)
                }
            }
        }
        walk(&self.root, self.n_classes)
    }

    pub fn leaf_count(&self) -> usize {
        fn walk(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 1,
                Node::Split { left, right, .. } => walk(left) + walk(right),
            }
        }
        walk(&self.root)
    }
}

impl Classifier for DecisionTree {
    fn predict(&self, row: &FeatureRow) -> u32 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { class, .. } => return *class,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] as f64 <= *threshold { left } else { right };
                }
            }
        }
    }
}

struct Builder<'a> {
    x: &'a [FeatureRow],
    y: &'a [u32],
    n_classes: usize,
    params: TreeParams,
}

impl Builder<'_> {
    fn build(&self, indices: &[usize], depth: usize) -> Node {
        let counts = self.class_counts(indices);
        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let depth_reached = self.params.max_depth.is_some_and(|max| depth >= max);

        if pure || depth_reached || indices.len() < self.params.min_samples_split {
            return leaf(counts);
        }

        let Some(split) = best_split(self.x, self.y, indices, self.n_classes, entropy(&counts)) else {
            return leaf(counts);
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .copied()
            .partition(|&i| self.x[i][split.feature] as f64 <= split.threshold);

        Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(self.build(&left, depth + 1)),
            right: Box::new(self.build(&right, depth + 1)),
        }
    }

    fn class_counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &i in indices {
            counts[self.y[i] as usize] += 1;
        }
        counts
    }
}

/// Leaf predicting the majority class (ties to the lowest class code).
fn leaf(counts: Vec<usize>) -> Node {
    let mut class = 0usize;
    for (c, &n) in counts.iter().enumerate() {
        if n > counts[class] {
            class = c;
        }
    }
    Node::Leaf {
        class: class as u32,
        counts,
    }
}
