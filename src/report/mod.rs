//! Evaluation metrics and formatted terminal output.
//!
//! Metrics are computed once on the held-out split and handed to the caller
//! unmodified: accuracy, confusion matrix (rows = true class, columns =
//! predicted class, both in class-code order) and a per-class
//! precision/recall/F1 report with macro and support-weighted averages.

use chrono::{DateTime, Utc};
use nalgebra::DMatrix;
use serde::Serialize;

use crate::preprocess::StageReport;

pub mod format;

pub use format::*;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub accuracy: f64,
    pub confusion_matrix: Vec<Vec<usize>>,
    pub classes: Vec<ClassMetrics>,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
    pub n_test: usize,
}

/// Vocabulary size of each fitted encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VocabularySizes {
    pub brand: usize,
    pub tier: usize,
    pub damage: usize,
    pub cost_category: usize,
}

/// Everything a training run reports; also the `--report-json` document.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSummary {
    pub run_id: String,
    pub trained_at: DateTime<Utc>,
    pub rows_read: usize,
    pub row_errors: usize,
    /// Rows left after preprocessing (train + test).
    pub total_data: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub tree_depth: usize,
    pub tree_leaves: usize,
    pub vocabulary: VocabularySizes,
    pub preprocessing: StageReport,
    pub evaluation: Evaluation,
}

/// Score predictions against the truth. `labels[code]` names each class code.
pub fn evaluate(y_true: &[u32], y_pred: &[u32], labels: &[String]) -> Evaluation {
    let k = labels.len();
    let n = y_true.len().min(y_pred.len());

    let mut cm = DMatrix::<usize>::zeros(k, k);
    for (&t, &p) in y_true.iter().zip(y_pred) {
        let (t, p) = (t as usize, p as usize);
        if t < k && p < k {
            cm[(t, p)] += 1;
        }
    }

    let correct: usize = (0..k).map(|i| cm[(i, i)]).sum();
    let accuracy = ratio(correct, n);

    let classes: Vec<ClassMetrics> = labels
        .iter()
        .enumerate()
        .map(|(j, label)| {
            let tp = cm[(j, j)];
            let predicted: usize = cm.column(j).iter().sum();
            let support: usize = cm.row(j).iter().sum();
            let precision = ratio(tp, predicted);
            let recall = ratio(tp, support);
            ClassMetrics {
                label: label.clone(),
                precision,
                recall,
                f1: f1(precision, recall),
                support,
            }
        })
        .collect();

    let total_support: usize = classes.iter().map(|c| c.support).sum();
    let macro_avg = AverageMetrics {
        precision: mean(classes.iter().map(|c| c.precision), k),
        recall: mean(classes.iter().map(|c| c.recall), k),
        f1: mean(classes.iter().map(|c| c.f1), k),
        support: total_support,
    };
    let weighted = |metric: fn(&ClassMetrics) -> f64| -> f64 {
        if total_support == 0 {
            return 0.0;
        }
        classes.iter().map(|c| metric(c) * c.support as f64).sum::<f64>() / total_support as f64
    };
    let weighted_avg = AverageMetrics {
        precision: weighted(|c| c.precision),
        recall: weighted(|c| c.recall),
        f1: weighted(|c| c.f1),
        support: total_support,
    };

    let confusion_matrix = (0..k).map(|i| cm.row(i).iter().copied().collect()).collect();

    Evaluation {
        accuracy,
        confusion_matrix,
        classes,
        macro_avg,
        weighted_avg,
        n_test: n,
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

fn mean(values: impl Iterator<Item = f64>, n: usize) -> f64 {
    if n == 0 { 0.0 } else { values.sum::<f64>() / n as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        ["Cheap", "Expensive", "Medium"].map(String::from).to_vec()
    }

    #[test]
    fn confusion_matrix_and_per_class_scores() {
        let y_true = [0, 0, 1, 2, 2, 2];
        let y_pred = [0, 2, 1, 2, 2, 0];
        let eval = evaluate(&y_true, &y_pred, &labels());

        assert!((eval.accuracy - 4.0 / 6.0).abs() < 1e-12);
        assert_eq!(eval.confusion_matrix, vec![vec![1, 0, 1], vec![0, 1, 0], vec![1, 0, 2]]);

        let cheap = &eval.classes[0];
        assert!((cheap.precision - 0.5).abs() < 1e-12);
        assert!((cheap.recall - 0.5).abs() < 1e-12);
        assert_eq!(cheap.support, 2);

        let medium = &eval.classes[2];
        assert!((medium.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((medium.recall - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(eval.weighted_avg.support, 6);
    }

    #[test]
    fn absent_class_scores_zero_without_dividing_by_zero() {
        let eval = evaluate(&[0, 0], &[0, 0], &labels());
        assert_eq!(eval.accuracy, 1.0);
        assert_eq!(eval.classes[1].precision, 0.0);
        assert_eq!(eval.classes[1].f1, 0.0);
        assert!((eval.macro_avg.recall - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(eval.weighted_avg.recall, 1.0);
    }
}
