//! Formatted terminal output.
//!
//! Formatting lives here so the pipeline code stays free of presentation
//! details and output changes stay localized.

use crate::domain::CanonicalRecord;
use crate::io::RowError;
use crate::preprocess::StageReport;
use crate::report::{Evaluation, TrainingSummary};

/// Format the full training summary (data stats, preprocessing, model, metrics).
pub fn format_training_summary(summary: &TrainingSummary) -> String {
    let mut out = String::new();

    out.push_str("=== repest - Repair Cost Model Training ===\n");
    out.push_str(&format!(
        "Run: {} (trained {})\n",
        summary.run_id,
        summary.trained_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!(
        "Rows: read={} | rejected at ingest={} | usable={}\n",
        summary.rows_read, summary.row_errors, summary.total_data
    ));
    out.push_str(&format!("Split: train={} | test={}\n", summary.n_train, summary.n_test));
    out.push_str(&format!(
        "Tree: depth={} | leaves={}\n",
        summary.tree_depth, summary.tree_leaves
    ));
    let v = &summary.vocabulary;
    out.push_str(&format!(
        "Vocabulary: brand={} tier={} damage={} cost_category={}\n",
        v.brand, v.tier, v.damage, v.cost_category
    ));

    out.push('\n');
    out.push_str(&format_stage_report(&summary.preprocessing));
    out.push('\n');
    out.push_str(&format_evaluation(&summary.evaluation));

    out
}

/// Format per-stage row counts and the damage categories removed as rare.
pub fn format_stage_report(report: &StageReport) -> String {
    let mut out = String::new();

    out.push_str("Preprocessing:\n");
    push_line(
        &mut out,
        format!("{:<18} {:>8} {:>8} {:>8}", "stage", "rows_in", "rows_out", "dropped"),
    );
    push_line(&mut out, format!("{:-<18} {:-<8} {:-<8} {:-<8}", "", "", "", ""));
    for stage in &report.stages {
        push_line(
            &mut out,
            format!(
                "{:<18} {:>8} {:>8} {:>8}",
                truncate(stage.name, 18),
                stage.rows_in,
                stage.rows_out,
                stage.dropped()
            ),
        );
    }

    if !report.rare_categories.is_empty() {
        out.push_str(&format!(
            "Rare damage categories dropped ({}):\n",
            report.rare_categories.len()
        ));
        for (name, n) in &report.rare_categories {
            out.push_str(&format!("  {} ({n})\n", truncate(name, 40)));
        }
    }

    out
}

/// Format accuracy, the confusion matrix and the per-class table.
pub fn format_evaluation(eval: &Evaluation) -> String {
    let mut out = String::new();

    out.push_str(&format!("Accuracy: {:.4} (n_test={})\n\n", eval.accuracy, eval.n_test));

    out.push_str("Confusion matrix (rows = true, columns = predicted):\n");
    let mut header = format!("{:<12}", "");
    for c in &eval.classes {
        header.push_str(&format!(" {:>10}", truncate(&c.label, 10)));
    }
    push_line(&mut out, header);
    for (c, row) in eval.classes.iter().zip(&eval.confusion_matrix) {
        let mut line = format!("{:<12}", truncate(&c.label, 12));
        for n in row {
            line.push_str(&format!(" {n:>10}"));
        }
        push_line(&mut out, line);
    }

    out.push_str("\nClassification report:\n");
    push_line(
        &mut out,
        format!(
            "{:<14} {:>9} {:>9} {:>9} {:>8}",
            "class", "precision", "recall", "f1", "support"
        ),
    );
    push_line(&mut out, format!("{:-<14} {:-<9} {:-<9} {:-<9} {:-<8}", "", "", "", "", ""));
    for c in &eval.classes {
        push_line(
            &mut out,
            format!(
                "{:<14} {:>9.3} {:>9.3} {:>9.3} {:>8}",
                truncate(&c.label, 14),
                c.precision,
                c.recall,
                c.f1,
                c.support
            ),
        );
    }
    for (name, avg) in [("macro avg", &eval.macro_avg), ("weighted avg", &eval.weighted_avg)] {
        push_line(
            &mut out,
            format!(
                "{:<14} {:>9.3} {:>9.3} {:>9.3} {:>8}",
                name, avg.precision, avg.recall, avg.f1, avg.support
            ),
        );
    }

    out
}

/// Format the first `max` ingest row errors.
pub fn format_row_errors(errors: &[RowError], max: usize) -> String {
    let mut out = String::new();
    if errors.is_empty() {
        return out;
    }
    out.push_str(&format!("Skipped rows ({}):\n", errors.len()));
    for e in errors.iter().take(max) {
        out.push_str(&format!("  line {}: {}\n", e.line, e.message));
    }
    if errors.len() > max {
        out.push_str(&format!("  ... and {} more\n", errors.len() - max));
    }
    out
}

/// Format the first `max` canonical records as a table.
pub fn format_record_preview(records: &[CanonicalRecord], max: usize) -> String {
    let mut out = String::new();
    push_line(
        &mut out,
        format!(
            "{:<12} {:<12} {:<22} {:>12} {:<10} {:<20}",
            "brand", "tier", "damage", "cost", "category", "speed"
        ),
    );
    push_line(
        &mut out,
        format!("{:-<12} {:-<12} {:-<22} {:-<12} {:-<10} {:-<20}", "", "", "", "", "", ""),
    );
    for r in records.iter().take(max) {
        push_line(
            &mut out,
            format!(
                "{:<12} {:<12} {:<22} {:>12.0} {:<10} {:<20}",
                truncate(&r.brand, 12),
                r.tier.label(),
                truncate(&r.damage, 22),
                r.cost,
                r.cost_category.label(),
                r.speed.label(),
            ),
        );
    }
    if records.len() > max {
        out.push_str(&format!("({} of {} rows shown)\n", max, records.len()));
    }
    out
}

fn push_line(out: &mut String, line: String) {
    out.push_str(line.trim_end());
    out.push('\n');
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
