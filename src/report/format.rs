//! Formatted terminal output for the offline commands.
//!
//! Formatting lives here so the ETL and training code only produce numbers.

use std::path::Path;

use crate::data::PrepareSummary;

use super::{ClassMetrics, Evaluation};

/// Summary printed after `credit prepare`.
pub fn format_prepare_summary(summary: &PrepareSummary, csv_path: &Path, mappings_path: &Path) -> String {
    let mut out = String::new();

    out.push_str("=== credit prepare ===\n");
    out.push_str(&format!(
        "Loans read: {} | row errors: {}\n",
        summary.loans_read, summary.row_errors
    ));
    out.push_str(&format!(
        "In sector: {} | complete: {}\n",
        summary.label.in_sector, summary.label.complete
    ));
    out.push_str(&format!(
        "Funded: {} -> {} | not funded: {} -> {}\n",
        summary.balance.positive_before,
        summary.balance.positive_after,
        summary.balance.negative_before,
        summary.balance.negative_after,
    ));
    out.push_str(&format!(
        "Imputed: mpi={} theme_loan_density={}\n",
        summary.mpi_imputed, summary.density_imputed
    ));

    out.push_str("\nCategorical columns:\n");
    for (column, n) in &summary.cardinalities {
        out.push_str(&format!("  {:<20} {:>8}\n", column.name(), n));
    }

    out.push_str(&format!("\nWrote {}\n", csv_path.display()));
    out.push_str(&format!("Wrote {}\n", mappings_path.display()));
    out
}

/// Held-out evaluation printed after `credit train`.
pub fn format_evaluation(eval: &Evaluation, model_path: &Path) -> String {
    let mut out = String::new();

    out.push_str("=== credit train ===\n");
    out.push_str(&format!(
        "Rows: train={} test={} | scale_pos_weight={:.4}\n",
        eval.n_train, eval.n_test, eval.scale_pos_weight
    ));
    out.push_str(&format!("Accuracy: {:.4}\n", eval.accuracy));
    match eval.roc_auc {
        Some(auc) => out.push_str(&format!("ROC AUC: {auc:.4}\n")),
        None => out.push_str("ROC AUC: n/a (single class in test set)\n"),
    }
    out.push_str(&format!("Log loss: {:.4}\n", eval.log_loss));
    out.push_str(&format!(
        "Best threshold: {:.2} (rejected F1={:.4})\n",
        eval.best_threshold, eval.f1_rejected
    ));

    out.push_str("\nClassification report:\n");
    out.push_str(&format_report_row("", "precision", "recall", "f1", "support"));
    out.push_str(&format_metrics("rejected", &eval.report.rejected));
    out.push_str(&format_metrics("funded", &eval.report.funded));
    out.push_str(&format_metrics("macro avg", &eval.report.macro_avg));
    out.push_str(&format_metrics("weighted avg", &eval.report.weighted_avg));

    out.push_str(&format!("\nWrote {}\n", model_path.display()));
    out
}

fn format_metrics(label: &str, m: &ClassMetrics) -> String {
    format_report_row(
        label,
        &format!("{:.2}", m.precision),
        &format!("{:.2}", m.recall),
        &format!("{:.2}", m.f1),
        &m.support.to_string(),
    )
}

fn format_report_row(label: &str, precision: &str, recall: &str, f1: &str, support: &str) -> String {
    let mut row = format!("{label:<14} {precision:>10} {recall:>10} {f1:>10} {support:>10}");
    row.truncate(row.trim_end().len());
    row.push('\n');
    row
}
