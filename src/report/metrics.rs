//! Binary classification metrics.
//!
//! Labels are `bool` with `true` = funded (positive class). Metrics that are
//! undefined for the given data (e.g. precision with no predicted positives)
//! are reported as `0.0`, except ROC AUC which is `None` when only one class
//! is present.

use serde::{Deserialize, Serialize};

/// Probability clamp used by `log_loss`.
const LOG_LOSS_EPS: f64 = 1e-15;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class precision/recall/F1 plus averages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub rejected: ClassMetrics,
    pub funded: ClassMetrics,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

pub fn accuracy(labels: &[bool], preds: &[bool]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let correct = labels.iter().zip(preds).filter(|(y, p)| y == p).count();
    correct as f64 / labels.len() as f64
}

pub fn class_metrics(labels: &[bool], preds: &[bool], class: bool) -> ClassMetrics {
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut fn_ = 0usize;
    for (&y, &p) in labels.iter().zip(preds) {
        match (y == class, p == class) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
    }

    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    ClassMetrics {
        precision,
        recall,
        f1,
        support: tp + fn_,
    }
}

pub fn f1_score(labels: &[bool], preds: &[bool], class: bool) -> f64 {
    class_metrics(labels, preds, class).f1
}

pub fn classification_report(labels: &[bool], preds: &[bool]) -> ClassificationReport {
    let rejected = class_metrics(labels, preds, false);
    let funded = class_metrics(labels, preds, true);
    let total = (rejected.support + funded.support) as f64;

    let macro_avg = ClassMetrics {
        precision: (rejected.precision + funded.precision) / 2.0,
        recall: (rejected.recall + funded.recall) / 2.0,
        f1: (rejected.f1 + funded.f1) / 2.0,
        support: rejected.support + funded.support,
    };

    let weighted = |a: f64, b: f64| {
        if total > 0.0 {
            (a * rejected.support as f64 + b * funded.support as f64) / total
        } else {
            0.0
        }
    };
    let weighted_avg = ClassMetrics {
        precision: weighted(rejected.precision, funded.precision),
        recall: weighted(rejected.recall, funded.recall),
        f1: weighted(rejected.f1, funded.f1),
        support: rejected.support + funded.support,
    };

    ClassificationReport {
        rejected,
        funded,
        accuracy: accuracy(labels, preds),
        macro_avg,
        weighted_avg,
    }
}

/// Area under the ROC curve via the rank-sum (Mann-Whitney U) statistic.
///
/// Tied scores receive their average rank.
pub fn roc_auc(labels: &[bool], probs: &[f64]) -> Option<f64> {
    let n_pos = labels.iter().filter(|&&y| y).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..probs.len()).collect();
    order.sort_by(|&a, &b| probs[a].total_cmp(&probs[b]));

    let mut rank_sum_pos = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && probs[order[j + 1]] == probs[order[i]] {
            j += 1;
        }
        // Ranks are 1-based; the tie group i..=j shares the average rank.
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &k in &order[i..=j] {
            if labels[k] {
                rank_sum_pos += avg_rank;
            }
        }
        i = j + 1;
    }

    let n_pos = n_pos as f64;
    let u = rank_sum_pos - n_pos * (n_pos + 1.0) / 2.0;
    Some(u / (n_pos * n_neg as f64))
}

/// Mean binary cross-entropy.
pub fn log_loss(labels: &[bool], probs: &[f64]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let total: f64 = labels
        .iter()
        .zip(probs)
        .map(|(&y, &p)| {
            let p = p.clamp(LOG_LOSS_EPS, 1.0 - LOG_LOSS_EPS);
            if y { -p.ln() } else { -(1.0 - p).ln() }
        })
        .sum();
    total / labels.len() as f64
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auc_perfect_and_inverted() {
        let labels = [false, false, true, true];
        assert_eq!(roc_auc(&labels, &[0.1, 0.2, 0.8, 0.9]), Some(1.0));
        assert_eq!(roc_auc(&labels, &[0.9, 0.8, 0.2, 0.1]), Some(0.0));
    }

    #[test]
    fn auc_counts_ties_as_half() {
        let labels = [false, true];
        assert_eq!(roc_auc(&labels, &[0.5, 0.5]), Some(0.5));
        assert_eq!(roc_auc(&[true, true], &[0.1, 0.2]), None);
    }

    #[test]
    fn per_class_metrics() {
        let labels = [true, true, true, false, false];
        let preds = [true, true, false, true, false];

        let funded = class_metrics(&labels, &preds, true);
        assert!((funded.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((funded.recall - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(funded.support, 3);

        let rejected = class_metrics(&labels, &preds, false);
        assert_eq!(rejected.precision, 0.5);
        assert_eq!(rejected.recall, 0.5);
        assert_eq!(rejected.f1, 0.5);

        let report = classification_report(&labels, &preds);
        assert_eq!(report.accuracy, 0.6);
        assert_eq!(report.weighted_avg.support, 5);
    }

    #[test]
    fn undefined_precision_is_zero() {
        let m = class_metrics(&[true, false], &[false, false], true);
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.f1, 0.0);
    }

    #[test]
    fn log_loss_is_finite_for_confident_mistakes() {
        let loss = log_loss(&[true, false], &[0.0, 1.0]);
        assert!(loss.is_finite());
        assert!(loss > 30.0);
    }
}
