//! Evaluation and terminal reporting.
//!
//! - binary classification metrics (`metrics`)
//! - held-out evaluation summary stored with the model (`Evaluation`)
//! - formatted output for `credit prepare` and `credit train` (`format`)

pub mod format;
pub mod metrics;

pub use format::*;
pub use metrics::*;

use serde::{Deserialize, Serialize};

use crate::fit::best_rejection_threshold;

/// Held-out evaluation of a trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub n_train: usize,
    pub n_test: usize,
    pub scale_pos_weight: f64,
    /// Accuracy at `best_threshold`.
    pub accuracy: f64,
    /// `None` when the test set has a single class.
    pub roc_auc: Option<f64>,
    pub log_loss: f64,
    /// Threshold maximizing F1 of the rejected class. Not used for serving.
    pub best_threshold: f64,
    pub f1_rejected: f64,
    /// Classification report at `best_threshold`.
    pub report: ClassificationReport,
}

/// Evaluate test-set probabilities against labels.
pub fn evaluate(labels: &[bool], probs: &[f64], n_train: usize, scale_pos_weight: f64) -> Evaluation {
    let choice = best_rejection_threshold(labels, probs);
    let preds: Vec<bool> = probs.iter().map(|&p| p >= choice.threshold).collect();

    Evaluation {
        n_train,
        n_test: labels.len(),
        scale_pos_weight,
        accuracy: accuracy(labels, &preds),
        roc_auc: roc_auc(labels, probs),
        log_loss: log_loss(labels, probs),
        best_threshold: choice.threshold,
        f1_rejected: choice.f1_rejected,
        report: classification_report(labels, &preds),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluate_perfect_separation() {
        let labels = [false, false, true, true];
        let probs = [0.1, 0.2, 0.8, 0.9];
        let eval = evaluate(&labels, &probs, 16, 1.0);

        assert_eq!(eval.n_train, 16);
        assert_eq!(eval.n_test, 4);
        assert_eq!(eval.accuracy, 1.0);
        assert_eq!(eval.roc_auc, Some(1.0));
        assert_eq!(eval.f1_rejected, 1.0);
        assert_eq!(eval.report.funded.support, 2);
    }

    #[test]
    fn evaluation_survives_json() {
        let eval = evaluate(&[false, true, true], &[0.4, 0.7, 0.3], 10, 2.0);
        let json = serde_json::to_string(&eval).unwrap();
        let back: Evaluation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, eval);
    }
}
