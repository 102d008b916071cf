//! Decision-threshold sweep used during evaluation.
//!
//! Thresholds `0.30, 0.31, ..., 0.79` are tried and the one with the highest
//! F1 for the *rejected* class is kept. The served decision rule does not use
//! this value; it is reported and stored with the model for reference.

use crate::report::f1_score;

const SWEEP_START: f64 = 0.30;
const SWEEP_STEP: f64 = 0.01;
const SWEEP_STEPS: usize = 50;

/// Threshold used when no candidate improves on an F1 of zero.
pub const FALLBACK_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdChoice {
    pub threshold: f64,
    /// F1 of the negative (not funded) class at `threshold`.
    pub f1_rejected: f64,
}

/// Pick the threshold maximizing negative-class F1. Earlier thresholds win ties.
pub fn best_rejection_threshold(labels: &[bool], probs: &[f64]) -> ThresholdChoice {
    let mut best = ThresholdChoice {
        threshold: FALLBACK_THRESHOLD,
        f1_rejected: 0.0,
    };

    for step in 0..SWEEP_STEPS {
        let t = SWEEP_START + SWEEP_STEP * step as f64;
        let preds: Vec<bool> = probs.iter().map(|&p| p >= t).collect();
        let f1 = f1_score(labels, &preds, false);
        if f1 > best.f1_rejected {
            best = ThresholdChoice {
                threshold: t,
                f1_rejected: f1,
            };
        }
    }

    best
}
