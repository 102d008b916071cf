//! Turning a probability into a credit score and a lending decision.
//!
//! `Scorer` bundles the two artifacts needed online (label mappings and the
//! booster). It is immutable once loaded and is shared across requests.

use std::path::Path;

use crate::domain::{Decision, LoanApplication, ScoreResponse};
use crate::error::AppError;
use crate::features::{FeatureVector, LabelMappings};
use crate::io::{read_mappings_json, read_model_json};
use crate::models::Booster;

pub const MIN_SCORE: u16 = 300;
pub const MAX_SCORE: u16 = 900;

/// Approval cut on the rounded approval percentage.
pub const APPROVAL_THRESHOLD_PCT: f64 = 65.0;

const SCORE_SPAN: f64 = 600.0;
const SCORE_EXPONENT: f64 = 0.75;

/// `floor(300 + 600 * prob^0.75)`, clamped to `[300, 900]`.
pub fn credit_score(prob: f64) -> u16 {
    let p = prob.clamp(0.0, 1.0);
    let raw = (f64::from(MIN_SCORE) + SCORE_SPAN * p.powf(SCORE_EXPONENT)).floor();
    raw.clamp(f64::from(MIN_SCORE), f64::from(MAX_SCORE)) as u16
}

/// Probability in percent, rounded to two decimals.
pub fn approval_percent(prob: f64) -> f64 {
    (prob.clamp(0.0, 1.0) * 10_000.0).round() / 100.0
}

pub fn decide(approval_pct: f64) -> Decision {
    if approval_pct >= APPROVAL_THRESHOLD_PCT {
        Decision::Approved
    } else {
        Decision::Rejected
    }
}

pub fn score_probability(prob: f64) -> Result<ScoreResponse, AppError> {
    if !prob.is_finite() {
        return Err(AppError::new(4, format!("Model produced a non-finite probability ({prob}).")));
    }
    let approval_probability = approval_percent(prob);
    Ok(ScoreResponse {
        credit_score: credit_score(prob),
        approval_probability,
        decision: decide(approval_probability),
    })
}

/// Label mappings plus the trained booster.
#[derive(Debug, Clone)]
pub struct Scorer {
    mappings: LabelMappings,
    booster: Booster,
}

impl Scorer {
    pub fn new(mappings: LabelMappings, booster: Booster) -> Self {
        Self { mappings, booster }
    }

    /// Load both artifacts. Either one missing or malformed is an error.
    pub fn load(model_path: &Path, mappings_path: &Path) -> Result<Self, AppError> {
        let model = read_model_json(model_path)?;
        let mappings = read_mappings_json(mappings_path)?;
        tracing::info!(
            model = %model_path.display(),
            mappings = %mappings_path.display(),
            trees = model.booster.trees().len(),
            trained_at = %model.trained_at,
            "artifacts loaded"
        );
        Ok(Self::new(mappings, model.booster))
    }

    pub fn features(&self, loan: &LoanApplication) -> FeatureVector {
        FeatureVector::from_encoded(&self.mappings.encode(loan))
    }

    /// Probability of the funded class.
    pub fn probability(&self, loan: &LoanApplication) -> f64 {
        self.booster.predict_proba(&self.features(loan))
    }

    pub fn score(&self, loan: &LoanApplication) -> Result<ScoreResponse, AppError> {
        score_probability(self.probability(loan))
    }
}
