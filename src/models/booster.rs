//! Boosted tree ensemble for binary classification.
//!
//! The raw score (margin) is `base_margin + Σ tree(x)`; the probability of the
//! positive ("funded") class is `sigmoid(margin)`. Leaf values already include
//! the learning rate.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::features::{FEATURE_COUNT, FeatureVector};
use crate::math::sigmoid;
use crate::models::tree::Tree;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BoosterParts", into = "BoosterParts")]
pub struct Booster {
    base_margin: f64,
    trees: Vec<Tree>,
}

/// Serialized form; converted through `Booster::new` so loaded models are checked.
#[derive(Serialize, Deserialize)]
struct BoosterParts {
    base_margin: f64,
    trees: Vec<Tree>,
}

impl Booster {
    pub fn new(base_margin: f64, trees: Vec<Tree>) -> Result<Self, AppError> {
        if !base_margin.is_finite() {
            return Err(AppError::new(4, "Booster base margin must be finite."));
        }
        for (idx, tree) in trees.iter().enumerate() {
            if let Some(feature) = tree.max_feature() {
                if feature >= FEATURE_COUNT {
                    return Err(AppError::new(
                        4,
                        format!("Tree {idx} splits on feature {feature}, but only {FEATURE_COUNT} features exist."),
                    ));
                }
            }
        }
        Ok(Self { base_margin, trees })
    }

    pub fn base_margin(&self) -> f64 {
        self.base_margin
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    pub fn margin(&self, features: &FeatureVector) -> f64 {
        let x = features.as_slice();
        self.base_margin + self.trees.iter().map(|t| t.predict(x)).sum::<f64>()
    }

    /// Probability of the positive class, in `[0, 1]`.
    pub fn predict_proba(&self, features: &FeatureVector) -> f64 {
        sigmoid(self.margin(features))
    }
}

impl TryFrom<BoosterParts> for Booster {
    type Error = AppError;

    fn try_from(parts: BoosterParts) -> Result<Self, Self::Error> {
        Booster::new(parts.base_margin, parts.trees)
    }
}

impl From<Booster> for BoosterParts {
    fn from(b: Booster) -> Self {
        Self {
            base_margin: b.base_margin,
            trees: b.trees,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EncodedLoan;
    use crate::models::tree::Node;

    fn features(term: f64) -> FeatureVector {
        FeatureVector::from_encoded(&EncodedLoan {
            loan_amount: 500.0,
            term_in_months: term,
            repayment_interval: 0,
            country: 0,
            activity: 0,
            region: 0,
            loan_theme_type: 0,
            mpi: 0.1,
            theme_loan_density: 1.0,
            num_female_borrowers: 1,
            num_male_borrowers: 0,
        })
    }

    #[test]
    fn empty_ensemble_uses_base_margin() {
        let booster = Booster::new(0.0, Vec::new()).unwrap();
        assert_eq!(booster.predict_proba(&features(12.0)), 0.5);
    }

    #[test]
    fn trees_are_summed_into_margin() {
        let split = Tree::from_nodes(vec![
            Node::Split {
                feature: 1,
                threshold: 10.0,
                left: 1,
                right: 2,
            },
            Node::Leaf { value: 1.0 },
            Node::Leaf { value: -1.0 },
        ])
        .unwrap();
        let booster = Booster::new(0.5, vec![split, Tree::leaf(0.25)]).unwrap();

        assert!((booster.margin(&features(8.0)) - 1.75).abs() < 1e-12);
        assert!((booster.margin(&features(14.0)) + 0.25).abs() < 1e-12);
        assert!(booster.predict_proba(&features(8.0)) > booster.predict_proba(&features(14.0)));
    }

    #[test]
    fn rejects_out_of_range_feature() {
        let tree = Tree::from_nodes(vec![
            Node::Split {
                feature: FEATURE_COUNT,
                threshold: 1.0,
                left: 1,
                right: 2,
            },
            Node::Leaf { value: 0.0 },
            Node::Leaf { value: 0.0 },
        ])
        .unwrap();
        assert!(Booster::new(0.0, vec![tree]).is_err());
    }
}
