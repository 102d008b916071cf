//! Label encoding for categorical loan columns.
//!
//! Fitting collects the distinct values of each categorical column, sorts them,
//! and assigns codes `0..n` in sorted order. The fitted mapping is persisted as
//! `label_mappings.json`:
//!
//! ```text
//! {
//!   "repayment_interval": { "bullet": 0, "irregular": 1, "monthly": 2 },
//!   "country": { ... },
//!   ...
//! }
//! ```
//!
//! Lookup never fails: a value that was not seen during fitting maps to
//! [`UNSEEN_CODE`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::{CategoricalColumn, EncodedLoan, LoanApplication};
use crate::error::AppError;

/// Code used for categorical values absent from the fitted mapping.
pub const UNSEEN_CODE: u32 = 0;

/// Fitted categorical value -> code mappings, one per categorical column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelMappings {
    columns: BTreeMap<CategoricalColumn, BTreeMap<String, u32>>,
}

impl LabelMappings {
    /// Fit mappings over every categorical column of `loans`.
    pub fn fit(loans: &[LoanApplication]) -> Self {
        let mut columns = BTreeMap::new();
        for column in CategoricalColumn::ALL {
            let distinct: BTreeSet<&str> = loans.iter().map(|l| column.value_of(l)).collect();
            let codes = distinct
                .into_iter()
                .enumerate()
                .map(|(idx, value)| (value.to_string(), idx as u32))
                .collect();
            columns.insert(column, codes);
        }
        Self { columns }
    }

    /// Ensure every categorical column has a mapping.
    ///
    /// A mapping file missing a column would silently encode that column as
    /// [`UNSEEN_CODE`] for every request, so loading treats it as an error.
    pub fn validate(&self) -> Result<(), AppError> {
        for column in CategoricalColumn::ALL {
            if !self.columns.contains_key(&column) {
                return Err(AppError::new(
                    2,
                    format!("Label mappings are missing column `{}`.", column.name()),
                ));
            }
        }
        Ok(())
    }

    /// Code for `value` in `column`, or [`UNSEEN_CODE`] if it was never fitted.
    pub fn code(&self, column: CategoricalColumn, value: &str) -> u32 {
        self.columns
            .get(&column)
            .and_then(|codes| codes.get(value))
            .copied()
            .unwrap_or(UNSEEN_CODE)
    }

    /// Number of distinct values fitted for `column`.
    pub fn cardinality(&self, column: CategoricalColumn) -> usize {
        self.columns.get(&column).map_or(0, BTreeMap::len)
    }

    /// Replace the categorical fields of `loan` with their codes.
    pub fn encode(&self, loan: &LoanApplication) -> EncodedLoan {
        EncodedLoan {
            loan_amount: loan.loan_amount,
            term_in_months: loan.term_in_months,
            repayment_interval: self.code(CategoricalColumn::RepaymentInterval, &loan.repayment_interval),
            country: self.code(CategoricalColumn::Country, &loan.country),
            activity: self.code(CategoricalColumn::Activity, &loan.activity),
            region: self.code(CategoricalColumn::Region, &loan.region),
            loan_theme_type: self.code(CategoricalColumn::LoanThemeType, &loan.loan_theme_type),
            mpi: loan.mpi,
            theme_loan_density: loan.theme_loan_density,
            num_female_borrowers: loan.num_female_borrowers,
            num_male_borrowers: loan.num_male_borrowers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loan(interval: &str, country: &str) -> LoanApplication {
        LoanApplication {
            loan_amount: 300.0,
            term_in_months: 12.0,
            repayment_interval: interval.to_string(),
            country: country.to_string(),
            activity: "Farming".to_string(),
            region: "Kisumu".to_string(),
            loan_theme_type: "General".to_string(),
            mpi: 0.2,
            theme_loan_density: 5.0,
            num_female_borrowers: 1,
            num_male_borrowers: 0,
        }
    }

    #[test]
    fn fit_assigns_codes_in_sorted_order() {
        let loans = vec![
            loan("monthly", "Kenya"),
            loan("bullet", "Peru"),
            loan("irregular", "Kenya"),
        ];
        let mappings = LabelMappings::fit(&loans);

        assert_eq!(mappings.code(CategoricalColumn::RepaymentInterval, "bullet"), 0);
        assert_eq!(mappings.code(CategoricalColumn::RepaymentInterval, "irregular"), 1);
        assert_eq!(mappings.code(CategoricalColumn::RepaymentInterval, "monthly"), 2);
        assert_eq!(mappings.code(CategoricalColumn::Country, "Peru"), 1);
        assert_eq!(mappings.cardinality(CategoricalColumn::Country), 2);
    }

    #[test]
    fn unseen_value_maps_to_zero() {
        let mappings = LabelMappings::fit(&[loan("monthly", "Kenya"), loan("bullet", "Peru")]);
        assert_eq!(mappings.code(CategoricalColumn::Country, "Atlantis"), UNSEEN_CODE);

        let encoded = mappings.encode(&loan("weekly", "Atlantis"));
        assert_eq!(encoded.repayment_interval, 0);
        assert_eq!(encoded.country, 0);
    }

    #[test]
    fn json_uses_column_names_as_keys() {
        let mappings = LabelMappings::fit(&[loan("monthly", "Kenya")]);
        let json = serde_json::to_value(&mappings).unwrap();
        assert_eq!(json["repayment_interval"]["monthly"], 0);
        assert_eq!(json["loan_theme_type"]["General"], 0);

        let back: LabelMappings = serde_json::from_value(json).unwrap();
        assert_eq!(back, mappings);
    }

    #[test]
    fn validate_rejects_missing_column() {
        let json = serde_json::json!({ "country": { "Kenya": 0 } });
        let mappings: LabelMappings = serde_json::from_value(json).unwrap();
        let err = mappings.validate().unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("repayment_interval"));
    }
}
