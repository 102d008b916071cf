//! Feature engineering shared by training and inference.
//!
//! Both paths go through [`FeatureVector::from_encoded`], so a loan encoded by
//! the ETL and the same loan encoded by the server produce the same vector.

use crate::domain::EncodedLoan;

/// Loans at or below this term (months) are flagged as short term.
pub const SHORT_TERM_MAX_MONTHS: f64 = 6.0;

/// Country MPI at or above this value is flagged as high poverty.
pub const HIGH_MPI_MIN: f64 = 0.6;

/// Feature column order expected by the model.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "loan_amount",
    "term_in_months",
    "repayment_interval",
    "country",
    "activity",
    "region",
    "loan_theme_type",
    "mpi",
    "theme_loan_density",
    "num_female_borrowers",
    "num_male_borrowers",
    "loan_amount_per_borrower",
    "short_term",
    "high_mpi",
];

pub const FEATURE_COUNT: usize = 14;

/// A model-ready feature row, in [`FEATURE_NAMES`] order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn from_encoded(loan: &EncodedLoan) -> Self {
        let total_borrowers = total_borrowers(loan.num_female_borrowers, loan.num_male_borrowers);
        let short_term = if loan.term_in_months <= SHORT_TERM_MAX_MONTHS { 1.0 } else { 0.0 };
        let high_mpi = if loan.mpi >= HIGH_MPI_MIN { 1.0 } else { 0.0 };

        Self([
            loan.loan_amount,
            loan.term_in_months,
            f64::from(loan.repayment_interval),
            f64::from(loan.country),
            f64::from(loan.activity),
            f64::from(loan.region),
            f64::from(loan.loan_theme_type),
            loan.mpi,
            loan.theme_loan_density,
            f64::from(loan.num_female_borrowers),
            f64::from(loan.num_male_borrowers),
            loan.loan_amount / total_borrowers as f64,
            short_term,
            high_mpi,
        ])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Borrower count used as a divisor, floored at 1.
pub fn total_borrowers(female: u32, male: u32) -> u64 {
    (u64::from(female) + u64::from(male)).max(1)
}
