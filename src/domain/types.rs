//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - deserialized from HTTP request bodies and CSV rows
//! - written to the processed dataset and the model artifact
//! - passed between the ETL, training and serving paths unchanged

use std::net::IpAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A raw loan application, as received by `POST /predict`.
///
/// Field names match the JSON contract exactly. Missing or mistyped fields are
/// rejected by the JSON extractor before any scoring happens; borrower counts
/// are unsigned so negative counts are rejected the same way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub loan_amount: f64,
    pub term_in_months: f64,
    pub repayment_interval: String,
    pub country: String,
    pub activity: String,
    pub region: String,
    pub loan_theme_type: String,
    pub mpi: f64,
    pub theme_loan_density: f64,
    pub num_female_borrowers: u32,
    pub num_male_borrowers: u32,
}

/// The five label-encoded columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalColumn {
    RepaymentInterval,
    Country,
    Activity,
    Region,
    LoanThemeType,
}

impl CategoricalColumn {
    pub const ALL: [CategoricalColumn; 5] = [
        CategoricalColumn::RepaymentInterval,
        CategoricalColumn::Country,
        CategoricalColumn::Activity,
        CategoricalColumn::Region,
        CategoricalColumn::LoanThemeType,
    ];

    /// Column name as used in CSV headers, JSON bodies and the mapping file.
    pub fn name(self) -> &'static str {
        match self {
            CategoricalColumn::RepaymentInterval => "repayment_interval",
            CategoricalColumn::Country => "country",
            CategoricalColumn::Activity => "activity",
            CategoricalColumn::Region => "region",
            CategoricalColumn::LoanThemeType => "loan_theme_type",
        }
    }

    /// Raw string value of this column on an application.
    pub fn value_of(self, loan: &LoanApplication) -> &str {
        match self {
            CategoricalColumn::RepaymentInterval => &loan.repayment_interval,
            CategoricalColumn::Country => &loan.country,
            CategoricalColumn::Activity => &loan.activity,
            CategoricalColumn::Region => &loan.region,
            CategoricalColumn::LoanThemeType => &loan.loan_theme_type,
        }
    }
}

/// A loan whose categorical columns have been replaced by integer codes.
///
/// This is the single hand-off point between encoding and feature engineering:
/// the ETL writes it to the processed CSV, training reads it back, and the
/// server builds it from a request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodedLoan {
    pub loan_amount: f64,
    pub term_in_months: f64,
    pub repayment_interval: u32,
    pub country: u32,
    pub activity: u32,
    pub region: u32,
    pub loan_theme_type: u32,
    pub mpi: f64,
    pub theme_loan_density: f64,
    pub num_female_borrowers: u32,
    pub num_male_borrowers: u32,
}

/// One row of the processed training dataset (`processed_kiva.csv`).
///
/// Column order matches the CSV header written by the ETL.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessedRow {
    pub loan_amount: f64,
    pub term_in_months: f64,
    pub repayment_interval: u32,
    pub country: u32,
    pub activity: u32,
    pub region: u32,
    pub loan_theme_type: u32,
    pub funded: u8,
    pub mpi: f64,
    pub theme_loan_density: f64,
    pub num_female_borrowers: u32,
    pub num_male_borrowers: u32,
}

impl ProcessedRow {
    pub fn from_encoded(loan: &EncodedLoan, funded: bool) -> Self {
        Self {
            loan_amount: loan.loan_amount,
            term_in_months: loan.term_in_months,
            repayment_interval: loan.repayment_interval,
            country: loan.country,
            activity: loan.activity,
            region: loan.region,
            loan_theme_type: loan.loan_theme_type,
            funded: u8::from(funded),
            mpi: loan.mpi,
            theme_loan_density: loan.theme_loan_density,
            num_female_borrowers: loan.num_female_borrowers,
            num_male_borrowers: loan.num_male_borrowers,
        }
    }

    pub fn encoded(&self) -> EncodedLoan {
        EncodedLoan {
            loan_amount: self.loan_amount,
            term_in_months: self.term_in_months,
            repayment_interval: self.repayment_interval,
            country: self.country,
            activity: self.activity,
            region: self.region,
            loan_theme_type: self.loan_theme_type,
            mpi: self.mpi,
            theme_loan_density: self.theme_loan_density,
            num_female_borrowers: self.num_female_borrowers,
            num_male_borrowers: self.num_male_borrowers,
        }
    }

    pub fn is_funded(&self) -> bool {
        self.funded != 0
    }
}

/// Lending decision derived from the approval probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Approved,
    Rejected,
}

/// Response body of `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResponse {
    /// Rescaled score in `[300, 900]`.
    pub credit_score: u16,
    /// Probability of the funded class, in percent, rounded to 2 decimals.
    pub approval_probability: f64,
    pub decision: Decision,
}

/// Response body of `GET /`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Hyperparameters of the gradient-boosted classifier.
///
/// Stored verbatim in the model artifact so a model file documents how it was trained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostParams {
    pub n_rounds: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Minimum hessian sum in each child of a split.
    pub min_child_weight: f64,
    /// Row fraction sampled (without replacement) per tree.
    pub subsample: f64,
    /// Column fraction sampled per tree.
    pub colsample_bytree: f64,
    /// Minimum loss reduction required to keep a split.
    pub gamma: f64,
    /// L2 regularization on leaf weights.
    pub lambda: f64,
    /// Weight multiplier applied to positive examples.
    pub scale_pos_weight: f64,
    pub seed: u64,
}

impl Default for BoostParams {
    fn default() -> Self {
        Self {
            n_rounds: 500,
            learning_rate: 0.05,
            max_depth: 5,
            min_child_weight: 5.0,
            subsample: 0.8,
            colsample_bytree: 0.8,
            gamma: 1.0,
            lambda: 1.0,
            scale_pos_weight: 1.0,
            seed: 42,
        }
    }
}

/// Configuration for `credit prepare`.
#[derive(Debug, Clone)]
pub struct PrepareConfig {
    pub data_dir: PathBuf,
    pub out_dir: PathBuf,
    /// Sector kept from the loan file.
    pub sector: String,
    /// `funded_amount / loan_amount` at or above which a loan counts as funded.
    pub funded_ratio_threshold: f64,
    /// Share of funded rows after rebalancing.
    pub accept_share: f64,
    /// Upper quantile at which theme loan density is clipped.
    pub density_clip_quantile: f64,
    pub seed: u64,
}

/// Configuration for `credit train`.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub processed_csv: PathBuf,
    pub model_path: PathBuf,
    pub test_fraction: f64,
    pub split_seed: u64,
    pub params: BoostParams,
    /// Derive `scale_pos_weight` from the training split instead of `params`.
    pub auto_scale_pos_weight: bool,
}

/// Configuration for `credit serve`.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub model_path: PathBuf,
    pub mappings_path: PathBuf,
    pub host: IpAddr,
    pub port: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loan_application_rejects_negative_borrower_counts() {
        let body = r#"{
            "loan_amount": 500.0, "term_in_months": 8, "repayment_interval": "monthly",
            "country": "Kenya", "activity": "Farming", "region": "Nakuru",
            "loan_theme_type": "General", "mpi": 0.2, "theme_loan_density": 3,
            "num_female_borrowers": -1, "num_male_borrowers": 0
        }"#;
        assert!(serde_json::from_str::<LoanApplication>(body).is_err());
    }

    #[test]
    fn decision_serializes_as_plain_word() {
        let json = serde_json::to_string(&Decision::Approved).unwrap();
        assert_eq!(json, "\"Approved\"");
    }

    #[test]
    fn processed_row_roundtrips_encoded_loan() {
        let loan = EncodedLoan {
            loan_amount: 250.0,
            term_in_months: 14.0,
            repayment_interval: 1,
            country: 7,
            activity: 3,
            region: 12,
            loan_theme_type: 2,
            mpi: 0.31,
            theme_loan_density: 4.0,
            num_female_borrowers: 2,
            num_male_borrowers: 1,
        };
        let row = ProcessedRow::from_encoded(&loan, true);
        assert!(row.is_funded());
        assert_eq!(row.encoded(), loan);
    }
}
