//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the raw loan application and its encoded form (`LoanApplication`, `EncodedLoan`)
//! - the processed dataset row (`ProcessedRow`)
//! - scoring responses (`ScoreResponse`, `Decision`)
//! - run configuration (`PrepareConfig`, `TrainConfig`, `ServeConfig`, `BoostParams`)

pub mod types;

pub use types::*;
