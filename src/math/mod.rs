//! Mathematical utilities: logistic link and robust summary statistics.

pub mod stats;

pub use stats::*;
