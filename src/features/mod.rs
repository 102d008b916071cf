//! Categorical encoding and feature engineering.
//!
//! - `encoding`: fit / persist / look up categorical codes (`LabelMappings`)
//! - `engineer`: derive model-ready feature rows (`FeatureVector`)

pub mod encoding;
pub mod engineer;

pub use encoding::*;
pub use engineer::*;
