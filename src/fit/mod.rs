//! Model training.
//!
//! Responsibilities:
//!
//! - split the processed dataset into stratified train/test sets
//! - grow the boosted tree ensemble (parallel split search)
//! - sweep decision thresholds on the held-out set

pub mod split;
pub mod threshold;
pub mod trainer;

pub use split::*;
pub use threshold::*;
pub use trainer::*;
