//! Tree ensemble model used for scoring.
//!
//! Inference only: the trainer that produces these structures lives in `fit`.

pub mod booster;
pub mod tree;

pub use booster::*;
pub use tree::*;
