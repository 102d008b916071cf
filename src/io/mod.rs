//! Input/output helpers.
//!
//! - raw Kiva CSV ingest + validation (`ingest`)
//! - processed dataset CSV (`processed`)
//! - model and label-mapping JSON (`artifacts`)

use std::fs::create_dir_all;
use std::path::Path;

use crate::error::AppError;

pub mod artifacts;
pub mod ingest;
pub mod processed;

pub use artifacts::*;
pub use ingest::*;
pub use processed::*;

fn ensure_parent_dir(path: &Path) -> Result<(), AppError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => create_dir_all(dir)
            .map_err(|e| AppError::new(2, format!("Failed to create directory '{}': {e}", dir.display()))),
        _ => Ok(()),
    }
}
