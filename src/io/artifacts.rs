//! Read/write the two artifacts the service loads at startup.
//!
//! - the model file: boosted trees plus the metadata needed to check that the
//!   model matches this build's feature layout
//! - `label_mappings.json`: categorical value -> code, one map per column
//!
//! Both are produced offline (`credit prepare`, `credit train`).

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::BoostParams;
use crate::error::AppError;
use crate::features::{FEATURE_NAMES, LabelMappings};
use crate::models::Booster;
use crate::report::Evaluation;

pub const MAPPINGS_FILE: &str = "label_mappings.json";

/// A saved model file (JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFile {
    pub tool: String,
    pub trained_at: DateTime<Utc>,
    /// Feature order the trees were trained on.
    pub feature_names: Vec<String>,
    pub params: BoostParams,
    pub evaluation: Option<Evaluation>,
    pub booster: Booster,
}

impl ModelFile {
    pub fn new(booster: Booster, params: BoostParams, evaluation: Option<Evaluation>) -> Self {
        Self {
            tool: "credit".to_string(),
            trained_at: Utc::now(),
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            params,
            evaluation,
            booster,
        }
    }

    /// Fail if the stored feature order differs from the one compiled in.
    pub fn check_features(&self) -> Result<(), AppError> {
        let expected: Vec<&str> = FEATURE_NAMES.to_vec();
        let actual: Vec<&str> = self.feature_names.iter().map(String::as_str).collect();
        if actual != expected {
            return Err(AppError::new(
                4,
                format!("Model feature layout {actual:?} does not match expected {expected:?}."),
            ));
        }
        Ok(())
    }
}

pub fn write_model_json(path: &Path, model: &ModelFile) -> Result<(), AppError> {
    super::ensure_parent_dir(path)?;
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create model file '{}': {e}", path.display())))?;
    serde_json::to_writer(file, model).map_err(|e| AppError::new(2, format!("Failed to write model file: {e}")))?;
    Ok(())
}

/// Read a model file and check its feature layout.
pub fn read_model_json(path: &Path) -> Result<ModelFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open model file '{}': {e}", path.display())))?;
    let model: ModelFile = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::new(2, format!("Invalid model file '{}': {e}", path.display())))?;
    model.check_features()?;
    Ok(model)
}

pub fn write_mappings_json(path: &Path, mappings: &LabelMappings) -> Result<(), AppError> {
    super::ensure_parent_dir(path)?;
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create mappings file '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, mappings)
        .map_err(|e| AppError::new(2, format!("Failed to write mappings file: {e}")))?;
    Ok(())
}

/// Read label mappings and check that every categorical column is present.
pub fn read_mappings_json(path: &Path) -> Result<LabelMappings, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open mappings file '{}': {e}", path.display())))?;
    let mappings: LabelMappings = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::new(2, format!("Invalid mappings file '{}': {e}", path.display())))?;
    mappings.validate()?;
    Ok(mappings)
}
