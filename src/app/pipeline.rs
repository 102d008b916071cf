//! The two offline workflows behind `credit prepare` and `credit train`.
//!
//! prepare: raw Kiva CSVs -> label/rebalance/enrich/encode -> processed CSV + label mappings
//! train:   processed CSV -> features -> stratified split -> boosted trees -> evaluation -> model file
//!
//! Presentation (printing) stays in `app`; these functions only compute and write artifacts.

use std::path::PathBuf;

use crate::data::{PrepareSummary, prepare_dataset};
use crate::domain::{PrepareConfig, TrainConfig};
use crate::error::AppError;
use crate::features::FeatureVector;
use crate::fit::{stratified_split, train_booster};
use crate::io::{
    MAPPINGS_FILE, ModelFile, PROCESSED_FILE, load_kiva_sources, read_processed_csv, write_mappings_json,
    write_model_json, write_processed_csv,
};
use crate::report::{Evaluation, evaluate};

/// Outputs of a `credit prepare` run.
#[derive(Debug, Clone)]
pub struct PrepareOutput {
    pub summary: PrepareSummary,
    pub processed_path: PathBuf,
    pub mappings_path: PathBuf,
}

/// Outputs of a `credit train` run.
#[derive(Debug, Clone)]
pub struct TrainOutput {
    pub evaluation: Evaluation,
    pub model_path: PathBuf,
}

pub fn run_prepare(config: &PrepareConfig) -> Result<PrepareOutput, AppError> {
    // 1) Read raw exports.
    let sources = load_kiva_sources(&config.data_dir)?;
    for err in sources.row_errors().take(5) {
        tracing::warn!(file = err.file, line = err.line, "skipped row: {}", err.message);
    }

    // 2) Label, rebalance, enrich, encode.
    let prepared = prepare_dataset(&sources, config)?;

    // 3) Persist both artifacts.
    let processed_path = config.out_dir.join(PROCESSED_FILE);
    let mappings_path = config.out_dir.join(MAPPINGS_FILE);
    write_processed_csv(&processed_path, &prepared.rows)?;
    write_mappings_json(&mappings_path, &prepared.mappings)?;
    tracing::info!(rows = prepared.rows.len(), path = %processed_path.display(), "processed dataset written");

    Ok(PrepareOutput {
        summary: prepared.summary,
        processed_path,
        mappings_path,
    })
}

pub fn run_train(config: &TrainConfig) -> Result<TrainOutput, AppError> {
    // 1) Load the processed dataset and build feature rows.
    let rows = read_processed_csv(&config.processed_csv)?;
    let features: Vec<FeatureVector> = rows.iter().map(|r| FeatureVector::from_encoded(&r.encoded())).collect();
    let labels: Vec<bool> = rows.iter().map(|r| r.is_funded()).collect();

    // 2) Stratified split.
    let split = stratified_split(&labels, config.test_fraction, config.split_seed)?;
    let train_x: Vec<FeatureVector> = split.train.iter().map(|&i| features[i]).collect();
    let train_y: Vec<bool> = split.train.iter().map(|&i| labels[i]).collect();
    let test_x: Vec<FeatureVector> = split.test.iter().map(|&i| features[i]).collect();
    let test_y: Vec<bool> = split.test.iter().map(|&i| labels[i]).collect();

    // 3) Class weighting.
    let mut params = config.params.clone();
    if config.auto_scale_pos_weight {
        params.scale_pos_weight = scale_pos_weight(&train_y)?;
    }
    tracing::info!(
        train = train_x.len(),
        test = test_x.len(),
        scale_pos_weight = params.scale_pos_weight,
        rounds = params.n_rounds,
        "training"
    );

    // 4) Fit and evaluate on the held-out rows.
    let booster = train_booster(&train_x, &train_y, &params)?;
    let probs: Vec<f64> = test_x.iter().map(|x| booster.predict_proba(x)).collect();
    let evaluation = evaluate(&test_y, &probs, train_x.len(), params.scale_pos_weight);

    // 5) Persist.
    let model = ModelFile::new(booster, params, Some(evaluation.clone()));
    write_model_json(&config.model_path, &model)?;
    tracing::info!(path = %config.model_path.display(), "model written");

    Ok(TrainOutput {
        evaluation,
        model_path: config.model_path.clone(),
    })
}

/// `negatives / positives` over the training labels.
pub fn scale_pos_weight(labels: &[bool]) -> Result<f64, AppError> {
    let pos = labels.iter().filter(|&&y| y).count();
    let neg = labels.len() - pos;
    if pos == 0 || neg == 0 {
        return Err(AppError::new(
            3,
            format!("Training split needs both classes ({pos} funded, {neg} not funded)."),
        ));
    }
    Ok(neg as f64 / pos as f64)
}
