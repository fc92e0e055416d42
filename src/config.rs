//! Pipeline configuration
//!
//! Defaults mirror the fixed artifact layout (`data/raw`, `data/processed`,
//! `outputs/models`, `mlruns`). Directories can be moved with environment
//! variables; everything else through an optional JSON file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// File name of the filtered dataset
pub const DATA_FILTERED: &str = "data_filtered.parquet";
/// File name of the training partition
pub const BASE_TRAIN: &str = "base_train.parquet";
/// File name of the held-out partition
pub const BASE_TEST: &str = "base_test.parquet";
/// Classification prediction table read by the dashboard
pub const PREDICTIONS_CLF: &str = "predicoes_clf.parquet";
/// Regression prediction table read by the dashboard
pub const PREDICTIONS_REG: &str = "predicoes_reg.parquet";

/// Configuration shared by the batch stages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Development shot log
    pub dev_path: PathBuf,
    /// Production shot log
    pub prod_path: PathBuf,
    /// Directory for filtered data, splits and prediction tables
    pub processed_dir: PathBuf,
    /// Directory for serialized models
    pub models_dir: PathBuf,
    /// Root of the experiment-tracking store
    pub tracking_dir: PathBuf,
    /// Experiment all runs are filed under
    pub experiment_name: String,
    /// Held-out share for the stratified split
    pub test_size: f64,
    /// Seed for the stratified split
    pub split_seed: u64,
    /// Seed for cross-validation and hyper-parameter search
    pub session_seed: u64,
    /// Folds used to rank candidates
    pub cv_folds: usize,
    /// Random draws in the decision tree search
    pub tune_iterations: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()));
        Self {
            dev_path: data_dir.join("raw").join("dataset_kobe_dev.parquet"),
            prod_path: data_dir.join("raw").join("dataset_kobe_prod.parquet"),
            processed_dir: data_dir.join("processed"),
            models_dir: PathBuf::from(
                std::env::var("MODELS_DIR").unwrap_or_else(|_| "outputs/models".to_string()),
            ),
            tracking_dir: PathBuf::from(
                std::env::var("MLRUNS_DIR").unwrap_or_else(|_| "mlruns".to_string()),
            ),
            experiment_name: std::env::var("EXPERIMENT_NAME").unwrap_or_else(|_| "Default".to_string()),
            test_size: 0.2,
            split_seed: 42,
            session_seed: 123,
            cv_folds: 10,
            tune_iterations: 10,
        }
    }
}

impl PipelineConfig {
    /// Load a JSON config file; absent keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| PipelineError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Root every relative directory under `base`
    pub fn rooted_at(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        let data_dir = base.join("data");
        Self {
            dev_path: data_dir.join("raw").join("dataset_kobe_dev.parquet"),
            prod_path: data_dir.join("raw").join("dataset_kobe_prod.parquet"),
            processed_dir: data_dir.join("processed"),
            models_dir: base.join("outputs").join("models"),
            tracking_dir: base.join("mlruns"),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(PipelineError::Config(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if self.cv_folds < 2 {
            return Err(PipelineError::Config(format!(
                "cv_folds must be at least 2, got {}",
                self.cv_folds
            )));
        }
        Ok(())
    }

    pub fn raw_paths(&self) -> Vec<PathBuf> {
        vec![self.dev_path.clone(), self.prod_path.clone()]
    }

    pub fn data_filtered_path(&self) -> PathBuf {
        self.processed_dir.join(DATA_FILTERED)
    }

    pub fn train_path(&self) -> PathBuf {
        self.processed_dir.join(BASE_TRAIN)
    }

    pub fn test_path(&self) -> PathBuf {
        self.processed_dir.join(BASE_TEST)
    }
}

/// Dashboard server configuration
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub host: String,
    pub port: u16,
    pub processed_dir: PathBuf,
    pub models_dir: PathBuf,
    /// Rows shown in each prediction table preview
    pub preview_rows: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        let pipeline = PipelineConfig::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8501),
            processed_dir: pipeline.processed_dir,
            models_dir: pipeline.models_dir,
            preview_rows: 100,
        }
    }
}

impl DashboardConfig {
    pub fn from_pipeline(config: &PipelineConfig) -> Self {
        Self {
            processed_dir: config.processed_dir.clone(),
            models_dir: config.models_dir.clone(),
            ..Self::default()
        }
    }

    pub fn classification_predictions(&self) -> PathBuf {
        self.processed_dir.join(PREDICTIONS_CLF)
    }

    pub fn regression_predictions(&self) -> PathBuf {
        self.processed_dir.join(PREDICTIONS_REG)
    }
}
