//! Kobe shot-outcome pipeline
//!
//! Predicts whether a Kobe Bryant shot attempt was made:
//! - Data preparation: filter the raw shot logs and split them
//! - Training: a tuned decision tree classifier and a linear regressor
//! - Batch scoring of the production log
//! - A dashboard over the resulting prediction tables
//!
//! # Modules
//!
//! - [`data`] - Loading, null filtering, stratified split
//! - [`training`] - Model fitting, tuning and cross-validation
//! - [`evaluation`] - Classification and regression metrics
//! - [`artifacts`] - Atomic persistence of models, datasets and predictions
//! - [`tracking`] - File-backed experiment tracking
//! - [`pipeline`] - The `prepare`, `train` and `apply` stages
//! - [`dashboard`] - HTTP dashboard
//! - [`cli`] - Command-line interface

pub mod error;
pub mod config;

pub mod data;
pub mod training;
pub mod evaluation;

pub mod artifacts;
pub mod tracking;

pub mod pipeline;
pub mod dashboard;
pub mod cli;

pub use error::{PipelineError, Result};

/// Prelude for common imports
pub mod prelude {
    pub use crate::artifacts::{ArtifactStore, PredictionTable};
    pub use crate::config::{DashboardConfig, PipelineConfig};
    pub use crate::data::{load_dataset, stratified_split, FilteredDataset, ShotRecord, Split};
    pub use crate::error::{PipelineError, Result};
    pub use crate::evaluation::{ClassificationMetrics, RegressionMetrics};
    pub use crate::pipeline::{run_all, run_apply, run_prepare, run_train, score};
    pub use crate::tracking::{ActiveRun, ExperimentTracker, Run, RunStatus};
    pub use crate::training::{Algorithm, TaskType, TrainedModel};
}
