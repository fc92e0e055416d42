//! Model training
//!
//! Two fixed workflows:
//! - Classification: a decision tree tuned by seeded random search over
//!   stratified K-fold accuracy
//! - Regression: a pinned pool of linear models ranked by K-fold R²
//!
//! Both refit the winner on the full training partition.

pub mod classifier;
mod config;
pub mod cross_validation;
mod model;
pub mod regressor;

pub use classifier::{Criterion, TreeClassifier, TreeParams};
pub use config::{Algorithm, TaskType, TrainerConfig};
pub use cross_validation::{CVResults, CVSplit, CVStrategy, CrossValidator};
pub use model::{input_columns, model_file_name, FittedModel, TrainedModel};
pub use regressor::LinearModel;

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::FilteredDataset;
use crate::error::{PipelineError, Result};

/// One row of the candidate leaderboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelComparison {
    pub model_name: String,
    pub params: BTreeMap<String, String>,
    /// Mean cross-validated score; `None` when the candidate failed
    pub cv_score: Option<f64>,
    pub cv_std: Option<f64>,
    pub error: Option<String>,
}

impl ModelComparison {
    pub fn scored(name: &str, params: BTreeMap<String, String>, results: &CVResults) -> Self {
        Self {
            model_name: name.to_string(),
            params,
            cv_score: Some(results.mean_score),
            cv_std: Some(results.std_score),
            error: None,
        }
    }

    pub fn failed(name: &str, params: BTreeMap<String, String>, error: &PipelineError) -> Self {
        Self {
            model_name: name.to_string(),
            params,
            cv_score: None,
            cv_std: None,
            error: Some(error.to_string()),
        }
    }
}

/// Refitted winner plus the leaderboard it came from
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: TrainedModel,
    pub comparison: Vec<ModelComparison>,
    /// Mean CV score of the winner (accuracy or R²)
    pub cv_score: f64,
    pub training_time_secs: f64,
}

/// Tune and fit the decision tree classifier on `train`
pub fn train_classification(train: &FilteredDataset, config: &TrainerConfig) -> Result<TrainingOutcome> {
    let start = Instant::now();
    let x = train.feature_matrix();
    let y = train.labels();

    let tuning = classifier::tune(&x, &y, config.tune_iterations, config.cv_folds, config.session_seed)?;
    let tree = TreeClassifier::fit(tuning.best, &x, &y)?;

    info!(
        params = ?tuning.best,
        cv_accuracy = tuning.best_score.mean_score,
        leaves = tree.n_leaves(),
        "Decision tree selected"
    );

    let model = TrainedModel::new(
        Algorithm::DecisionTreeClassifier,
        tuning.best.to_params(),
        FittedModel::DecisionTree(tree),
    );
    Ok(TrainingOutcome {
        model,
        comparison: tuning.candidates,
        cv_score: tuning.best_score.mean_score,
        training_time_secs: start.elapsed().as_secs_f64(),
    })
}

/// Compare the linear pool on the regression target and refit the winner
pub fn train_regression(train: &FilteredDataset, config: &TrainerConfig) -> Result<TrainingOutcome> {
    let start = Instant::now();
    let x = train.regression_matrix();
    let y = train.regression_targets();

    let comparison = regressor::compare(&x, &y, config.cv_folds, config.session_seed)?;
    let linear = LinearModel::fit(comparison.best, &x, &y)?;

    info!(
        algorithm = %comparison.best,
        cv_r2 = comparison.best_score.mean_score,
        "Regression model selected"
    );

    let model = TrainedModel::new(
        comparison.best,
        regressor::algorithm_params(comparison.best),
        FittedModel::Linear(linear),
    );
    Ok(TrainingOutcome {
        model,
        comparison: comparison.candidates,
        cv_score: comparison.best_score.mean_score,
        training_time_secs: start.elapsed().as_secs_f64(),
    })
}
