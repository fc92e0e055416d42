//! Task and algorithm identifiers

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;

/// Type of ML task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    Classification,
    Regression,
}

impl TaskType {
    /// Suffix used in artifact file names
    pub fn suffix(&self) -> &'static str {
        match self {
            TaskType::Classification => "clf",
            TaskType::Regression => "reg",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Supported model families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    DecisionTreeClassifier,
    LinearRegression,
    Ridge,
    Lasso,
    ElasticNet,
}

impl Algorithm {
    /// Regression candidates, in ranking tie-break order
    pub const REGRESSION_POOL: [Algorithm; 4] = [
        Algorithm::LinearRegression,
        Algorithm::Ridge,
        Algorithm::Lasso,
        Algorithm::ElasticNet,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::DecisionTreeClassifier => "DecisionTreeClassifier",
            Algorithm::LinearRegression => "LinearRegression",
            Algorithm::Ridge => "Ridge",
            Algorithm::Lasso => "Lasso",
            Algorithm::ElasticNet => "ElasticNet",
        }
    }

    pub fn task(&self) -> TaskType {
        match self {
            Algorithm::DecisionTreeClassifier => TaskType::Classification,
            _ => TaskType::Regression,
        }
    }

    /// `(penalty, l1_ratio)` of the penalized linear models
    pub fn penalty(&self) -> Option<(f64, f64)> {
        match self {
            Algorithm::Ridge => Some((1.0, 0.0)),
            Algorithm::Lasso => Some((1.0, 1.0)),
            Algorithm::ElasticNet => Some((1.0, 0.5)),
            _ => None,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Knobs shared by both trainers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainerConfig {
    pub cv_folds: usize,
    pub tune_iterations: usize,
    pub session_seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            cv_folds: 10,
            tune_iterations: 10,
            session_seed: 123,
        }
    }
}

impl From<&PipelineConfig> for TrainerConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            cv_folds: config.cv_folds,
            tune_iterations: config.tune_iterations,
            session_seed: config.session_seed,
        }
    }
}
