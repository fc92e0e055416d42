//! Model evaluation
//!
//! Plain metric functions over `f64` slices plus the metric bundles logged
//! by the training and scoring stages and shown on the dashboard.

pub mod metrics;
mod report;

pub use metrics::{accuracy, f1_score, log_loss, mae, mse, r2_score, rmse};
pub use report::{ClassScores, ClassificationReport};

use serde::Serialize;

use crate::artifacts::PredictionTable;
use crate::error::Result;

/// Held-out metrics of the classification model
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassificationMetrics {
    pub log_loss: f64,
    pub f1_score: f64,
}

impl ClassificationMetrics {
    pub fn compute(real: &[f64], label: &[f64], score: &[f64]) -> Result<Self> {
        Ok(Self {
            log_loss: log_loss(real, score)?,
            f1_score: f1_score(real, label)?,
        })
    }

    pub fn from_table(table: &PredictionTable) -> Result<Self> {
        Self::compute(&table.real, &table.prediction_label, &table.prediction_score)
    }
}

/// Error metrics of the regression model
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegressionMetrics {
    pub mae: f64,
    pub mse: f64,
    pub rmse: f64,
    pub r2: f64,
}

impl RegressionMetrics {
    pub fn compute(real: &[f64], predicted: &[f64]) -> Result<Self> {
        Ok(Self {
            mae: mae(real, predicted)?,
            mse: mse(real, predicted)?,
            rmse: rmse(real, predicted)?,
            r2: r2_score(real, predicted)?,
        })
    }

    pub fn from_table(table: &PredictionTable) -> Result<Self> {
        Self::compute(&table.real, &table.prediction_label)
    }
}
