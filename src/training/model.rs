//! Persisted model artifact

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::classifier::TreeClassifier;
use super::config::{Algorithm, TaskType};
use super::regressor::LinearModel;
use crate::artifacts::write_atomic;
use crate::data::{dataset_columns, FilteredDataset, FEATURE_COLUMNS};
use crate::error::{PipelineError, Result};

/// Fitted estimator state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FittedModel {
    DecisionTree(TreeClassifier),
    Linear(LinearModel),
}

/// A trained model together with everything needed to reuse it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub algorithm: Algorithm,
    pub task: TaskType,
    pub feature_names: Vec<String>,
    pub params: BTreeMap<String, String>,
    pub trained_at: DateTime<Utc>,
    pub model: FittedModel,
}

impl TrainedModel {
    pub fn new(algorithm: Algorithm, params: BTreeMap<String, String>, model: FittedModel) -> Self {
        let task = algorithm.task();
        Self {
            algorithm,
            task,
            feature_names: input_columns(task).iter().map(|s| s.to_string()).collect(),
            params,
            trained_at: Utc::now(),
            model,
        }
    }

    /// `{algorithm}_{clf|reg}_final.json`
    pub fn file_name(&self) -> String {
        model_file_name(self.algorithm, self.task)
    }

    fn check_width(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.feature_names.len() {
            return Err(PipelineError::model(format!(
                "{} expects {} features ({}), got {}",
                self.algorithm,
                self.feature_names.len(),
                self.feature_names.join(", "),
                x.ncols()
            )));
        }
        Ok(())
    }

    /// Class labels or regression values
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_width(x)?;
        match &self.model {
            FittedModel::DecisionTree(tree) => tree.predict(x),
            FittedModel::Linear(linear) => linear.predict(x),
        }
    }

    /// Positive-class probability; classification models only
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_width(x)?;
        match &self.model {
            FittedModel::DecisionTree(tree) => tree.predict_proba(x),
            FittedModel::Linear(_) => Err(PipelineError::model(format!(
                "{} is a regression model and has no class probabilities",
                self.algorithm
            ))),
        }
    }

    /// Input matrix this model scores `dataset` with
    pub fn design_matrix(&self, dataset: &FilteredDataset) -> Array2<f64> {
        match self.task {
            TaskType::Classification => dataset.feature_matrix(),
            TaskType::Regression => dataset.regression_matrix(),
        }
    }

    pub fn predict_dataset(&self, dataset: &FilteredDataset) -> Result<Array1<f64>> {
        self.predict(&self.design_matrix(dataset))
    }

    /// Serialize to JSON through an atomic replace
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_vec_pretty(self)?;
        write_atomic(path, |w| Ok(w.write_all(&json)?))?;
        info!(algorithm = %self.algorithm, task = %self.task, path = %path.display(), "Saved model");
        Ok(())
    }

    /// Load a saved model; unparsable content is a model error
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Io(std::io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))
        })?;
        serde_json::from_str(&json)
            .map_err(|e| PipelineError::model(format!("corrupt model file {}: {}", path.display(), e)))
    }
}

/// Input columns per task; regression also sees `shot_made_flag`
pub fn input_columns(task: TaskType) -> Vec<&'static str> {
    match task {
        TaskType::Classification => FEATURE_COLUMNS.to_vec(),
        TaskType::Regression => dataset_columns(),
    }
}

pub fn model_file_name(algorithm: Algorithm, task: TaskType) -> String {
    format!("{}_{}_final.json", algorithm.name(), task.suffix())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::classifier::TreeParams;
    use ndarray::{array, concatenate, Axis};

    fn linear_model() -> TrainedModel {
        TrainedModel::new(
            Algorithm::Ridge,
            BTreeMap::new(),
            FittedModel::Linear(LinearModel {
                intercept: 0.1,
                coefficients: vec![0.01, -0.02, 0.003, 0.04, 0.05, -0.0061, 1.0],
            }),
        )
    }

    #[test]
    fn test_file_name() {
        assert_eq!(linear_model().file_name(), "Ridge_reg_final.json");
        assert_eq!(
            model_file_name(Algorithm::DecisionTreeClassifier, TaskType::Classification),
            "DecisionTreeClassifier_clf_final.json"
        );
    }

    #[test]
    fn test_save_load_identical_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let x = array![
            [33.9, -118.2, 10.0, 1.0, 0.0, 15.0],
            [34.0, -118.3, 5.0, 2.0, 0.0, 2.0],
            [33.8, -118.4, 0.0, 4.0, 1.0, 25.0],
            [33.95, -118.25, 7.0, 3.0, 1.0, 1.0],
        ];
        let y = array![1.0, 1.0, 0.0, 0.0];
        let tree = TreeClassifier::fit(TreeParams::default(), &x, &y).unwrap();
        let model = TrainedModel::new(
            Algorithm::DecisionTreeClassifier,
            TreeParams::default().to_params(),
            FittedModel::DecisionTree(tree),
        );

        let path = dir.path().join(model.file_name());
        model.save(&path).unwrap();
        let loaded = TrainedModel::load(&path).unwrap();

        assert_eq!(loaded, model);
        assert_eq!(loaded.predict_proba(&x).unwrap(), model.predict_proba(&x).unwrap());

        let linear = linear_model();
        let x_reg = concatenate![Axis(1), x, y.clone().insert_axis(Axis(1))];
        let path = dir.path().join(linear.file_name());
        linear.save(&path).unwrap();
        assert_eq!(
            TrainedModel::load(&path).unwrap().predict(&x_reg).unwrap(),
            linear.predict(&x_reg).unwrap()
        );
    }

    #[test]
    fn test_regression_has_no_probabilities() {
        let x = Array2::zeros((1, 7));
        assert!(matches!(linear_model().predict_proba(&x), Err(PipelineError::Model(_))));
        assert!(matches!(linear_model().predict(&Array2::zeros((1, 6))), Err(PipelineError::Model(_))));
    }

    #[test]
    fn test_input_columns_per_task() {
        let linear = linear_model();
        assert_eq!(linear.feature_names.len(), 7);
        assert_eq!(linear.feature_names.last().map(String::as_str), Some("shot_made_flag"));
        assert_eq!(input_columns(TaskType::Classification).len(), 6);
    }

    #[test]
    fn test_corrupt_file_is_model_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("DecisionTreeClassifier_clf_final.json");
        std::fs::write(&path, "{\"algorithm\": ").unwrap();
        assert!(matches!(TrainedModel::load(&path), Err(PipelineError::Model(_))));
        assert!(matches!(
            TrainedModel::load(dir.path().join("missing.json")),
            Err(PipelineError::Io(_))
        ));
    }
}
