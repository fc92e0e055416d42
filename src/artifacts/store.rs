//! Fixed on-disk layout for models, datasets and prediction tables

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, info};

use super::PredictionTable;
use crate::config::{PipelineConfig, PREDICTIONS_CLF, PREDICTIONS_REG};
use crate::data::FilteredDataset;
use crate::error::{PipelineError, Result};
use crate::tracking::ActiveRun;
use crate::training::{model_file_name, Algorithm, TaskType, TrainedModel};

/// Reads and writes pipeline artifacts; every write is atomic and recorded on a run.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    processed_dir: PathBuf,
    models_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(processed_dir: impl Into<PathBuf>, models_dir: impl Into<PathBuf>) -> Self {
        Self {
            processed_dir: processed_dir.into(),
            models_dir: models_dir.into(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.processed_dir.clone(), config.models_dir.clone())
    }

    pub fn processed_dir(&self) -> &Path {
        &self.processed_dir
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn model_path(&self, algorithm: Algorithm, task: TaskType) -> PathBuf {
        self.models_dir.join(model_file_name(algorithm, task))
    }

    pub fn predictions_path(&self, task: TaskType) -> PathBuf {
        self.processed_dir.join(match task {
            TaskType::Classification => PREDICTIONS_CLF,
            TaskType::Regression => PREDICTIONS_REG,
        })
    }

    pub fn dataset_path(&self, file_name: &str) -> PathBuf {
        self.processed_dir.join(file_name)
    }

    /// Persist a model and attach it to `run`
    pub fn save_model(&self, model: &TrainedModel, run: &mut ActiveRun<'_>) -> Result<PathBuf> {
        let path = self.model_path(model.algorithm, model.task);
        model.save(&path)?;
        run.log_artifact(&path);
        run.log_param(format!("model_path_{}", model.task.suffix()), path.display());
        Ok(path)
    }

    /// Most recently written `*_{task}_final.json`
    pub fn latest_model(&self, task: TaskType) -> Result<TrainedModel> {
        let suffix = format!("_{}_final.json", task.suffix());
        let mut newest: Option<(SystemTime, PathBuf)> = None;

        let entries = std::fs::read_dir(&self.models_dir).map_err(|e| {
            PipelineError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", self.models_dir.display(), e),
            ))
        })?;
        for entry in entries {
            let path = entry?.path();
            let matches = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(&suffix) && !n.starts_with('.'));
            if !matches {
                continue;
            }
            let modified = std::fs::metadata(&path)?.modified()?;
            if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
                newest = Some((modified, path));
            }
        }

        let (_, path) = newest.ok_or_else(|| {
            PipelineError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no *{} model in {}", suffix, self.models_dir.display()),
            ))
        })?;
        debug!(path = %path.display(), "Resolved latest model");
        TrainedModel::load(path)
    }

    /// Persist a prediction table and attach it to `run`
    pub fn save_predictions(&self, task: TaskType, table: &PredictionTable, run: &mut ActiveRun<'_>) -> Result<PathBuf> {
        let path = self.predictions_path(task);
        table.write(&path)?;
        info!(task = %task, rows = table.len(), path = %path.display(), "Saved predictions");
        run.log_artifact(&path);
        run.log_param(format!("predictions_{}", task.suffix()), path.display());
        Ok(path)
    }

    pub fn load_predictions(&self, task: TaskType) -> Result<PredictionTable> {
        PredictionTable::read(self.predictions_path(task))
    }

    /// Persist an intermediate dataset and attach it to `run`
    pub fn save_dataset(&self, file_name: &str, dataset: &FilteredDataset, run: &mut ActiveRun<'_>) -> Result<PathBuf> {
        let path = self.dataset_path(file_name);
        dataset.write(&path)?;
        info!(rows = dataset.len(), path = %path.display(), "Saved dataset");
        run.log_artifact(&path);
        Ok(path)
    }

    pub fn load_dataset(&self, file_name: &str) -> Result<FilteredDataset> {
        FilteredDataset::read(self.dataset_path(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::ExperimentTracker;
    use crate::training::{FittedModel, LinearModel};
    use std::collections::BTreeMap;

    fn linear(algorithm: Algorithm, intercept: f64) -> TrainedModel {
        TrainedModel::new(
            algorithm,
            BTreeMap::new(),
            FittedModel::Linear(LinearModel {
                intercept,
                coefficients: vec![0.0; 7],
            }),
        )
    }

    #[test]
    fn test_layout() {
        let store = ArtifactStore::new("data/processed", "outputs/models");
        assert_eq!(
            store.model_path(Algorithm::DecisionTreeClassifier, TaskType::Classification),
            PathBuf::from("outputs/models/DecisionTreeClassifier_clf_final.json")
        );
        assert_eq!(
            store.predictions_path(TaskType::Regression),
            PathBuf::from("data/processed/predicoes_reg.parquet")
        );
    }

    #[test]
    fn test_save_model_logs_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("processed"), dir.path().join("models"));
        let tracker = ExperimentTracker::new(dir.path().join("mlruns"), "Default");

        tracker
            .run_scoped("Treinamento_Regressao", |run| {
                store.save_model(&linear(Algorithm::Lasso, 0.6), run)?;
                Ok(())
            })
            .unwrap();

        let run = tracker.latest_run("Treinamento_Regressao").unwrap().unwrap();
        assert_eq!(run.artifacts.len(), 1);
        assert!(run.artifacts[0].ends_with("Lasso_reg_final.json"));
        assert!(run.params.contains_key("model_path_reg"));
    }

    #[test]
    fn test_latest_model_picks_newest() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("processed"), dir.path().join("models"));

        let old = linear(Algorithm::Ridge, 0.1);
        old.save(store.model_path(old.algorithm, old.task)).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(50));
        let new = linear(Algorithm::LinearRegression, 0.2);
        new.save(store.model_path(new.algorithm, new.task)).unwrap();

        let latest = store.latest_model(TaskType::Regression).unwrap();
        assert_eq!(latest.algorithm, Algorithm::LinearRegression);
        assert!(store.latest_model(TaskType::Classification).is_err());
    }

    #[test]
    fn test_missing_models_dir_is_io_error() {
        let store = ArtifactStore::new("/nonexistent/processed", "/nonexistent/models");
        assert!(matches!(store.latest_model(TaskType::Regression), Err(PipelineError::Io(_))));
    }
}
