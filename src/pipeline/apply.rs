//! Batch scoring of the production shot log

use tracing::info;

use crate::artifacts::{ArtifactStore, PredictionTable};
use crate::config::PipelineConfig;
use crate::data::{load_dataset, FilteredDataset};
use crate::error::Result;
use crate::evaluation::{ClassificationMetrics, RegressionMetrics};
use crate::tracking::ExperimentTracker;
use crate::training::{TaskType, TrainedModel};

pub const RUN_NAME: &str = "PipelineAplicacao";

/// Score `dataset` with `model` into the shared prediction layout.
///
/// Classification rows carry the true label and the positive-class
/// probability. Regression rows carry the synthetic target as `real` and
/// repeat the prediction in `prediction_score`.
pub fn score(model: &TrainedModel, dataset: &FilteredDataset) -> Result<PredictionTable> {
    let x = model.design_matrix(dataset);
    let label = model.predict(&x)?.to_vec();

    match model.task {
        TaskType::Classification => {
            let proba = model.predict_proba(&x)?.to_vec();
            PredictionTable::new(dataset.labels().to_vec(), label, proba)
        }
        TaskType::Regression => {
            let score = label.clone();
            PredictionTable::new(dataset.regression_targets().to_vec(), label, score)
        }
    }
}

/// Metrics recomputed on the production data
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApplySummary {
    pub rows: usize,
    pub classification: ClassificationMetrics,
    pub regression: RegressionMetrics,
}

/// Score the production dataset with the latest models and write both tables.
pub fn run_apply(config: &PipelineConfig, tracker: &ExperimentTracker) -> Result<ApplySummary> {
    let store = ArtifactStore::from_config(config);

    tracker.run_scoped(RUN_NAME, |run| {
        let dataset = load_dataset(&[&config.prod_path])?;
        run.log_param("input_file", config.prod_path.display());
        run.log_param("num_rows", dataset.len());

        let classifier = store.latest_model(TaskType::Classification)?;
        let regressor = store.latest_model(TaskType::Regression)?;
        run.log_param("model_clf", classifier.algorithm);
        run.log_param("model_reg", regressor.algorithm);

        let clf_table = score(&classifier, &dataset)?;
        let classification = ClassificationMetrics::from_table(&clf_table)?;
        run.log_metric("log_loss_producao", classification.log_loss);
        run.log_metric("f1_score_producao", classification.f1_score);
        store.save_predictions(TaskType::Classification, &clf_table, run)?;

        let reg_table = score(&regressor, &dataset)?;
        let regression = RegressionMetrics::from_table(&reg_table)?;
        run.log_metric("rmse_producao", regression.rmse);
        run.log_metric("r2_score_producao", regression.r2);
        store.save_predictions(TaskType::Regression, &reg_table, run)?;

        info!(
            run_id = run.run_id(),
            rows = dataset.len(),
            log_loss = classification.log_loss,
            f1 = classification.f1_score,
            rmse = regression.rmse,
            r2 = regression.r2,
            "Production scoring finished"
        );

        Ok(ApplySummary {
            rows: dataset.len(),
            classification,
            regression,
        })
    })
}
