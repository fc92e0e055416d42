//! Training stage: classification and regression runs

use tracing::info;

use super::apply::score;
use crate::artifacts::ArtifactStore;
use crate::config::{PipelineConfig, BASE_TEST, BASE_TRAIN};
use crate::error::Result;
use crate::evaluation::{ClassificationMetrics, RegressionMetrics};
use crate::tracking::{ActiveRun, ExperimentTracker};
use crate::training::{
    train_classification, train_regression, Algorithm, ModelComparison, TaskType, TrainerConfig,
};

pub const CLASSIFICATION_RUN: &str = "Treinamento_ArvoreDecisao_Clf";
pub const REGRESSION_RUN: &str = "Treinamento_Regressao";

/// Held-out results of both trained models
#[derive(Debug, Clone, PartialEq)]
pub struct TrainSummary {
    pub classification: ClassificationMetrics,
    pub regression_algorithm: Algorithm,
    pub regression: RegressionMetrics,
}

fn log_leaderboard(run: &mut ActiveRun<'_>, metric: &str, comparison: &[ModelComparison]) {
    for (rank, entry) in comparison.iter().enumerate() {
        match (entry.cv_score, &entry.error) {
            (Some(score), _) => {
                info!(rank, model = %entry.model_name, params = ?entry.params, score, "Candidate");
                run.log_metric(metric, score);
            }
            (None, Some(error)) => {
                info!(rank, model = %entry.model_name, error = %error, "Candidate failed");
                run.log_param(format!("failed_{}", entry.model_name), error);
            }
            (None, None) => {}
        }
    }
}

/// Train both models on `base_train` and evaluate them on `base_test`.
pub fn run_train(config: &PipelineConfig, tracker: &ExperimentTracker) -> Result<TrainSummary> {
    let store = ArtifactStore::from_config(config);
    let trainer = TrainerConfig::from(config);
    let train = store.load_dataset(BASE_TRAIN)?;
    let test = store.load_dataset(BASE_TEST)?;
    info!(train = train.len(), test = test.len(), "Loaded training partitions");

    let classification = tracker.run_scoped(CLASSIFICATION_RUN, |run| {
        run.log_param("cv_folds", trainer.cv_folds);
        run.log_param("n_iter", trainer.tune_iterations);
        run.log_param("session_seed", trainer.session_seed);

        let outcome = train_classification(&train, &trainer)?;
        log_leaderboard(run, "cv_accuracy", &outcome.comparison);
        for (key, value) in &outcome.model.params {
            run.log_param(key.as_str(), value);
        }
        run.log_metric("cv_accuracy_best", outcome.cv_score);

        let table = score(&outcome.model, &test)?;
        let metrics = ClassificationMetrics::from_table(&table)?;
        run.log_metric("log_loss", metrics.log_loss);
        run.log_metric("f1_score", metrics.f1_score);

        store.save_model(&outcome.model, run)?;
        store.save_predictions(TaskType::Classification, &table, run)?;

        info!(
            run_id = run.run_id(),
            log_loss = metrics.log_loss,
            f1 = metrics.f1_score,
            secs = outcome.training_time_secs,
            "Classification training finished"
        );
        Ok(metrics)
    })?;

    let (regression_algorithm, regression) = tracker.run_scoped(REGRESSION_RUN, |run| {
        run.log_param("cv_folds", trainer.cv_folds);
        run.log_param("session_seed", trainer.session_seed);
        run.log_param("target", "shot_made_flag + 0.1");

        let outcome = train_regression(&train, &trainer)?;
        log_leaderboard(run, "cv_r2", &outcome.comparison);
        let name = outcome.model.algorithm.name();
        run.log_param("best_model", name);
        for (key, value) in &outcome.model.params {
            run.log_param(key.as_str(), value);
        }

        let table = score(&outcome.model, &test)?;
        let metrics = RegressionMetrics::from_table(&table)?;
        run.log_metric(format!("rmse_{}", name), metrics.rmse);
        run.log_metric(format!("r2_{}", name), metrics.r2);

        store.save_model(&outcome.model, run)?;
        store.save_predictions(TaskType::Regression, &table, run)?;

        info!(
            run_id = run.run_id(),
            algorithm = name,
            rmse = metrics.rmse,
            r2 = metrics.r2,
            secs = outcome.training_time_secs,
            "Regression training finished"
        );
        Ok((outcome.model.algorithm, metrics))
    })?;

    Ok(TrainSummary {
        classification,
        regression_algorithm,
        regression,
    })
}
