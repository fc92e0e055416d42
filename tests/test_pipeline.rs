//! Integration test: prepare → train → apply on synthetic shot logs

use std::fs::File;
use std::path::Path;

use kobe_pipeline::artifacts::ArtifactStore;
use kobe_pipeline::config::{PipelineConfig, BASE_TEST, BASE_TRAIN, DATA_FILTERED};
use kobe_pipeline::data::FilteredDataset;
use kobe_pipeline::evaluation::ClassificationMetrics;
use kobe_pipeline::pipeline::{run_all, run_apply, run_prepare, score};
use kobe_pipeline::tracking::{ExperimentTracker, RunStatus};
use kobe_pipeline::training::{TaskType, TrainedModel};
use kobe_pipeline::PipelineError;
use polars::prelude::*;
use tempfile::TempDir;

/// Shot log where short shots are mostly made; every 23rd row lacks a label
fn write_shot_log(path: &Path, n: usize, offset: usize) {
    let mut lat = Vec::with_capacity(n);
    let mut lon = Vec::with_capacity(n);
    let mut minutes = Vec::with_capacity(n);
    let mut period = Vec::with_capacity(n);
    let mut playoffs = Vec::with_capacity(n);
    let mut distance = Vec::with_capacity(n);
    let mut made = Vec::with_capacity(n);

    for k in 0..n {
        let i = k + offset;
        let d = ((i * 7) % 30) as i64;
        lat.push(33.9 + (i % 17) as f64 * 0.01);
        lon.push(-118.3 + (i % 13) as f64 * 0.01);
        minutes.push((i % 12) as i64);
        period.push((i % 4 + 1) as i64);
        playoffs.push((i % 5 == 0) as i64);
        distance.push(d);
        let flag = if (d < 12) != (i % 9 == 0) { 1.0 } else { 0.0 };
        made.push(if i % 23 == 5 { None } else { Some(flag) });
    }

    let mut df = df!(
        "action_type" => vec!["Jump Shot"; n],
        "lat" => lat,
        "lon" => lon,
        "minutes_remaining" => minutes,
        "period" => period,
        "playoffs" => playoffs,
        "shot_distance" => distance,
        "shot_made_flag" => made
    )
    .unwrap();

    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let file = File::create(path).unwrap();
    ParquetWriter::new(file).finish(&mut df).unwrap();
}

fn setup() -> (TempDir, PipelineConfig) {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig {
        cv_folds: 3,
        tune_iterations: 3,
        experiment_name: "Default".to_string(),
        ..PipelineConfig::rooted_at(dir.path())
    };
    write_shot_log(&config.dev_path, 240, 0);
    write_shot_log(&config.prod_path, 90, 1000);
    (dir, config)
}

fn labelled_rows(n: usize, offset: usize) -> usize {
    (0..n).filter(|k| (k + offset) % 23 != 5).count()
}

#[test]
fn test_full_pipeline_writes_every_artifact() {
    let (_dir, config) = setup();
    let summary = run_all(&config).unwrap();

    let expected = labelled_rows(240, 0) + labelled_rows(90, 1000);
    assert_eq!(summary.prepare.filtered_rows, expected);
    assert_eq!(summary.prepare.train_rows + summary.prepare.test_rows, expected);
    assert_eq!(summary.apply.rows, labelled_rows(90, 1000));

    for file in [DATA_FILTERED, BASE_TRAIN, BASE_TEST, "predicoes_clf.parquet", "predicoes_reg.parquet"] {
        assert!(config.processed_dir.join(file).is_file(), "missing {}", file);
    }
    assert!(config
        .models_dir
        .join("DecisionTreeClassifier_clf_final.json")
        .is_file());
    let reg_model = config.models_dir.join(format!(
        "{}_reg_final.json",
        summary.train.regression_algorithm.name()
    ));
    assert!(reg_model.is_file());

    let c = summary.apply.classification;
    assert!(c.log_loss.is_finite() && c.log_loss >= 0.0);
    assert!((0.0..=1.0).contains(&c.f1_score));
    assert!(summary.apply.regression.rmse >= 0.0);
}

#[test]
fn test_runs_are_tracked() {
    let (_dir, config) = setup();
    run_all(&config).unwrap();

    let tracker = ExperimentTracker::from_config(&config);
    let runs = tracker.list_runs().unwrap();
    let names: Vec<&str> = runs.iter().map(|r| r.run_name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "PreparacaoDados",
            "Treinamento_ArvoreDecisao_Clf",
            "Treinamento_Regressao",
            "PipelineAplicacao"
        ]
    );
    assert!(runs.iter().all(|r| r.status == RunStatus::Finished));

    let prepare = &runs[0];
    assert_eq!(prepare.tags.get("stage").map(String::as_str), Some("data_processing"));
    assert_eq!(prepare.params.get("test_size").map(String::as_str), Some("0.2"));
    assert!(prepare.params.contains_key("num_rows_final"));
    assert!(prepare.metric("train_size").is_some());
    assert_eq!(prepare.artifacts.len(), 3);

    let clf = &runs[1];
    assert!(clf.metric("log_loss").is_some());
    assert!(clf.metric("f1_score").is_some());
    // baseline plus three random draws
    assert_eq!(
        clf.metrics_history.iter().filter(|m| m.name == "cv_accuracy").count(),
        4
    );

    let reg = &runs[2];
    let best = reg.params.get("best_model").unwrap();
    assert!(reg.metric(&format!("rmse_{}", best)).is_some());
    assert!(reg.metric(&format!("r2_{}", best)).is_some());

    let apply = &runs[3];
    for metric in ["log_loss_producao", "f1_score_producao", "rmse_producao", "r2_score_producao"] {
        assert!(apply.metric(metric).is_some(), "missing {}", metric);
    }
    assert_eq!(apply.artifacts.len(), 2);
}

#[test]
fn test_rescoring_test_split_reproduces_training_metrics() {
    let (_dir, config) = setup();
    run_all(&config).unwrap();

    let store = ArtifactStore::from_config(&config);
    let model = store.latest_model(TaskType::Classification).unwrap();
    let test = store.load_dataset(BASE_TEST).unwrap();
    let metrics = ClassificationMetrics::from_table(&score(&model, &test).unwrap()).unwrap();

    let tracker = ExperimentTracker::from_config(&config);
    let run = tracker
        .latest_run("Treinamento_ArvoreDecisao_Clf")
        .unwrap()
        .unwrap();
    assert!((run.metric("log_loss").unwrap() - metrics.log_loss).abs() < 1e-12);
    assert!((run.metric("f1_score").unwrap() - metrics.f1_score).abs() < 1e-12);
}

#[test]
fn test_saved_models_round_trip() {
    let (dir, config) = setup();
    run_all(&config).unwrap();

    let store = ArtifactStore::from_config(&config);
    let test = store.load_dataset(BASE_TEST).unwrap();
    for task in [TaskType::Classification, TaskType::Regression] {
        let model = store.latest_model(task).unwrap();
        let inputs = match task {
            TaskType::Classification => 6,
            TaskType::Regression => 7,
        };
        assert_eq!(model.feature_names.len(), inputs);
        let copy = dir.path().join(format!("copy_{}.json", task));
        model.save(&copy).unwrap();
        let reloaded = TrainedModel::load(&copy).unwrap();
        assert_eq!(
            reloaded.predict_dataset(&test).unwrap(),
            model.predict_dataset(&test).unwrap()
        );
    }
}

#[test]
fn test_prepare_is_deterministic() {
    let (_dir, config) = setup();
    let tracker = ExperimentTracker::from_config(&config);

    run_prepare(&config, &tracker).unwrap();
    let first = FilteredDataset::read(config.train_path()).unwrap();
    run_prepare(&config, &tracker).unwrap();
    let second = FilteredDataset::read(config.train_path()).unwrap();

    assert_eq!(first, second);
    let test = FilteredDataset::read(config.test_path()).unwrap();
    let filtered = FilteredDataset::read(config.data_filtered_path()).unwrap();
    assert_eq!(first.len() + test.len(), filtered.len());
    assert!(filtered.iter().all(|r| r.features().iter().all(|v| !v.is_nan())));
}

#[test]
fn test_apply_without_models_fails_run() {
    let (_dir, config) = setup();
    let tracker = ExperimentTracker::from_config(&config);

    let err = run_apply(&config, &tracker).unwrap_err();
    assert!(matches!(err, PipelineError::Io(_)));

    let run = tracker.latest_run("PipelineAplicacao").unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
}

#[test]
fn test_missing_raw_file_is_io_error() {
    let (_dir, config) = setup();
    std::fs::remove_file(&config.prod_path).unwrap();
    let tracker = ExperimentTracker::from_config(&config);
    assert!(matches!(run_prepare(&config, &tracker), Err(PipelineError::Io(_))));
}
