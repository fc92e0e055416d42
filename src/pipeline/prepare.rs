//! Data preparation stage

use tracing::info;

use crate::artifacts::ArtifactStore;
use crate::config::{PipelineConfig, BASE_TEST, BASE_TRAIN, DATA_FILTERED};
use crate::data::{load_dataset, stratified_split};
use crate::error::Result;
use crate::tracking::ExperimentTracker;

pub const RUN_NAME: &str = "PreparacaoDados";

/// Row counts written by the preparation stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrepareSummary {
    pub filtered_rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Load the raw shot logs, filter them and write the stratified split.
pub fn run_prepare(config: &PipelineConfig, tracker: &ExperimentTracker) -> Result<PrepareSummary> {
    let store = ArtifactStore::from_config(config);

    tracker.run_scoped(RUN_NAME, |run| {
        run.set_tag("stage", "data_processing");

        let inputs = config.raw_paths();
        let input_files: Vec<String> = inputs.iter().map(|p| p.display().to_string()).collect();
        run.log_param("input_files", input_files.join(","));

        let dataset = load_dataset(&inputs)?;
        let filtered_path = store.save_dataset(DATA_FILTERED, &dataset, run)?;
        run.log_param("output_file", filtered_path.display());
        run.log_param("num_rows_final", dataset.len());

        let split = stratified_split(&dataset, config.test_size, config.split_seed)?;
        store.save_dataset(BASE_TRAIN, &split.train, run)?;
        store.save_dataset(BASE_TEST, &split.test, run)?;

        run.log_param("test_size", config.test_size);
        run.log_param("split_seed", config.split_seed);
        run.log_metric("train_size", split.train.len() as f64);
        run.log_metric("test_size", split.test.len() as f64);

        info!(
            run_id = run.run_id(),
            filtered = dataset.len(),
            train = split.train.len(),
            test = split.test.len(),
            "Data preparation finished"
        );

        Ok(PrepareSummary {
            filtered_rows: dataset.len(),
            train_rows: split.train.len(),
            test_rows: split.test.len(),
        })
    })
}
