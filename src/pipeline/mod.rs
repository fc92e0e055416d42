//! Batch stages
//!
//! `prepare` → `train` → `apply`. Each stage reads its inputs from the
//! artifact layout, runs inside its own tracked run and can be executed on
//! its own.

pub mod apply;
pub mod prepare;
pub mod train;

pub use apply::{run_apply, score, ApplySummary};
pub use prepare::{run_prepare, PrepareSummary};
pub use train::{run_train, TrainSummary};

use tracing::info;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::tracking::ExperimentTracker;

/// Results of a full pipeline execution
#[derive(Debug, Clone)]
pub struct PipelineSummary {
    pub prepare: PrepareSummary,
    pub train: TrainSummary,
    pub apply: ApplySummary,
}

/// Run every batch stage in order, stopping at the first failure.
pub fn run_all(config: &PipelineConfig) -> Result<PipelineSummary> {
    config.validate()?;
    let tracker = ExperimentTracker::from_config(config);
    info!(experiment = %tracker.experiment(), "Starting pipeline");

    let prepare = run_prepare(config, &tracker)?;
    let train = run_train(config, &tracker)?;
    let apply = run_apply(config, &tracker)?;

    Ok(PipelineSummary {
        prepare,
        train,
        apply,
    })
}
