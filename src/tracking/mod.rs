//! Experiment Tracking Module
//!
//! File-backed experiment tracking with an MLflow-like layout:
//! `{root}/{experiment}/{run_id}/run.json` plus an `artifacts/` directory.
//! Runs are explicit handles; logging is best-effort and never aborts a stage.

mod storage;
mod tracker;

pub use storage::{LocalStorage, StorageBackend};
pub use tracker::{ActiveRun, ExperimentTracker, Metric, Run, RunStatus};
