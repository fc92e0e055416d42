//! Experiment Tracker Implementation
//!
//! Track runs, parameters, metrics and artifacts.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::storage::{LocalStorage, StorageBackend};
use crate::config::PipelineConfig;
use crate::error::Result;

/// A single logged metric value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub value: f64,
    /// Position among values logged under the same name
    pub step: u64,
    pub timestamp: DateTime<Utc>,
}

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
    /// Handle dropped without being finished
    Killed,
}

/// A run within an experiment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub run_name: String,
    pub experiment: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub params: BTreeMap<String, String>,
    /// Latest value per metric
    pub metrics: BTreeMap<String, f64>,
    pub metrics_history: Vec<Metric>,
    pub tags: BTreeMap<String, String>,
    pub artifacts: Vec<String>,
}

impl Run {
    pub fn new(experiment: impl Into<String>, run_name: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4().simple().to_string(),
            run_name: run_name.into(),
            experiment: experiment.into(),
            start_time: Utc::now(),
            end_time: None,
            status: RunStatus::Running,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            metrics_history: Vec::new(),
            tags: BTreeMap::new(),
            artifacts: Vec::new(),
        }
    }

    /// Run duration in seconds (up to now while running)
    pub fn duration_secs(&self) -> f64 {
        let end = self.end_time.unwrap_or_else(Utc::now);
        (end - self.start_time).num_milliseconds() as f64 / 1000.0
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}

/// Experiment tracker: opens runs against a storage backend
pub struct ExperimentTracker {
    experiment: String,
    storage: Box<dyn StorageBackend + Send + Sync>,
}

impl ExperimentTracker {
    /// Track `experiment` under a local directory
    pub fn new(root: impl Into<PathBuf>, experiment: impl Into<String>) -> Self {
        Self::with_storage(Box::new(LocalStorage::new(root)), experiment)
    }

    pub fn with_storage(storage: Box<dyn StorageBackend + Send + Sync>, experiment: impl Into<String>) -> Self {
        let experiment = experiment.into();
        if !storage.is_available() {
            warn!(experiment = %experiment, "Tracking storage unavailable, runs will not be persisted");
        }
        Self { experiment, storage }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.tracking_dir.clone(), config.experiment_name.clone())
    }

    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    /// Open a run; it is finalized when the handle is finished or dropped.
    pub fn start_run(&self, run_name: impl Into<String>) -> ActiveRun<'_> {
        let run = Run::new(&self.experiment, run_name);
        info!(run_id = %run.run_id, run_name = %run.run_name, experiment = %self.experiment, "Run started");
        let active = ActiveRun {
            tracker: self,
            run,
            closed: false,
        };
        active.flush();
        active
    }

    /// Execute `f` inside a run: Finished on `Ok`, Failed on `Err`.
    pub fn run_scoped<T, F>(&self, run_name: impl Into<String>, f: F) -> Result<T>
    where
        F: FnOnce(&mut ActiveRun<'_>) -> Result<T>,
    {
        let mut run = self.start_run(run_name);
        match f(&mut run) {
            Ok(value) => {
                run.finish();
                Ok(value)
            }
            Err(e) => {
                run.set_tag("error", e.to_string());
                run.fail();
                Err(e)
            }
        }
    }

    /// All persisted runs of this experiment, oldest first
    pub fn list_runs(&self) -> Result<Vec<Run>> {
        self.storage.load_runs(&self.experiment)
    }

    /// Most recent run with the given name
    pub fn latest_run(&self, run_name: &str) -> Result<Option<Run>> {
        Ok(self
            .list_runs()?
            .into_iter()
            .filter(|r| r.run_name == run_name)
            .last())
    }
}

/// Handle to an open run; every logging call is best-effort.
pub struct ActiveRun<'a> {
    tracker: &'a ExperimentTracker,
    run: Run,
    closed: bool,
}

impl<'a> ActiveRun<'a> {
    pub fn run_id(&self) -> &str {
        &self.run.run_id
    }

    pub fn run(&self) -> &Run {
        &self.run
    }

    /// Record a parameter; the first value logged under a key wins.
    pub fn log_param(&mut self, key: impl Into<String>, value: impl Display) {
        let key = key.into();
        let value = value.to_string();
        if let Some(existing) = self.run.params.get(&key) {
            if *existing != value {
                warn!(run_id = %self.run.run_id, key = %key, existing = %existing, rejected = %value, "Parameter already logged");
            }
            return;
        }
        debug!(run_id = %self.run.run_id, key = %key, value = %value, "log_param");
        self.run.params.insert(key, value);
        self.flush();
    }

    /// Append a metric value
    pub fn log_metric(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        let step = self.run.metrics_history.iter().filter(|m| m.name == name).count() as u64;
        debug!(run_id = %self.run.run_id, metric = %name, value, step, "log_metric");
        self.run.metrics.insert(name.clone(), value);
        self.run.metrics_history.push(Metric {
            name,
            value,
            step,
            timestamp: Utc::now(),
        });
        self.flush();
    }

    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.run.tags.insert(key.into(), value.into());
        self.flush();
    }

    /// Copy a file into the run's artifact store
    pub fn log_artifact(&mut self, path: &Path) {
        match self.tracker.storage.store_artifact(&self.run, path) {
            Ok(stored) => {
                self.run.artifacts.push(stored.display().to_string());
                self.flush();
            }
            Err(e) => {
                warn!(run_id = %self.run.run_id, path = %path.display(), error = %e, "Failed to log artifact");
            }
        }
    }

    pub fn finish(mut self) {
        self.close(RunStatus::Finished);
    }

    pub fn fail(mut self) {
        self.close(RunStatus::Failed);
    }

    fn close(&mut self, status: RunStatus) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.run.status = status;
        self.run.end_time = Some(Utc::now());
        info!(
            run_id = %self.run.run_id,
            run_name = %self.run.run_name,
            status = ?status,
            duration_secs = self.run.duration_secs(),
            "Run ended"
        );
        self.flush();
    }

    fn flush(&self) {
        if let Err(e) = self.tracker.storage.save_run(&self.run) {
            warn!(run_id = %self.run.run_id, error = %e, "Failed to persist run");
        }
    }
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        self.close(RunStatus::Killed);
    }
}
