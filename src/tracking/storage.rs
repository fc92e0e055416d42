//! Storage Backend for Experiment Tracking
//!
//! Provides storage backends for persisting runs.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::tracker::Run;
use crate::artifacts::write_atomic;
use crate::error::Result;

/// Storage backend trait
pub trait StorageBackend {
    /// Persist the current state of a run
    fn save_run(&self, run: &Run) -> Result<()>;

    /// Load every run of an experiment, oldest first
    fn load_runs(&self, experiment: &str) -> Result<Vec<Run>>;

    /// Copy a file into the run's artifact directory, returning the stored path
    fn store_artifact(&self, run: &Run, source: &Path) -> Result<PathBuf>;

    /// Check if storage is available
    fn is_available(&self) -> bool;
}

/// Local file system storage backend
pub struct LocalStorage {
    base_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new local storage backend
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn run_dir(&self, run: &Run) -> PathBuf {
        self.base_dir.join(&run.experiment).join(&run.run_id)
    }

    fn run_file(&self, run: &Run) -> PathBuf {
        self.run_dir(run).join("run.json")
    }
}

impl StorageBackend for LocalStorage {
    fn save_run(&self, run: &Run) -> Result<()> {
        let json = serde_json::to_vec_pretty(run)?;
        write_atomic(&self.run_file(run), |w| Ok(w.write_all(&json)?))
    }

    fn load_runs(&self, experiment: &str) -> Result<Vec<Run>> {
        let exp_dir = self.base_dir.join(experiment);
        if !exp_dir.exists() {
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        for entry in fs::read_dir(&exp_dir)? {
            let run_file = entry?.path().join("run.json");
            if run_file.is_file() {
                let json = fs::read_to_string(&run_file)?;
                runs.push(serde_json::from_str::<Run>(&json)?);
            }
        }

        runs.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.run_id.cmp(&b.run_id)));
        Ok(runs)
    }

    fn store_artifact(&self, run: &Run, source: &Path) -> Result<PathBuf> {
        let artifact_dir = self.run_dir(run).join("artifacts");
        fs::create_dir_all(&artifact_dir)?;

        let file_name = source.file_name().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("artifact path has no file name: {}", source.display()),
            )
        })?;
        let target = artifact_dir.join(file_name);
        fs::copy(source, &target)?;
        Ok(target)
    }

    fn is_available(&self) -> bool {
        fs::create_dir_all(&self.base_dir).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_storage_save_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(temp_dir.path());

        let mut run = Run::new("Default", "PreparacaoDados");
        run.params.insert("test_size".to_string(), "0.2".to_string());
        storage.save_run(&run).unwrap();

        assert!(storage.run_file(&run).exists());
        let runs = storage.load_runs("Default").unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].run_name, "PreparacaoDados");
        assert_eq!(runs[0].params.get("test_size").map(String::as_str), Some("0.2"));
    }

    #[test]
    fn test_unknown_experiment_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(temp_dir.path());
        assert!(storage.load_runs("missing").unwrap().is_empty());
        assert!(storage.is_available());
    }

    #[test]
    fn test_store_artifact_copies_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(temp_dir.path().join("mlruns"));
        let source = temp_dir.path().join("predicoes_clf.parquet");
        fs::write(&source, b"parquet bytes").unwrap();

        let run = Run::new("Default", "PipelineAplicacao");
        let stored = storage.store_artifact(&run, &source).unwrap();
        assert!(stored.ends_with("artifacts/predicoes_clf.parquet"));
        assert_eq!(fs::read(&stored).unwrap(), b"parquet bytes");
    }
}
