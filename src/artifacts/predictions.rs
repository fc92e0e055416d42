//! Scored prediction tables shared with the dashboard

use std::path::Path;

use polars::prelude::*;

use super::write_frame;
use crate::data::loader::{numeric_column, read_frame};
use crate::error::{PipelineError, Result};

/// Column names of the prediction table wire format
pub const PREDICTION_COLUMNS: [&str; 3] = ["real", "prediction_label", "prediction_score"];

/// One row per scored input: ground truth, predicted label and score.
///
/// For classification `prediction_score` is the positive-class probability;
/// for regression it repeats `prediction_label`.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionTable {
    pub real: Vec<f64>,
    pub prediction_label: Vec<f64>,
    pub prediction_score: Vec<f64>,
}

impl PredictionTable {
    pub fn new(real: Vec<f64>, prediction_label: Vec<f64>, prediction_score: Vec<f64>) -> Result<Self> {
        if real.len() != prediction_label.len() || real.len() != prediction_score.len() {
            return Err(PipelineError::value(format!(
                "prediction columns differ in length: real={}, prediction_label={}, prediction_score={}",
                real.len(),
                prediction_label.len(),
                prediction_score.len()
            )));
        }
        Ok(Self {
            real,
            prediction_label,
            prediction_score,
        })
    }

    pub fn len(&self) -> usize {
        self.real.len()
    }

    pub fn is_empty(&self) -> bool {
        self.real.is_empty()
    }

    /// `real - prediction_label` per row
    pub fn residuals(&self) -> Vec<f64> {
        self.real
            .iter()
            .zip(&self.prediction_label)
            .map(|(r, p)| r - p)
            .collect()
    }

    pub fn to_frame(&self) -> Result<DataFrame> {
        Ok(df!(
            "real" => &self.real,
            "prediction_label" => &self.prediction_label,
            "prediction_score" => &self.prediction_score
        )?)
    }

    /// Parse a frame, rejecting missing columns and null cells.
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let mut columns = Vec::with_capacity(3);
        for name in PREDICTION_COLUMNS {
            let values = numeric_column(df, name)?
                .into_iter()
                .collect::<Option<Vec<f64>>>()
                .ok_or_else(|| PipelineError::schema(format!("column '{}' contains nulls", name)))?;
            columns.push(values);
        }
        let prediction_score = columns.pop().unwrap_or_default();
        let prediction_label = columns.pop().unwrap_or_default();
        let real = columns.pop().unwrap_or_default();
        Self::new(real, prediction_label, prediction_score)
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let df = read_frame(path.as_ref())?;
        Self::from_frame(&df)
    }

    /// Atomically replace the parquet file at `path`
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut df = self.to_frame()?;
        write_frame(path.as_ref(), &mut df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_mismatch_rejected() {
        let err = PredictionTable::new(vec![1.0, 0.0], vec![1.0], vec![0.9, 0.1]).unwrap_err();
        assert!(matches!(err, PipelineError::Value(_)));
    }

    #[test]
    fn test_write_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predicoes_clf.parquet");
        let table = PredictionTable::new(
            vec![1.0, 0.0, 1.0, 1.0],
            vec![1.0, 0.0, 0.0, 1.0],
            vec![0.9, 0.1, 0.4, 0.8],
        )
        .unwrap();

        table.write(&path).unwrap();
        assert_eq!(PredictionTable::read(&path).unwrap(), table);
    }

    #[test]
    fn test_legacy_layout_is_schema_error() {
        // training once wrote `real` + `prediction` only
        let df = df!("real" => [1.1, 0.1], "prediction" => [1.0, 0.2]).unwrap();
        let err = PredictionTable::from_frame(&df).unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)));
    }

    #[test]
    fn test_residuals() {
        let table = PredictionTable::new(vec![1.1, 0.1], vec![1.0, 0.2], vec![1.0, 0.2]).unwrap();
        let residuals = table.residuals();
        assert!((residuals[0] - 0.1).abs() < 1e-12);
        assert!((residuals[1] + 0.1).abs() < 1e-12);
    }
}
