//! Dataset loading and projection

use std::fs::File;
use std::path::Path;

use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{regression_target, FEATURE_COLUMNS, LABEL_COLUMN};
use crate::artifacts::write_frame;
use crate::error::{PipelineError, Result};

/// One shot attempt with every retained column present
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShotRecord {
    pub lat: f64,
    pub lon: f64,
    pub minutes_remaining: f64,
    pub period: f64,
    pub playoffs: f64,
    pub shot_distance: f64,
    pub shot_made_flag: f64,
}

impl ShotRecord {
    /// Feature vector in [`FEATURE_COLUMNS`] order
    pub fn features(&self) -> [f64; 6] {
        [
            self.lat,
            self.lon,
            self.minutes_remaining,
            self.period,
            self.playoffs,
            self.shot_distance,
        ]
    }

    /// Regression inputs: the features followed by the label
    pub fn regression_inputs(&self) -> [f64; 7] {
        let [lat, lon, minutes, period, playoffs, distance] = self.features();
        [lat, lon, minutes, period, playoffs, distance, self.shot_made_flag]
    }

    pub fn label(&self) -> f64 {
        self.shot_made_flag
    }

    pub fn regression_target(&self) -> f64 {
        regression_target(self.shot_made_flag)
    }

    fn from_row(values: [Option<f64>; 7]) -> Option<Self> {
        Some(Self {
            lat: values[0]?,
            lon: values[1]?,
            minutes_remaining: values[2]?,
            period: values[3]?,
            playoffs: values[4]?,
            shot_distance: values[5]?,
            shot_made_flag: values[6]?,
        })
    }
}

/// Ordered shot records with no missing value in any retained column
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilteredDataset {
    records: Vec<ShotRecord>,
}

impl FilteredDataset {
    pub fn from_records(records: Vec<ShotRecord>) -> Self {
        Self { records }
    }

    /// Project a frame to the seven retained columns and drop incomplete rows.
    ///
    /// Integer and boolean columns are widened to `f64`; NaN counts as missing.
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let mut columns = Vec::with_capacity(7);
        for name in FEATURE_COLUMNS.iter().copied().chain(std::iter::once(LABEL_COLUMN)) {
            columns.push(numeric_column(df, name)?);
        }

        let records = (0..df.height())
            .filter_map(|i| {
                let mut row = [None; 7];
                for (slot, column) in row.iter_mut().zip(&columns) {
                    *slot = column[i].filter(|v| !v.is_nan());
                }
                ShotRecord::from_row(row)
            })
            .collect();

        Ok(Self { records })
    }

    pub fn to_frame(&self) -> Result<DataFrame> {
        let column = |f: fn(&ShotRecord) -> f64| self.records.iter().map(f).collect::<Vec<f64>>();
        let df = df!(
            "lat" => column(|r| r.lat),
            "lon" => column(|r| r.lon),
            "minutes_remaining" => column(|r| r.minutes_remaining),
            "period" => column(|r| r.period),
            "playoffs" => column(|r| r.playoffs),
            "shot_distance" => column(|r| r.shot_distance),
            "shot_made_flag" => column(|r| r.shot_made_flag)
        )?;
        Ok(df)
    }

    /// Read a persisted dataset artifact
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let df = read_frame(path.as_ref())?;
        Self::from_frame(&df)
    }

    /// Persist as parquet through an atomic replace
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut df = self.to_frame()?;
        write_frame(path.as_ref(), &mut df)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ShotRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShotRecord> {
        self.records.iter()
    }

    /// Rows at `indices`, in the given order
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            records: indices.iter().map(|&i| self.records[i]).collect(),
        }
    }

    /// Feature matrix (n_rows × 6)
    pub fn feature_matrix(&self) -> Array2<f64> {
        let flat: Vec<f64> = self.records.iter().flat_map(|r| r.features()).collect();
        Array2::from_shape_vec((self.records.len(), FEATURE_COLUMNS.len()), flat)
            .unwrap_or_else(|_| Array2::zeros((0, FEATURE_COLUMNS.len())))
    }

    /// Regression design matrix (n_rows × 7), label as the last column
    pub fn regression_matrix(&self) -> Array2<f64> {
        let flat: Vec<f64> = self.records.iter().flat_map(|r| r.regression_inputs()).collect();
        Array2::from_shape_vec((self.records.len(), FEATURE_COLUMNS.len() + 1), flat)
            .unwrap_or_else(|_| Array2::zeros((0, FEATURE_COLUMNS.len() + 1)))
    }

    pub fn labels(&self) -> Array1<f64> {
        self.records.iter().map(|r| r.label()).collect()
    }

    pub fn regression_targets(&self) -> Array1<f64> {
        self.records.iter().map(|r| r.regression_target()).collect()
    }
}

impl Extend<ShotRecord> for FilteredDataset {
    fn extend<T: IntoIterator<Item = ShotRecord>>(&mut self, iter: T) {
        self.records.extend(iter);
    }
}

/// Load and concatenate shot logs in input order, keeping complete rows only.
pub fn load_dataset<P: AsRef<Path>>(paths: &[P]) -> Result<FilteredDataset> {
    let mut dataset = FilteredDataset::default();

    for path in paths {
        let path = path.as_ref();
        let df = read_frame(path)?;
        let part = FilteredDataset::from_frame(&df)?;
        debug!(
            path = %path.display(),
            rows_read = df.height(),
            rows_kept = part.len(),
            "Loaded shot log"
        );
        dataset.extend(part.records);
    }

    info!(files = paths.len(), rows = dataset.len(), "Filtered dataset ready");
    Ok(dataset)
}

/// Read a parquet file; unreadable or corrupt files are IO errors.
pub(crate) fn read_frame(path: &Path) -> Result<DataFrame> {
    let file = File::open(path).map_err(|e| {
        PipelineError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })?;

    ParquetReader::new(file).finish().map_err(|e| {
        PipelineError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{}: {}", path.display(), e),
        ))
    })
}

/// Extract a column as `f64`, failing with a schema error when absent.
pub(crate) fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| PipelineError::schema(format!("required column '{}' is missing", name)))?;

    let series = column
        .as_materialized_series()
        .cast(&DataType::Float64)
        .map_err(|e| PipelineError::schema(format!("column '{}' is not numeric: {}", name, e)))?;

    let values = series
        .f64()
        .map_err(|e| PipelineError::schema(format!("column '{}' is not numeric: {}", name, e)))?;

    Ok(values.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_frame() -> DataFrame {
        df!(
            "lat" => [Some(33.9), Some(34.0), None, Some(33.8)],
            "lon" => [Some(-118.2), Some(-118.3), Some(-118.1), Some(-118.4)],
            "minutes_remaining" => [10i64, 5, 3, 0],
            "period" => [1i64, 2, 3, 4],
            "playoffs" => [0i64, 0, 1, 1],
            "shot_distance" => [15i64, 2, 20, 25],
            "shot_made_flag" => [Some(1.0), None, Some(0.0), Some(0.0)],
            "action_type" => ["Jump Shot", "Layup", "Jump Shot", "Dunk"]
        )
        .unwrap()
    }

    #[test]
    fn test_from_frame_drops_incomplete_rows() {
        let dataset = FilteredDataset::from_frame(&raw_frame()).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.records()[0].shot_distance, 15.0);
        assert_eq!(dataset.records()[1].period, 4.0);
    }

    #[test]
    fn test_regression_matrix_appends_label() {
        let dataset = FilteredDataset::from_frame(&raw_frame()).unwrap();
        let x = dataset.regression_matrix();
        assert_eq!(x.dim(), (2, 7));
        assert_eq!(x.row(0).to_vec(), vec![33.9, -118.2, 10.0, 1.0, 0.0, 15.0, 1.0]);
        assert_eq!(x[[1, 6]], 0.0);
        assert_eq!(dataset.feature_matrix().ncols(), 6);
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let df = raw_frame().drop("playoffs").unwrap();
        let err = FilteredDataset::from_frame(&df).unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)), "got {:?}", err);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_dataset(&["/nonexistent/dataset_kobe_dev.parquet"]).unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
    }

    #[test]
    fn test_load_concatenates_in_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.parquet");
        let second = dir.path().join("second.parquet");

        let mut df = raw_frame();
        write_frame(&first, &mut df).unwrap();
        let mut df = raw_frame().tail(Some(1));
        write_frame(&second, &mut df).unwrap();

        let dataset = load_dataset(&[&first, &second]).unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.records()[2].shot_distance, 25.0);
    }

    #[test]
    fn test_round_trip_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data_filtered.parquet");
        let dataset = FilteredDataset::from_frame(&raw_frame()).unwrap();

        dataset.write(&path).unwrap();
        let reloaded = FilteredDataset::read(&path).unwrap();
        assert_eq!(reloaded, dataset);
    }

    #[test]
    fn test_feature_matrix_shape() {
        let dataset = FilteredDataset::from_frame(&raw_frame()).unwrap();
        let x = dataset.feature_matrix();
        assert_eq!(x.dim(), (2, 6));
        assert_eq!(x[[0, 5]], 15.0);
        assert_eq!(dataset.regression_targets().to_vec(), vec![1.1, 0.1]);
    }
}
