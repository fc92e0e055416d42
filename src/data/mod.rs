//! Shot-log data: loading, null filtering and stratified splitting
//!
//! Every stage that touches raw rows goes through [`load_dataset`] so the
//! feature projection and null policy stay identical between training and
//! production scoring.

pub mod loader;
pub mod split;

pub use loader::{load_dataset, FilteredDataset, ShotRecord};
pub use split::{stratified_split, Split};

/// Classifier inputs, in training column order; the regressor also sees the label
pub const FEATURE_COLUMNS: [&str; 6] = [
    "lat",
    "lon",
    "minutes_remaining",
    "period",
    "playoffs",
    "shot_distance",
];

/// Binary label: 1 when the shot was made
pub const LABEL_COLUMN: &str = "shot_made_flag";

/// Offset added to the label to build the synthetic regression target
pub const REGRESSION_OFFSET: f64 = 0.1;

/// Synthetic continuous target shared by training and scoring
pub fn regression_target(label: f64) -> f64 {
    label + REGRESSION_OFFSET
}

/// All seven retained columns: features first, label last
pub fn dataset_columns() -> Vec<&'static str> {
    FEATURE_COLUMNS
        .iter()
        .copied()
        .chain(std::iter::once(LABEL_COLUMN))
        .collect()
}
