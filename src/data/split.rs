//! Stratified train/test partitioning

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::FilteredDataset;
use crate::error::{PipelineError, Result};

/// Disjoint train/test partitions of one filtered dataset
#[derive(Debug, Clone)]
pub struct Split {
    pub train: FilteredDataset,
    pub test: FilteredDataset,
    /// Row positions in the source dataset, ascending
    pub train_indices: Vec<usize>,
    /// Row positions in the source dataset, ascending
    pub test_indices: Vec<usize>,
}

/// Split `dataset` into train/test, preserving the label proportion.
///
/// Each class contributes `round(n_class * test_size)` rows to the test set,
/// clamped to `1..=n_class - 1`. Identical input and seed always yield the
/// same membership; both partitions keep the source row order.
pub fn stratified_split(dataset: &FilteredDataset, test_size: f64, seed: u64) -> Result<Split> {
    let labels: Vec<f64> = dataset.iter().map(|r| r.label()).collect();
    let (train_indices, test_indices) = stratified_indices(&labels, test_size, seed)?;

    Ok(Split {
        train: dataset.subset(&train_indices),
        test: dataset.subset(&test_indices),
        train_indices,
        test_indices,
    })
}

/// Index-level stratified split over class labels.
pub fn stratified_indices(labels: &[f64], test_size: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(PipelineError::value(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }

    let mut classes: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (idx, &label) in labels.iter().enumerate() {
        classes.entry(label.round() as i64).or_default().push(idx);
    }

    if classes.len() < 2 {
        return Err(PipelineError::value(format!(
            "stratified split needs at least 2 distinct labels, found {}",
            classes.len()
        )));
    }
    if let Some((class, members)) = classes.iter().find(|(_, m)| m.len() < 2) {
        return Err(PipelineError::value(format!(
            "label {} has only {} member; every class needs at least 2",
            class,
            members.len()
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();

    for members in classes.values_mut() {
        members.shuffle(&mut rng);
        let n_test = ((members.len() as f64 * test_size).round() as usize).clamp(1, members.len() - 1);
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok((train, test))
}
