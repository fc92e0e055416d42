//! Decision tree classifier and its hyper-parameter search
//!
//! Trees are grown by `linfa-trees` and flattened into a plain node vector
//! that carries per-leaf class counts, so fitted models serialize as JSON and
//! expose positive-class probabilities.

use std::collections::BTreeMap;

use linfa::prelude::*;
use linfa::Dataset;
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cross_validation::{CVResults, CVStrategy, CrossValidator};
use super::ModelComparison;
use crate::error::{PipelineError, Result};
use crate::evaluation::accuracy;

/// Impurity criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    Gini,
    Entropy,
}

impl Criterion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Criterion::Gini => "gini",
            Criterion::Entropy => "entropy",
        }
    }

    fn split_quality(&self) -> SplitQuality {
        match self {
            Criterion::Gini => SplitQuality::Gini,
            Criterion::Entropy => SplitQuality::Entropy,
        }
    }
}

/// Tree growth limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeParams {
    /// `None` grows until leaves are pure or too small
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub criterion: Criterion,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: Criterion::Gini,
        }
    }
}

impl TreeParams {
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Parameters as tracking-friendly strings
    pub fn to_params(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert(
            "max_depth".to_string(),
            self.max_depth.map_or_else(|| "None".to_string(), |d| d.to_string()),
        );
        params.insert("min_samples_split".to_string(), self.min_samples_split.to_string());
        params.insert("min_samples_leaf".to_string(), self.min_samples_leaf.to_string());
        params.insert("criterion".to_string(), self.criterion.as_str().to_string());
        params
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum FlatNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        positives: usize,
        total: usize,
        label: f64,
    },
}

/// Fitted binary decision tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeClassifier {
    pub params: TreeParams,
    n_features: usize,
    /// Root at index 0
    nodes: Vec<FlatNode>,
}

impl TreeClassifier {
    /// Fit on a feature matrix and 0/1 labels
    pub fn fit(params: TreeParams, x: &Array2<f64>, y: &Array1<f64>) -> Result<Self> {
        if x.nrows() == 0 {
            return Err(PipelineError::model("cannot fit a tree on an empty dataset"));
        }
        if x.nrows() != y.len() {
            return Err(PipelineError::model(format!(
                "feature rows ({}) and labels ({}) differ",
                x.nrows(),
                y.len()
            )));
        }
        if let Some(v) = y.iter().find(|&&v| v != 0.0 && v != 1.0) {
            return Err(PipelineError::value(format!("expected binary labels, found {}", v)));
        }

        let targets: Array1<usize> = y.mapv(|v| v as usize);
        let dataset = Dataset::new(x.clone(), targets);
        let tree = DecisionTree::<f64, usize>::params()
            .split_quality(params.criterion.split_quality())
            .max_depth(params.max_depth)
            .min_weight_split(params.min_samples_split as f32)
            .min_weight_leaf(params.min_samples_leaf as f32)
            .fit(&dataset)
            .map_err(|e| PipelineError::model(e.to_string()))?;

        let root = tree
            .iter_nodes()
            .next()
            .ok_or_else(|| PipelineError::model("fitted tree has no root"))?;

        let mut nodes = Vec::new();
        let rows: Vec<usize> = (0..x.nrows()).collect();
        flatten(root, rows, x, y, &mut nodes);

        Ok(Self {
            params,
            n_features: x.ncols(),
            nodes,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, FlatNode::Leaf { .. })).count()
    }

    /// Positive-class probability per row
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_width(x)?;
        x.axis_iter(Axis(0))
            .map(|row| {
                self.leaf(row).map(|(positives, total, label)| {
                    if total == 0 {
                        label
                    } else {
                        positives as f64 / total as f64
                    }
                })
            })
            .collect()
    }

    /// Majority class of the reached leaf per row
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_width(x)?;
        x.axis_iter(Axis(0))
            .map(|row| self.leaf(row).map(|(_, _, label)| label))
            .collect()
    }

    fn check_width(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.n_features {
            return Err(PipelineError::model(format!(
                "model expects {} features, got {}",
                self.n_features,
                x.ncols()
            )));
        }
        Ok(())
    }

    fn leaf(&self, row: ArrayView1<'_, f64>) -> Result<(usize, usize, f64)> {
        let mut idx = 0;
        // A well-formed tree never revisits a node
        for _ in 0..=self.nodes.len() {
            match self.nodes.get(idx) {
                Some(FlatNode::Leaf {
                    positives,
                    total,
                    label,
                }) => return Ok((*positives, *total, *label)),
                Some(FlatNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = row
                        .get(*feature)
                        .ok_or_else(|| PipelineError::model(format!("split on unknown feature {}", feature)))?;
                    idx = if *value < *threshold { *left } else { *right };
                }
                None => break,
            }
        }
        Err(PipelineError::model("malformed decision tree"))
    }
}

fn flatten(
    node: &linfa_trees::TreeNode<f64, usize>,
    rows: Vec<usize>,
    x: &Array2<f64>,
    y: &Array1<f64>,
    nodes: &mut Vec<FlatNode>,
) -> usize {
    let idx = nodes.len();
    let children = node.children();
    let left = children.first().and_then(|c| c.as_deref());
    let right = children.get(1).and_then(|c| c.as_deref());

    match (node.is_leaf(), left, right) {
        (false, Some(left), Some(right)) => {
            let (feature, threshold, _) = node.split();
            nodes.push(FlatNode::Split {
                feature,
                threshold,
                left: 0,
                right: 0,
            });
            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
                rows.into_iter().partition(|&r| x[[r, feature]] < threshold);
            let left_idx = flatten(left, left_rows, x, y, nodes);
            let right_idx = flatten(right, right_rows, x, y, nodes);
            if let FlatNode::Split { left, right, .. } = &mut nodes[idx] {
                *left = left_idx;
                *right = right_idx;
            }
        }
        _ => {
            let total = rows.len();
            let positives = rows.iter().filter(|&&r| y[r] == 1.0).count();
            let fallback = node.prediction().unwrap_or(0) as f64;
            let label = match (2 * positives).cmp(&total) {
                std::cmp::Ordering::Greater => 1.0,
                std::cmp::Ordering::Less => 0.0,
                std::cmp::Ordering::Equal => fallback,
            };
            nodes.push(FlatNode::Leaf {
                positives,
                total,
                label,
            });
        }
    }
    idx
}

/// Outcome of the hyper-parameter search
#[derive(Debug, Clone)]
pub struct TuningResult {
    pub best: TreeParams,
    pub best_score: CVResults,
    /// Every candidate in draw order, baseline first
    pub candidates: Vec<ModelComparison>,
}

/// Baseline plus `n_iter` seeded random draws from the search grid
pub fn candidate_params(n_iter: usize, seed: u64) -> Vec<TreeParams> {
    const LEAF: [usize; 5] = [2, 3, 4, 5, 6];
    const SPLIT: [usize; 5] = [2, 5, 7, 9, 10];
    const CRITERIA: [Criterion; 2] = [Criterion::Gini, Criterion::Entropy];

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut candidates = vec![TreeParams::default()];
    for _ in 0..n_iter {
        let params = TreeParams::default()
            .with_max_depth(rng.gen_range(1..=15))
            .with_min_samples_leaf(*LEAF.choose(&mut rng).unwrap_or(&2))
            .with_min_samples_split(*SPLIT.choose(&mut rng).unwrap_or(&2))
            .with_criterion(*CRITERIA.choose(&mut rng).unwrap_or(&Criterion::Gini));
        candidates.push(params);
    }
    candidates
}

/// Pick the candidate with the best mean stratified K-fold accuracy.
///
/// Ties keep the earlier candidate.
pub fn tune(x: &Array2<f64>, y: &Array1<f64>, n_iter: usize, folds: usize, seed: u64) -> Result<TuningResult> {
    let cv = CrossValidator::new(CVStrategy::StratifiedKFold {
        n_splits: folds,
        shuffle: true,
    })
    .with_random_state(seed);

    // Candidates are scored in parallel; selection walks them in draw order
    let scored: Vec<(TreeParams, Result<CVResults>)> = candidate_params(n_iter, seed)
        .into_par_iter()
        .map(|params| {
            let results = cv.cross_val_score(x.nrows(), Some(y), |split| {
                let x_train = x.select(Axis(0), &split.train_indices);
                let y_train = y.select(Axis(0), &split.train_indices);
                let x_test = x.select(Axis(0), &split.test_indices);
                let y_test = y.select(Axis(0), &split.test_indices);

                let tree = TreeClassifier::fit(params, &x_train, &y_train)?;
                let predicted = tree.predict(&x_test)?;
                accuracy(&y_test.to_vec(), &predicted.to_vec())
            });
            (params, results)
        })
        .collect();

    let mut best: Option<(TreeParams, CVResults)> = None;
    let mut candidates = Vec::with_capacity(scored.len());

    for (params, results) in scored {
        let results = results?;
        debug!(params = ?params, mean_accuracy = results.mean_score, "Scored tree candidate");
        candidates.push(ModelComparison::scored("DecisionTreeClassifier", params.to_params(), &results));

        let improves = best
            .as_ref()
            .map_or(true, |(_, b)| results.mean_score > b.mean_score);
        if improves {
            best = Some((params, results));
        }
    }

    let (best, best_score) = best.ok_or_else(|| PipelineError::model("no tree candidates evaluated"))?;
    Ok(TuningResult {
        best,
        best_score,
        candidates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [1.0, 5.0],
            [2.0, 4.0],
            [3.0, 6.0],
            [4.0, 5.0],
            [6.0, 5.0],
            [7.0, 4.0],
            [8.0, 6.0],
            [9.0, 5.0],
        ];
        let y = array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_fit_predict_separable() {
        let (x, y) = separable();
        let tree = TreeClassifier::fit(TreeParams::default(), &x, &y).unwrap();

        assert_eq!(tree.predict(&x).unwrap(), y);
        let proba = tree.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
        assert_eq!(proba[0], 0.0);
        assert_eq!(proba[7], 1.0);
    }

    #[test]
    fn test_depth_one_leaf_probabilities() {
        let x = array![[0.0], [0.0], [0.0], [1.0], [1.0], [1.0]];
        let y = array![0.0, 0.0, 1.0, 1.0, 1.0, 0.0];
        let tree = TreeClassifier::fit(TreeParams::default().with_max_depth(1), &x, &y).unwrap();

        let proba = tree.predict_proba(&x).unwrap();
        for p in proba.iter() {
            assert!((p - 1.0 / 3.0).abs() < 1e-12 || (p - 2.0 / 3.0).abs() < 1e-12);
        }
        assert!(tree.n_leaves() <= 2);
    }

    #[test]
    fn test_wrong_width_is_model_error() {
        let (x, y) = separable();
        let tree = TreeClassifier::fit(TreeParams::default(), &x, &y).unwrap();
        let err = tree.predict(&array![[1.0, 2.0, 3.0]]).unwrap_err();
        assert!(matches!(err, PipelineError::Model(_)));
    }

    #[test]
    fn test_candidates_are_seeded() {
        let a = candidate_params(10, 123);
        let b = candidate_params(10, 123);
        assert_eq!(a, b);
        assert_eq!(a.len(), 11);
        assert_eq!(a[0], TreeParams::default());
        for p in &a[1..] {
            assert!((1..=15).contains(&p.max_depth.unwrap()));
            assert!([2, 3, 4, 5, 6].contains(&p.min_samples_leaf));
            assert!([2, 5, 7, 9, 10].contains(&p.min_samples_split));
        }
    }

    #[test]
    fn test_tune_reports_every_candidate() {
        let (x, y) = separable();
        let result = tune(&x, &y, 3, 2, 123).unwrap();
        assert_eq!(result.candidates.len(), 4);
        assert!(result.best_score.mean_score > 0.5);
    }
}
