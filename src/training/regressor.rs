//! Linear regression candidates and their cross-validated comparison

use std::collections::BTreeMap;

use linfa::prelude::*;
use linfa::Dataset;
use linfa_elasticnet::ElasticNet;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::config::Algorithm;
use super::cross_validation::{CVResults, CVStrategy, CrossValidator};
use super::ModelComparison;
use crate::error::{PipelineError, Result};
use crate::evaluation::r2_score;

/// Fitted linear model: `y = x · coefficients + intercept`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    /// Fit one of the linear algorithms
    pub fn fit(algorithm: Algorithm, x: &Array2<f64>, y: &Array1<f64>) -> Result<Self> {
        if x.nrows() == 0 || x.nrows() != y.len() {
            return Err(PipelineError::model(format!(
                "cannot fit {} on {} rows with {} targets",
                algorithm,
                x.nrows(),
                y.len()
            )));
        }
        let dataset = Dataset::new(x.clone(), y.clone());

        match (algorithm, algorithm.penalty()) {
            (Algorithm::LinearRegression, _) => {
                let fitted = LinearRegression::new()
                    .fit(&dataset)
                    .map_err(|e| PipelineError::model(format!("{}: {}", algorithm, e)))?;
                Ok(Self {
                    intercept: fitted.intercept(),
                    coefficients: fitted.params().to_vec(),
                })
            }
            (_, Some((penalty, l1_ratio))) => {
                let fitted = ElasticNet::<f64>::params()
                    .penalty(penalty)
                    .l1_ratio(l1_ratio)
                    .fit(&dataset)
                    .map_err(|e| PipelineError::model(format!("{}: {}", algorithm, e)))?;
                Ok(Self {
                    intercept: fitted.intercept(),
                    coefficients: fitted.hyperplane().to_vec(),
                })
            }
            (other, None) => Err(PipelineError::model(format!("{} is not a linear model", other))),
        }
    }

    pub fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if x.ncols() != self.coefficients.len() {
            return Err(PipelineError::model(format!(
                "model expects {} features, got {}",
                self.coefficients.len(),
                x.ncols()
            )));
        }
        let w = Array1::from(self.coefficients.clone());
        Ok(x.dot(&w) + self.intercept)
    }
}

/// Parameters of a pool member as tracking strings
pub fn algorithm_params(algorithm: Algorithm) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    if let Some((penalty, l1_ratio)) = algorithm.penalty() {
        params.insert("alpha".to_string(), penalty.to_string());
        params.insert("l1_ratio".to_string(), l1_ratio.to_string());
    }
    params
}

/// Outcome of the candidate comparison
#[derive(Debug, Clone)]
pub struct ComparisonResult {
    pub best: Algorithm,
    pub best_score: CVResults,
    /// Pool order; failed candidates carry an error and no score
    pub candidates: Vec<ModelComparison>,
}

/// Mean R² of `algorithm` over the folds where R² is defined.
///
/// Folds whose held-out target is constant are skipped; fit and predict
/// failures fail the candidate.
fn cross_val_r2(cv: &CrossValidator, algorithm: Algorithm, x: &Array2<f64>, y: &Array1<f64>) -> Result<CVResults> {
    let splits = cv.split(x.nrows(), None)?;
    let mut scores = Vec::with_capacity(splits.len());

    for (fold, split) in splits.iter().enumerate() {
        let x_train = x.select(Axis(0), &split.train_indices);
        let y_train = y.select(Axis(0), &split.train_indices);
        let x_test = x.select(Axis(0), &split.test_indices);
        let y_test = y.select(Axis(0), &split.test_indices);

        let model = LinearModel::fit(algorithm, &x_train, &y_train)?;
        let predicted = model.predict(&x_test)?;
        match r2_score(&y_test.to_vec(), &predicted.to_vec()) {
            Ok(score) => scores.push(score),
            Err(PipelineError::Value(reason)) => {
                debug!(algorithm = %algorithm, fold, reason = %reason, "R² undefined on fold, skipped");
            }
            Err(e) => return Err(e),
        }
    }

    if scores.is_empty() {
        return Err(PipelineError::value(format!(
            "R² undefined on all {} folds",
            splits.len()
        )));
    }
    Ok(CVResults::from_scores(scores))
}

/// Walk `pool` in order, keeping the best mean score; ties go to the earlier
/// candidate and failures are recorded without a score.
fn rank<F>(pool: &[Algorithm], mut score: F) -> Result<ComparisonResult>
where
    F: FnMut(Algorithm) -> Result<CVResults>,
{
    let mut best: Option<(Algorithm, CVResults)> = None;
    let mut candidates = Vec::with_capacity(pool.len());

    for &algorithm in pool {
        match score(algorithm) {
            Ok(results) => {
                debug!(algorithm = %algorithm, mean_r2 = results.mean_score, "Scored regression candidate");
                candidates.push(ModelComparison::scored(algorithm.name(), algorithm_params(algorithm), &results));
                let improves = best
                    .as_ref()
                    .map_or(true, |(_, b)| results.mean_score > b.mean_score);
                if improves {
                    best = Some((algorithm, results));
                }
            }
            Err(e) => {
                warn!(algorithm = %algorithm, error = %e, "Regression candidate failed");
                candidates.push(ModelComparison::failed(algorithm.name(), algorithm_params(algorithm), &e));
            }
        }
    }

    let (best, best_score) = best.ok_or_else(|| {
        PipelineError::model("every regression candidate failed cross-validation")
    })?;
    Ok(ComparisonResult {
        best,
        best_score,
        candidates,
    })
}

/// Rank the pool by mean shuffled K-fold R², ties to the earlier candidate.
///
/// The fold count is capped at `n_rows / 2` (but never below 2) so held-out
/// folds keep at least two rows whenever the data allows.
pub fn compare(x: &Array2<f64>, y: &Array1<f64>, folds: usize, seed: u64) -> Result<ComparisonResult> {
    let n_splits = folds.min(x.nrows() / 2).max(2);
    if n_splits != folds {
        debug!(requested = folds, used = n_splits, rows = x.nrows(), "Capped regression fold count");
    }
    let cv = CrossValidator::new(CVStrategy::KFold {
        n_splits,
        shuffle: true,
    })
    .with_random_state(seed);

    rank(&Algorithm::REGRESSION_POOL, |algorithm| cross_val_r2(&cv, algorithm, x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, concatenate, s};

    fn linear_data() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [1.0, 0.5],
            [2.0, 1.5],
            [3.0, 0.0],
            [4.0, 2.0],
            [5.0, 1.0],
            [6.0, 0.5],
            [7.0, 2.5],
            [8.0, 1.0],
            [9.0, 0.0],
            [10.0, 1.5],
        ];
        let y = x.column(0).mapv(|v| 2.0 * v + 1.0) + &x.column(1).mapv(|v| 0.5 * v);
        (x, y)
    }

    #[test]
    fn test_ols_recovers_coefficients() {
        let (x, y) = linear_data();
        let model = LinearModel::fit(Algorithm::LinearRegression, &x, &y).unwrap();

        assert!((model.coefficients[0] - 2.0).abs() < 1e-6);
        assert!((model.coefficients[1] - 0.5).abs() < 1e-6);
        assert!((model.intercept - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_predict_checks_width() {
        let model = LinearModel {
            intercept: 1.0,
            coefficients: vec![2.0],
        };
        assert_eq!(model.predict(&array![[3.0]]).unwrap()[0], 7.0);
        assert!(matches!(model.predict(&array![[3.0, 1.0]]), Err(PipelineError::Model(_))));
    }

    #[test]
    fn test_compare_prefers_unpenalized_fit() {
        let (x, y) = linear_data();
        let result = compare(&x, &y, 2, 123).unwrap();

        assert_eq!(result.candidates.len(), 4);
        assert_eq!(result.candidates[0].model_name, "LinearRegression");
        assert_eq!(result.best, Algorithm::LinearRegression);
        assert!(result.best_score.mean_score > 0.99);
    }

    #[test]
    fn test_compare_on_small_training_set() {
        let (x, y) = linear_data();
        let x = concatenate![Axis(0), x, x.slice(s![..5, ..])];
        let y = concatenate![Axis(0), y, y.slice(s![..5])];
        assert_eq!(x.nrows(), 15);

        let result = compare(&x, &y, 10, 123).unwrap();
        assert!(result.candidates.iter().all(|c| c.error.is_none()));
        assert!(result.best_score.n_folds <= 7);
        assert_eq!(result.best, Algorithm::LinearRegression);
    }

    #[test]
    fn test_constant_target_fails_every_candidate() {
        let (x, _) = linear_data();
        let y = Array1::from_elem(x.nrows(), 1.1);

        let err = compare(&x, &y, 3, 123).unwrap_err();
        assert!(matches!(err, PipelineError::Model(_)));
    }

    #[test]
    fn test_failed_candidate_is_recorded_and_skipped() {
        let result = rank(&Algorithm::REGRESSION_POOL, |algorithm| match algorithm {
            Algorithm::Ridge => Err(PipelineError::model("singular matrix")),
            Algorithm::Lasso => Ok(CVResults::from_scores(vec![0.9, 0.7])),
            _ => Ok(CVResults::from_scores(vec![0.5, 0.5])),
        })
        .unwrap();

        assert_eq!(result.best, Algorithm::Lasso);
        assert_eq!(result.candidates.len(), 4);
        let ridge = &result.candidates[1];
        assert_eq!(ridge.model_name, "Ridge");
        assert!(ridge.cv_score.is_none());
        assert!(ridge.error.as_deref().unwrap().contains("singular matrix"));
    }

    #[test]
    fn test_ties_keep_earlier_candidate() {
        let result = rank(&Algorithm::REGRESSION_POOL, |_| Ok(CVResults::from_scores(vec![0.8]))).unwrap();
        assert_eq!(result.best, Algorithm::LinearRegression);
    }

    #[test]
    fn test_penalized_params_logged() {
        let params = algorithm_params(Algorithm::ElasticNet);
        assert_eq!(params.get("l1_ratio").map(String::as_str), Some("0.5"));
        assert!(algorithm_params(Algorithm::LinearRegression).is_empty());
    }
}
