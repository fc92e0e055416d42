//! Classification and regression metrics
//!
//! All functions take ground truth first. Empty or length-mismatched inputs
//! are value errors; classification metrics also require labels in {0, 1}.

use crate::error::{PipelineError, Result};

fn check_pair(real: &[f64], predicted: &[f64], metric: &str) -> Result<()> {
    if real.is_empty() {
        return Err(PipelineError::value(format!("{}: empty input", metric)));
    }
    if real.len() != predicted.len() {
        return Err(PipelineError::value(format!(
            "{}: length mismatch ({} vs {})",
            metric,
            real.len(),
            predicted.len()
        )));
    }
    Ok(())
}

fn check_binary(values: &[f64], metric: &str) -> Result<()> {
    match values.iter().find(|&&v| v != 0.0 && v != 1.0) {
        Some(v) => Err(PipelineError::value(format!(
            "{}: expected binary labels, found {}",
            metric, v
        ))),
        None => Ok(()),
    }
}

/// Confusion counts for the positive class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BinaryCounts {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    pub fn_: usize,
}

impl BinaryCounts {
    pub fn from_labels(real: &[f64], label: &[f64]) -> Result<Self> {
        check_pair(real, label, "confusion")?;
        check_binary(real, "confusion")?;
        check_binary(label, "confusion")?;

        let mut counts = Self::default();
        for (&r, &p) in real.iter().zip(label) {
            match (r == 1.0, p == 1.0) {
                (true, true) => counts.tp += 1,
                (false, true) => counts.fp += 1,
                (false, false) => counts.tn += 1,
                (true, false) => counts.fn_ += 1,
            }
        }
        Ok(counts)
    }

    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn f1(&self) -> f64 {
        harmonic_mean(self.precision(), self.recall())
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }
}

pub(crate) fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

pub(crate) fn harmonic_mean(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// Share of exactly matching labels
pub fn accuracy(real: &[f64], label: &[f64]) -> Result<f64> {
    check_pair(real, label, "accuracy")?;
    let hits = real.iter().zip(label).filter(|(r, p)| r == p).count();
    Ok(hits as f64 / real.len() as f64)
}

pub fn precision(real: &[f64], label: &[f64]) -> Result<f64> {
    Ok(BinaryCounts::from_labels(real, label)?.precision())
}

pub fn recall(real: &[f64], label: &[f64]) -> Result<f64> {
    Ok(BinaryCounts::from_labels(real, label)?.recall())
}

/// F1 of the positive class; 0 when precision + recall is 0
pub fn f1_score(real: &[f64], label: &[f64]) -> Result<f64> {
    Ok(BinaryCounts::from_labels(real, label)?.f1())
}

/// Binary cross-entropy of the positive-class probability.
///
/// Probabilities are clipped to `[ε, 1 - ε]` with `ε = f64::EPSILON`. The
/// ground truth must contain both classes.
pub fn log_loss(real: &[f64], score: &[f64]) -> Result<f64> {
    check_pair(real, score, "log_loss")?;
    check_binary(real, "log_loss")?;
    if real.iter().all(|&y| y == real[0]) {
        return Err(PipelineError::value(format!(
            "log_loss: ground truth contains a single class ({})",
            real[0]
        )));
    }
    if let Some(p) = score.iter().find(|p| !(0.0..=1.0).contains(*p)) {
        return Err(PipelineError::value(format!(
            "log_loss: probability {} outside [0, 1]",
            p
        )));
    }

    let eps = f64::EPSILON;
    let total: f64 = real
        .iter()
        .zip(score)
        .map(|(&y, &p)| {
            let p = p.clamp(eps, 1.0 - eps);
            y * p.ln() + (1.0 - y) * (1.0 - p).ln()
        })
        .sum();
    Ok(-total / real.len() as f64)
}

pub fn mse(real: &[f64], predicted: &[f64]) -> Result<f64> {
    check_pair(real, predicted, "mse")?;
    let sum: f64 = real.iter().zip(predicted).map(|(r, p)| (r - p).powi(2)).sum();
    Ok(sum / real.len() as f64)
}

pub fn rmse(real: &[f64], predicted: &[f64]) -> Result<f64> {
    Ok(mse(real, predicted)?.sqrt())
}

pub fn mae(real: &[f64], predicted: &[f64]) -> Result<f64> {
    check_pair(real, predicted, "mae")?;
    let sum: f64 = real.iter().zip(predicted).map(|(r, p)| (r - p).abs()).sum();
    Ok(sum / real.len() as f64)
}

/// Coefficient of determination.
///
/// Undefined for fewer than two rows or a constant ground truth.
pub fn r2_score(real: &[f64], predicted: &[f64]) -> Result<f64> {
    check_pair(real, predicted, "r2_score")?;
    if real.len() < 2 {
        return Err(PipelineError::value("r2_score: needs at least 2 samples"));
    }

    let mean = real.iter().sum::<f64>() / real.len() as f64;
    let ss_tot: f64 = real.iter().map(|r| (r - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return Err(PipelineError::value("r2_score: ground truth has zero variance"));
    }
    let ss_res: f64 = real.iter().zip(predicted).map(|(r, p)| (r - p).powi(2)).sum();
    Ok(1.0 - ss_res / ss_tot)
}
