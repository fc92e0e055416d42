//! Per-class classification report

use serde::Serialize;

use super::metrics::{harmonic_mean, ratio, BinaryCounts};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassScores {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Precision, recall and F1 per class plus accuracy and averages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    /// `(class label, scores)` for classes 0 and 1
    pub classes: Vec<(String, ClassScores)>,
    pub accuracy: f64,
    pub macro_avg: ClassScores,
    pub weighted_avg: ClassScores,
}

impl ClassificationReport {
    pub fn new(real: &[f64], label: &[f64]) -> Result<Self> {
        let c = BinaryCounts::from_labels(real, label)?;

        let negative = scores(c.tn, c.fn_, c.fp, c.tn + c.fp);
        let positive = scores(c.tp, c.fp, c.fn_, c.tp + c.fn_);
        let total = c.total();

        let macro_avg = ClassScores {
            precision: (negative.precision + positive.precision) / 2.0,
            recall: (negative.recall + positive.recall) / 2.0,
            f1_score: (negative.f1_score + positive.f1_score) / 2.0,
            support: total,
        };
        let weight = |f: fn(&ClassScores) -> f64| {
            (f(&negative) * negative.support as f64 + f(&positive) * positive.support as f64) / total as f64
        };
        let weighted_avg = ClassScores {
            precision: weight(|s| s.precision),
            recall: weight(|s| s.recall),
            f1_score: weight(|s| s.f1_score),
            support: total,
        };

        Ok(Self {
            classes: vec![("0".to_string(), negative), ("1".to_string(), positive)],
            accuracy: ratio(c.tp + c.tn, total),
            macro_avg,
            weighted_avg,
        })
    }
}

fn scores(hits: usize, false_pos: usize, false_neg: usize, support: usize) -> ClassScores {
    let precision = ratio(hits, hits + false_pos);
    let recall = ratio(hits, hits + false_neg);
    ClassScores {
        precision,
        recall,
        f1_score: harmonic_mean(precision, recall),
        support,
    }
}
