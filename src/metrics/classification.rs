//! Holdout classification metrics and the confusion matrix

use crate::error::{FraudError, Result};
use super::ranking::{average_precision, roc_auc};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Metric names in report order
pub const DEFAULT_METRICS: [&str; 5] = ["pr_auc", "roc_auc", "precision", "recall", "f1"];

/// Standard holdout metrics of one model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HoldoutResults {
    /// Average precision of the scores
    pub pr_auc: f64,
    /// NaN when the holdout has a single class
    pub roc_auc: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl HoldoutResults {
    /// Value of a metric by its report name
    pub fn get(&self, metric: &str) -> Option<f64> {
        match metric {
            "pr_auc" => Some(self.pr_auc),
            "roc_auc" => Some(self.roc_auc),
            "precision" => Some(self.precision),
            "recall" => Some(self.recall),
            "f1" => Some(self.f1),
            _ => None,
        }
    }

    /// (name, value) pairs in [`DEFAULT_METRICS`] order
    pub fn to_pairs(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("pr_auc", self.pr_auc),
            ("roc_auc", self.roc_auc),
            ("precision", self.precision),
            ("recall", self.recall),
            ("f1", self.f1),
        ]
    }
}

/// Binary confusion counts at a fixed threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tn: usize,
    pub fp: usize,
    pub fn_: usize,
    pub tp: usize,
}

impl ConfusionMatrix {
    /// Count outcomes of thresholded predictions
    pub fn from_predictions(y_true: &[bool], y_pred: &[bool]) -> Self {
        let mut cm = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            match (t, p) {
                (true, true) => cm.tp += 1,
                (false, true) => cm.fp += 1,
                (false, false) => cm.tn += 1,
                (true, false) => cm.fn_ += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.tn + self.fp + self.fn_ + self.tp
    }

    /// Predicted positives
    pub fn alerts(&self) -> usize {
        self.tp + self.fp
    }

    /// TP / (TP + FP), `zero_division` when nothing was flagged
    pub fn precision(&self, zero_division: f64) -> f64 {
        ratio_or(self.tp, self.tp + self.fp, zero_division)
    }

    /// TP / (TP + FN), `zero_division` when there are no positives
    pub fn recall(&self, zero_division: f64) -> f64 {
        ratio_or(self.tp, self.tp + self.fn_, zero_division)
    }

    /// 2TP / (2TP + FP + FN), `zero_division` when the denominator is zero
    pub fn f1(&self, zero_division: f64) -> f64 {
        ratio_or(2 * self.tp, 2 * self.tp + self.fp + self.fn_, zero_division)
    }

    /// 2x2 report table. The `rotulo` column holds the row labels.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        Ok(df!(
            "rotulo" => &["Real: Não Fraude", "Real: Fraude"],
            "Predito: Não Fraude" => &[self.tn as u64, self.fn_ as u64],
            "Predito: Fraude" => &[self.fp as u64, self.tp as u64],
        )?)
    }
}

fn ratio_or(num: usize, den: usize, zero_division: f64) -> f64 {
    if den == 0 {
        zero_division
    } else {
        num as f64 / den as f64
    }
}

/// Validate aligned label/score arrays and convert labels to booleans
pub(crate) fn binary_inputs(y_true: &Array1<f64>, y_proba: &Array1<f64>) -> Result<Vec<bool>> {
    if y_true.len() != y_proba.len() {
        return Err(FraudError::length_mismatch("y_proba", y_true.len(), y_proba.len()));
    }
    if y_proba.iter().any(|p| p.is_nan()) {
        return Err(FraudError::InvalidInput("y_proba contains NaN".to_string()));
    }

    y_true
        .iter()
        .map(|&v| {
            if v == 1.0 {
                Ok(true)
            } else if v == 0.0 {
                Ok(false)
            } else {
                Err(FraudError::InvalidInput(format!("labels must be 0 or 1, found {}", v)))
            }
        })
        .collect()
}

pub(crate) fn validate_threshold(threshold: f64) -> Result<()> {
    if threshold.is_nan() {
        return Err(FraudError::InvalidParameter {
            name: "threshold".to_string(),
            value: threshold.to_string(),
            reason: "must be a number".to_string(),
        });
    }
    Ok(())
}

/// Flag scores at or above the threshold
pub(crate) fn threshold_predictions(y_proba: &Array1<f64>, threshold: f64) -> Vec<bool> {
    y_proba.iter().map(|&p| p >= threshold).collect()
}

/// PR-AUC and ROC-AUC from the scores, precision/recall/F1 from
/// `y_proba >= threshold`.
///
/// `zero_division` replaces precision, recall or F1 when its denominator is zero.
pub fn compute_classification_metrics(
    y_true: &Array1<f64>,
    y_proba: &Array1<f64>,
    threshold: f64,
    zero_division: f64,
) -> Result<HoldoutResults> {
    let truth = binary_inputs(y_true, y_proba)?;
    validate_threshold(threshold)?;

    let scores: Vec<f64> = y_proba.to_vec();
    let cm = ConfusionMatrix::from_predictions(&truth, &threshold_predictions(y_proba, threshold));

    Ok(HoldoutResults {
        pr_auc: average_precision(&truth, &scores),
        roc_auc: roc_auc(&truth, &scores),
        precision: cm.precision(zero_division),
        recall: cm.recall(zero_division),
        f1: cm.f1(zero_division),
    })
}

/// Confusion counts of `y_proba >= threshold` against the labels
pub fn compute_confusion_matrix(
    y_true: &Array1<f64>,
    y_proba: &Array1<f64>,
    threshold: f64,
) -> Result<ConfusionMatrix> {
    let truth = binary_inputs(y_true, y_proba)?;
    validate_threshold(threshold)?;
    Ok(ConfusionMatrix::from_predictions(
        &truth,
        &threshold_predictions(y_proba, threshold),
    ))
}
