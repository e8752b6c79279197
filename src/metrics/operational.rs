//! Alert volume versus captured fraud at a fixed threshold

use crate::error::Result;
use super::classification::{binary_inputs, threshold_predictions, validate_threshold, ConfusionMatrix};
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Operational view of one model on the holdout
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperationalTradeoff {
    /// Transactions flagged as fraud
    #[serde(rename = "alertas_totais")]
    pub alerts: usize,
    /// Share of transactions flagged, NaN for an empty holdout
    #[serde(rename = "pct_alertas")]
    pub alert_rate: f64,
    #[serde(rename = "fraudes_capturadas")]
    pub frauds_caught: usize,
    #[serde(rename = "fraudes_perdidas")]
    pub frauds_missed: usize,
    pub precision: f64,
    pub recall: f64,
}

/// Alert volume and fraud capture of `y_proba >= threshold`
pub fn operational_tradeoff(
    y_true: &Array1<f64>,
    y_proba: &Array1<f64>,
    threshold: f64,
) -> Result<OperationalTradeoff> {
    let truth = binary_inputs(y_true, y_proba)?;
    validate_threshold(threshold)?;
    let cm = ConfusionMatrix::from_predictions(&truth, &threshold_predictions(y_proba, threshold));

    let total = cm.total();
    let alert_rate = if total == 0 {
        f64::NAN
    } else {
        cm.alerts() as f64 / total as f64
    };

    Ok(OperationalTradeoff {
        alerts: cm.alerts(),
        alert_rate,
        frauds_caught: cm.tp,
        frauds_missed: cm.fn_,
        precision: cm.precision(0.0),
        recall: cm.recall(0.0),
    })
}

/// One row per model, most alerts first.
///
/// Rows with equal alert rates keep their input order; NaN rates go last.
pub fn tradeoff_table<S: AsRef<str>>(
    y_true: &Array1<f64>,
    proba_by_model: &[(S, Array1<f64>)],
    threshold: f64,
) -> Result<DataFrame> {
    let mut rows = proba_by_model
        .iter()
        .map(|(name, proba)| Ok((name.as_ref(), operational_tradeoff(y_true, proba, threshold)?)))
        .collect::<Result<Vec<_>>>()?;

    rows.sort_by(|(_, a), (_, b)| descending_nan_last(a.alert_rate, b.alert_rate));

    let models: Vec<&str> = rows.iter().map(|(name, _)| *name).collect();
    let alerts: Vec<u64> = rows.iter().map(|(_, t)| t.alerts as u64).collect();
    let rates: Vec<f64> = rows.iter().map(|(_, t)| t.alert_rate).collect();
    let caught: Vec<u64> = rows.iter().map(|(_, t)| t.frauds_caught as u64).collect();
    let missed: Vec<u64> = rows.iter().map(|(_, t)| t.frauds_missed as u64).collect();
    let precision: Vec<f64> = rows.iter().map(|(_, t)| t.precision).collect();
    let recall: Vec<f64> = rows.iter().map(|(_, t)| t.recall).collect();

    Ok(df!(
        "modelo" => models,
        "alertas_totais" => alerts,
        "pct_alertas" => rates,
        "fraudes_capturadas" => caught,
        "fraudes_perdidas" => missed,
        "precision" => precision,
        "recall" => recall,
    )?)
}

fn descending_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
