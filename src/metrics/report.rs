//! Report tables for holdout and cross-validation results

use crate::error::{FraudError, Result};
use super::classification::HoldoutResults;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

const METRIC_COLUMN_ALIASES: [&str; 3] = ["metrica", "metric", "index"];

/// Long-format holdout table with columns `metrica` and `valor`
pub fn holdout_results_to_dataframe(results: &HoldoutResults) -> Result<DataFrame> {
    let (names, values): (Vec<&str>, Vec<f64>) = results.to_pairs().into_iter().unzip();
    Ok(df!(
        "metrica" => names,
        "valor" => values,
    )?)
}

/// Mean and standard deviation of one metric across folds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    pub mean: f64,
    pub std: f64,
}

impl MetricStats {
    /// Population statistics (ddof = 0) of fold scores. NaN for no scores.
    pub fn from_scores(scores: &[f64]) -> Self {
        let n = scores.len() as f64;
        let mean = scores.iter().sum::<f64>() / n;
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        Self { mean, std: variance.sqrt() }
    }
}

/// Cross-validation summary of one model.
///
/// `Mapping` keeps metric order as given. `Table` is an already tabulated summary
/// with a metric-name column plus `mean`/`std` columns.
#[derive(Debug, Clone)]
pub enum CvSummary {
    Mapping(Vec<(String, MetricStats)>),
    Table(DataFrame),
}

impl CvSummary {
    /// Summarise per-fold scores keyed by metric name
    pub fn from_fold_scores<S: AsRef<str>>(scores: &[(S, Vec<f64>)]) -> Self {
        CvSummary::Mapping(
            scores
                .iter()
                .map(|(metric, folds)| (metric.as_ref().to_string(), MetricStats::from_scores(folds)))
                .collect(),
        )
    }
}

impl TryFrom<Value> for CvSummary {
    type Error = FraudError;

    /// `{metric: {"mean": x, "std": y}}` becomes a mapping; `{column: [...]}` a table.
    fn try_from(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(FraudError::TypeMismatch(format!(
                "cv summary must be a JSON object, got {}",
                json_kind(&value)
            )));
        };

        if map.values().all(Value::is_object) {
            let stats = map
                .into_iter()
                .map(|(metric, stats)| {
                    let field = |key: &str| stats.get(key).and_then(Value::as_f64).unwrap_or(f64::NAN);
                    let parsed = MetricStats { mean: field("mean"), std: field("std") };
                    (metric, parsed)
                })
                .collect();
            return Ok(CvSummary::Mapping(stats));
        }

        if map.values().all(Value::is_array) {
            let columns = map
                .into_iter()
                .map(|(name, values)| json_column(&name, values))
                .collect::<Result<Vec<_>>>()?;
            return Ok(CvSummary::Table(DataFrame::new(columns)?));
        }

        Err(FraudError::TypeMismatch(
            "cv summary values must all be objects or all be arrays".to_string(),
        ))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn json_column(name: &str, values: Value) -> Result<Column> {
    let Value::Array(items) = values else {
        return Err(FraudError::TypeMismatch(format!("column '{}' is not an array", name)));
    };

    let is_text = items.iter().any(Value::is_string)
        && items.iter().all(|v| v.is_string() || v.is_null());
    if is_text {
        let text: Vec<Option<String>> = items.iter().map(|v| v.as_str().map(str::to_string)).collect();
        return Ok(Column::new(name.into(), text));
    }

    let numbers = items
        .iter()
        .map(|v| match v {
            Value::Null => Ok(None),
            other => other.as_f64().map(Some).ok_or_else(|| {
                FraudError::TypeMismatch(format!("column '{}' mixes numbers and {}", name, json_kind(other)))
            }),
        })
        .collect::<Result<Vec<Option<f64>>>>()?;
    Ok(Column::new(name.into(), numbers))
}

/// Long-format CV table with columns `modelo`, `metrica`, `mean`, `std`.
///
/// A `Table` must carry a metric column (`metrica`, `metric` or `index`, else the
/// first text column) and `mean`/`std` columns, matched case-insensitively.
pub fn consolidate_cv_results(summary: &CvSummary, model_name: &str) -> Result<DataFrame> {
    let (metrics, means, stds) = match summary {
        CvSummary::Mapping(stats) => {
            let metrics: Vec<String> = stats.iter().map(|(m, _)| m.clone()).collect();
            let means: Vec<Option<f64>> = stats.iter().map(|(_, s)| Some(s.mean)).collect();
            let stds: Vec<Option<f64>> = stats.iter().map(|(_, s)| Some(s.std)).collect();
            (metrics, means, stds)
        }
        CvSummary::Table(df) => table_columns(df)?,
    };

    let models = vec![model_name; metrics.len()];
    Ok(df!(
        "modelo" => models,
        "metrica" => metrics,
        "mean" => means,
        "std" => stds,
    )?)
}

type CvColumns = (Vec<String>, Vec<Option<f64>>, Vec<Option<f64>>);

fn table_columns(df: &DataFrame) -> Result<CvColumns> {
    let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
    let by_lower: BTreeMap<String, &str> = names.iter().map(|n| (n.to_lowercase(), n.as_str())).collect();

    let metric_col = METRIC_COLUMN_ALIASES
        .iter()
        .find_map(|alias| by_lower.get(*alias).copied())
        .or_else(|| {
            df.get_columns()
                .iter()
                .find(|c| matches!(c.dtype(), DataType::String))
                .map(|c| c.name().as_str())
        });

    let (Some(metric_col), Some(mean_col), Some(std_col)) =
        (metric_col, by_lower.get("mean").copied(), by_lower.get("std").copied())
    else {
        return Err(FraudError::Shape {
            expected: "a metric column plus 'mean' and 'std' columns".to_string(),
            actual: format!("columns {:?}", names),
        });
    };

    let metrics = df
        .column(metric_col)?
        .cast(&DataType::String)?
        .str()?
        .into_iter()
        .map(|m| m.unwrap_or_default().to_string())
        .collect();
    let stat = |col: &str| -> Result<Vec<Option<f64>>> {
        Ok(df.column(col)?.cast(&DataType::Float64)?.f64()?.into_iter().collect())
    };

    Ok((metrics, stat(mean_col)?, stat(std_col)?))
}
