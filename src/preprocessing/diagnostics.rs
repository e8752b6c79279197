//! Pre-modelling diagnostics: feature grouping and missing-value ratios

use crate::error::{FraudError, Result};
use crate::features::CATEGORICAL_FEATURES;
use polars::prelude::*;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::debug;

/// Default ratio above which a column is flagged by [`check_missing_ratio`]
pub const DEFAULT_MISSING_THRESHOLD: f64 = 0.3;

/// Partition `columns` into (categorical, numeric), preserving input order.
///
/// A column is categorical when it appears in `categorical_features` (the registry
/// list when `None` or empty). Everything else lands in the numeric group; dtypes
/// are not inspected.
pub fn split_feature_groups<S: AsRef<str>>(
    columns: &[S],
    categorical_features: Option<&[String]>,
) -> (Vec<String>, Vec<String>) {
    let categorical: HashSet<&str> = match categorical_features {
        Some(list) if !list.is_empty() => list.iter().map(String::as_str).collect(),
        _ => CATEGORICAL_FEATURES.iter().copied().collect(),
    };

    columns
        .iter()
        .map(|c| c.as_ref().to_string())
        .partition(|c| categorical.contains(c.as_str()))
}

/// Fraction of missing values per column.
///
/// Null counts as missing everywhere, NaN as well in float columns. The report has
/// columns `coluna`, `missing_ratio` and `above_threshold` (`ratio > threshold`),
/// sorted by descending ratio. On a zero-row frame every ratio is NaN and no column
/// is flagged.
pub fn check_missing_ratio(df: &DataFrame, threshold: f64) -> Result<DataFrame> {
    validate_threshold(threshold)?;

    let n_rows = df.height();
    let ratios = df
        .get_columns()
        .iter()
        .map(|column| {
            let missing = count_missing(column)?;
            Ok((column.name().to_string(), ratio(missing, n_rows)))
        })
        .collect::<Result<Vec<_>>>()?;

    missing_report(ratios, threshold)
}

/// [`check_missing_ratio`] over a column-oriented JSON object
/// (`{"col": [v0, v1, ...], ...}`) where `null` marks a missing value.
///
/// Columns are visited in key order before sorting, so ties come out
/// alphabetically.
pub fn check_missing_ratio_json(value: &Value, threshold: f64) -> Result<DataFrame> {
    validate_threshold(threshold)?;

    let object = value.as_object().ok_or_else(|| {
        FraudError::TypeUnsupported(format!(
            "expected an object of column arrays, got {}",
            json_kind(value)
        ))
    })?;

    let mut n_rows: Option<usize> = None;
    let mut ratios = Vec::with_capacity(object.len());

    for (name, cells) in object {
        let cells = cells.as_array().ok_or_else(|| {
            FraudError::TypeUnsupported(format!(
                "column '{}' must be an array, got {}",
                name,
                json_kind(cells)
            ))
        })?;

        match n_rows {
            Some(expected) if expected != cells.len() => {
                return Err(FraudError::length_mismatch(name, expected, cells.len()));
            }
            _ => n_rows = Some(cells.len()),
        }

        let missing = cells.iter().filter(|v| v.is_null()).count();
        ratios.push((name.clone(), ratio(missing, cells.len())));
    }

    missing_report(ratios, threshold)
}

fn validate_threshold(threshold: f64) -> Result<()> {
    if threshold.is_nan() {
        return Err(FraudError::InvalidParameter {
            name: "threshold".to_string(),
            value: threshold.to_string(),
            reason: "must be a number".to_string(),
        });
    }
    Ok(())
}

fn count_missing(column: &Column) -> Result<usize> {
    match column.dtype() {
        DataType::Float32 | DataType::Float64 => {
            let as_f64 = column.cast(&DataType::Float64)?;
            Ok(as_f64
                .f64()?
                .into_iter()
                .filter(|v| v.map_or(true, f64::is_nan))
                .count())
        }
        _ => Ok(column.null_count()),
    }
}

fn ratio(missing: usize, total: usize) -> f64 {
    if total == 0 {
        f64::NAN
    } else {
        missing as f64 / total as f64
    }
}

/// Sort descending (stable, NaN last) and lay the report out as a frame
fn missing_report(mut ratios: Vec<(String, f64)>, threshold: f64) -> Result<DataFrame> {
    ratios.sort_by(|(_, a), (_, b)| match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.total_cmp(a),
    });

    let flagged = ratios.iter().filter(|(_, r)| *r > threshold).count();
    debug!(columns = ratios.len(), flagged, threshold, "Missing ratio report");

    let names: Vec<String> = ratios.iter().map(|(n, _)| n.clone()).collect();
    let values: Vec<f64> = ratios.iter().map(|(_, r)| *r).collect();
    let above: Vec<bool> = values.iter().map(|r| *r > threshold).collect();

    Ok(DataFrame::new(vec![
        Column::new("coluna".into(), names),
        Column::new("missing_ratio".into(), values),
        Column::new("above_threshold".into(), above),
    ])?)
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_split_feature_groups_default_list() {
        let columns = ["hora_transacao", "periodo_dia", "extra", "temp_faixa"];
        let (cats, nums) = split_feature_groups(&columns, None);
        assert_eq!(cats, vec!["periodo_dia", "temp_faixa"]);
        assert_eq!(nums, vec!["hora_transacao", "extra"]);
    }

    #[test]
    fn test_split_feature_groups_custom_list() {
        let custom = vec!["extra".to_string()];
        let (cats, nums) = split_feature_groups(&["extra", "periodo_dia"], Some(custom.as_slice()));
        assert_eq!(cats, vec!["extra"]);
        assert_eq!(nums, vec!["periodo_dia"]);

        // Empty list falls back to the registry
        let (cats, _) = split_feature_groups(&["extra", "periodo_dia"], Some(&[][..]));
        assert_eq!(cats, vec!["periodo_dia"]);
    }

    #[test]
    fn test_check_missing_ratio() {
        let df = df!(
            "a" => &[Some(1.0), None, Some(f64::NAN), Some(4.0)],
            "b" => &[Some("x"), None, Some("y"), Some("z")],
            "c" => &[1i64, 2, 3, 4],
        )
        .unwrap();

        let report = check_missing_ratio(&df, 0.3).unwrap();
        let names: Vec<_> = report.column("coluna").unwrap().str().unwrap().into_iter().flatten().collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        let ratios = report.column("missing_ratio").unwrap().f64().unwrap();
        assert_eq!(ratios.get(0), Some(0.5));
        assert_eq!(ratios.get(1), Some(0.25));
        assert_eq!(ratios.get(2), Some(0.0));

        let above = report.column("above_threshold").unwrap().bool().unwrap();
        assert_eq!(above.into_iter().collect::<Vec<_>>(), vec![Some(true), Some(false), Some(false)]);
    }

    #[test]
    fn test_check_missing_ratio_empty_frame() {
        let df = df!("a" => Vec::<f64>::new()).unwrap();
        let report = check_missing_ratio(&df, DEFAULT_MISSING_THRESHOLD).unwrap();
        let ratio = report.column("missing_ratio").unwrap().f64().unwrap().get(0).unwrap();
        assert!(ratio.is_nan());
        assert_eq!(report.column("above_threshold").unwrap().bool().unwrap().get(0), Some(false));
    }

    #[test]
    fn test_nan_threshold_rejected() {
        let df = df!("a" => &[1.0]).unwrap();
        assert!(matches!(
            check_missing_ratio(&df, f64::NAN),
            Err(FraudError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_check_missing_ratio_json() {
        let value = json!({"a": [1, null, 3, null], "b": ["x", "y", null, "z"]});
        let report = check_missing_ratio_json(&value, 0.3).unwrap();
        assert_eq!(report.height(), 2);
        let ratios = report.column("missing_ratio").unwrap().f64().unwrap();
        assert_eq!(ratios.get(0), Some(0.5));
    }

    #[test]
    fn test_check_missing_ratio_json_rejects_non_tables() {
        assert!(matches!(
            check_missing_ratio_json(&json!([1, 2, 3]), 0.3),
            Err(FraudError::TypeUnsupported(_))
        ));
        assert!(matches!(
            check_missing_ratio_json(&json!({"a": 1}), 0.3),
            Err(FraudError::TypeUnsupported(_))
        ));
        assert!(matches!(
            check_missing_ratio_json(&json!({"a": [1, 2], "b": [1]}), 0.3),
            Err(FraudError::Shape { .. })
        ));
    }
}
