//! Missing value imputation strategies

use crate::error::{FraudError, Result};
use super::{numeric_values, string_values};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Fill value used for a categorical column with no observed values
const MISSING_CATEGORY: &str = "missing_value";

/// Strategy for imputing missing values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    /// Replace with median (numeric only)
    Median,
    /// Replace with mode / most frequent value (read as strings)
    MostFrequent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum ImputeValue {
    Numeric(f64),
    String(String),
}

/// Imputer for handling missing values.
///
/// Fill values are learned per column in `fit`; `transform` returns a frame with
/// exactly the fitted columns, in fit order and without nulls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
    fill_values: Vec<(String, ImputeValue)>,
    is_fitted: bool,
}

impl Imputer {
    /// Create a new imputer with the specified strategy
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            fill_values: Vec::new(),
            is_fitted: false,
        }
    }

    /// Fit the imputer to the data
    pub fn fit<S: AsRef<str>>(&mut self, df: &DataFrame, columns: &[S]) -> Result<&mut Self> {
        self.fill_values = columns
            .iter()
            .map(|col| {
                let col = col.as_ref();
                let value = self.compute_fill_value(df, col)?;
                Ok((col.to_string(), value))
            })
            .collect::<Result<Vec<_>>>()?;

        self.is_fitted = true;
        Ok(self)
    }

    /// Transform the data by imputing missing values
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(FraudError::NotFitted);
        }

        let columns = self
            .fill_values
            .iter()
            .map(|(col_name, fill_value)| self.fill_column(df, col_name, fill_value))
            .collect::<Result<Vec<Column>>>()?;

        Ok(DataFrame::new(columns)?)
    }

    /// Fit and transform in one step
    pub fn fit_transform<S: AsRef<str>>(&mut self, df: &DataFrame, columns: &[S]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    pub fn strategy(&self) -> &ImputeStrategy {
        &self.strategy
    }

    /// Learned numeric fill value for a column
    pub fn numeric_fill_value(&self, column: &str) -> Option<f64> {
        self.fill_values.iter().find_map(|(name, value)| match value {
            ImputeValue::Numeric(v) if name == column => Some(*v),
            _ => None,
        })
    }

    /// Learned categorical fill value for a column
    pub fn string_fill_value(&self, column: &str) -> Option<&str> {
        self.fill_values.iter().find_map(|(name, value)| match value {
            ImputeValue::String(v) if name == column => Some(v.as_str()),
            _ => None,
        })
    }

    fn compute_fill_value(&self, df: &DataFrame, col: &str) -> Result<ImputeValue> {
        match self.strategy {
            ImputeStrategy::Median => {
                let mut observed: Vec<f64> = numeric_values(df, col)?.into_iter().flatten().collect();
                let median = compute_median(&mut observed).unwrap_or_else(|| {
                    warn!(column = col, "No observed values, imputing 0.0");
                    0.0
                });
                Ok(ImputeValue::Numeric(median))
            }
            ImputeStrategy::MostFrequent => {
                let values = string_values(df, col)?;
                let mode = compute_mode_string(values.iter().flatten()).unwrap_or_else(|| {
                    warn!(column = col, fill = MISSING_CATEGORY, "No observed values");
                    MISSING_CATEGORY.to_string()
                });
                Ok(ImputeValue::String(mode))
            }
        }
    }

    fn fill_column(&self, df: &DataFrame, col_name: &str, fill_value: &ImputeValue) -> Result<Column> {
        match fill_value {
            ImputeValue::Numeric(val) => {
                let filled: Vec<f64> = numeric_values(df, col_name)?
                    .into_iter()
                    .map(|opt| opt.unwrap_or(*val))
                    .collect();
                Ok(Column::new(col_name.into(), filled))
            }
            ImputeValue::String(val) => {
                let filled: Vec<String> = string_values(df, col_name)?
                    .into_iter()
                    .map(|opt| opt.unwrap_or_else(|| val.clone()))
                    .collect();
                Ok(Column::new(col_name.into(), filled))
            }
        }
    }
}

/// Median of the values, averaging the two middle values for even counts
pub(crate) fn compute_median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Most frequent value; ties go to the lexicographically smallest value
fn compute_mode_string<'a>(values: impl Iterator<Item = &'a String>) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for val in values {
        *counts.entry(val.as_str()).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .max_by(|(va, ca), (vb, cb)| ca.cmp(cb).then_with(|| vb.cmp(va)))
        .map(|(v, _)| v.to_string())
}
