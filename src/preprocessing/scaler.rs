//! Standard scaling: (x - mean) / std

use crate::error::{FraudError, Result};
use super::numeric_values;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Parameters for a fitted column
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScalerParams {
    column: String,
    center: f64,
    scale: f64,
}

/// Feature scaler.
///
/// Uses the population standard deviation; a constant column keeps scale 1 so it
/// maps to zeros instead of NaN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

impl Default for Scaler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scaler {
    /// Create a new scaler
    pub fn new() -> Self {
        Self {
            params: Vec::new(),
            is_fitted: false,
        }
    }

    /// Fit the scaler to the data
    pub fn fit<S: AsRef<str>>(&mut self, df: &DataFrame, columns: &[S]) -> Result<&mut Self> {
        self.params = columns
            .iter()
            .map(|col| {
                let col = col.as_ref();
                let values: Vec<f64> = numeric_values(df, col)?.into_iter().flatten().collect();
                let (center, scale) = mean_and_scale(&values);
                Ok(ScalerParams {
                    column: col.to_string(),
                    center,
                    scale,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        self.is_fitted = true;
        Ok(self)
    }

    /// Transform the data.
    /// Fitted columns are replaced in place; other columns pass through.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(FraudError::NotFitted);
        }

        let replacements = self
            .params
            .iter()
            .map(|params| {
                let scaled: Vec<Option<f64>> = numeric_values(df, &params.column)?
                    .into_iter()
                    .map(|opt| opt.map(|v| (v - params.center) / params.scale))
                    .collect();
                Ok(Column::new(params.column.as_str().into(), scaled))
            })
            .collect::<Result<Vec<Column>>>()?;

        let mut result = df.clone();
        for scaled in replacements {
            result.with_column(scaled)?;
        }

        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform<S: AsRef<str>>(&mut self, df: &DataFrame, columns: &[S]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Learned (mean, scale) of a column
    pub fn params(&self, column: &str) -> Option<(f64, f64)> {
        self.params
            .iter()
            .find(|p| p.column == column)
            .map(|p| (p.center, p.scale))
    }
}

fn mean_and_scale(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 1.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();
    // Near-constant columns are treated as constant
    let scale = if std < 10.0 * f64::EPSILON * mean.abs().max(1.0) { 1.0 } else { std };
    (mean, scale)
}
