//! One-hot encoding of categorical columns

use crate::error::{FraudError, Result};
use super::string_values;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One-hot encoder.
///
/// The vocabulary of each column is learned at fit time and kept sorted. A
/// category not seen during fit encodes as all zeros for its column group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneHotEncoder {
    // column name -> sorted categories
    vocabularies: Vec<(String, Vec<String>)>,
    is_fitted: bool,
}

impl Default for OneHotEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl OneHotEncoder {
    /// Create a new encoder
    pub fn new() -> Self {
        Self {
            vocabularies: Vec::new(),
            is_fitted: false,
        }
    }

    /// Fit the encoder to the data
    pub fn fit<S: AsRef<str>>(&mut self, df: &DataFrame, columns: &[S]) -> Result<&mut Self> {
        self.vocabularies = columns
            .iter()
            .map(|col| {
                let col = col.as_ref();
                let categories: BTreeSet<String> =
                    string_values(df, col)?.into_iter().flatten().collect();
                Ok((col.to_string(), categories.into_iter().collect()))
            })
            .collect::<Result<Vec<_>>>()?;

        self.is_fitted = true;
        Ok(self)
    }

    /// Encode the fitted columns. The result holds only indicator columns,
    /// grouped by source column in fit order.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(FraudError::NotFitted);
        }

        let mut columns = Vec::with_capacity(self.n_output_columns());
        for (col_name, categories) in &self.vocabularies {
            let values = string_values(df, col_name)?;
            for category in categories {
                let indicator: Vec<f64> = values
                    .iter()
                    .map(|v| if v.as_deref() == Some(category.as_str()) { 1.0 } else { 0.0 })
                    .collect();
                columns.push(Column::new(
                    indicator_name(col_name, category).into(),
                    indicator,
                ));
            }
        }

        Ok(DataFrame::new(columns)?)
    }

    /// Fit and transform in one step
    pub fn fit_transform<S: AsRef<str>>(&mut self, df: &DataFrame, columns: &[S]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Learned categories of a column, sorted
    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.vocabularies
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, cats)| cats.as_slice())
    }

    /// Output column names, in transform order
    pub fn feature_names_out(&self) -> Vec<String> {
        self.vocabularies
            .iter()
            .flat_map(|(col, cats)| cats.iter().map(move |cat| indicator_name(col, cat)))
            .collect()
    }

    pub fn n_output_columns(&self) -> usize {
        self.vocabularies.iter().map(|(_, cats)| cats.len()).sum()
    }
}

fn indicator_name(column: &str, category: &str) -> String {
    format!("{}_{}", column, category)
}
