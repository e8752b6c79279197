//! Preprocessing configuration

use crate::features::{CATEGORICAL_FEATURES, NUMERIC_FEATURES};
use serde::{Deserialize, Serialize};

/// Configuration for the column preprocessor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    /// Numeric feature columns (None = registry list)
    pub numeric_features: Option<Vec<String>>,

    /// Categorical feature columns (None = registry list)
    pub categorical_features: Option<Vec<String>>,

    /// Standardize numeric features after imputation
    pub scale_numeric: bool,

    /// Prefer compressed sparse rows for the transform output
    pub sparse_output: bool,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            numeric_features: None,
            categorical_features: None,
            scale_numeric: false,
            sparse_output: false,
        }
    }
}

impl PreprocessingConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set numeric features
    pub fn with_numeric_features<S: Into<String>>(mut self, cols: impl IntoIterator<Item = S>) -> Self {
        self.numeric_features = Some(cols.into_iter().map(Into::into).collect());
        self
    }

    /// Builder method to set categorical features
    pub fn with_categorical_features<S: Into<String>>(mut self, cols: impl IntoIterator<Item = S>) -> Self {
        self.categorical_features = Some(cols.into_iter().map(Into::into).collect());
        self
    }

    /// Builder method to enable numeric scaling
    pub fn with_scale_numeric(mut self, scale: bool) -> Self {
        self.scale_numeric = scale;
        self
    }

    /// Builder method to select sparse output
    pub fn with_sparse_output(mut self, sparse: bool) -> Self {
        self.sparse_output = sparse;
        self
    }

    /// Numeric columns after applying the registry default.
    /// An empty list counts as not given.
    pub fn resolved_numeric_features(&self) -> Vec<String> {
        resolve(&self.numeric_features, NUMERIC_FEATURES)
    }

    /// Categorical columns after applying the registry default
    pub fn resolved_categorical_features(&self) -> Vec<String> {
        resolve(&self.categorical_features, CATEGORICAL_FEATURES)
    }
}

fn resolve(given: &Option<Vec<String>>, default: &[&str]) -> Vec<String> {
    match given {
        Some(cols) if !cols.is_empty() => cols.clone(),
        _ => default.iter().map(|s| s.to_string()).collect(),
    }
}
