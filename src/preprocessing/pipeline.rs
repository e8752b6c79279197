//! Column preprocessing pipeline

use crate::error::{FraudError, Result};
use super::{
    config::PreprocessingConfig,
    encoder::OneHotEncoder,
    frame_to_array,
    imputer::{Imputer, ImputeStrategy},
    scaler::Scaler,
    sparse::CsrMatrix,
};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// Transform output in the form selected by `sparse_output`
#[derive(Debug, Clone, PartialEq)]
pub enum PreprocessorOutput {
    Dense(Array2<f64>),
    Sparse(CsrMatrix),
}

/// Two-branch column transformer.
///
/// Numeric branch: median imputation, then optional standard scaling.
/// Categorical branch: most-frequent imputation, then one-hot encoding.
/// Columns outside both lists are dropped. Output columns are the numeric
/// features in list order followed by the indicator groups of each categorical
/// feature in list order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnPreprocessor {
    config: PreprocessingConfig,
    numeric_features: Vec<String>,
    categorical_features: Vec<String>,
    numeric_imputer: Option<Imputer>,
    categorical_imputer: Option<Imputer>,
    scaler: Option<Scaler>,
    encoder: Option<OneHotEncoder>,
    feature_names_out: Vec<String>,
    is_fitted: bool,
    /// Timing: seconds spent in last fit call
    fit_time: Option<f64>,
}

impl Default for ColumnPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnPreprocessor {
    /// Create a preprocessor over the registry feature lists, without scaling
    pub fn new() -> Self {
        Self::with_config(PreprocessingConfig::default())
    }

    /// Create a new preprocessor with custom configuration
    pub fn with_config(config: PreprocessingConfig) -> Self {
        Self {
            numeric_features: config.resolved_numeric_features(),
            categorical_features: config.resolved_categorical_features(),
            config,
            numeric_imputer: None,
            categorical_imputer: None,
            scaler: None,
            encoder: None,
            feature_names_out: Vec::new(),
            is_fitted: false,
            fit_time: None,
        }
    }

    /// Learn medians, modes, scaling statistics and vocabularies from `df`
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        let start = Instant::now();

        let mut numeric_imputer = Imputer::new(ImputeStrategy::Median);
        let imputed_numeric = numeric_imputer.fit_transform(df, &self.numeric_features)?;

        let scaler = if self.config.scale_numeric {
            let mut scaler = Scaler::new();
            scaler.fit(&imputed_numeric, &self.numeric_features)?;
            Some(scaler)
        } else {
            None
        };

        let mut categorical_imputer = Imputer::new(ImputeStrategy::MostFrequent);
        let imputed_categorical = categorical_imputer.fit_transform(df, &self.categorical_features)?;

        let mut encoder = OneHotEncoder::new();
        encoder.fit(&imputed_categorical, &self.categorical_features)?;

        self.feature_names_out = self
            .numeric_features
            .iter()
            .cloned()
            .chain(encoder.feature_names_out())
            .collect();
        self.numeric_imputer = Some(numeric_imputer);
        self.categorical_imputer = Some(categorical_imputer);
        self.scaler = scaler;
        self.encoder = Some(encoder);
        self.is_fitted = true;

        let elapsed = start.elapsed().as_secs_f64();
        self.fit_time = Some(elapsed);
        debug!(
            rows = df.height(),
            n_numeric = self.numeric_features.len(),
            n_categorical = self.categorical_features.len(),
            n_output = self.feature_names_out.len(),
            scaled = self.config.scale_numeric,
            elapsed_secs = elapsed,
            "Preprocessor fitted"
        );
        Ok(self)
    }

    /// Transform a table into the fitted output columns (all Float64)
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let (numeric_imputer, categorical_imputer, encoder) = match (
            &self.numeric_imputer,
            &self.categorical_imputer,
            &self.encoder,
        ) {
            (Some(n), Some(c), Some(e)) if self.is_fitted => (n, c, e),
            _ => return Err(FraudError::NotFitted),
        };

        let mut numeric = numeric_imputer.transform(df)?;
        if let Some(ref scaler) = self.scaler {
            numeric = scaler.transform(&numeric)?;
        }

        let categorical = categorical_imputer.transform(df)?;
        let indicators = encoder.transform(&categorical)?;

        let columns: Vec<Column> = numeric
            .get_columns()
            .iter()
            .chain(indicators.get_columns().iter())
            .cloned()
            .collect();

        Ok(DataFrame::new(columns)?)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<DataFrame> {
        self.fit(df)?;
        self.transform(df)
    }

    /// Transform into a dense row-major matrix, columns as in [`Self::feature_names_out`]
    pub fn transform_array(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let transformed = self.transform(df)?;
        frame_to_array(&transformed, &self.feature_names_out)
    }

    /// Transform into compressed sparse rows
    pub fn transform_sparse(&self, df: &DataFrame) -> Result<CsrMatrix> {
        Ok(CsrMatrix::from_dense(&self.transform_array(df)?))
    }

    /// Transform into the form selected by the `sparse_output` setting
    pub fn transform_output(&self, df: &DataFrame) -> Result<PreprocessorOutput> {
        if self.config.sparse_output {
            self.transform_sparse(df).map(PreprocessorOutput::Sparse)
        } else {
            self.transform_array(df).map(PreprocessorOutput::Dense)
        }
    }

    /// Output column names; fails before fit
    pub fn feature_names_out(&self) -> Result<&[String]> {
        if !self.is_fitted {
            return Err(FraudError::NotFitted);
        }
        Ok(&self.feature_names_out)
    }

    pub fn config(&self) -> &PreprocessingConfig {
        &self.config
    }

    pub fn numeric_features(&self) -> &[String] {
        &self.numeric_features
    }

    pub fn categorical_features(&self) -> &[String] {
        &self.categorical_features
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Fitted one-hot encoder, for inspecting vocabularies
    pub fn encoder(&self) -> Option<&OneHotEncoder> {
        self.encoder.as_ref()
    }

    /// Seconds spent in the last fit call
    pub fn fit_time(&self) -> Option<f64> {
        self.fit_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_dataframe() -> DataFrame {
        df!(
            "idade" => &[Some(25.0), Some(30.0), None, Some(40.0), Some(45.0)],
            "renda" => &[50000.0, 60000.0, 70000.0, 80000.0, 90000.0],
            "cidade" => &[Some("SP"), Some("RJ"), Some("SP"), None, Some("BH")],
            "id" => &[1i64, 2, 3, 4, 5],
        )
        .unwrap()
    }

    fn preprocessor(scale: bool) -> ColumnPreprocessor {
        ColumnPreprocessor::with_config(
            PreprocessingConfig::new()
                .with_numeric_features(["idade", "renda"])
                .with_categorical_features(["cidade"])
                .with_scale_numeric(scale),
        )
    }

    #[test]
    fn test_preprocessor_creation() {
        let preprocessor = preprocessor(false);
        assert!(!preprocessor.is_fitted());
        assert!(preprocessor.transform(&create_test_dataframe()).is_err());
    }

    #[test]
    fn test_output_layout() {
        let df = create_test_dataframe();
        let mut preprocessor = preprocessor(false);
        let result = preprocessor.fit_transform(&df).unwrap();

        assert_eq!(
            preprocessor.feature_names_out().unwrap(),
            &["idade", "renda", "cidade_BH", "cidade_RJ", "cidade_SP"]
        );
        assert_eq!(result.width(), 5);
        assert_eq!(result.height(), 5);
        // "id" is dropped
        assert!(result.column("id").is_err());
    }

    #[test]
    fn test_imputation_before_encoding() {
        let df = create_test_dataframe();
        let mut preprocessor = preprocessor(false);
        let result = preprocessor.fit_transform(&df).unwrap();

        // Median of [25, 30, 40, 45]
        let idade = result.column("idade").unwrap().f64().unwrap();
        assert_eq!(idade.get(2), Some(35.0));

        // Missing city takes the mode "SP"
        let sp = result.column("cidade_SP").unwrap().f64().unwrap();
        assert_eq!(sp.get(3), Some(1.0));
    }

    #[test]
    fn test_scaling_uses_fit_statistics() {
        let df = create_test_dataframe();
        let mut preprocessor = preprocessor(true);
        let result = preprocessor.fit_transform(&df).unwrap();

        let renda = result.column("renda").unwrap().f64().unwrap();
        assert!(renda.mean().unwrap().abs() < 1e-10);
    }

    #[test]
    fn test_transform_is_idempotent() {
        let df = create_test_dataframe();
        let mut preprocessor = preprocessor(true);
        preprocessor.fit(&df).unwrap();

        let first = preprocessor.transform_array(&df).unwrap();
        let second = preprocessor.transform_array(&df).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_sparse_output_matches_dense() {
        let df = create_test_dataframe();
        let mut preprocessor = ColumnPreprocessor::with_config(
            preprocessor(false).config().clone().with_sparse_output(true),
        );
        preprocessor.fit(&df).unwrap();

        let dense = preprocessor.transform_array(&df).unwrap();
        match preprocessor.transform_output(&df).unwrap() {
            PreprocessorOutput::Sparse(csr) => assert_eq!(csr.to_dense(), dense),
            PreprocessorOutput::Dense(_) => panic!("expected sparse output"),
        }
    }

    #[test]
    fn test_missing_configured_column() {
        let df = create_test_dataframe().drop("renda").unwrap();
        let mut preprocessor = preprocessor(false);
        assert!(matches!(preprocessor.fit(&df), Err(FraudError::FeatureNotFound(_))));
    }
}
