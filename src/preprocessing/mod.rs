//! Data preprocessing module
//!
//! Column-wise preprocessing for the fraud models:
//! - Median imputation and optional standard scaling for numeric features
//! - Most-frequent imputation and one-hot encoding for categorical features
//! - Post-transform feature names, dense and sparse outputs
//! - Diagnostics: missing-value ratios and categorical/numeric splitting

mod config;
mod imputer;
mod scaler;
mod encoder;
mod pipeline;
pub mod diagnostics;
pub mod sparse;

pub use config::PreprocessingConfig;
pub use imputer::{Imputer, ImputeStrategy};
pub use scaler::Scaler;
pub use encoder::OneHotEncoder;
pub use pipeline::{ColumnPreprocessor, PreprocessorOutput};
pub use diagnostics::{
    check_missing_ratio, check_missing_ratio_json, split_feature_groups,
    DEFAULT_MISSING_THRESHOLD,
};
pub use sparse::CsrMatrix;

use crate::error::{FraudError, Result};
use ndarray::Array2;
use polars::prelude::*;

/// Build the project's column preprocessor.
///
/// `None` (or an empty list) selects the registry's canonical feature lists.
/// `scale_numeric` adds standard scaling to the numeric branch, which the linear
/// model needs. `sparse_output` makes [`ColumnPreprocessor::transform_output`]
/// return compressed sparse rows instead of a dense matrix.
pub fn build_preprocessor(
    numeric_features: Option<Vec<String>>,
    categorical_features: Option<Vec<String>>,
    scale_numeric: bool,
    sparse_output: bool,
) -> ColumnPreprocessor {
    let mut config = PreprocessingConfig::new()
        .with_scale_numeric(scale_numeric)
        .with_sparse_output(sparse_output);
    if let Some(cols) = numeric_features {
        config = config.with_numeric_features(cols);
    }
    if let Some(cols) = categorical_features {
        config = config.with_categorical_features(cols);
    }
    ColumnPreprocessor::with_config(config)
}

/// Output column names of a fitted preprocessor, including one-hot columns
pub fn get_feature_names_after_preprocessing(preprocessor: &ColumnPreprocessor) -> Result<Vec<String>> {
    preprocessor.feature_names_out().map(|names| names.to_vec())
}

/// Check if dtype can be read as a number
pub(crate) fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
            | DataType::Boolean
    )
}

/// Read a numeric column as floats. Nulls and NaN are both reported as `None`.
pub(crate) fn numeric_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| FraudError::FeatureNotFound(name.to_string()))?;

    if !is_numeric_dtype(column.dtype()) {
        return Err(FraudError::DataError(format!(
            "column '{}' has dtype {} but is configured as numeric",
            name,
            column.dtype()
        )));
    }

    let as_f64 = column.cast(&DataType::Float64)?;
    Ok(as_f64
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Read a categorical column as strings, casting non-string columns
pub(crate) fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| FraudError::FeatureNotFound(name.to_string()))?;
    let as_str = column.cast(&DataType::String)?;
    Ok(as_str
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}

/// Extract named columns from a DataFrame into a row-major `Array2<f64>`.
/// Nulls become NaN.
pub(crate) fn frame_to_array(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = col_names.len();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|col_name| {
            Ok(numeric_values(df, col_name)?
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect())
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_data[c][r]))
}
