//! Preprocessor + estimator pipelines and the project's model recipes

use crate::error::{FraudError, Result};
use crate::preprocessing::{build_preprocessor, ColumnPreprocessor};
use super::config::{DecisionTreeParams, LogisticRegressionParams, RandomForestParams};
use super::decision_tree::DecisionTree;
use super::linear_models::LogisticRegression;
use super::models::Estimator;
use super::random_forest::RandomForest;
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::time::Instant;
use tracing::info;

pub const LOGISTIC_REGRESSION_NAME: &str = "Regressão Logística";
pub const DECISION_TREE_NAME: &str = "Árvore de Decisão";
pub const RANDOM_FOREST_NAME: &str = "Random Forest";

/// Column preprocessor followed by an estimator.
///
/// `fit` learns the preprocessing statistics and the estimator from the same
/// table; prediction reuses both without refitting.
#[derive(Debug)]
pub struct ModelPipeline {
    preprocessor: ColumnPreprocessor,
    estimator: Box<dyn Estimator>,
}

impl ModelPipeline {
    pub fn new(preprocessor: ColumnPreprocessor, estimator: Box<dyn Estimator>) -> Self {
        Self { preprocessor, estimator }
    }

    /// Fit preprocessing and estimator on a feature table and 0/1 target
    pub fn fit(&mut self, df: &DataFrame, y: &Array1<f64>) -> Result<&mut Self> {
        if df.height() != y.len() {
            return Err(FraudError::length_mismatch("y", df.height(), y.len()));
        }

        // Staged on a copy; a failed estimator fit keeps the previous state
        let start = Instant::now();
        let mut preprocessor = self.preprocessor.clone();
        preprocessor.fit(df)?;
        let x = preprocessor.transform_array(df)?;
        self.estimator.fit(&x, y)?;
        self.preprocessor = preprocessor;

        info!(
            estimator = self.estimator.name(),
            n_samples = x.nrows(),
            n_features = x.ncols(),
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Pipeline fitted"
        );
        Ok(self)
    }

    fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted() {
            return Err(FraudError::NotFitted);
        }
        self.preprocessor.transform_array(df)
    }

    /// Hard labels; a fraud probability of exactly 0.5 is labelled legitimate
    pub fn predict(&self, df: &DataFrame) -> Result<Array1<f64>> {
        self.estimator.predict(&self.transform(df)?)
    }

    /// Two-column probability matrix, columns (legitimate, fraud)
    pub fn predict_proba(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.estimator.supports_proba() {
            return Err(FraudError::Capability(format!(
                "{} does not support predict_proba",
                self.estimator.name()
            )));
        }
        self.estimator.predict_proba(&self.transform(df)?)
    }

    /// Estimator importances paired with the post-preprocessing column names.
    /// `None` when the estimator has no importances.
    pub fn feature_importances(&self) -> Result<Option<Vec<(String, f64)>>> {
        let names = self.preprocessor.feature_names_out()?;
        Ok(self.estimator.feature_importances().map(|importances| {
            names.iter().cloned().zip(importances.iter().copied()).collect()
        }))
    }

    pub fn preprocessor(&self) -> &ColumnPreprocessor {
        &self.preprocessor
    }

    pub fn estimator(&self) -> &dyn Estimator {
        self.estimator.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.preprocessor.is_fitted() && self.estimator.is_fitted()
    }
}

/// Logistic regression baseline: scaled numerics, L2, balanced class weights
pub fn build_logistic_regression(random_state: u64) -> ModelPipeline {
    let estimator = LogisticRegression::with_params(LogisticRegressionParams::default())
        .with_random_state(random_state);
    ModelPipeline::new(build_preprocessor(None, None, true, false), Box::new(estimator))
}

/// Depth-limited decision tree on unscaled features
pub fn build_decision_tree(random_state: u64) -> ModelPipeline {
    let estimator =
        DecisionTree::with_params(DecisionTreeParams::default()).with_random_state(random_state);
    ModelPipeline::new(build_preprocessor(None, None, false, false), Box::new(estimator))
}

/// Random forest on unscaled features, trees fitted in parallel
pub fn build_random_forest(random_state: u64) -> ModelPipeline {
    let estimator =
        RandomForest::with_params(RandomForestParams::default()).with_random_state(random_state);
    ModelPipeline::new(build_preprocessor(None, None, false, false), Box::new(estimator))
}

/// The three evaluated models, unfitted, in report order
pub fn get_models(random_state: u64) -> Vec<(String, ModelPipeline)> {
    vec![
        (LOGISTIC_REGRESSION_NAME.to_string(), build_logistic_regression(random_state)),
        (DECISION_TREE_NAME.to_string(), build_decision_tree(random_state)),
        (RANDOM_FOREST_NAME.to_string(), build_random_forest(random_state)),
    ]
}

/// Fit a pipeline in place and hand it back
pub fn fit_model<'a>(
    pipeline: &'a mut ModelPipeline,
    x: &DataFrame,
    y: &Array1<f64>,
) -> Result<&'a mut ModelPipeline> {
    pipeline.fit(x, y)
}

/// Fraud probability of each row; `Capability` error for estimators without
/// probability support
pub fn predict_proba(pipeline: &ModelPipeline, x: &DataFrame) -> Result<Array1<f64>> {
    let proba = pipeline.predict_proba(x)?;
    Ok(proba.column(1).to_owned())
}
