//! Ticket Fraud - fraud-detection modelling layer for ticketing transactions
//!
//! This crate provides everything between the engineered feature table and the
//! evaluation report:
//! - Feature registry with the canonical column roles and validation
//! - Column preprocessing: imputation, scaling, one-hot encoding
//! - Three model recipes: logistic regression, decision tree, random forest
//! - Holdout metrics, CV consolidation and operational alert trade-offs
//!
//! # Modules
//!
//! - [`features`] - Column roles, feature names and feature-set validation
//! - [`preprocessing`] - Column preprocessor and missing-value diagnostics
//! - [`training`] - Estimators, model pipelines and experiment configuration
//! - [`metrics`] - Classification metrics and report tables
//!
//! # Example
//!
//! ```no_run
//! use ticket_fraud::prelude::*;
//! use polars::prelude::*;
//!
//! # fn run(train: &DataFrame, holdout: &DataFrame) -> ticket_fraud::Result<()> {
//! let x_train = feature_frame(train)?;
//! let y_train = target_from_frame(train)?;
//! let x_test = feature_frame(holdout)?;
//! let y_test = target_from_frame(holdout)?;
//!
//! for (name, mut pipeline) in get_models(DEFAULT_RANDOM_STATE) {
//!     fit_model(&mut pipeline, &x_train, &y_train)?;
//!     let proba = predict_proba(&pipeline, &x_test)?;
//!     let results = compute_classification_metrics(&y_test, &proba, 0.5, 0.0)?;
//!     println!("{}: PR-AUC {:.3}", name, results.pr_auc);
//! }
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// Feature registry
pub mod features;

// Core ML modules
pub mod preprocessing;
pub mod training;
pub mod metrics;

pub use error::{FraudError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{FraudError, Result};

    // Feature registry
    pub use crate::features::{
        feature_frame, get_feature_names, get_features, target_from_frame, validate_feature_set,
        validate_frame, FeatureRoles, TARGET_COLUMN,
    };

    // Preprocessing
    pub use crate::preprocessing::{
        build_preprocessor, check_missing_ratio, get_feature_names_after_preprocessing,
        split_feature_groups, ColumnPreprocessor, PreprocessingConfig,
    };

    // Training
    pub use crate::training::{
        fit_model, get_models, predict_proba, DecisionTree, Estimator, ExperimentConfig,
        LogisticRegression, ModelPipeline, RandomForest, DEFAULT_RANDOM_STATE,
    };

    // Metrics
    pub use crate::metrics::{
        compute_classification_metrics, compute_confusion_matrix, consolidate_cv_results,
        holdout_results_to_dataframe, operational_tradeoff, tradeoff_table, CvSummary,
        HoldoutResults,
    };
}
