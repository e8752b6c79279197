//! Model training module
//!
//! The three supervised models evaluated for fraud detection, each wrapped with
//! the column preprocessor in a [`ModelPipeline`]:
//! - Logistic regression (L2, balanced class weights, L-BFGS) on scaled features
//! - Decision tree (Gini, depth-limited)
//! - Random forest (bootstrap, sqrt features, trees fitted in parallel)

mod config;
mod models;
mod pipeline;
pub mod linear_models;
pub mod decision_tree;
pub mod random_forest;

pub use config::{
    ClassWeight, DecisionTreeParams, ExperimentConfig, LogisticRegressionParams,
    RandomForestParams, DEFAULT_RANDOM_STATE,
};
pub use models::Estimator;
pub use pipeline::{
    build_decision_tree, build_logistic_regression, build_random_forest, fit_model, get_models,
    predict_proba, ModelPipeline, DECISION_TREE_NAME, LOGISTIC_REGRESSION_NAME,
    RANDOM_FOREST_NAME,
};
pub use linear_models::LogisticRegression;
pub use decision_tree::{DecisionTree, TreeNode};
pub use random_forest::{MaxFeatures, RandomForest};
