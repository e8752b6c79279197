//! Evaluation metrics
//!
//! Holdout classification metrics, confusion matrix, cross-validation report
//! consolidation and the operational alert trade-off between models.

mod classification;
mod operational;
mod report;
pub mod ranking;

pub use classification::{
    compute_classification_metrics, compute_confusion_matrix, ConfusionMatrix, HoldoutResults,
    DEFAULT_METRICS,
};
pub use operational::{operational_tradeoff, tradeoff_table, OperationalTradeoff};
pub use ranking::{average_precision, roc_auc};
pub use report::{consolidate_cv_results, holdout_results_to_dataframe, CvSummary, MetricStats};
