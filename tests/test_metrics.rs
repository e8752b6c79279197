//! Integration test: holdout metrics and report tables

use ndarray::{array, Array1};
use serde_json::json;
use ticket_fraud::metrics::{
    compute_classification_metrics, compute_confusion_matrix, consolidate_cv_results,
    holdout_results_to_dataframe, operational_tradeoff, tradeoff_table, CvSummary,
};
use ticket_fraud::FraudError;

fn reference_scores() -> (Array1<f64>, Array1<f64>) {
    (array![0.0, 0.0, 1.0, 1.0], array![0.1, 0.4, 0.35, 0.8])
}

#[test]
fn test_reference_holdout_metrics() {
    let (y_true, y_proba) = reference_scores();
    let results = compute_classification_metrics(&y_true, &y_proba, 0.5, 0.0).unwrap();

    assert!((results.pr_auc - 0.8333).abs() < 1e-4);
    assert!((results.roc_auc - 0.75).abs() < 1e-12);
    assert_eq!(results.precision, 1.0);
    assert_eq!(results.recall, 0.5);
    assert!((results.f1 - 0.667).abs() < 1e-3);

    let table = holdout_results_to_dataframe(&results).unwrap();
    assert_eq!(table.height(), 5);
}

#[test]
fn test_all_negative_holdout() {
    let y_true = Array1::zeros(4);
    let y_proba = array![0.1, 0.6, 0.2, 0.9];
    let results = compute_classification_metrics(&y_true, &y_proba, 0.5, 0.0).unwrap();

    assert!(results.roc_auc.is_nan());
    assert_eq!(results.precision, 0.0);
    assert_eq!(results.recall, 0.0);
    assert_eq!(results.f1, 0.0);
}

#[test]
fn test_confusion_matrix_layout() {
    let (y_true, y_proba) = reference_scores();
    let cm = compute_confusion_matrix(&y_true, &y_proba, 0.5).unwrap();
    assert_eq!((cm.tn, cm.fp, cm.fn_, cm.tp), (2, 0, 1, 1));

    let df = cm.to_dataframe().unwrap();
    let rows: Vec<&str> = df.column("rotulo").unwrap().str().unwrap().into_no_null_iter().collect();
    assert_eq!(rows, vec!["Real: Não Fraude", "Real: Fraude"]);
}

#[test]
fn test_operational_reference_case() {
    let stats = operational_tradeoff(&array![0.0, 1.0, 1.0, 0.0], &array![0.2, 0.9, 0.3, 0.6], 0.5).unwrap();
    assert_eq!(stats.alerts, 2);
    assert_eq!(stats.alert_rate, 0.5);
    assert_eq!(stats.frauds_caught, 1);
    assert_eq!(stats.frauds_missed, 1);
}

#[test]
fn test_tradeoff_table_ties_keep_each_model_once() {
    let y_true = array![0.0, 1.0, 1.0, 0.0];
    let models = vec![
        ("Regressão Logística".to_string(), array![0.7, 0.9, 0.3, 0.1]),
        ("Árvore de Decisão".to_string(), array![0.1, 0.9, 0.8, 0.2]),
        ("Random Forest".to_string(), array![0.6, 0.9, 0.8, 0.7]),
    ];
    let df = tradeoff_table(&y_true, &models, 0.5).unwrap();

    let names: Vec<&str> = df.column("modelo").unwrap().str().unwrap().into_no_null_iter().collect();
    assert_eq!(names, vec!["Random Forest", "Regressão Logística", "Árvore de Decisão"]);

    let rates: Vec<f64> = df.column("pct_alertas").unwrap().f64().unwrap().into_no_null_iter().collect();
    assert!(rates.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn test_consolidate_mapping_summary() {
    let summary = CvSummary::try_from(json!({"pr_auc": {"mean": 0.8, "std": 0.02}})).unwrap();
    let df = consolidate_cv_results(&summary, "ModelX").unwrap();

    assert_eq!(df.shape(), (1, 4));
    assert_eq!(df.column("metrica").unwrap().str().unwrap().get(0), Some("pr_auc"));
    assert_eq!(df.column("std").unwrap().f64().unwrap().get(0), Some(0.02));
}

#[test]
fn test_consolidate_from_fold_scores() {
    let summary = CvSummary::from_fold_scores(&[
        ("pr_auc", vec![0.7, 0.8, 0.9]),
        ("roc_auc", vec![0.9, 0.9, 0.9]),
    ]);
    let df = consolidate_cv_results(&summary, "Random Forest").unwrap();

    assert_eq!(df.height(), 2);
    let means = df.column("mean").unwrap().f64().unwrap();
    assert!((means.get(0).unwrap() - 0.8).abs() < 1e-12);
    assert!(df.column("std").unwrap().f64().unwrap().get(1).unwrap() < 1e-12);
}

#[test]
fn test_invalid_inputs() {
    let (y_true, _) = reference_scores();
    assert!(matches!(
        compute_classification_metrics(&y_true, &array![0.1, 0.2], 0.5, 0.0),
        Err(FraudError::Shape { .. })
    ));
    assert!(matches!(
        compute_classification_metrics(&array![0.0, 3.0], &array![0.1, 0.2], 0.5, 0.0),
        Err(FraudError::InvalidInput(_))
    ));
    assert!(matches!(CvSummary::try_from(json!("pr_auc")), Err(FraudError::TypeMismatch(_))));
}
