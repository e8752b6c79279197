//! Integration test: feature registry and frame validation

use polars::prelude::*;
use std::collections::HashSet;
use ticket_fraud::features::{
    feature_frame, get_feature_names, get_features, target_from_frame, validate_feature_set,
    validate_frame, CATEGORICAL_FEATURES, NUMERIC_FEATURES, TARGET_COLUMN, TRACKING_COLUMNS,
};
use ticket_fraud::FraudError;

fn registry_frame(n_rows: usize) -> DataFrame {
    let mut columns: Vec<Column> = Vec::new();
    columns.push(Column::new("id_transacao".into(), (0..n_rows as i64).collect::<Vec<_>>()));
    for name in CATEGORICAL_FEATURES {
        columns.push(Column::new((*name).into(), vec!["a"; n_rows]));
    }
    for name in NUMERIC_FEATURES {
        columns.push(Column::new((*name).into(), vec![1.0; n_rows]));
    }
    columns.push(Column::new(
        TARGET_COLUMN.into(),
        (0..n_rows).map(|i| (i % 2) as i32).collect::<Vec<_>>(),
    ));
    DataFrame::new(columns).unwrap()
}

#[test]
fn test_feature_names_are_unique_and_ordered() {
    let names = get_feature_names();
    assert_eq!(names.len(), 37);
    assert_eq!(names.iter().collect::<HashSet<_>>().len(), 37);
    assert_eq!(&names[..3], CATEGORICAL_FEATURES);
    assert_eq!(names[3], NUMERIC_FEATURES[0]);
}

#[test]
fn test_roles_exclude_tracking_and_target() {
    let roles = get_features();
    let names = get_feature_names();
    assert!(!names.contains(&roles.target.to_string()));
    for col in TRACKING_COLUMNS {
        assert!(!names.contains(&col.to_string()));
    }
    assert_eq!(roles.as_map().len(), 4);
}

#[test]
fn test_validate_superset_and_missing() {
    let mut columns = get_feature_names();
    columns.push("coluna_extra".to_string());
    assert!(validate_feature_set(&columns).is_ok());

    columns.retain(|c| c != "periodo_dia" && c != "hora_transacao");
    match validate_feature_set(&columns) {
        Err(FraudError::MissingFeatures { missing }) => {
            assert_eq!(missing, vec!["hora_transacao".to_string(), "periodo_dia".to_string()]);
        }
        other => panic!("expected MissingFeatures, got {:?}", other),
    }
}

#[test]
fn test_feature_frame_selects_canonical_columns() {
    let df = registry_frame(4);
    assert!(validate_frame(&df).is_ok());

    let features = feature_frame(&df).unwrap();
    let names: Vec<String> = features.get_column_names().iter().map(|n| n.to_string()).collect();
    assert_eq!(names, get_feature_names());
    assert_eq!(features.height(), 4);
}

#[test]
fn test_target_from_frame() {
    let df = registry_frame(4);
    let y = target_from_frame(&df).unwrap();
    assert_eq!(y.to_vec(), vec![0.0, 1.0, 0.0, 1.0]);

    let without_target = df.drop(TARGET_COLUMN).unwrap();
    assert!(matches!(
        target_from_frame(&without_target),
        Err(FraudError::FeatureNotFound(_))
    ));
}
