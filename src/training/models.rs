//! Estimator trait and shared training checks

use crate::error::{FraudError, Result};
use ndarray::{Array1, Array2};
use std::fmt::Debug;
use tracing::warn;

/// Binary classifier over a dense feature matrix.
///
/// Labels are 0.0 (legitimate) and 1.0 (fraud). Probability matrices have two
/// columns, the second being the fraud probability.
pub trait Estimator: Send + Sync + Debug {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Fit the estimator to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Hard class labels
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    fn is_fitted(&self) -> bool;

    /// Whether [`Estimator::predict_proba`] is available
    fn supports_proba(&self) -> bool {
        false
    }

    /// Class probabilities, shape (n_samples, 2)
    fn predict_proba(&self, _x: &Array2<f64>) -> Result<Array2<f64>> {
        Err(FraudError::Capability(format!(
            "{} does not produce class probabilities",
            self.name()
        )))
    }

    /// Get feature importances (if available)
    fn feature_importances(&self) -> Option<Array1<f64>> {
        None
    }
}

/// Reject training sets the estimators cannot learn from.
///
/// A single-class target is allowed; the fitted model then predicts that class.
pub(crate) fn validate_training_data(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    let n_samples = x.nrows();

    if n_samples != y.len() {
        return Err(FraudError::length_mismatch("y", n_samples, y.len()));
    }

    if n_samples == 0 {
        return Err(FraudError::InvalidInput("empty training set".to_string()));
    }

    if let Some(label) = y.iter().find(|&&v| v != 0.0 && v != 1.0) {
        return Err(FraudError::InvalidInput(format!(
            "labels must be 0 or 1, found {}",
            label
        )));
    }

    if x.iter().any(|v| !v.is_finite()) {
        return Err(FraudError::InvalidInput(
            "feature matrix contains NaN or infinite values".to_string(),
        ));
    }

    let positives = count_positives(y);
    if positives == 0 || positives == n_samples {
        warn!(n_samples, positives, "Training target has a single class");
    }

    Ok(())
}

/// Reject a prediction matrix whose width differs from the training one
pub(crate) fn check_n_features(expected: usize, x: &Array2<f64>) -> Result<()> {
    if x.ncols() != expected {
        return Err(FraudError::Shape {
            expected: format!("{} features", expected),
            actual: format!("{} features", x.ncols()),
        });
    }
    Ok(())
}

pub(crate) fn count_positives(y: &Array1<f64>) -> usize {
    y.iter().filter(|&&v| v == 1.0).count()
}

/// Stack fraud probabilities into the (negative, positive) column layout
pub(crate) fn two_column_proba(positive: &Array1<f64>) -> Array2<f64> {
    Array2::from_shape_fn((positive.len(), 2), |(i, j)| {
        if j == 1 {
            positive[i]
        } else {
            1.0 - positive[i]
        }
    })
}

/// Labels from fraud probabilities; a tie goes to the negative class
pub(crate) fn labels_from_proba(positive: &Array1<f64>) -> Array1<f64> {
    positive.mapv(|p| if p > 0.5 { 1.0 } else { 0.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[derive(Debug)]
    struct Constant;

    impl Estimator for Constant {
        fn name(&self) -> &str {
            "Constant"
        }

        fn fit(&mut self, _x: &Array2<f64>, _y: &Array1<f64>) -> Result<()> {
            Ok(())
        }

        fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
            Ok(Array1::zeros(x.nrows()))
        }

        fn is_fitted(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_default_proba_is_capability_error() {
        let model = Constant;
        assert!(!model.supports_proba());
        assert!(model.feature_importances().is_none());
        assert!(matches!(
            model.predict_proba(&Array2::zeros((1, 1))),
            Err(FraudError::Capability(_))
        ));
    }

    #[test]
    fn test_validate_training_data() {
        let x = array![[1.0], [2.0]];
        assert!(validate_training_data(&x, &array![0.0, 1.0]).is_ok());
        assert!(validate_training_data(&x, &array![1.0, 1.0]).is_ok());
        assert!(matches!(
            validate_training_data(&x, &array![0.0]),
            Err(FraudError::Shape { .. })
        ));
        assert!(matches!(
            validate_training_data(&x, &array![0.0, 2.0]),
            Err(FraudError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_training_data(&Array2::zeros((0, 3)), &Array1::zeros(0)),
            Err(FraudError::InvalidInput(_))
        ));
        assert!(validate_training_data(&array![[f64::NAN], [1.0]], &array![0.0, 1.0]).is_err());
    }

    #[test]
    fn test_proba_helpers() {
        let p = array![0.2, 0.5, 0.9];
        let proba = two_column_proba(&p);
        assert_eq!(proba.shape(), &[3, 2]);
        assert!((proba[[0, 0]] - 0.8).abs() < 1e-12);
        assert_eq!(labels_from_proba(&p), array![0.0, 0.0, 1.0]);
    }
}
