//! Model recipes and experiment configuration

use crate::error::{FraudError, Result};
use crate::preprocessing::DEFAULT_MISSING_THRESHOLD;
use super::random_forest::MaxFeatures;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Seed used by every recipe unless the caller picks another one
pub const DEFAULT_RANDOM_STATE: u64 = 42;

/// Per-class sample weighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassWeight {
    /// Every sample weighs 1
    Uniform,
    /// Weight of class c is n_samples / (n_classes * count_c)
    Balanced,
}

/// Logistic regression hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegressionParams {
    /// Inverse L2 regularization strength
    pub c: f64,
    pub class_weight: ClassWeight,
    /// L-BFGS iteration cap
    pub max_iter: usize,
    /// Stop when the largest gradient component falls below this
    pub tol: f64,
    /// History size of the L-BFGS curvature pairs
    pub memory: usize,
    pub fit_intercept: bool,
}

impl Default for LogisticRegressionParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            class_weight: ClassWeight::Balanced,
            max_iter: 2000,
            tol: 1e-4,
            memory: 10,
            fit_intercept: true,
        }
    }
}

/// Decision tree hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features examined per split (None = all)
    pub max_features: Option<usize>,
}

impl Default for DecisionTreeParams {
    fn default() -> Self {
        Self {
            max_depth: Some(6),
            min_samples_split: 100,
            min_samples_leaf: 50,
            max_features: None,
        }
    }
}

/// Random forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 300,
            max_depth: None,
            min_samples_split: 100,
            min_samples_leaf: 50,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
        }
    }
}

/// Settings shared by a modelling run: seed, decision threshold and diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub random_state: u64,
    /// Probability at or above which a transaction is flagged
    pub threshold: f64,
    /// Missing ratio above which a column is reported
    pub missing_threshold: f64,
    /// Value substituted for precision/recall/F1 when the denominator is zero
    pub zero_division: f64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            random_state: DEFAULT_RANDOM_STATE,
            threshold: 0.5,
            missing_threshold: DEFAULT_MISSING_THRESHOLD,
            zero_division: 0.0,
        }
    }
}

impl ExperimentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_missing_threshold(mut self, threshold: f64) -> Self {
        self.missing_threshold = threshold;
        self
    }

    pub fn with_zero_division(mut self, value: f64) -> Self {
        self.zero_division = value;
        self
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(invalid("threshold", self.threshold, "must be within [0, 1]"));
        }
        if self.missing_threshold.is_nan() {
            return Err(invalid("missing_threshold", self.missing_threshold, "must be a number"));
        }
        if self.zero_division != 0.0 && self.zero_division != 1.0 {
            return Err(invalid("zero_division", self.zero_division, "must be 0 or 1"));
        }
        Ok(())
    }

    /// Parse and validate a JSON document; absent keys keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Save to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

fn invalid(name: &str, value: f64, reason: &str) -> FraudError {
    FraudError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipe_defaults() {
        let lr = LogisticRegressionParams::default();
        assert_eq!(lr.c, 1.0);
        assert_eq!(lr.class_weight, ClassWeight::Balanced);
        assert_eq!(lr.max_iter, 2000);

        let dt = DecisionTreeParams::default();
        assert_eq!(dt.max_depth, Some(6));
        assert_eq!((dt.min_samples_split, dt.min_samples_leaf), (100, 50));

        let rf = RandomForestParams::default();
        assert_eq!(rf.n_estimators, 300);
        assert_eq!(rf.max_depth, None);
        assert!(rf.bootstrap);
    }

    #[test]
    fn test_experiment_config_partial_json() {
        let config = ExperimentConfig::from_json_str(r#"{"threshold": 0.3}"#).unwrap();
        assert_eq!(config.threshold, 0.3);
        assert_eq!(config.random_state, DEFAULT_RANDOM_STATE);
        assert_eq!(config.missing_threshold, 0.3);
    }

    #[test]
    fn test_experiment_config_validation() {
        assert!(ExperimentConfig::new().validate().is_ok());
        assert!(matches!(
            ExperimentConfig::new().with_threshold(1.5).validate(),
            Err(FraudError::InvalidParameter { .. })
        ));
        assert!(ExperimentConfig::from_json_str(r#"{"zero_division": 0.5}"#).is_err());
        assert!(matches!(
            ExperimentConfig::from_json_str("not json"),
            Err(FraudError::Serialization(_))
        ));
    }

    #[test]
    fn test_experiment_config_file_roundtrip() {
        let path = std::env::temp_dir().join(format!("experiment_config_{}.json", std::process::id()));
        let config = ExperimentConfig::new().with_random_state(7).with_threshold(0.25);
        config.save(&path).unwrap();
        let loaded = ExperimentConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);
    }
}
