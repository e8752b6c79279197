//! Random Forest implementation

use crate::error::{FraudError, Result};
use super::config::{DecisionTreeParams, RandomForestParams};
use super::decision_tree::DecisionTree;
use super::models::{
    check_n_features, labels_from_proba, two_column_proba, validate_training_data, Estimator,
};
use ndarray::{Array1, Array2};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

/// Strategy for max features
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of n_features, rounded down
    Sqrt,
    /// Log2 of n_features, rounded down
    Log2,
    /// Fraction of n_features
    Fraction(f64),
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

impl MaxFeatures {
    /// Number of features examined per split, at least 1
    pub fn resolve(&self, n_features: usize) -> usize {
        match *self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().floor() as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).floor() as usize,
            MaxFeatures::Fixed(n) => n.min(n_features),
            MaxFeatures::All => n_features,
        }
        .max(1)
    }
}

/// Random Forest classifier.
///
/// Tree `i` draws its bootstrap sample and its own tree seed from a `ChaCha8Rng`
/// seeded with `random_state + i`, so a fit does not depend on how rayon schedules
/// the trees. A bootstrap sample is passed to its tree as per-row draw counts, so
/// `min_samples_leaf` and `min_samples_split` count distinct transactions.
/// Probabilities are the mean of the per-tree leaf fractions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    pub params: RandomForestParams,
    pub random_state: Option<u64>,
    /// Individual trees
    trees: Vec<DecisionTree>,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
    /// Number of features
    n_features: usize,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomForest {
    /// Create a new classifier forest
    pub fn new() -> Self {
        Self::with_params(RandomForestParams::default())
    }

    pub fn with_params(params: RandomForestParams) -> Self {
        Self {
            params,
            random_state: None,
            trees: Vec::new(),
            feature_importances: None,
            n_features: 0,
        }
    }

    /// Set number of trees
    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.params.n_estimators = n_estimators;
        self
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.params.max_depth = depth;
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.params.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.params.min_samples_leaf = min_samples;
        self
    }

    /// Set max features strategy
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.params.max_features = max_features;
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.params.bootstrap = bootstrap;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit the forest to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        validate_training_data(x, y)?;
        if self.params.n_estimators == 0 {
            return Err(FraudError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let start = Instant::now();
        let n_samples = x.nrows();
        let n_features = x.ncols();
        self.n_features = n_features;

        let tree_params = DecisionTreeParams {
            max_depth: self.params.max_depth,
            min_samples_split: self.params.min_samples_split,
            min_samples_leaf: self.params.min_samples_leaf,
            max_features: Some(self.params.max_features.resolve(n_features)),
        };
        let base_seed = self.random_state.unwrap_or(0);
        let bootstrap = self.params.bootstrap;

        // Build trees in parallel
        let trees: Vec<DecisionTree> = (0..self.params.n_estimators)
            .into_par_iter()
            .map(|tree_idx| -> Result<DecisionTree> {
                let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(tree_idx as u64));

                let mut tree = DecisionTree::with_params(tree_params.clone())
                    .with_random_state(rng.next_u64());

                if bootstrap {
                    // Draw counts become sample weights
                    let mut counts = vec![0.0; n_samples];
                    for _ in 0..n_samples {
                        counts[rng.gen_range(0..n_samples)] += 1.0;
                    }
                    tree.fit_weighted(x, y, &counts)?;
                } else {
                    tree.fit(x, y)?;
                }

                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        self.compute_feature_importances();

        debug!(
            n_samples,
            n_features,
            n_trees = self.trees.len(),
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Random forest fitted"
        );
        Ok(self)
    }

    fn compute_feature_importances(&mut self) {
        let mut total_importances = Array1::<f64>::zeros(self.n_features);
        for tree in &self.trees {
            if let Some(imp) = tree.feature_importances() {
                total_importances += imp;
            }
        }

        let total = total_importances.sum();
        if total > 0.0 {
            total_importances /= total;
        }
        self.feature_importances = Some(total_importances);
    }

    /// Mean fraud probability over the trees
    pub fn predict_positive(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(FraudError::NotFitted);
        }
        check_n_features(self.n_features, x)?;

        let per_tree: Vec<Array1<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict_positive(x))
            .collect::<Result<Vec<_>>>()?;

        // Summed in tree order so the result does not depend on thread scheduling
        let mut sum = Array1::<f64>::zeros(x.nrows());
        for p in &per_tree {
            sum += p;
        }

        Ok(sum / self.trees.len() as f64)
    }

    /// Predict class probabilities, columns (legitimate, fraud)
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        Ok(two_column_proba(&self.predict_positive(x)?))
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(labels_from_proba(&self.predict_positive(x)?))
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Get number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }
}

impl Estimator for RandomForest {
    fn name(&self) -> &str {
        "RandomForest"
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        RandomForest::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        RandomForest::predict(self, x)
    }

    fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    fn supports_proba(&self) -> bool {
        true
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        RandomForest::predict_proba(self, x)
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.feature_importances.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::decision_tree::TreeNode;
    use ndarray::array;

    fn small_forest(n_estimators: usize) -> RandomForest {
        RandomForest::new()
            .with_n_estimators(n_estimators)
            .with_min_samples_split(2)
            .with_min_samples_leaf(1)
            .with_random_state(42)
    }

    fn clustered_data() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.1],
            [0.2, 0.2],
            [0.3, 0.1],
            [1.0, 1.0],
            [1.1, 1.1],
            [1.2, 1.2],
            [1.3, 1.1],
        ];
        let y = array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_max_features_resolution() {
        assert_eq!(MaxFeatures::Sqrt.resolve(37), 6);
        assert_eq!(MaxFeatures::Log2.resolve(1), 1);
        assert_eq!(MaxFeatures::Fixed(100).resolve(10), 10);
        assert_eq!(MaxFeatures::All.resolve(5), 5);
    }

    #[test]
    fn test_classifier() {
        let (x, y) = clustered_data();
        let mut rf = small_forest(25);
        rf.fit(&x, &y).unwrap();

        let predictions = rf.predict(&x).unwrap();
        let accuracy = predictions
            .iter()
            .zip(y.iter())
            .filter(|(p, a)| (*p - *a).abs() < 0.5)
            .count() as f64
            / y.len() as f64;

        assert!(accuracy >= 0.8, "Accuracy too low: {}", accuracy);
        assert_eq!(rf.n_trees(), 25);
    }

    #[test]
    fn test_predict_proba() {
        let (x, y) = clustered_data();
        let mut rf = small_forest(10);
        rf.fit(&x, &y).unwrap();

        let proba = rf.predict_proba(&x).unwrap();
        assert_eq!(proba.shape(), &[8, 2]);

        // Probabilities should sum to 1
        for (i, row) in proba.rows().into_iter().enumerate() {
            let row_sum: f64 = row.sum();
            assert!((row_sum - 1.0).abs() < 1e-6, "Row {} sum: {}", i, row_sum);
            assert!(row[1] >= 0.0 && row[1] <= 1.0);
        }
    }

    #[test]
    fn test_same_seed_same_probabilities() {
        let (x, y) = clustered_data();
        let mut a = small_forest(15);
        let mut b = small_forest(15);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        assert_eq!(a.predict_positive(&x).unwrap(), b.predict_positive(&x).unwrap());
    }

    #[test]
    fn test_feature_importances_sum_to_one() {
        let (x, y) = clustered_data();
        let mut rf = small_forest(10);
        rf.fit(&x, &y).unwrap();

        let importances = rf.feature_importances().unwrap();
        assert_eq!(importances.len(), 2);
        assert!((importances.sum() - 1.0).abs() < 1e-9);
    }

    fn collect_leaf_sizes(node: &TreeNode, sizes: &mut Vec<usize>) {
        match node {
            TreeNode::Leaf { n_samples, .. } => sizes.push(*n_samples),
            TreeNode::Split { left, right, .. } => {
                collect_leaf_sizes(left, sizes);
                collect_leaf_sizes(right, sizes);
            }
        }
    }

    #[test]
    fn test_leaf_minimum_counts_distinct_rows() {
        let n = 60;
        let x = Array2::from_shape_fn((n, 2), |(i, j)| if j == 0 { i as f64 } else { ((i * 7) % n) as f64 });
        let y = Array1::from_shape_fn(n, |i| if i >= 30 { 1.0 } else { 0.0 });

        let mut rf = RandomForest::new()
            .with_n_estimators(5)
            .with_max_features(MaxFeatures::All)
            .with_min_samples_split(10)
            .with_min_samples_leaf(5)
            .with_random_state(3);
        rf.fit(&x, &y).unwrap();

        for tree in rf.trees() {
            let root = tree.root().unwrap();
            let root_rows = match root {
                TreeNode::Leaf { n_samples, .. } | TreeNode::Split { n_samples, .. } => *n_samples,
            };
            // Repeated draws collapse to one row
            assert!(root_rows < n);

            let mut sizes = Vec::new();
            collect_leaf_sizes(root, &mut sizes);
            assert!(sizes.iter().all(|&s| s >= 5), "leaf sizes {:?}", sizes);
        }
    }

    #[test]
    fn test_not_fitted() {
        let rf = RandomForest::new();
        assert!(matches!(rf.predict(&array![[1.0]]), Err(FraudError::NotFitted)));
    }
}
