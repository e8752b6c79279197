//! Decision tree classifier

use crate::error::{FraudError, Result};
use super::config::DecisionTreeParams;
use super::models::{
    check_n_features, labels_from_proba, two_column_proba, validate_training_data, Estimator,
};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node holding the fraction of fraud samples that reached it
    Leaf {
        value: f64,
        n_samples: usize,
    },
    /// Internal node with split; `x[feature] <= threshold` goes left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Best split of one node
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// Binary decision tree using Gini impurity.
///
/// Leaves store class fractions, so `predict_proba` returns the share of fraud
/// training samples in the leaf. With sample weights the fractions, impurities
/// and importances are weighted, while `min_samples_split` and
/// `min_samples_leaf` still count distinct rows. Features are visited in an order drawn from
/// `random_state`; equal-gain splits resolve to the first feature in that order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub params: DecisionTreeParams,
    pub random_state: Option<u64>,
    /// Tree root
    root: Option<TreeNode>,
    /// Number of features
    n_features: usize,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    /// Create a new classifier tree
    pub fn new() -> Self {
        Self::with_params(DecisionTreeParams::default())
    }

    pub fn with_params(params: DecisionTreeParams) -> Self {
        Self {
            params,
            random_state: None,
            root: None,
            n_features: 0,
            feature_importances: None,
        }
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

    /// Examine at most this many randomly drawn features per split
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.params.max_features = max_features;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        validate_training_data(x, y)?;
        let indices: Vec<usize> = (0..x.nrows()).collect();
        self.fit_rows(x, y, indices, &vec![1.0; x.nrows()])
    }

    /// Fit on the rows with a positive weight; `weights` is indexed by row of `x`.
    /// Inputs must already have passed `validate_training_data`.
    pub(crate) fn fit_weighted(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        weights: &[f64],
    ) -> Result<&mut Self> {
        if weights.len() != x.nrows() {
            return Err(FraudError::length_mismatch("sample_weight", x.nrows(), weights.len()));
        }
        let indices: Vec<usize> = (0..x.nrows()).filter(|&i| weights[i] > 0.0).collect();
        if indices.is_empty() {
            return Err(FraudError::InvalidInput("all sample weights are zero".to_string()));
        }
        self.fit_rows(x, y, indices, weights)
    }

    fn fit_rows(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: Vec<usize>,
        weights: &[f64],
    ) -> Result<&mut Self> {
        if self.params.min_samples_leaf == 0 {
            return Err(FraudError::InvalidParameter {
                name: "min_samples_leaf".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let n_features = x.ncols();
        self.n_features = n_features;

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(0));
        let mut importances = vec![0.0; n_features];

        let n_rows = indices.len();
        let sample = Sample { x, y, weights };
        let root = self.build_tree(&sample, indices, 0, &mut rng, &mut importances);

        // Normalize feature importances
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));
        self.root = Some(root);

        debug!(
            n_samples = n_rows,
            n_features,
            depth = self.get_depth(),
            leaves = self.get_n_leaves(),
            "Decision tree fitted"
        );
        Ok(self)
    }

    fn build_tree(
        &self,
        sample: &Sample,
        indices: Vec<usize>,
        depth: usize,
        rng: &mut ChaCha8Rng,
        importances: &mut [f64],
    ) -> TreeNode {
        let n_samples = indices.len();
        let (total, positives) = sample.totals(&indices);
        let leaf = TreeNode::Leaf {
            value: positives / total,
            n_samples,
        };

        // Check stopping conditions
        let should_stop = n_samples < self.params.min_samples_split
            || n_samples < 2 * self.params.min_samples_leaf
            || self.params.max_depth.map_or(false, |d| depth >= d)
            || positives == 0.0
            || positives == total;

        if should_stop {
            return leaf;
        }

        let features = self.draw_features(rng);
        let Some(best) = self.find_best_split(sample, &indices, total, positives, &features) else {
            return leaf;
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| sample.x[[i, best.feature_idx]] <= best.threshold);

        importances[best.feature_idx] += total * best.gain;

        let left = Box::new(self.build_tree(sample, left_indices, depth + 1, rng, importances));
        let right = Box::new(self.build_tree(sample, right_indices, depth + 1, rng, importances));

        TreeNode::Split {
            feature_idx: best.feature_idx,
            threshold: best.threshold,
            left,
            right,
            n_samples,
            impurity: gini(positives, total),
        }
    }

    /// Candidate features for one node, in visiting order
    fn draw_features(&self, rng: &mut ChaCha8Rng) -> Vec<usize> {
        let mut features: Vec<usize> = (0..self.n_features).collect();
        features.shuffle(rng);
        let k = self
            .params
            .max_features
            .map_or(self.n_features, |m| m.clamp(1, self.n_features.max(1)));
        features.truncate(k);
        features
    }

    fn find_best_split(
        &self,
        sample: &Sample,
        indices: &[usize],
        total: f64,
        positives: f64,
        features: &[usize],
    ) -> Option<SplitCandidate> {
        let n = indices.len();
        let parent_impurity = gini(positives, total);
        let min_leaf = self.params.min_samples_leaf;

        // Each feature independently finds its best split by sorting and sweeping
        let per_feature: Vec<Option<SplitCandidate>> = features
            .par_iter()
            .map(|&feature_idx| {
                // (value, weight, weighted positive)
                let mut column: Vec<(f64, f64, f64)> = indices
                    .iter()
                    .map(|&i| {
                        let w = sample.weights[i];
                        (sample.x[[i, feature_idx]], w, if sample.y[i] == 1.0 { w } else { 0.0 })
                    })
                    .collect();
                column.sort_by(|a, b| a.0.total_cmp(&b.0));

                let mut best: Option<SplitCandidate> = None;
                let mut left_total = 0.0;
                let mut left_pos = 0.0;

                for split in 1..n {
                    left_total += column[split - 1].1;
                    left_pos += column[split - 1].2;
                    if split < min_leaf || n - split < min_leaf {
                        continue;
                    }
                    let (lo, hi) = (column[split - 1].0, column[split].0);
                    if lo == hi {
                        continue;
                    }

                    let right_total = total - left_total;
                    let right_pos = positives - left_pos;
                    let weighted = (left_total * gini(left_pos, left_total)
                        + right_total * gini(right_pos, right_total))
                        / total;
                    let gain = parent_impurity - weighted;

                    if gain > best.as_ref().map_or(0.0, |b| b.gain) {
                        let mut threshold = lo + (hi - lo) / 2.0;
                        if threshold >= hi {
                            threshold = lo;
                        }
                        best = Some(SplitCandidate { feature_idx, threshold, gain });
                    }
                }
                best
            })
            .collect();

        // Strict comparison keeps the first feature on ties
        per_feature.into_iter().flatten().fold(None, |acc, cand| match acc {
            Some(b) if b.gain >= cand.gain => Some(b),
            _ => Some(cand),
        })
    }

    /// Fraud probability of each row
    pub fn predict_positive(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(FraudError::NotFitted)?;
        check_n_features(self.n_features, x)?;

        let values: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|row| Self::leaf_value(root, row))
            .collect();
        Ok(Array1::from_vec(values))
    }

    fn leaf_value(mut node: &TreeNode, sample: ArrayView1<f64>) -> f64 {
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                    node = if sample[*feature_idx] <= *threshold { left } else { right };
                }
            }
        }
    }

    /// Class probabilities, columns (legitimate, fraud)
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

    pub fn root(&self) -> Option<&TreeNode> {
        self.root.as_ref()
    }

    /// Get tree depth
    pub fn get_depth(&self) -> usize {
        match &self.root {
            None => 0,
            Some(node) => Self::node_depth(node),
        }
    }

    fn node_depth(node: &TreeNode) -> usize {
        match node {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => {
                1 + Self::node_depth(left).max(Self::node_depth(right))
            }
        }
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        match &self.root {
            None => 0,
            Some(node) => Self::count_leaves(node),
        }
    }

    fn count_leaves(node: &TreeNode) -> usize {
        match node {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => Self::count_leaves(left) + Self::count_leaves(right),
        }
    }
}

impl Estimator for DecisionTree {
    fn name(&self) -> &str {
        "DecisionTree"
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        DecisionTree::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        DecisionTree::predict(self, x)
    }

    fn is_fitted(&self) -> bool {
        self.root.is_some()
    }

    fn supports_proba(&self) -> bool {
        true
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        DecisionTree::predict_proba(self, x)
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.feature_importances.clone()
    }
}

/// Training rows with their weights
struct Sample<'a> {
    x: &'a Array2<f64>,
    y: &'a Array1<f64>,
    weights: &'a [f64],
}

impl Sample<'_> {
    /// Total weight and fraud weight of a node
    fn totals(&self, indices: &[usize]) -> (f64, f64) {
        indices.iter().fold((0.0, 0.0), |(total, pos), &i| {
            let w = self.weights[i];
            (total + w, if self.y[i] == 1.0 { pos + w } else { pos })
        })
    }
}

/// Gini impurity of a binary node from (weighted) class counts
fn gini(positives: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    let p = positives / total;
    2.0 * p * (1.0 - p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn small_tree() -> DecisionTree {
        DecisionTree::new()
            .with_min_samples_split(2)
            .with_min_samples_leaf(1)
            .with_random_state(42)
    }

    #[test]
    fn test_classifier_simple() {
        let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = small_tree();
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.predict(&x).unwrap(), y);
        assert_eq!(tree.get_depth(), 1);
        let importances = tree.feature_importances().unwrap();
        assert_eq!(importances[0], 1.0);
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_leaf_probabilities_are_class_fractions() {
        // Leaves of three samples stay mixed
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = array![0.0, 0.0, 1.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new()
            .with_min_samples_split(2)
            .with_min_samples_leaf(3)
            .with_random_state(0);
        tree.fit(&x, &y).unwrap();

        let proba = tree.predict_proba(&x).unwrap();
        assert!((proba[[0, 1]] - 1.0 / 3.0).abs() < 1e-12);
        assert!((proba[[5, 1]] - 2.0 / 3.0).abs() < 1e-12);
        assert!((proba[[0, 0]] + proba[[0, 1]] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_max_depth() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0], [5.0, 1.0], [6.0, 2.0]];
        let y = array![0.0, 1.0, 0.0, 1.0, 0.0, 1.0];

        let mut tree = small_tree().with_max_depth(Some(2));
        tree.fit(&x, &y).unwrap();

        assert!(tree.get_depth() <= 2);
    }

    #[test]
    fn test_min_samples_split_stops_growth() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = small_tree().with_min_samples_split(10);
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.get_n_leaves(), 1);
        assert_eq!(tree.predict_positive(&x).unwrap(), array![0.5, 0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_single_class_target() {
        let x = array![[1.0], [2.0]];
        let y = array![0.0, 0.0];

        let mut tree = small_tree();
        tree.fit(&x, &y).unwrap();
        assert_eq!(tree.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_same_seed_same_tree() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut a = small_tree().with_max_features(Some(1));
        let mut b = small_tree().with_max_features(Some(1));
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        assert_eq!(a.feature_importances(), b.feature_importances());
    }

    #[test]
    fn test_weights_count_toward_fractions_not_leaf_size() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![0.0, 1.0, 1.0, 1.0, 0.0];

        // Row 0 drawn three times, row 4 never; leaves keep two distinct rows
        let mut tree = DecisionTree::new()
            .with_min_samples_split(2)
            .with_min_samples_leaf(2)
            .with_random_state(0);
        tree.fit_weighted(&x, &y, &[3.0, 1.0, 1.0, 1.0, 0.0]).unwrap();

        assert_eq!(tree.get_n_leaves(), 2);
        let proba = tree.predict_positive(&x).unwrap();
        assert!((proba[0] - 0.25).abs() < 1e-12);
        assert_eq!(proba[3], 1.0);
    }

    #[test]
    fn test_unit_weights_match_plain_fit() {
        let x = array![[1.0, 4.0], [2.0, 3.0], [3.0, 2.0], [4.0, 1.0], [5.0, 5.0]];
        let y = array![0.0, 0.0, 1.0, 1.0, 1.0];

        let mut plain = small_tree();
        let mut weighted = small_tree();
        plain.fit(&x, &y).unwrap();
        weighted.fit_weighted(&x, &y, &[1.0; 5]).unwrap();

        assert_eq!(plain.predict_positive(&x).unwrap(), weighted.predict_positive(&x).unwrap());
        assert_eq!(plain.feature_importances(), weighted.feature_importances());
    }

    #[test]
    fn test_not_fitted() {
        let tree = DecisionTree::new();
        assert!(!Estimator::is_fitted(&tree));
        assert!(matches!(tree.predict(&array![[1.0]]), Err(FraudError::NotFitted)));
    }
}
