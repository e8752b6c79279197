//! Linear models: L2-regularized logistic regression fitted with L-BFGS

use crate::error::{FraudError, Result};
use super::config::{ClassWeight, LogisticRegressionParams};
use super::models::{
    check_n_features, count_positives, labels_from_proba, two_column_proba,
    validate_training_data, Estimator,
};
use ndarray::{s, Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{debug, warn};

/// Sufficient-decrease constant of the Armijo condition
const ARMIJO_C1: f64 = 1e-4;
/// Step halvings before the line search gives up
const MAX_LINE_SEARCH: usize = 40;
/// Relative objective decrease below which the solver stops
const FTOL: f64 = 2.220446049250313e-9;

/// Logistic regression for binary classification.
///
/// Minimizes `0.5 * ||w||^2 + C * sum_i sw_i * logloss_i` where `sw_i` is the class
/// weight of sample `i`. The intercept is not penalized. The objective is divided
/// by `C * sum(sw)` before optimization, which leaves the minimizer unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub params: LogisticRegressionParams,
    /// Accepted for API symmetry; the solver is deterministic
    pub random_state: Option<u64>,
    coefficients: Option<Array1<f64>>,
    intercept: Option<f64>,
    n_iter: usize,
    converged: bool,
    is_fitted: bool,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    /// Create a new logistic regression model
    pub fn new() -> Self {
        Self::with_params(LogisticRegressionParams::default())
    }

    pub fn with_params(params: LogisticRegressionParams) -> Self {
        Self {
            params,
            random_state: None,
            coefficients: None,
            intercept: None,
            n_iter: 0,
            converged: false,
            is_fitted: false,
        }
    }

    /// Set inverse regularization strength
    pub fn with_c(mut self, c: f64) -> Self {
        self.params.c = c;
        self
    }

    pub fn with_class_weight(mut self, class_weight: ClassWeight) -> Self {
        self.params.class_weight = class_weight;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.params.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.params.tol = tol;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit the model with L-BFGS
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        validate_training_data(x, y)?;
        if !(self.params.c > 0.0) {
            return Err(FraudError::InvalidParameter {
                name: "C".to_string(),
                value: self.params.c.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let start = Instant::now();
        let sample_weight = self.sample_weights(y);
        let weight_sum = sample_weight.sum();

        let objective = LogisticObjective {
            x,
            y,
            sample_weight: sample_weight / weight_sum,
            alpha: 1.0 / (self.params.c * weight_sum),
            fit_intercept: self.params.fit_intercept,
        };

        let n_params = x.ncols() + usize::from(self.params.fit_intercept);
        let outcome = lbfgs(
            |theta| objective.value_and_grad(theta),
            Array1::zeros(n_params),
            self.params.max_iter,
            self.params.tol,
            self.params.memory.max(1),
        );

        if !outcome.converged {
            warn!(
                max_iter = self.params.max_iter,
                n_iter = outcome.n_iter,
                "L-BFGS did not converge"
            );
        }

        let n_features = x.ncols();
        self.coefficients = Some(outcome.theta.slice(s![..n_features]).to_owned());
        self.intercept = Some(if self.params.fit_intercept {
            outcome.theta[n_features]
        } else {
            0.0
        });
        self.n_iter = outcome.n_iter;
        self.converged = outcome.converged;
        self.is_fitted = true;

        debug!(
            n_samples = x.nrows(),
            n_features,
            n_iter = outcome.n_iter,
            converged = outcome.converged,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "Logistic regression fitted"
        );
        Ok(self)
    }

    fn sample_weights(&self, y: &Array1<f64>) -> Array1<f64> {
        match self.params.class_weight {
            ClassWeight::Uniform => Array1::ones(y.len()),
            ClassWeight::Balanced => {
                let n = y.len() as f64;
                let positives = count_positives(y) as f64;
                let negatives = n - positives;
                // An absent class has no samples to weigh
                let w_pos = if positives > 0.0 { n / (2.0 * positives) } else { 0.0 };
                let w_neg = if negatives > 0.0 { n / (2.0 * negatives) } else { 0.0 };
                y.mapv(|v| if v == 1.0 { w_pos } else { w_neg })
            }
        }
    }

    /// Raw scores `x . w + b`
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (coefficients, intercept) = match (&self.coefficients, self.intercept) {
            (Some(w), Some(b)) if self.is_fitted => (w, b),
            _ => return Err(FraudError::NotFitted),
        };
        check_n_features(coefficients.len(), x)?;
        Ok(x.dot(coefficients) + intercept)
    }

    /// Class probabilities, columns (legitimate, fraud)
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let positive = self.decision_function(x)?.mapv(sigmoid);
        Ok(two_column_proba(&positive))
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let positive = self.decision_function(x)?.mapv(sigmoid);
        Ok(labels_from_proba(&positive))
    }

    /// Fitted weights, one per input column
    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.coefficients.as_ref()
    }

    pub fn intercept(&self) -> Option<f64> {
        self.intercept
    }

    /// Solver iterations used by the last fit
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    pub fn converged(&self) -> bool {
        self.converged
    }
}

impl Estimator for LogisticRegression {
    fn name(&self) -> &str {
        "LogisticRegression"
    }

    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        LogisticRegression::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        LogisticRegression::predict(self, x)
    }

    fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    fn supports_proba(&self) -> bool {
        true
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        LogisticRegression::predict_proba(self, x)
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// log(1 + exp(z)) without overflow
fn softplus(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

/// Weighted mean log-loss plus L2 penalty on the coefficients.
/// Parameter layout: coefficients, then the intercept when fitted.
struct LogisticObjective<'a> {
    x: &'a Array2<f64>,
    y: &'a Array1<f64>,
    /// Normalized to sum 1
    sample_weight: Array1<f64>,
    alpha: f64,
    fit_intercept: bool,
}

impl LogisticObjective<'_> {
    fn value_and_grad(&self, theta: &Array1<f64>) -> (f64, Array1<f64>) {
        let n_features = self.x.ncols();
        let w: ArrayView1<f64> = theta.slice(s![..n_features]);
        let b = if self.fit_intercept { theta[n_features] } else { 0.0 };

        let z = self.x.dot(&w) + b;
        let mut loss = 0.0;
        let mut residual = Array1::<f64>::zeros(z.len());
        for (i, &zi) in z.iter().enumerate() {
            let sw = self.sample_weight[i];
            loss += sw * (softplus(zi) - self.y[i] * zi);
            residual[i] = sw * (sigmoid(zi) - self.y[i]);
        }
        loss += 0.5 * self.alpha * w.dot(&w);

        let mut grad = Array1::zeros(theta.len());
        grad.slice_mut(s![..n_features])
            .assign(&(self.x.t().dot(&residual) + &(&w * self.alpha)));
        if self.fit_intercept {
            grad[n_features] = residual.sum();
        }

        (loss, grad)
    }
}

struct LbfgsOutcome {
    theta: Array1<f64>,
    n_iter: usize,
    converged: bool,
}

/// Limited-memory BFGS with Armijo backtracking.
///
/// Converged when the largest gradient component is at most `tol`, or when an
/// iteration's relative objective decrease falls below [`FTOL`].
fn lbfgs<F>(f: F, theta0: Array1<f64>, max_iter: usize, tol: f64, memory: usize) -> LbfgsOutcome
where
    F: Fn(&Array1<f64>) -> (f64, Array1<f64>),
{
    let mut theta = theta0;
    let (mut fx, mut grad) = f(&theta);
    // (s, y, 1 / s.y), oldest first
    let mut history: VecDeque<(Array1<f64>, Array1<f64>, f64)> = VecDeque::with_capacity(memory);

    for iter in 0..max_iter {
        if inf_norm(&grad) <= tol {
            return LbfgsOutcome { theta, n_iter: iter, converged: true };
        }

        let mut direction = two_loop_direction(&grad, &history);
        let mut slope = grad.dot(&direction);
        if slope >= 0.0 {
            // Curvature pairs gave an ascent direction; restart from steepest descent
            history.clear();
            direction = -&grad;
            slope = -grad.dot(&grad);
        }

        let mut step = if history.is_empty() {
            (1.0 / grad.dot(&grad).sqrt()).min(1.0)
        } else {
            1.0
        };

        let mut accepted = None;
        for _ in 0..MAX_LINE_SEARCH {
            let candidate = &theta + &(&direction * step);
            let (f_candidate, g_candidate) = f(&candidate);
            if f_candidate.is_finite() && f_candidate <= fx + ARMIJO_C1 * step * slope {
                accepted = Some((candidate, f_candidate, g_candidate));
                break;
            }
            step *= 0.5;
        }

        let Some((next, f_next, g_next)) = accepted else {
            debug!(iter, "Line search failed to decrease the objective");
            return LbfgsOutcome { theta, n_iter: iter, converged: false };
        };

        let s_k = &next - &theta;
        let y_k = &g_next - &grad;
        let sy = s_k.dot(&y_k);
        if sy > 1e-10 {
            if history.len() == memory {
                history.pop_front();
            }
            history.push_back((s_k, y_k, 1.0 / sy));
        }

        let f_prev = fx;
        theta = next;
        fx = f_next;
        grad = g_next;

        if f_prev - fx <= FTOL * f_prev.abs().max(fx.abs()).max(1.0) {
            return LbfgsOutcome { theta, n_iter: iter + 1, converged: true };
        }
    }

    let converged = inf_norm(&grad) <= tol;
    LbfgsOutcome { theta, n_iter: max_iter, converged }
}

/// Approximate `-H^{-1} g` from the stored curvature pairs
fn two_loop_direction(grad: &Array1<f64>, history: &VecDeque<(Array1<f64>, Array1<f64>, f64)>) -> Array1<f64> {
    let mut q = grad.clone();
    let mut alphas = Vec::with_capacity(history.len());

    for (s_k, y_k, rho) in history.iter().rev() {
        let a = rho * s_k.dot(&q);
        q.scaled_add(-a, y_k);
        alphas.push(a);
    }

    if let Some((s_k, y_k, _)) = history.back() {
        q *= s_k.dot(y_k) / y_k.dot(y_k);
    }

    for ((s_k, y_k, rho), a) in history.iter().zip(alphas.iter().rev()) {
        let beta = rho * y_k.dot(&q);
        q.scaled_add(a - beta, s_k);
    }

    -q
}

fn inf_norm(v: &Array1<f64>) -> f64 {
    v.iter().fold(0.0, |acc, x| acc.max(x.abs()))
}
