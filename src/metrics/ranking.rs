//! Threshold-free ranking metrics over fraud scores

use std::cmp::Ordering;

/// Area under the precision-recall curve as a step function.
///
/// Sums `(R_k - R_{k-1}) * P_k` over the distinct score thresholds in decreasing
/// order; tied scores form a single threshold. Returns 0.0 when there are no
/// positives.
pub fn average_precision(y_true: &[bool], scores: &[f64]) -> f64 {
    let n_positive = y_true.iter().filter(|&&t| t).count();
    if n_positive == 0 {
        return 0.0;
    }

    let mut pairs: Vec<(f64, bool)> = scores.iter().copied().zip(y_true.iter().copied()).collect();
    pairs.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut prev_recall = 0.0;
    let mut ap = 0.0;
    let mut i = 0;

    while i < pairs.len() {
        let threshold = pairs[i].0;
        while i < pairs.len() && pairs[i].0 == threshold {
            if pairs[i].1 {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }

        let recall = tp as f64 / n_positive as f64;
        let precision = tp as f64 / (tp + fp) as f64;
        ap += (recall - prev_recall) * precision;
        prev_recall = recall;
    }

    ap
}

/// ROC-AUC from the Mann-Whitney rank statistic with tied ranks averaged.
///
/// NaN unless both classes are present.
pub fn roc_auc(y_true: &[bool], scores: &[f64]) -> f64 {
    let n_positive = y_true.iter().filter(|&&t| t).count();
    let n_negative = y_true.len() - n_positive;
    if n_positive == 0 || n_negative == 0 {
        return f64::NAN;
    }

    let ranks = average_ranks(scores);
    let positive_rank_sum: f64 = ranks
        .iter()
        .zip(y_true.iter())
        .filter(|(_, &t)| t)
        .map(|(r, _)| r)
        .sum();

    let n_pos = n_positive as f64;
    (positive_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_negative as f64)
}

/// 1-based ranks in ascending score order; ties share their mean rank
fn average_ranks(scores: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].partial_cmp(&scores[b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // Positions start..end hold ranks start+1..=end
        let mean_rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = mean_rank;
        }
        start = end;
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;

    const Y: [bool; 4] = [false, false, true, true];
    const SCORES: [f64; 4] = [0.1, 0.4, 0.35, 0.8];

    #[test]
    fn test_average_precision() {
        let ap = average_precision(&Y, &SCORES);
        assert!((ap - 5.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_average_precision_ties_form_one_step() {
        // All scores tied: a single threshold at prevalence
        let ap = average_precision(&[true, false, false, true], &[0.5; 4]);
        assert!((ap - 0.5).abs() < 1e-12);
        assert_eq!(average_precision(&[false, false], &[0.3, 0.9]), 0.0);
    }

    #[test]
    fn test_roc_auc() {
        assert!((roc_auc(&Y, &SCORES) - 0.75).abs() < 1e-12);
        assert_eq!(roc_auc(&[false, true], &[0.2, 0.9]), 1.0);
        assert!(roc_auc(&[false, false], &[0.2, 0.9]).is_nan());
    }

    #[test]
    fn test_roc_auc_ties_count_half() {
        assert!((roc_auc(&[false, true], &[0.5, 0.5]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_average_ranks() {
        assert_eq!(average_ranks(&[3.0, 1.0, 3.0, 2.0]), vec![3.5, 1.0, 3.5, 2.0]);
    }
}
