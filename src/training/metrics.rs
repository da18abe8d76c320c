//! Scoring metrics used for model selection

use ndarray::Array1;
use std::collections::BTreeSet;

/// Macro-averaged F1 over the union of true and predicted labels
pub fn f1_macro(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let labels: BTreeSet<i64> = y_true
        .iter()
        .chain(y_pred.iter())
        .map(|v| v.round() as i64)
        .collect();
    if labels.is_empty() {
        return 0.0;
    }

    let total: f64 = labels
        .iter()
        .map(|&label| {
            let (mut tp, mut fp, mut fn_) = (0usize, 0usize, 0usize);
            for (t, p) in y_true.iter().zip(y_pred.iter()) {
                let t = t.round() as i64 == label;
                let p = p.round() as i64 == label;
                match (t, p) {
                    (true, true) => tp += 1,
                    (false, true) => fp += 1,
                    (true, false) => fn_ += 1,
                    (false, false) => {}
                }
            }
            let denom = 2 * tp + fp + fn_;
            if denom == 0 {
                0.0
            } else {
                2.0 * tp as f64 / denom as f64
            }
        })
        .sum();
    total / labels.len() as f64
}

/// Coefficient of determination; 0 when the target is constant
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let n = y_true.len() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mean = y_true.sum() / n;
    let ss_tot: f64 = y_true.iter().map(|y| (y - mean).powi(2)).sum();
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else {
        0.0
    }
}

/// Fraction of exact label matches
pub fn accuracy(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| (*t - *p).abs() < 0.5)
        .count();
    correct as f64 / y_true.len() as f64
}

/// Mean and population standard deviation
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}
