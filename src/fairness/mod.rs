//! Fairness checks over binary sensitive attributes
//!
//! For each group of a two-valued attribute, reports how often the model is right and how
//! often it predicts the positive class. Pure aggregation over predictions the caller
//! already has.

use crate::dataset::{Column, Dataset};
use crate::error::{DiagnosisError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metrics for one group of a sensitive attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupFairnessMetric {
    /// Value of this group (e.g. "male", "1")
    pub group_value: String,
    pub group_size: usize,
    pub accuracy: f64,
    /// Mean predicted label; for encoded binary labels, the share predicted as class 1
    pub predicted_positive_rate: f64,
}

/// Per-group metrics for one attribute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FairnessResult {
    pub attribute: String,
    /// Groups in ascending value order
    pub groups: Vec<GroupFairnessMetric>,
}

impl FairnessResult {
    /// Largest difference in predicted-positive rate between groups
    pub fn demographic_parity_gap(&self) -> f64 {
        spread(self.groups.iter().map(|g| g.predicted_positive_rate))
    }

    /// Largest difference in accuracy between groups
    pub fn accuracy_gap(&self) -> f64 {
        spread(self.groups.iter().map(|g| g.accuracy))
    }

    pub fn group(&self, value: &str) -> Option<&GroupFairnessMetric> {
        self.groups.iter().find(|g| g.group_value == value)
    }
}

fn spread(values: impl Iterator<Item = f64>) -> f64 {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if min.is_finite() && max.is_finite() {
        max - min
    } else {
        0.0
    }
}

/// Evaluates group metrics for binary attributes
#[derive(Debug, Clone, Default)]
pub struct FairnessChecker;

impl FairnessChecker {
    pub fn new() -> Self {
        Self
    }

    /// Group metrics for `sensitive`, aligned row-for-row with the labels.
    ///
    /// Rows where the attribute is missing are left out. The attribute must have exactly two
    /// distinct values.
    pub fn check(&self, y_true: &Array1<f64>, y_pred: &Array1<f64>, sensitive: &Column) -> Result<FairnessResult> {
        if y_true.len() != y_pred.len() || y_true.len() != sensitive.len() {
            return Err(DiagnosisError::ShapeError {
                expected: format!("{} rows", y_true.len()),
                actual: format!("{} predictions, {} attribute values", y_pred.len(), sensitive.len()),
            });
        }
        let n_groups = sensitive.n_unique();
        if n_groups != 2 {
            return Err(DiagnosisError::ConfigurationError(format!(
                "Sensitive attribute '{}' must have exactly 2 distinct values, found {}",
                sensitive.name(),
                n_groups
            )));
        }

        // (size, correct, predicted sum)
        let mut tallies: BTreeMap<String, (usize, usize, f64)> = BTreeMap::new();
        for row in 0..sensitive.len() {
            let Some(group) = sensitive.value_label(row) else {
                continue;
            };
            let entry = tallies.entry(group).or_insert((0, 0, 0.0));
            entry.0 += 1;
            if (y_true[row] - y_pred[row]).abs() < 0.5 {
                entry.1 += 1;
            }
            entry.2 += y_pred[row];
        }

        let groups = tallies
            .into_iter()
            .map(|(group_value, (size, correct, predicted))| GroupFairnessMetric {
                group_value,
                group_size: size,
                accuracy: correct as f64 / size as f64,
                predicted_positive_rate: predicted / size as f64,
            })
            .collect();

        Ok(FairnessResult {
            attribute: sensitive.name().to_string(),
            groups,
        })
    }

    /// Checks the first `max_attributes` binary feature columns, in column order.
    /// Columns that fail are skipped.
    pub fn scan(
        &self,
        features: &Dataset,
        y_true: &Array1<f64>,
        y_pred: &Array1<f64>,
        max_attributes: usize,
    ) -> Vec<FairnessResult> {
        features
            .binary_columns()
            .into_iter()
            .take(max_attributes)
            .filter_map(|column| self.check(y_true, y_pred, column).ok())
            .collect()
    }
}
