//! Dataset profiling

use super::stats::skewness;
use super::task_type::{TaskType, TaskTypeClassifier};
use crate::dataset::{ColumnKind, Dataset, TargetSpec};
use crate::error::{DiagnosisError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-column profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnProfile {
    /// Column name
    pub name: String,
    /// Storage kind
    pub kind: ColumnKind,
    /// Number of missing cells
    pub missing_count: usize,
    /// Percentage of missing cells (0-100)
    pub missing_pct: f64,
    /// Number of distinct non-missing values
    pub n_unique: usize,
    /// Skewness (numeric features only)
    pub skewness: Option<f64>,
}

/// Dataset profile relative to a target column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub n_rows: usize,
    pub n_cols: usize,
    pub target: String,
    pub task_type: TaskType,
    /// Rows removed because the target was missing
    pub dropped_target_rows: usize,
    pub columns: Vec<ColumnProfile>,
    /// Class label to percentage of rows (classification only)
    pub class_distribution: Option<BTreeMap<String, f64>>,
    /// Largest class share divided by smallest class share (classification only)
    pub imbalance_ratio: Option<f64>,
}

impl Profile {
    /// (column, missing %) in column order
    pub fn missing_percentages(&self) -> Vec<(String, f64)> {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.missing_pct))
            .collect()
    }

    /// (column, skewness) for numeric columns with a defined skewness, in column order.
    /// A numeric target is included.
    pub fn skewness(&self) -> Vec<(String, f64)> {
        self.columns
            .iter()
            .filter_map(|c| c.skewness.map(|s| (c.name.clone(), s)))
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Computes a [`Profile`] for a dataset and target
#[derive(Debug, Clone, Default)]
pub struct DatasetProfiler {
    classifier: TaskTypeClassifier,
}

impl DatasetProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_classifier(mut self, classifier: TaskTypeClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Profile `dataset` against `target`. Rows with a missing target are dropped first.
    pub fn profile(&self, dataset: &Dataset, target: &str) -> Result<Profile> {
        if dataset.column(target).is_none() {
            return Err(DiagnosisError::ConfigurationError(format!(
                "Target column '{}' not found",
                target
            )));
        }
        let (data, dropped) = dataset.drop_missing_target(target)?;
        let target_col = TargetSpec::new(target).validate(&data)?;
        let task_type = self.classifier.classify(target_col);

        let n_rows = data.n_rows();
        let columns = data
            .columns()
            .iter()
            .map(|col| {
                let missing_count = col.missing_count();
                let missing_pct = if n_rows == 0 {
                    0.0
                } else {
                    missing_count as f64 / n_rows as f64 * 100.0
                };
                let skew = col.as_numeric().and_then(skewness);
                ColumnProfile {
                    name: col.name().to_string(),
                    kind: col.kind(),
                    missing_count,
                    missing_pct,
                    n_unique: col.n_unique(),
                    skewness: skew,
                }
            })
            .collect();

        let (class_distribution, imbalance_ratio) = match task_type {
            TaskType::Classification => {
                let mut counts: BTreeMap<String, usize> = BTreeMap::new();
                for row in 0..n_rows {
                    if let Some(label) = target_col.value_label(row) {
                        *counts.entry(label).or_insert(0) += 1;
                    }
                }
                let distribution: BTreeMap<String, f64> = counts
                    .iter()
                    .map(|(k, &v)| (k.clone(), v as f64 / n_rows as f64 * 100.0))
                    .collect();
                let max = counts.values().copied().max().unwrap_or(0);
                let min = counts.values().copied().min().unwrap_or(0);
                let ratio = (min > 0).then(|| max as f64 / min as f64);
                (Some(distribution), ratio)
            }
            TaskType::Regression => (None, None),
        };

        Ok(Profile {
            n_rows,
            n_cols: data.n_cols(),
            target: target.to_string(),
            task_type,
            dropped_target_rows: dropped,
            columns,
            class_distribution,
            imbalance_ratio,
        })
    }
}
