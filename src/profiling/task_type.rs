//! Classification vs regression decision

use crate::dataset::Column;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Learning task inferred from the target column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Classification,
    Regression,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Classification => "classification",
            TaskType::Regression => "regression",
        }
    }

    /// Name of the selection metric for this task
    pub fn metric_name(&self) -> &'static str {
        match self {
            TaskType::Classification => "F1",
            TaskType::Regression => "R2",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decides the task type from the target's value domain.
///
/// Text targets are always classification. Numeric targets are classification when they
/// have at most `threshold` distinct values. Integer count targets with few distinct values
/// therefore read as classification; raise the threshold for those.
#[derive(Debug, Clone, Copy)]
pub struct TaskTypeClassifier {
    threshold: usize,
}

impl Default for TaskTypeClassifier {
    fn default() -> Self {
        Self { threshold: 20 }
    }
}

impl TaskTypeClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn classify(&self, target: &Column) -> TaskType {
        if !target.is_numeric() || target.n_unique() <= self.threshold {
            TaskType::Classification
        } else {
            TaskType::Regression
        }
    }
}
