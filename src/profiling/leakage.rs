//! Target leakage and feature collinearity detection

use super::stats::{pearson, round_to};
use crate::dataset::{Column, ColumnData, Dataset};
use crate::preprocessing::LabelEncoder;
use serde::{Deserialize, Serialize};

/// Correlation used against the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationMethod {
    /// Binary target
    PointBiserial,
    Pearson,
}

impl CorrelationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrelationMethod::PointBiserial => "point-biserial",
            CorrelationMethod::Pearson => "pearson",
        }
    }
}

/// Feature whose correlation with the target exceeds the leakage threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeakageFinding {
    pub feature: String,
    /// Rounded to 3 decimals
    pub correlation: f64,
    pub method: CorrelationMethod,
}

/// Pair of features whose absolute correlation exceeds the collinearity threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollinearityFinding {
    pub feature_a: String,
    pub feature_b: String,
    /// Absolute correlation, rounded to 3 decimals
    pub correlation: f64,
}

/// Read-only correlation checks over numeric features
#[derive(Debug, Clone, Copy)]
pub struct LeakageDetector {
    leakage_threshold: f64,
    collinearity_threshold: f64,
}

impl Default for LeakageDetector {
    fn default() -> Self {
        Self {
            leakage_threshold: 0.8,
            collinearity_threshold: 0.9,
        }
    }
}

/// Target as numbers; text labels are encoded in sorted order
fn target_values(target: &Column) -> Vec<Option<f64>> {
    match target.data() {
        ColumnData::Numeric(values) => values.clone(),
        ColumnData::Categorical(values) => {
            let mut encoder = LabelEncoder::new();
            if encoder.fit(target).is_err() {
                return vec![None; values.len()];
            }
            values
                .iter()
                .map(|v| {
                    v.as_ref().and_then(|label| {
                        encoder
                            .classes()
                            .iter()
                            .position(|c| c == label)
                            .map(|i| i as f64)
                    })
                })
                .collect()
        }
    }
}

impl LeakageDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_leakage_threshold(mut self, threshold: f64) -> Self {
        self.leakage_threshold = threshold;
        self
    }

    pub fn with_collinearity_threshold(mut self, threshold: f64) -> Self {
        self.collinearity_threshold = threshold;
        self
    }

    /// Numeric features correlated with the target above the leakage threshold
    pub fn detect_target_leakage(&self, features: &Dataset, target: &Column) -> Vec<LeakageFinding> {
        let y = target_values(target);
        let method = if target.n_unique() <= 2 {
            CorrelationMethod::PointBiserial
        } else {
            CorrelationMethod::Pearson
        };

        features
            .numeric_columns()
            .into_iter()
            .filter(|c| c.name() != target.name())
            .filter_map(|col| {
                let x = col.as_numeric()?;
                if x.len() != y.len() {
                    return None;
                }
                let corr = pearson(x, &y);
                (corr.abs() > self.leakage_threshold).then(|| LeakageFinding {
                    feature: col.name().to_string(),
                    correlation: round_to(corr, 3),
                    method,
                })
            })
            .collect()
    }

    /// Each unordered pair of numeric features (in column order) above the collinearity threshold
    pub fn detect_high_correlation(&self, features: &Dataset) -> Vec<CollinearityFinding> {
        let numeric = features.numeric_columns();
        let mut findings = Vec::new();
        for i in 0..numeric.len() {
            for j in (i + 1)..numeric.len() {
                let (Some(a), Some(b)) = (numeric[i].as_numeric(), numeric[j].as_numeric()) else {
                    continue;
                };
                let corr = pearson(a, b).abs();
                if corr > self.collinearity_threshold {
                    findings.push(CollinearityFinding {
                        feature_a: numeric[i].name().to_string(),
                        feature_b: numeric[j].name().to_string(),
                        correlation: round_to(corr, 3),
                    });
                }
            }
        }
        findings
    }
}
