//! Pipeline configuration
//!
//! Every policy constant used by the diagnosis stages lives here so that it can be
//! overridden from a JSON file instead of being a literal buried in stage code.

use crate::error::{DiagnosisError, Result};
use crate::preprocessing::MissingValuePolicy;
use crate::training::GradientBoostingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Detection and trigger thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// |corr(feature, target)| above this is reported as leakage
    pub leakage: f64,
    /// |corr(feature, feature)| above this is reported as collinearity
    pub collinearity: f64,
    /// Imbalance ratio above this triggers a balancing suggestion
    pub imbalance_trigger: f64,
    /// |skewness| above this triggers a transformation suggestion
    pub skew_trigger: f64,
    /// Missing percentage above this triggers column removal
    pub missing_removal_pct: f64,
    /// Missing percentage above this (and up to removal) triggers imputation
    pub missing_imputation_pct: f64,
    /// Numeric targets with at most this many distinct values are classification
    pub max_classification_cardinality: usize,
    /// Datasets with fewer rows raise a small-dataset warning
    pub small_dataset_rows: usize,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            leakage: 0.8,
            collinearity: 0.9,
            imbalance_trigger: 2.0,
            skew_trigger: 2.0,
            missing_removal_pct: 50.0,
            missing_imputation_pct: 20.0,
            max_classification_cardinality: 20,
            small_dataset_rows: 10,
        }
    }
}

/// Random forest hyperparameters used by the candidate set
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_leaf: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_leaf: 1,
        }
    }
}

/// Logistic regression solver settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticParams {
    pub max_iter: usize,
    pub learning_rate: f64,
    pub alpha: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            learning_rate: 0.1,
            alpha: 0.01,
        }
    }
}

/// Model selection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Number of cross-validation folds
    pub cv_folds: usize,
    /// Seed shared by every stochastic component
    pub random_state: u64,
    /// Evaluate folds on the rayon pool
    pub parallel_folds: bool,
    pub forest: ForestParams,
    pub boosting: GradientBoostingConfig,
    pub logistic: LogisticParams,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            cv_folds: 3,
            random_state: 42,
            parallel_folds: true,
            forest: ForestParams::default(),
            boosting: GradientBoostingConfig::default(),
            logistic: LogisticParams::default(),
        }
    }
}

/// Attribution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplainConfig {
    /// Attributions are never computed over more rows than this
    pub sample_size: usize,
    /// Permutations per row for the model-agnostic estimator
    pub permutation_samples: usize,
    /// Background rows used to marginalize absent features
    pub background_size: usize,
}

impl Default for ExplainConfig {
    fn default() -> Self {
        Self {
            sample_size: 200,
            permutation_samples: 50,
            background_size: 50,
        }
    }
}

/// Error clustering settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub n_clusters: usize,
    /// Number of k-means initializations; the lowest inertia wins
    pub n_init: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            n_clusters: 3,
            n_init: 10,
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosisConfig {
    pub thresholds: ThresholdConfig,
    pub selection: SelectionConfig,
    pub explain: ExplainConfig,
    pub clustering: ClusterConfig,
    pub missing_policy: MissingValuePolicy,
    /// Maximum number of binary feature columns scanned for fairness gaps
    pub max_fairness_attributes: usize,
}

impl Default for DiagnosisConfig {
    fn default() -> Self {
        Self {
            thresholds: ThresholdConfig::default(),
            selection: SelectionConfig::default(),
            explain: ExplainConfig::default(),
            clustering: ClusterConfig::default(),
            missing_policy: MissingValuePolicy::default(),
            max_fairness_attributes: 2,
        }
    }
}

impl DiagnosisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file; absent keys keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.selection.cv_folds = folds;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.selection.random_state = seed;
        self.selection.boosting.random_state = Some(seed);
        self
    }

    pub fn with_leakage_threshold(mut self, threshold: f64) -> Self {
        self.thresholds.leakage = threshold;
        self
    }

    pub fn with_collinearity_threshold(mut self, threshold: f64) -> Self {
        self.thresholds.collinearity = threshold;
        self
    }

    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.explain.sample_size = sample_size;
        self
    }

    pub fn with_n_clusters(mut self, n_clusters: usize) -> Self {
        self.clustering.n_clusters = n_clusters;
        self
    }

    pub fn with_missing_policy(mut self, policy: MissingValuePolicy) -> Self {
        self.missing_policy = policy;
        self
    }

    /// Shrink ensemble sizes; useful for quick runs and tests
    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.selection.forest.n_estimators = n_estimators;
        self.selection.boosting.n_estimators = n_estimators;
        self
    }

    /// Reject values no stage can work with
    pub fn validate(&self) -> Result<()> {
        let invalid = |name: &str, value: String, reason: &str| {
            Err(DiagnosisError::ConfigurationError(format!(
                "{} = {}: {}",
                name, value, reason
            )))
        };

        if self.selection.cv_folds < 2 {
            return invalid("cv_folds", self.selection.cv_folds.to_string(), "must be at least 2");
        }
        for (name, value) in [
            ("leakage", self.thresholds.leakage),
            ("collinearity", self.thresholds.collinearity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return invalid(name, value.to_string(), "correlation thresholds lie in [0, 1]");
            }
        }
        if self.thresholds.missing_imputation_pct > self.thresholds.missing_removal_pct {
            return invalid(
                "missing_imputation_pct",
                self.thresholds.missing_imputation_pct.to_string(),
                "must not exceed missing_removal_pct",
            );
        }
        if self.explain.sample_size == 0 {
            return invalid("sample_size", "0".to_string(), "must be positive");
        }
        if self.clustering.n_clusters == 0 {
            return invalid("n_clusters", "0".to_string(), "must be positive");
        }
        if self.selection.forest.n_estimators == 0 || self.selection.boosting.n_estimators == 0 {
            return invalid("n_estimators", "0".to_string(), "ensembles need at least one tree");
        }
        Ok(())
    }
}
