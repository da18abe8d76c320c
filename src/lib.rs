//! explainml - Automated dataset diagnosis
//!
//! Given a tabular dataset and a target column, this crate profiles the data, flags leakage
//! and collinearity, selects the best of three baseline models by cross-validation, explains
//! it with Shapley-value attributions, clusters its errors, checks group fairness and turns
//! the findings into prioritized remediation suggestions.
//!
//! # Modules
//!
//! ## Data
//! - [`dataset`] - Columns, datasets and file ingestion
//! - [`preprocessing`] - Scaling, label encoding, missing-value policies
//! - [`profiling`] - Task type, dataset profile, leakage and collinearity checks
//!
//! ## Modeling
//! - [`training`] - Candidate models, cross-validation and model selection
//! - [`explainability`] - Tree SHAP, sampled Shapley values, error clustering
//! - [`fairness`] - Group metrics over binary attributes
//!
//! ## Findings
//! - [`recommender`] - Rule-based remediation suggestions
//! - [`remediation`] - Applies suggestions to produce a new dataset
//! - [`pipeline`] - End-to-end diagnosis producing a [`pipeline::DiagnosticBundle`]
//! - [`report`] - Markdown / JSON rendering and insight summaries
//!
//! ## Services
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;
pub mod config;
pub mod events;

// Data
pub mod dataset;
pub mod preprocessing;
pub mod profiling;

// Modeling
pub mod training;
pub mod explainability;
pub mod fairness;

// Findings
pub mod recommender;
pub mod remediation;
pub mod pipeline;
pub mod report;

// Services
pub mod cli;

pub use error::{DiagnosisError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{DiagnosisError, Result};

    // Configuration and events
    pub use crate::config::{DiagnosisConfig, ThresholdConfig, SelectionConfig, ExplainConfig, ClusterConfig};
    pub use crate::events::{DiagnosticEvent, EventSink, MemorySink, NullSink, TracingSink};

    // Data
    pub use crate::dataset::{Column, Dataset, DataLoader};
    pub use crate::preprocessing::MissingValuePolicy;
    pub use crate::profiling::{DatasetProfiler, LeakageDetector, Profile, TaskType, TaskTypeClassifier};

    // Modeling
    pub use crate::training::{FittedModel, Leaderboard, ModelCapability, ModelKind, ModelSelector};
    pub use crate::explainability::{Explainer, ErrorClusterer, ExplanationSample};
    pub use crate::fairness::{FairnessChecker, FairnessResult};

    // Findings
    pub use crate::recommender::{IssuesBundle, Priority, Suggestion, SuggestionEngine, SuggestionType};
    pub use crate::remediation::apply_suggestions;
    pub use crate::pipeline::{DiagnosisPipeline, DiagnosticBundle, WarningKind};
    pub use crate::report::{write_report, ReportFormat};
}
