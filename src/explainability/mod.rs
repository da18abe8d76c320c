//! Model explainability module
//!
//! Provides attribution and error analysis for the selected model:
//! - Exact path-dependent TreeSHAP for tree ensembles
//! - Permutation-sampling Shapley estimates for any other model
//! - Clustering of misclassified rows by their most influential features

mod error_analysis;
mod explainer;
mod sampling;
pub mod tree_shap;

pub use error_analysis::{ErrorCluster, ErrorClusterer};
pub use explainer::{AttributionMethod, ExplanationSample, Explainer};
pub use sampling::PermutationExplainer;
