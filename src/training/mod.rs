//! Model training module
//!
//! Provides the candidate models and the cross-validated selection over them:
//! - Linear models (OLS, logistic regression)
//! - Decision trees and Random Forests
//! - Gradient boosting
//! - K-Means, used for error clustering

pub mod clustering;
pub mod cross_validation;
pub mod decision_tree;
mod fitted;
pub mod gradient_boosting;
pub mod linear_models;
pub mod metrics;
pub mod random_forest;
mod selector;

pub use clustering::KMeans;
pub use cross_validation::{CVSplit, CVStrategy, CrossValidator};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use fitted::{
    FittedModel, LeafValue, ModelCapability, ModelKind, OutputTarget, TreeComponent,
    TreeEnsembleView,
};
pub use gradient_boosting::{
    BoostedTrees, GradientBoostingClassifier, GradientBoostingConfig, GradientBoostingRegressor,
};
pub use linear_models::{LinearRegression, LogisticRegression, MulticlassLogistic};
pub use random_forest::{MaxFeatures, RandomForest};
pub use selector::{CandidateFailure, EncodedTarget, Leaderboard, ModelResult, ModelSelector, Selection};
