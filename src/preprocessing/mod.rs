//! Data preprocessing module
//!
//! Turns a [`Dataset`](crate::dataset::Dataset) into model inputs:
//! - Numeric feature matrix under an explicit missing-value policy
//! - Standard scaling for linear models
//! - Label encoding for classification targets

mod encoder;
mod imputation;
mod scaler;

pub use encoder::LabelEncoder;
pub use imputation::{FeatureMatrix, MissingValuePolicy};
pub use scaler::StandardScaler;
