//! Label encoding for classification targets

use crate::dataset::{format_value, Column, ColumnData};
use crate::error::{DiagnosisError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maps the distinct values of a column to `0..K-1` in sorted order.
///
/// Numeric columns sort numerically, text columns lexically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
    index: HashMap<String, usize>,
}

impl LabelEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, column: &Column) -> Result<&mut Self> {
        let classes: Vec<String> = match column.data() {
            ColumnData::Numeric(values) => {
                let mut distinct: Vec<f64> = values.iter().flatten().copied().collect();
                distinct.sort_by(|a, b| a.total_cmp(b));
                distinct.dedup_by(|a, b| a == b);
                distinct.into_iter().map(format_value).collect()
            }
            ColumnData::Categorical(values) => {
                let mut distinct: Vec<String> = values.iter().flatten().cloned().collect();
                distinct.sort();
                distinct.dedup();
                distinct
            }
        };
        if classes.is_empty() {
            return Err(DiagnosisError::DataError(format!(
                "Column '{}' has no values to encode",
                column.name()
            )));
        }

        self.index = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        self.classes = classes;
        Ok(self)
    }

    /// Encode every row; missing or unseen values are errors
    pub fn transform(&self, column: &Column) -> Result<Vec<usize>> {
        if self.classes.is_empty() {
            return Err(DiagnosisError::ModelNotFitted);
        }
        (0..column.len())
            .map(|row| {
                let label = column.value_label(row).ok_or_else(|| {
                    DiagnosisError::DataError(format!(
                        "Missing value in '{}' at row {}",
                        column.name(),
                        row
                    ))
                })?;
                self.index.get(&label).copied().ok_or_else(|| {
                    DiagnosisError::ValidationError(format!("Unseen label '{}'", label))
                })
            })
            .collect()
    }

    pub fn fit_transform(&mut self, column: &Column) -> Result<Vec<usize>> {
        self.fit(column)?;
        self.transform(column)
    }

    /// Encoded labels as a float vector for model fitting
    pub fn transform_f64(&self, column: &Column) -> Result<Array1<f64>> {
        Ok(self
            .transform(column)?
            .into_iter()
            .map(|c| c as f64)
            .collect())
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn inverse(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }
}
