//! Missing-value policy used to build the numeric training matrix

use crate::dataset::Dataset;
use crate::error::{DiagnosisError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// How missing numeric cells are handled before training
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingValuePolicy {
    /// Replace missing cells with 0
    #[default]
    FillZero,
    /// Drop every row with a missing numeric feature
    DropRows,
    /// Replace missing cells with the column mean (0 when the column has no values)
    MeanImpute,
}

/// Dense numeric features with the source row of each matrix row
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub x: Array2<f64>,
    pub feature_names: Vec<String>,
    /// Index into the source dataset for every matrix row
    pub rows: Vec<usize>,
}

impl FeatureMatrix {
    pub fn n_rows(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }
}

impl MissingValuePolicy {
    /// Build the matrix from the numeric columns of `features`; text columns are ignored
    pub fn build_matrix(&self, features: &Dataset) -> Result<FeatureMatrix> {
        let numeric = features.numeric_columns();
        if numeric.is_empty() {
            return Err(DiagnosisError::NoNumericFeatures);
        }

        let columns: Vec<&[Option<f64>]> =
            numeric.iter().filter_map(|c| c.as_numeric()).collect();
        let feature_names: Vec<String> = numeric.iter().map(|c| c.name().to_string()).collect();

        let rows: Vec<usize> = match self {
            MissingValuePolicy::DropRows => (0..features.n_rows())
                .filter(|&r| columns.iter().all(|c| c[r].is_some()))
                .collect(),
            _ => (0..features.n_rows()).collect(),
        };
        if rows.is_empty() {
            return Err(DiagnosisError::DataError(
                "No complete rows left after applying the missing-value policy".to_string(),
            ));
        }

        let fills: Vec<f64> = columns
            .iter()
            .map(|c| match self {
                MissingValuePolicy::MeanImpute => {
                    let present: Vec<f64> = c.iter().flatten().copied().collect();
                    if present.is_empty() {
                        0.0
                    } else {
                        present.iter().sum::<f64>() / present.len() as f64
                    }
                }
                _ => 0.0,
            })
            .collect();

        let x = Array2::from_shape_fn((rows.len(), columns.len()), |(i, j)| {
            columns[j][rows[i]].unwrap_or(fills[j])
        });

        Ok(FeatureMatrix {
            x,
            feature_names,
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;

    fn sample() -> Dataset {
        Dataset::new(vec![
            Column::numeric("a", vec![Some(1.0), None, Some(3.0)]),
            Column::from_strs("b", &["x", "y", "z"]),
            Column::numeric("c", vec![Some(2.0), Some(4.0), Some(6.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn test_fill_zero() {
        let m = MissingValuePolicy::FillZero.build_matrix(&sample()).unwrap();
        assert_eq!(m.feature_names, vec!["a", "c"]);
        assert_eq!(m.x[[1, 0]], 0.0);
        assert_eq!(m.rows, vec![0, 1, 2]);
    }

    #[test]
    fn test_drop_rows_tracks_source_rows() {
        let m = MissingValuePolicy::DropRows.build_matrix(&sample()).unwrap();
        assert_eq!(m.n_rows(), 2);
        assert_eq!(m.rows, vec![0, 2]);
    }

    #[test]
    fn test_mean_impute() {
        let m = MissingValuePolicy::MeanImpute.build_matrix(&sample()).unwrap();
        assert!((m.x[[1, 0]] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_numeric_features() {
        let ds = Dataset::new(vec![Column::from_strs("b", &["x"])]).unwrap();
        assert!(matches!(
            MissingValuePolicy::FillZero.build_matrix(&ds),
            Err(DiagnosisError::NoNumericFeatures)
        ));
    }
}
