//! Feature standardization

use crate::error::{DiagnosisError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Standard scaling (z-score normalization): (x - mean) / std
///
/// Uses the population standard deviation; constant columns keep a scale of 1.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    center: Option<Array1<f64>>,
    scale: Option<Array1<f64>>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(DiagnosisError::DataError(
                "Cannot fit a scaler on zero rows".to_string(),
            ));
        }
        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| DiagnosisError::ComputationError("empty axis".to_string()))?;
        let std = x.std_axis(Axis(0), 0.0);

        self.scale = Some(std.mapv(|s| if s == 0.0 || !s.is_finite() { 1.0 } else { s }));
        self.center = Some(mean);
        Ok(self)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (center, scale) = match (&self.center, &self.scale) {
            (Some(c), Some(s)) => (c, s),
            _ => return Err(DiagnosisError::ModelNotFitted),
        };
        if x.ncols() != center.len() {
            return Err(DiagnosisError::ShapeError {
                expected: format!("{} features", center.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok((x - center) / scale)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    pub fn is_fitted(&self) -> bool {
        self.center.is_some()
    }
}
