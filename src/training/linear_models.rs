//! Linear model implementations

use crate::error::{DiagnosisError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Solve symmetric positive-definite system Ax = b using Cholesky decomposition.
/// Retries once with a small ridge if the matrix is not positive definite.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }
    cholesky_solve_inner(a, b).or_else(|| {
        let mut a_reg = a.clone();
        let ridge = (1e-8 * a.diag().iter().map(|v| v.abs()).sum::<f64>() / n as f64).max(1e-12);
        for k in 0..n {
            a_reg[[k, k]] += ridge;
        }
        cholesky_solve_inner(&a_reg, b)
    })
}

fn cholesky_solve_inner(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut l = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // Forward substitution: L * y = b
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // Backward substitution: L^T * x = y
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Gauss-Jordan inverse with partial pivoting (fallback)
fn matrix_inverse(m: &Array2<f64>) -> Option<Array2<f64>> {
    let n = m.nrows();
    if n != m.ncols() {
        return None;
    }

    let mut aug = Array2::zeros((n, 2 * n));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = m[[i, j]];
        }
        aug[[i, n + i]] = 1.0;
    }

    for col in 0..n {
        let mut max_row = col;
        for row in col + 1..n {
            if aug[[row, col]].abs() > aug[[max_row, col]].abs() {
                max_row = row;
            }
        }
        if max_row != col {
            for j in 0..2 * n {
                aug.swap([col, j], [max_row, j]);
            }
        }
        if aug[[col, col]].abs() < 1e-10 {
            return None;
        }

        let pivot = aug[[col, col]];
        for j in 0..2 * n {
            aug[[col, j]] /= pivot;
        }
        for row in 0..n {
            if row != col {
                let factor = aug[[row, col]];
                for j in 0..2 * n {
                    aug[[row, j]] -= factor * aug[[col, j]];
                }
            }
        }
    }

    Some(aug.slice(ndarray::s![.., n..]).to_owned())
}

/// Solve least squares via normal equations: (X^T X) w = X^T y
fn solve_least_squares(x: &Array2<f64>, y: &Array1<f64>) -> Option<Array1<f64>> {
    let xtx = x.t().dot(x);
    let xty = x.t().dot(y);

    cholesky_solve(&xtx, &xty).or_else(|| matrix_inverse(&xtx).map(|inv| inv.dot(&xty)))
}

fn check_rows(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(DiagnosisError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 {
        return Err(DiagnosisError::ValidationError(
            "Cannot fit on zero samples".to_string(),
        ));
    }
    Ok(())
}

/// Ordinary least squares linear regression
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinearRegression {
    /// Fitted coefficients (weights)
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept (bias)
    pub intercept: Option<f64>,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit on centered data; the intercept is recovered from the means
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_rows(x, y)?;

        let x_mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| DiagnosisError::ComputationError("empty feature axis".to_string()))?;
        let y_mean = y.mean().unwrap_or(0.0);
        let x_centered = x - &x_mean.clone().insert_axis(Axis(0));
        let y_centered = y - y_mean;

        let coefficients = solve_least_squares(&x_centered, &y_centered).ok_or_else(|| {
            DiagnosisError::ComputationError(
                "Matrix is singular, cannot solve least squares".to_string(),
            )
        })?;
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(DiagnosisError::ComputationError(
                "Least squares produced non-finite coefficients".to_string(),
            ));
        }

        self.intercept = Some(y_mean - coefficients.dot(&x_mean));
        self.coefficients = Some(coefficients);
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self.coefficients.as_ref().ok_or(DiagnosisError::ModelNotFitted)?;
        Ok(x.dot(coefficients) + self.intercept.unwrap_or(0.0))
    }
}

/// L2-regularized logistic regression for binary targets, fitted by gradient descent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Fitted coefficients
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept
    pub intercept: Option<f64>,
    /// Regularization strength (L2)
    pub alpha: f64,
    /// Maximum iterations
    pub max_iter: usize,
    /// Convergence tolerance
    pub tol: f64,
    /// Learning rate
    pub learning_rate: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            alpha: 0.01,
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: 0.1,
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    fn sigmoid(z: &Array1<f64>) -> Array1<f64> {
        z.mapv(|v| 1.0 / (1.0 + (-v).exp()))
    }

    /// Fit on 0/1 labels
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_rows(x, y)?;
        let n_samples = x.nrows() as f64;

        let mut weights: Array1<f64> = Array1::zeros(x.ncols());
        let mut bias = 0.0;

        for _ in 0..self.max_iter {
            let predictions = Self::sigmoid(&(x.dot(&weights) + bias));
            let errors = &predictions - y;
            let dw = x.t().dot(&errors) / n_samples + self.alpha * &weights;
            let db = errors.mean().unwrap_or(0.0);

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                break;
            }

            weights = weights - self.learning_rate * dw;
            bias -= self.learning_rate * db;
        }

        if weights.iter().any(|w| !w.is_finite()) || !bias.is_finite() {
            return Err(DiagnosisError::TrainingError(
                "Logistic regression diverged".to_string(),
            ));
        }

        self.coefficients = Some(weights);
        self.intercept = Some(bias);
        Ok(self)
    }

    /// Log-odds of the positive class
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self.coefficients.as_ref().ok_or(DiagnosisError::ModelNotFitted)?;
        Ok(x.dot(coefficients) + self.intercept.unwrap_or(0.0))
    }

    /// Probability of the positive class
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(Self::sigmoid(&self.decision_function(x)?))
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }
}

/// Logistic regression over labels `0..K`; one-vs-rest when K > 2
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MulticlassLogistic {
    template: LogisticRegression,
    models: Vec<LogisticRegression>,
    n_classes: usize,
}

impl MulticlassLogistic {
    pub fn new(template: LogisticRegression) -> Self {
        Self {
            template,
            models: Vec::new(),
            n_classes: 0,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_classes = y.iter().fold(0.0f64, |m, &v| m.max(v.round())) as usize + 1;
        if n_classes < 2 {
            return Err(DiagnosisError::TrainingError(
                "Classification needs at least two classes".to_string(),
            ));
        }
        let targets: Vec<usize> = if n_classes == 2 { vec![1] } else { (0..n_classes).collect() };

        self.models = targets
            .into_iter()
            .map(|class| {
                let y_bin: Array1<f64> = y
                    .mapv(|v| if v.round() as usize == class { 1.0 } else { 0.0 });
                let mut model = self.template.clone();
                model.fit(x, &y_bin)?;
                Ok(model)
            })
            .collect::<Result<Vec<_>>>()?;
        self.n_classes = n_classes;
        Ok(self)
    }

    /// Class probabilities, shape (n_samples, n_classes)
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.models.is_empty() {
            return Err(DiagnosisError::ModelNotFitted);
        }
        let mut proba = Array2::zeros((x.nrows(), self.n_classes));
        if self.n_classes == 2 {
            let p = self.models[0].predict_proba(x)?;
            proba.column_mut(1).assign(&p);
            proba.column_mut(0).assign(&p.mapv(|v| 1.0 - v));
        } else {
            for (c, model) in self.models.iter().enumerate() {
                proba.column_mut(c).assign(&model.predict_proba(x)?);
            }
            for mut row in proba.rows_mut() {
                let sum = row.sum();
                if sum > 0.0 {
                    row /= sum;
                }
            }
        }
        Ok(proba)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba
            .rows()
            .into_iter()
            .map(|row| {
                let mut best = 0;
                for (c, &p) in row.iter().enumerate() {
                    if p > row[best] {
                        best = c;
                    }
                }
                best as f64
            })
            .collect())
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}
