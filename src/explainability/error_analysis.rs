//! Groups misclassified rows by the features that drive their attributions

use crate::config::ClusterConfig;
use crate::error::{DiagnosisError, Result};
use crate::events::{DiagnosticEvent, EventSink};
use crate::training::KMeans;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

const STAGE: &str = "error_analysis";

/// A region of feature space where the model errs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorCluster {
    /// e.g. `"age≈41.3, income≈52000.0"`
    pub condition: String,
    pub size: usize,
    pub features: Vec<String>,
    pub centers: Vec<f64>,
}

/// k-means over the two most influential features of the misclassified rows
#[derive(Debug, Clone)]
pub struct ErrorClusterer {
    n_clusters: usize,
    n_init: usize,
    random_state: u64,
}

impl Default for ErrorClusterer {
    fn default() -> Self {
        Self::new(ClusterConfig::default())
    }
}

impl ErrorClusterer {
    pub fn new(config: ClusterConfig) -> Self {
        Self {
            n_clusters: config.n_clusters,
            n_init: config.n_init,
            random_state: 42,
        }
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Clusters of misclassified rows; empty when there is nothing to cluster.
    ///
    /// `x`, `y_true`, `y_pred` and `attributions` must describe the same rows.
    pub fn find_clusters(
        &self,
        x: &Array2<f64>,
        y_true: &Array1<f64>,
        y_pred: &Array1<f64>,
        attributions: &Array2<f64>,
        feature_names: &[String],
        sink: &dyn EventSink,
    ) -> Vec<ErrorCluster> {
        match self.try_find_clusters(x, y_true, y_pred, attributions, feature_names) {
            Ok(clusters) => {
                sink.record(
                    DiagnosticEvent::debug(STAGE, "Error clustering finished")
                        .with_field("clusters", clusters.len()),
                );
                clusters
            }
            Err(err) => {
                sink.record(DiagnosticEvent::warn(STAGE, "Error clustering failed").with_field("reason", &err));
                Vec::new()
            }
        }
    }

    fn try_find_clusters(
        &self,
        x: &Array2<f64>,
        y_true: &Array1<f64>,
        y_pred: &Array1<f64>,
        attributions: &Array2<f64>,
        feature_names: &[String],
    ) -> Result<Vec<ErrorCluster>> {
        if y_true.len() != y_pred.len() {
            return Ok(Vec::new());
        }
        if x.nrows() != y_true.len() || attributions.dim() != x.dim() || feature_names.len() != x.ncols() {
            return Err(DiagnosisError::ShapeError {
                expected: format!("{} rows × {} features everywhere", y_true.len(), feature_names.len()),
                actual: format!("x {:?}, attributions {:?}", x.dim(), attributions.dim()),
            });
        }

        let error_rows: Vec<usize> = y_true
            .iter()
            .zip(y_pred.iter())
            .enumerate()
            .filter(|(_, (t, p))| (*t - *p).abs() > 0.5)
            .map(|(i, _)| i)
            .collect();
        if error_rows.is_empty() || error_rows.len() < self.n_clusters || x.ncols() < 2 {
            return Ok(Vec::new());
        }

        // Top two features by mean |attribution| over the error rows, stronger first
        let importance = attributions
            .select(Axis(0), &error_rows)
            .mapv(f64::abs)
            .mean_axis(Axis(0))
            .ok_or_else(|| DiagnosisError::ComputationError("empty attribution matrix".to_string()))?;
        let mut order: Vec<usize> = (0..importance.len()).collect();
        order.sort_by(|&a, &b| importance[b].total_cmp(&importance[a]).then(a.cmp(&b)));
        let top = [order[0], order[1]];

        let points = x.select(Axis(0), &error_rows).select(Axis(1), &top);
        let k = self.n_clusters.min(points.nrows());
        let mut kmeans = KMeans::new(k)
            .with_n_init(self.n_init)
            .with_random_state(self.random_state);
        kmeans.fit(&points)?;

        let centroids = kmeans.centroids().ok_or(DiagnosisError::ModelNotFitted)?;
        let labels = kmeans.labels().ok_or(DiagnosisError::ModelNotFitted)?;
        let features = vec![feature_names[top[0]].clone(), feature_names[top[1]].clone()];

        Ok((0..k)
            .map(|c| {
                let center = centroids.row(c);
                ErrorCluster {
                    condition: format!(
                        "{}≈{:.1}, {}≈{:.1}",
                        features[0], center[0], features[1], center[1]
                    ),
                    size: labels.iter().filter(|&&l| l == c).count(),
                    features: features.clone(),
                    centers: vec![center[0], center[1]],
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{MemorySink, NullSink};
    use ndarray::array;

    fn names() -> Vec<String> {
        vec!["age".to_string(), "income".to_string(), "noise".to_string()]
    }

    #[test]
    fn test_no_errors_gives_empty() {
        let x = Array2::from_shape_fn((6, 3), |(i, j)| (i + j) as f64);
        let y = array![0.0, 1.0, 0.0, 1.0, 0.0, 1.0];
        let attributions = Array2::ones((6, 3));
        let clusters = ErrorClusterer::default().find_clusters(&x, &y, &y, &attributions, &names(), &NullSink);
        assert!(clusters.is_empty());
    }

    #[test]
    fn test_length_mismatch_gives_empty() {
        let x = Array2::zeros((4, 3));
        let clusters = ErrorClusterer::default().find_clusters(
            &x,
            &array![0.0, 1.0, 0.0, 1.0],
            &array![1.0, 0.0],
            &Array2::zeros((4, 3)),
            &names(),
            &NullSink,
        );
        assert!(clusters.is_empty());
    }

    #[test]
    fn test_fewer_errors_than_clusters() {
        let x = Array2::from_shape_fn((5, 3), |(i, j)| (i * j) as f64);
        let y_true = array![0.0, 0.0, 0.0, 0.0, 0.0];
        let y_pred = array![1.0, 1.0, 0.0, 0.0, 0.0];
        let clusters =
            ErrorClusterer::default().find_clusters(&x, &y_true, &y_pred, &Array2::ones((5, 3)), &names(), &NullSink);
        assert!(clusters.is_empty());
    }

    #[test]
    fn test_clusters_use_top_attribution_features() {
        let x = array![
            [20.0, 1000.0, 0.0],
            [21.0, 1100.0, 0.0],
            [60.0, 9000.0, 0.0],
            [61.0, 9100.0, 0.0],
            [40.0, 5000.0, 0.0],
            [41.0, 5100.0, 0.0],
        ];
        let y_true = Array1::zeros(6);
        let y_pred = Array1::ones(6);
        // noise has the largest attribution, age the second
        let attributions = Array2::from_shape_fn((6, 3), |(_, j)| [0.5, 0.1, 0.9][j]);
        let clusters = ErrorClusterer::default().find_clusters(&x, &y_true, &y_pred, &attributions, &names(), &NullSink);

        assert_eq!(clusters.len(), 3);
        assert_eq!(clusters[0].features, vec!["noise".to_string(), "age".to_string()]);
        assert_eq!(clusters.iter().map(|c| c.size).sum::<usize>(), 6);
        assert!(clusters.iter().all(|c| c.condition.starts_with("noise≈0.0, age≈")));
    }

    #[test]
    fn test_shape_mismatch_is_logged() {
        let sink = MemorySink::new();
        let clusters = ErrorClusterer::default().find_clusters(
            &Array2::zeros((4, 3)),
            &array![0.0, 1.0, 0.0, 1.0],
            &array![1.0, 0.0, 1.0, 0.0],
            &Array2::zeros((4, 2)),
            &names(),
            &sink,
        );
        assert!(clusters.is_empty());
        assert_eq!(sink.for_stage("error_analysis").len(), 1);
    }
}
