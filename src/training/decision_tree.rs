//! Decision tree implementation

use crate::error::{DiagnosisError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf {
        value: f64,
        /// Class proportions (classification only, empty otherwise)
        proba: Vec<f64>,
        n_samples: usize,
    },
    /// Internal node; rows with `x[feature_idx] <= threshold` go left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

impl TreeNode {
    pub fn n_samples(&self) -> usize {
        match self {
            TreeNode::Leaf { n_samples, .. } | TreeNode::Split { n_samples, .. } => *n_samples,
        }
    }

    /// Leaf reached by `sample`
    pub fn leaf_for(&self, sample: ArrayView1<f64>) -> &TreeNode {
        let mut node = self;
        while let TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            ..
        } = node
        {
            node = if sample[*feature_idx] <= *threshold { left } else { right };
        }
        node
    }
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Criterion {
    /// Gini impurity (classification)
    Gini,
    /// Mean squared error (regression)
    MSE,
}

/// Running statistics of one side of a candidate split
#[derive(Clone)]
struct SideStats {
    count: usize,
    sum: f64,
    sq_sum: f64,
    class_counts: Vec<usize>,
}

impl SideStats {
    fn new(n_classes: usize) -> Self {
        Self {
            count: 0,
            sum: 0.0,
            sq_sum: 0.0,
            class_counts: vec![0; n_classes],
        }
    }

    fn add(&mut self, y: f64, class: Option<usize>) {
        self.count += 1;
        self.sum += y;
        self.sq_sum += y * y;
        if let Some(c) = class {
            self.class_counts[c] += 1;
        }
    }

    fn remove(&mut self, y: f64, class: Option<usize>) {
        self.count -= 1;
        self.sum -= y;
        self.sq_sum -= y * y;
        if let Some(c) = class {
            self.class_counts[c] -= 1;
        }
    }

    fn impurity(&self, criterion: Criterion) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = self.count as f64;
        match criterion {
            Criterion::Gini => {
                1.0 - self
                    .class_counts
                    .iter()
                    .map(|&c| (c as f64 / n).powi(2))
                    .sum::<f64>()
            }
            Criterion::MSE => (self.sq_sum / n - (self.sum / n).powi(2)).max(0.0),
        }
    }
}

/// Decision tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features considered at each split (all when `None`)
    pub max_features: Option<usize>,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Seed for per-node feature sampling
    pub random_state: Option<u64>,
    /// Number of features
    n_features: usize,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
    /// Is classification task
    is_classification: bool,
    /// Number of classes; labels are `0..n_classes`
    n_classes: usize,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new_classifier()
    }
}

impl DecisionTree {
    /// Create a new classifier tree
    pub fn new_classifier() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::Gini,
            random_state: None,
            n_features: 0,
            feature_importances: None,
            is_classification: true,
            n_classes: 0,
        }
    }

    /// Create a new regressor tree
    pub fn new_regressor() -> Self {
        Self {
            criterion: Criterion::MSE,
            is_classification: false,
            ..Self::new_classifier()
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fix the class count, so leaf distributions line up across trees
    /// fitted on bootstrap samples that miss a class
    pub fn with_n_classes(mut self, n_classes: usize) -> Self {
        self.n_classes = n_classes;
        self
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(DiagnosisError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(DiagnosisError::ValidationError(
                "Cannot fit a tree on zero samples".to_string(),
            ));
        }
        if y.iter().any(|v| !v.is_finite()) || x.iter().any(|v| !v.is_finite()) {
            return Err(DiagnosisError::ValidationError(
                "Non-finite values in training data".to_string(),
            ));
        }

        self.n_features = n_features;
        if self.is_classification {
            let max_label = y.iter().fold(0.0f64, |m, &v| m.max(v.round())) as usize;
            self.n_classes = self.n_classes.max(max_label + 1);
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(42));
        let mut importances = vec![0.0; n_features];
        let indices: Vec<usize> = (0..n_samples).collect();
        let root = self.build_tree(x, y, &indices, 0, &mut importances, &mut rng);
        self.root = Some(root);

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn class_of(&self, y: f64) -> Option<usize> {
        self.is_classification
            .then(|| (y.round().max(0.0) as usize).min(self.n_classes.saturating_sub(1)))
    }

    fn stats_for(&self, y: &Array1<f64>, indices: &[usize]) -> SideStats {
        let mut stats = SideStats::new(if self.is_classification { self.n_classes } else { 0 });
        for &i in indices {
            stats.add(y[i], self.class_of(y[i]));
        }
        stats
    }

    fn make_leaf(&self, stats: &SideStats) -> TreeNode {
        let n = stats.count.max(1) as f64;
        let (value, proba) = if self.is_classification {
            let proba: Vec<f64> = stats.class_counts.iter().map(|&c| c as f64 / n).collect();
            // Lowest label wins ties
            let mut best = 0;
            for (c, &count) in stats.class_counts.iter().enumerate() {
                if count > stats.class_counts[best] {
                    best = c;
                }
            }
            (best as f64, proba)
        } else {
            (stats.sum / n, Vec::new())
        };
        TreeNode::Leaf {
            value,
            proba,
            n_samples: stats.count,
        }
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let stats = self.stats_for(y, indices);
        let parent_impurity = stats.impurity(self.criterion);

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || parent_impurity <= 1e-12;

        if should_stop {
            return self.make_leaf(&stats);
        }

        let candidates = self.candidate_features(rng);
        let Some((best_feature, best_threshold, best_gain)) =
            self.find_best_split(x, y, indices, &stats, &candidates)
        else {
            return self.make_leaf(&stats);
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, best_feature]] <= best_threshold);

        if left_indices.is_empty() || right_indices.is_empty() {
            return self.make_leaf(&stats);
        }

        importances[best_feature] += n_samples as f64 * best_gain;

        let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, importances, rng));
        let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, importances, rng));

        TreeNode::Split {
            feature_idx: best_feature,
            threshold: best_threshold,
            left,
            right,
            n_samples,
            impurity: parent_impurity,
        }
    }

    fn candidate_features(&self, rng: &mut ChaCha8Rng) -> Vec<usize> {
        match self.max_features {
            Some(k) if k < self.n_features => {
                let mut features = sample(rng, self.n_features, k).into_vec();
                features.sort_unstable();
                features
            }
            _ => (0..self.n_features).collect(),
        }
    }

    /// Best (feature, threshold, gain) over the candidate features.
    ///
    /// Each feature is swept once in sorted order; ties keep the earliest feature and threshold.
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        parent: &SideStats,
        candidates: &[usize],
    ) -> Option<(usize, f64, f64)> {
        let n = indices.len() as f64;
        let parent_impurity = parent.impurity(self.criterion);

        let per_feature: Vec<Option<(usize, f64, f64)>> = candidates
            .par_iter()
            .map(|&feature_idx| {
                let mut order: Vec<usize> = indices.to_vec();
                order.sort_by(|&a, &b| x[[a, feature_idx]].total_cmp(&x[[b, feature_idx]]));

                let mut left = SideStats::new(parent.class_counts.len());
                let mut right = parent.clone();
                let mut best: Option<(f64, f64)> = None;

                for pos in 0..order.len() - 1 {
                    let row = order[pos];
                    let yi = y[row];
                    let class = self.class_of(yi);
                    left.add(yi, class);
                    right.remove(yi, class);

                    let current = x[[row, feature_idx]];
                    let next = x[[order[pos + 1], feature_idx]];
                    if current == next {
                        continue;
                    }
                    if left.count < self.min_samples_leaf || right.count < self.min_samples_leaf {
                        continue;
                    }

                    let weighted = (left.count as f64 * left.impurity(self.criterion)
                        + right.count as f64 * right.impurity(self.criterion))
                        / n;
                    let gain = parent_impurity - weighted;
                    if gain > 1e-12 && best.map_or(true, |(g, _)| gain > g) {
                        best = Some((gain, (current + next) / 2.0));
                    }
                }

                best.map(|(gain, threshold)| (feature_idx, threshold, gain))
            })
            .collect();

        per_feature
            .into_iter()
            .flatten()
            .fold(None, |best: Option<(usize, f64, f64)>, cand| match best {
                Some(b) if b.2 >= cand.2 => Some(b),
                _ => Some(cand),
            })
    }

    fn root_node(&self) -> Result<&TreeNode> {
        self.root.as_ref().ok_or(DiagnosisError::ModelNotFitted)
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root_node()?;
        self.check_width(x)?;
        Ok(x.rows()
            .into_iter()
            .map(|row| match root.leaf_for(row) {
                TreeNode::Leaf { value, .. } => *value,
                TreeNode::Split { .. } => 0.0,
            })
            .collect())
    }

    /// Class proportions of the leaf each row falls into
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let root = self.root_node()?;
        self.check_width(x)?;
        if !self.is_classification {
            return Err(DiagnosisError::ValidationError(
                "predict_proba is only available for classification".to_string(),
            ));
        }
        let mut proba = Array2::zeros((x.nrows(), self.n_classes));
        for (i, row) in x.rows().into_iter().enumerate() {
            if let TreeNode::Leaf { proba: p, .. } = root.leaf_for(row) {
                for (j, &v) in p.iter().enumerate() {
                    proba[[i, j]] = v;
                }
            }
        }
        Ok(proba)
    }

    fn check_width(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.n_features {
            return Err(DiagnosisError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(())
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.root.as_ref()
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Get tree depth
    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classifier_separable() {
        let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new_classifier();
        tree.fit(&x, &y).unwrap();

        let predictions = tree.predict(&x).unwrap();
        assert_eq!(predictions, y);
    }

    #[test]
    fn test_regressor_simple() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0];

        let mut tree = DecisionTree::new_regressor();
        tree.fit(&x, &y).unwrap();

        let predictions = tree.predict(&x).unwrap();
        let mse: f64 = predictions
            .iter()
            .zip(y.iter())
            .map(|(p, a)| (p - a).powi(2))
            .sum::<f64>()
            / y.len() as f64;
        assert!(mse < 1e-12, "MSE too high: {}", mse);
    }

    #[test]
    fn test_max_depth() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let y = array![0.0, 1.0, 0.0, 1.0];

        let mut tree = DecisionTree::new_classifier().with_max_depth(2);
        tree.fit(&x, &y).unwrap();

        // depth counts levels including the leaves
        assert!(tree.get_depth() <= 3);
    }

    #[test]
    fn test_leaf_probabilities() {
        let x = array![[0.0], [0.0], [0.0], [1.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];
        let mut tree = DecisionTree::new_classifier().with_n_classes(3);
        tree.fit(&x, &y).unwrap();

        let proba = tree.predict_proba(&array![[0.0]]).unwrap();
        assert_eq!(proba.ncols(), 3);
        assert!((proba[[0, 0]] - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(proba[[0, 2]], 0.0);
    }

    #[test]
    fn test_feature_importances() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new_classifier();
        tree.fit(&x, &y).unwrap();

        let importances = tree.feature_importances().unwrap();
        assert_eq!(importances[0], 1.0);
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_node_counts_are_consistent() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = array![0.0, 0.0, 1.0, 0.0, 1.0, 1.0];
        let mut tree = DecisionTree::new_classifier();
        tree.fit(&x, &y).unwrap();

        fn check(node: &TreeNode) {
            if let TreeNode::Split { left, right, n_samples, .. } = node {
                assert_eq!(left.n_samples() + right.n_samples(), *n_samples);
                check(left);
                check(right);
            }
        }
        let root = tree.root().unwrap();
        assert_eq!(root.n_samples(), 6);
        check(root);
    }
}
