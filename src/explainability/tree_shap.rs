//! Exact path-dependent TreeSHAP
//!
//! Attributions for an additive tree ensemble in polynomial time, using node sample counts
//! as the conditional distribution of absent features. For every row the attributions plus
//! the expected value add up to the ensemble output.

use crate::training::{TreeComponent, TreeEnsembleView, TreeNode};
use ndarray::{Array1, ArrayView1};

#[derive(Debug, Clone, Copy)]
struct PathElement {
    /// Input column; `None` for the root placeholder
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    pweight: f64,
}

fn extend_path(path: &mut Vec<PathElement>, zero_fraction: f64, one_fraction: f64, feature: Option<usize>) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        pweight: if depth == 0 { 1.0 } else { 0.0 },
    });
    let denom = (depth + 1) as f64;
    for i in (0..depth).rev() {
        path[i + 1].pweight += one_fraction * path[i].pweight * (i + 1) as f64 / denom;
        path[i].pweight = zero_fraction * path[i].pweight * (depth - i) as f64 / denom;
    }
}

fn unwind_path(path: &mut Vec<PathElement>, index: usize) {
    let depth = path.len() - 1;
    let one = path[index].one_fraction;
    let zero = path[index].zero_fraction;
    let denom = (depth + 1) as f64;
    let mut next_one_portion = path[depth].pweight;

    for i in (0..depth).rev() {
        if one != 0.0 {
            let previous = path[i].pweight;
            path[i].pweight = next_one_portion * denom / ((i + 1) as f64 * one);
            next_one_portion = previous - path[i].pweight * zero * (depth - i) as f64 / denom;
        } else {
            path[i].pweight = path[i].pweight * denom / (zero * (depth - i) as f64);
        }
    }

    for i in index..depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

/// Total permutation weight of the path with element `index` removed
fn unwound_sum(path: &[PathElement], index: usize) -> f64 {
    let depth = path.len() - 1;
    let one = path[index].one_fraction;
    let zero = path[index].zero_fraction;
    let denom = (depth + 1) as f64;
    let mut next_one_portion = path[depth].pweight;
    let mut total = 0.0;

    for i in (0..depth).rev() {
        if one != 0.0 {
            let tmp = next_one_portion * denom / ((i + 1) as f64 * one);
            total += tmp;
            next_one_portion = path[i].pweight - tmp * zero * (depth - i) as f64 / denom;
        } else if zero != 0.0 {
            total += path[i].pweight / zero * denom / (depth - i) as f64;
        }
    }
    total
}

fn cover_ratio(child: &TreeNode, parent_samples: usize) -> f64 {
    if parent_samples == 0 {
        return 0.0;
    }
    child.n_samples() as f64 / parent_samples as f64
}

struct Walk<'a, 'b, 'r> {
    component: &'b TreeComponent<'a>,
    row: ArrayView1<'r, f64>,
    phi: &'b mut Array1<f64>,
}

impl Walk<'_, '_, '_> {
    fn recurse(
        &mut self,
        node: &TreeNode,
        mut path: Vec<PathElement>,
        zero_fraction: f64,
        one_fraction: f64,
        feature: Option<usize>,
    ) {
        extend_path(&mut path, zero_fraction, one_fraction, feature);

        match node {
            TreeNode::Leaf { .. } => {
                let value = self.component.weight * self.component.leaf_output(node);
                for i in 1..path.len() {
                    let element = path[i];
                    if let Some(column) = element.feature {
                        let w = unwound_sum(&path, i);
                        self.phi[column] += w * (element.one_fraction - element.zero_fraction) * value;
                    }
                }
            }
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                n_samples,
                ..
            } => {
                let column = self.component.input_column(*feature_idx);
                let (hot, cold) = if self.row[column] <= *threshold {
                    (left.as_ref(), right.as_ref())
                } else {
                    (right.as_ref(), left.as_ref())
                };

                let mut incoming_zero = 1.0;
                let mut incoming_one = 1.0;
                if let Some(k) = path.iter().skip(1).position(|e| e.feature == Some(column)) {
                    let k = k + 1;
                    incoming_zero = path[k].zero_fraction;
                    incoming_one = path[k].one_fraction;
                    unwind_path(&mut path, k);
                }

                let hot_zero = cover_ratio(hot, *n_samples) * incoming_zero;
                let cold_zero = cover_ratio(cold, *n_samples) * incoming_zero;
                self.recurse(hot, path.clone(), hot_zero, incoming_one, Some(column));
                self.recurse(cold, path, cold_zero, 0.0, Some(column));
            }
        }
    }
}

/// Cover-weighted mean leaf output of one tree
fn expected_leaf_output(component: &TreeComponent<'_>, node: &TreeNode, weight: f64) -> f64 {
    match node {
        TreeNode::Leaf { .. } => weight * component.leaf_output(node),
        TreeNode::Split {
            left,
            right,
            n_samples,
            ..
        } => {
            expected_leaf_output(component, left, weight * cover_ratio(left, *n_samples))
                + expected_leaf_output(component, right, weight * cover_ratio(right, *n_samples))
        }
    }
}

/// Expected ensemble output over the training distribution
pub fn expected_value(view: &TreeEnsembleView<'_>) -> f64 {
    view.offset
        + view
            .components
            .iter()
            .map(|c| c.weight * expected_leaf_output(c, c.root, 1.0))
            .sum::<f64>()
}

/// SHAP values of one row; `n_features` is the width of the input matrix
pub fn shap_values(view: &TreeEnsembleView<'_>, row: ArrayView1<f64>, n_features: usize) -> Array1<f64> {
    let mut phi = Array1::zeros(n_features);
    for component in &view.components {
        let mut walk = Walk {
            component,
            row,
            phi: &mut phi,
        };
        walk.recurse(component.root, Vec::new(), 1.0, 1.0, None);
    }
    phi
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::{LeafValue, TreeComponent};

    fn leaf(value: f64, n_samples: usize) -> TreeNode {
        TreeNode::Leaf {
            value,
            proba: Vec::new(),
            n_samples,
        }
    }

    fn split(feature_idx: usize, threshold: f64, left: TreeNode, right: TreeNode) -> TreeNode {
        let n_samples = left.n_samples() + right.n_samples();
        TreeNode::Split {
            feature_idx,
            threshold,
            left: Box::new(left),
            right: Box::new(right),
            n_samples,
            impurity: 0.0,
        }
    }

    fn view(root: &TreeNode) -> TreeEnsembleView<'_> {
        TreeEnsembleView {
            components: vec![TreeComponent {
                root,
                feature_map: None,
                weight: 1.0,
                leaf: LeafValue::Value,
            }],
            offset: 0.0,
        }
    }

    #[test]
    fn test_single_split_attribution() {
        // x0 <= 0.5 -> 0, else 10; even split of training rows
        let root = split(0, 0.5, leaf(0.0, 50), leaf(10.0, 50));
        let v = view(&root);
        assert!((expected_value(&v) - 5.0).abs() < 1e-12);

        let phi = shap_values(&v, ndarray::array![1.0, 3.0].view(), 2);
        assert!((phi[0] - 5.0).abs() < 1e-12);
        assert_eq!(phi[1], 0.0);
    }

    #[test]
    fn test_interaction_split_evenly() {
        // y = 1 only when both features are high; symmetric covers
        let root = split(
            0,
            0.5,
            split(1, 0.5, leaf(0.0, 25), leaf(0.0, 25)),
            split(1, 0.5, leaf(0.0, 25), leaf(1.0, 25)),
        );
        let v = view(&root);
        let phi = shap_values(&v, ndarray::array![1.0, 1.0].view(), 2);
        assert!((phi[0] - phi[1]).abs() < 1e-12);
        assert!((phi.sum() + expected_value(&v) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_repeated_feature_is_additive() {
        let root = split(
            0,
            0.5,
            leaf(-1.0, 40),
            split(0, 2.0, leaf(2.0, 30), split(1, 0.0, leaf(3.0, 10), leaf(7.0, 20))),
        );
        let v = view(&root);
        for row in [[0.0, 1.0], [1.0, 1.0], [3.0, -1.0], [3.0, 1.0]] {
            let row = ndarray::arr1(&row);
            let phi = shap_values(&v, row.view(), 2);
            let output = root.leaf_for(row.view());
            let TreeNode::Leaf { value, .. } = output else {
                panic!("expected a leaf");
            };
            assert!(
                (phi.sum() + expected_value(&v) - value).abs() < 1e-9,
                "additivity broken for {:?}",
                row
            );
        }
    }

    #[test]
    fn test_feature_map_routes_to_input_columns() {
        let root = split(0, 0.5, leaf(0.0, 10), leaf(4.0, 10));
        let map = [2usize];
        let v = TreeEnsembleView {
            components: vec![TreeComponent {
                root: &root,
                feature_map: Some(&map),
                weight: 0.5,
                leaf: LeafValue::Value,
            }],
            offset: 1.0,
        };
        let phi = shap_values(&v, ndarray::array![9.0, 9.0, 1.0].view(), 3);
        assert_eq!(phi[0], 0.0);
        assert!((phi[2] - 1.0).abs() < 1e-12);
        assert!((expected_value(&v) - 2.0).abs() < 1e-12);
    }
}
