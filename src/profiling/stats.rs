//! Descriptive statistics over columns with missing cells

/// Pearson correlation over the rows where both values are present.
///
/// Returns 0 for degenerate inputs (fewer than two complete rows, or zero variance).
pub fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> f64 {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b.iter())
        .filter_map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => Some((*x, *y)),
            _ => None,
        })
        .collect();
    pearson_complete(&pairs)
}

fn pearson_complete(pairs: &[(f64, f64)]) -> f64 {
    let n = pairs.len();
    if n < 2 {
        return 0.0;
    }
    let nf = n as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / nf;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / nf;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for &(x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    let denom = (sxx * syy).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return 0.0;
    }
    (sxy / denom).clamp(-1.0, 1.0)
}

/// Biased Fisher-Pearson skewness `m3 / m2^1.5` over the present values.
///
/// `None` when there are no values or the variance is zero.
pub fn skewness(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    let n = present.len() as f64;
    let mean = present.iter().sum::<f64>() / n;
    let m2 = present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let m3 = present.iter().map(|v| (v - mean).powi(3)).sum::<f64>() / n;
    // Relative tolerance so float noise on a constant column does not read as variance
    if m2 <= f64::EPSILON * mean.abs().max(1.0).powi(2) {
        return None;
    }
    let skew = m3 / m2.powf(1.5);
    skew.is_finite().then_some(skew)
}

/// Round to a fixed number of decimals
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_pearson_perfect() {
        let a = some(&[1.0, 2.0, 3.0, 4.0]);
        let b = some(&[2.0, 4.0, 6.0, 8.0]);
        assert!((pearson(&a, &b) - 1.0).abs() < 1e-12);
        let c = some(&[4.0, 3.0, 2.0, 1.0]);
        assert!((pearson(&a, &c) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_degenerate_is_zero() {
        let a = some(&[1.0, 1.0, 1.0]);
        let b = some(&[1.0, 2.0, 3.0]);
        assert_eq!(pearson(&a, &b), 0.0);
        assert_eq!(pearson(&[Some(1.0)], &[Some(2.0)]), 0.0);
    }

    #[test]
    fn test_pearson_skips_incomplete_rows() {
        let a = vec![Some(1.0), None, Some(3.0), Some(5.0)];
        let b = vec![Some(1.0), Some(100.0), Some(3.0), Some(5.0)];
        assert!((pearson(&a, &b) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_skewness() {
        assert!(skewness(&some(&[1.0, 2.0, 3.0])).unwrap().abs() < 1e-12);
        assert!(skewness(&some(&[1.0, 1.0, 1.0, 10.0])).unwrap() > 1.0);
        assert!(skewness(&some(&[5.0, 5.0])).is_none());
        assert!(skewness(&[None, None]).is_none());
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.98765, 3), 0.988);
        assert_eq!(round_to(-0.12345, 2), -0.12);
    }
}
