use serde::{Deserialize, Serialize};

/// Fallback upper bound, in months, when no curve reports a finite domain.
pub const DEFAULT_K_MAX: f64 = 120.0;

/// Shared domain bound across a set of curves: the maximum of the finite
/// per-curve upper bounds, or [`DEFAULT_K_MAX`] when there is none.
pub fn compute_k_max(upper_bounds: impl IntoIterator<Item = Option<f64>>) -> f64 {
    let k_max = upper_bounds
        .into_iter()
        .flatten()
        .filter(|bound| bound.is_finite())
        .fold(f64::NAN, f64::max);
    if k_max.is_finite() { k_max } else { DEFAULT_K_MAX }
}

/// Sampling limit for one curve: its own bound capped by the shared `k_max`.
pub fn curve_k_limit(own_bound: Option<f64>, k_max: f64) -> f64 {
    own_bound
        .filter(|bound| bound.is_finite())
        .unwrap_or(DEFAULT_K_MAX)
        .min(k_max)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub k: f64,
    pub hd: f64,
}

/// Samples `evaluate` at integer months `0..=limit`.
pub fn sample_curve(limit: f64, evaluate: impl Fn(f64) -> f64) -> Vec<CurvePoint> {
    if !limit.is_finite() || limit < 0.0 {
        return Vec::new();
    }
    (0..=limit.floor() as u32)
        .map(|month| {
            let k = f64::from(month);
            CurvePoint {
                k,
                hd: evaluate(k),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_k_max_takes_largest_finite_bound() {
        assert_eq!(compute_k_max([Some(80.0), Some(120.0), Some(95.0)]), 120.0);
        assert_eq!(compute_k_max([Some(90.0)]), 90.0);

        let k_max = compute_k_max([Some(60.0), None, Some(96.0), Some(24.0)]);
        assert_eq!(k_max, 96.0);
    }

    #[test]
    fn test_k_max_falls_back_without_candidates() {
        assert_eq!(compute_k_max([]), DEFAULT_K_MAX);
        assert_eq!(compute_k_max([None, None]), DEFAULT_K_MAX);
        assert_eq!(compute_k_max([Some(f64::NAN), Some(f64::INFINITY)]), DEFAULT_K_MAX);
    }

    #[test]
    fn test_curve_limit_capped_by_shared_domain() {
        assert_eq!(curve_k_limit(Some(60.0), 96.0), 60.0);
        assert_eq!(curve_k_limit(Some(200.0), 96.0), 96.0);
        assert_eq!(curve_k_limit(None, 96.0), 96.0);
        assert_eq!(curve_k_limit(None, 150.0), DEFAULT_K_MAX);
        assert_eq!(curve_k_limit(Some(f64::NAN), 96.0), 96.0);
    }

    #[test]
    fn test_sample_curve_walks_integer_months() {
        let points = sample_curve(3.0, |k| k * 2.0);
        assert_eq!(points.len(), 4);
        assert_eq!(points[0], CurvePoint { k: 0.0, hd: 0.0 });
        assert_eq!(points[3], CurvePoint { k: 3.0, hd: 6.0 });
    }

    #[test]
    fn test_sample_curve_truncates_fractional_limit() {
        let points = sample_curve(2.9, |k| k);
        assert_eq!(points.last(), Some(&CurvePoint { k: 2.0, hd: 2.0 }));
    }

    #[test]
    fn test_sample_curve_rejects_bad_limits() {
        assert!(sample_curve(f64::NAN, |k| k).is_empty());
        assert!(sample_curve(-1.0, |k| k).is_empty());
    }
}
