use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::filters::FilterSpec;

/// Coefficients and portfolio statistics of one fitted curve.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FitParams {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub k30: Option<f64>,
    pub k50: Option<f64>,
    pub k80: Option<f64>,
    pub r2: Option<f64>,
    pub var_y: Option<f64>,
    pub sigma: Option<f64>,
    pub mean_y: Option<f64>,
    pub median_y: Option<f64>,
    pub band_z: Option<f64>,
    pub n_projects: Option<u64>,
    pub disb_count: Option<u64>,
    pub approved_avg: Option<f64>,
    pub portfolio_share: Option<f64>,
}

impl FitParams {
    /// Historic disbursement share at month `k` under the quadratic
    /// logistic model `1 / (1 + exp(-(b0 + b1*k + b2*k^2)))`.
    pub fn evaluate(&self, k: f64) -> f64 {
        1.0 / (1.0 + (-(self.b0 + self.b1 * k + self.b2 * k * k)).exp())
    }
}

/// One observed scatter point behind a fit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SnapshotPoint {
    pub k: f64,
    pub d: Option<f64>,
    pub y: Option<f64>,
    #[serde(alias = "iatiidentifier")]
    pub iati_identifier: Option<String>,
    pub macrosector_id: Option<u32>,
    pub modality_id: Option<u32>,
    pub country_id: Option<String>,
}

/// Backend response to a curve-fit request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FitResult {
    pub params: Option<FitParams>,
    #[serde(alias = "kDomain", default)]
    pub k_domain: Vec<f64>,
    #[serde(alias = "activePoints", default)]
    pub active_points: Vec<SnapshotPoint>,
    #[serde(default)]
    pub points: Vec<SnapshotPoint>,
    #[serde(default)]
    pub bands: Option<Value>,
}

impl FitResult {
    /// Finite upper bound of the fit's own domain, when the backend
    /// reported one.
    pub fn k_upper_bound(&self) -> Option<f64> {
        self.k_domain
            .get(1)
            .copied()
            .filter(|bound| bound.is_finite())
    }
}

#[async_trait]
pub trait CurveFitService: Send + Sync {
    async fn fit_curve(&self, filters: &FilterSpec) -> Result<FitResult>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(b0: f64, b1: f64, b2: f64) -> FitParams {
        serde_json::from_value(json!({"b0": b0, "b1": b1, "b2": b2}))
            .expect("minimal params should deserialize")
    }

    #[test]
    fn test_evaluate_is_logistic() {
        let p = params(0.0, 0.0, 0.0);
        assert!((p.evaluate(0.0) - 0.5).abs() < 1e-12);

        let p = params(-4.0, 0.1, 0.0);
        assert!(p.evaluate(0.0) < 0.02);
        assert!(p.evaluate(120.0) > 0.99);
        // Monotone in k for b1 > 0, b2 = 0.
        assert!(p.evaluate(10.0) < p.evaluate(20.0));
    }

    #[test]
    fn test_fit_result_deserializes_wire_shape() {
        let raw = json!({
            "params": {
                "b0": -4.2, "b1": 0.09, "b2": 0.0001,
                "k50": 42.5, "r2": 0.87, "n_projects": 131
            },
            "kDomain": [0, 96],
            "activePoints": [
                {"k": 3, "d": 0.01, "iatiidentifier": "XM-DAC-46002-P1"}
            ],
            "points": [
                {"k": 3, "d": 0.01, "y": 0.02, "macrosector_id": 11, "country_id": "AR"}
            ]
        });
        let result: FitResult = serde_json::from_value(raw).unwrap();
        let p = result.params.as_ref().unwrap();
        assert_eq!(p.k50, Some(42.5));
        assert_eq!(p.n_projects, Some(131));
        assert_eq!(p.k30, None);
        assert_eq!(result.k_domain, vec![0.0, 96.0]);
        assert_eq!(
            result.active_points[0].iati_identifier.as_deref(),
            Some("XM-DAC-46002-P1")
        );
        assert_eq!(result.points[0].macrosector_id, Some(11));
        assert!(result.bands.is_none());
    }

    #[test]
    fn test_fit_result_tolerates_missing_blocks() {
        let result: FitResult = serde_json::from_value(json!({"params": null})).unwrap();
        assert!(result.params.is_none());
        assert!(result.k_domain.is_empty());
        assert!(result.active_points.is_empty());
        assert!(result.points.is_empty());
    }

    #[test]
    fn test_k_upper_bound() {
        let mut result: FitResult = serde_json::from_value(json!({"kDomain": [0, 96]})).unwrap();
        assert_eq!(result.k_upper_bound(), Some(96.0));

        result.k_domain = vec![0.0];
        assert_eq!(result.k_upper_bound(), None);

        result.k_domain = vec![0.0, f64::INFINITY];
        assert_eq!(result.k_upper_bound(), None);

        result.k_domain.clear();
        assert_eq!(result.k_upper_bound(), None);
    }
}
