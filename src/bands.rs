use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::filters::FilterSpec;

// Accepted source spellings per canonical field, most specific first.
// Later entries are fallbacks, not overrides.
const K_ALIASES: &[&str] = &["k", "month", "x"];
const P2_5_ALIASES: &[&str] = &["p2_5", "p_2_5", "p025"];
const P10_ALIASES: &[&str] = &["p10", "p_10"];
const P50_ALIASES: &[&str] = &["p50", "p_50", "median", "hd"];
const P90_ALIASES: &[&str] = &["p90", "p_90"];
const P97_5_ALIASES: &[&str] = &["p97_5", "p_97_5", "p975"];
const P_LOW_ALIASES: &[&str] = &["p_low", "pLow", "lower", "hd_dn", "p10", "p_10", "p2_5", "p_2_5"];
const P_HIGH_ALIASES: &[&str] = &[
    "p_high", "pHigh", "upper", "hd_up", "p90", "p_90", "p97_5", "p_97_5",
];
const N_ALIASES: &[&str] = &["n", "n_k", "count"];
const LOW_SAMPLE_P80_ALIASES: &[&str] = &["low_sample_p80"];
const LOW_SAMPLE_P95_ALIASES: &[&str] = &["low_sample_p95"];

/// Canonical quantile-band columns, index-aligned by ascending `k`.
/// Absent values are `None`, never zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BandTable {
    pub k: Vec<f64>,
    pub p2_5: Vec<Option<f64>>,
    pub p10: Vec<Option<f64>>,
    pub p50: Vec<Option<f64>>,
    pub p90: Vec<Option<f64>>,
    pub p97_5: Vec<Option<f64>>,
    pub p_low: Vec<Option<f64>>,
    pub p_high: Vec<Option<f64>>,
    pub n: Vec<Option<f64>>,
    pub low_sample_p80: Vec<Option<f64>>,
    pub low_sample_p95: Vec<Option<f64>>,
}

impl BandTable {
    pub fn len(&self) -> usize {
        self.k.len()
    }

    pub fn is_empty(&self) -> bool {
        self.k.is_empty()
    }

    fn truncate(&mut self, len: usize) {
        self.k.truncate(len);
        self.p2_5.truncate(len);
        self.p10.truncate(len);
        self.p50.truncate(len);
        self.p90.truncate(len);
        self.p97_5.truncate(len);
        self.p_low.truncate(len);
        self.p_high.truncate(len);
        self.n.truncate(len);
        self.low_sample_p80.truncate(len);
        self.low_sample_p95.truncate(len);
    }

    // Truncates every column to the shortest non-empty quantile column.
    fn reconcile_lengths(&mut self) {
        let lens: Vec<usize> = [
            self.k.len(),
            self.p2_5.len(),
            self.p10.len(),
            self.p50.len(),
            self.p90.len(),
            self.p97_5.len(),
            self.p_low.len(),
            self.p_high.len(),
        ]
        .into_iter()
        .filter(|len| *len > 0)
        .collect();

        let Some(&min_len) = lens.iter().min() else {
            return;
        };
        if lens.iter().any(|len| *len != min_len) {
            warn!("Inconsistent band column lengths {lens:?}, truncating to {min_len}");
            self.truncate(min_len);
        }
    }

    // Restores p2_5 <= p10 <= p50 <= p90 <= p97_5 and p_low <= p50 <= p_high
    // per index by raising (never lowering) out-of-order values.
    fn clamp_quantiles(&mut self) {
        for index in 0..self.k.len() {
            let k = self.k[index];
            let mut prev = f64::NEG_INFINITY;
            let chain: [(&str, &mut Vec<Option<f64>>); 5] = [
                ("p2_5", &mut self.p2_5),
                ("p10", &mut self.p10),
                ("p50", &mut self.p50),
                ("p90", &mut self.p90),
                ("p97_5", &mut self.p97_5),
            ];
            for (name, column) in chain {
                if let Some(value) = column[index] {
                    if value < prev {
                        warn!("Quantile inversion at k {k} for {name}");
                        column[index] = Some(prev);
                    } else {
                        prev = value;
                    }
                }
            }

            let Some(median) = self.p50[index] else {
                continue;
            };
            if let Some(low) = self.p_low[index] {
                if low > median {
                    warn!("Low band above median at k {k}");
                    self.p_low[index] = Some(median);
                }
            }
            if let Some(high) = self.p_high[index] {
                if high < median {
                    warn!("High band below median at k {k}");
                    self.p_high[index] = Some(median);
                }
            }
        }
    }
}

struct BandRecord {
    k: f64,
    p2_5: Option<f64>,
    p10: Option<f64>,
    p50: Option<f64>,
    p90: Option<f64>,
    p97_5: Option<f64>,
    p_low: Option<f64>,
    p_high: Option<f64>,
    n: Option<f64>,
    low_sample_p80: Option<f64>,
    low_sample_p95: Option<f64>,
}

/// Normalizes a raw band payload into a [`BandTable`].
///
/// Accepts an array of records (`[{k, p10, ...}]`) or an object of parallel
/// arrays (`{k: [], p10: [], ...}`) with aliased field names. Never fails:
/// malformed input degrades to absent values or an empty table, with
/// diagnostics logged rather than errors raised.
pub fn normalize_bands(raw: &Value) -> BandTable {
    let mut records: Vec<BandRecord> = collect_records(raw)
        .iter()
        .filter_map(|record| {
            let k = resolve_number(record, K_ALIASES)?;
            Some(BandRecord {
                k,
                p2_5: resolve_number(record, P2_5_ALIASES),
                p10: resolve_number(record, P10_ALIASES),
                p50: resolve_number(record, P50_ALIASES),
                p90: resolve_number(record, P90_ALIASES),
                p97_5: resolve_number(record, P97_5_ALIASES),
                p_low: resolve_number(record, P_LOW_ALIASES),
                p_high: resolve_number(record, P_HIGH_ALIASES),
                n: resolve_number(record, N_ALIASES),
                low_sample_p80: resolve_number(record, LOW_SAMPLE_P80_ALIASES),
                low_sample_p95: resolve_number(record, LOW_SAMPLE_P95_ALIASES),
            })
        })
        .collect();
    records.sort_by(|a, b| a.k.total_cmp(&b.k));

    let mut table = BandTable::default();
    for record in &records {
        table.k.push(record.k);
        table.p2_5.push(record.p2_5);
        table.p10.push(record.p10);
        table.p50.push(record.p50);
        table.p90.push(record.p90);
        table.p97_5.push(record.p97_5);
        table.p_low.push(record.p_low);
        table.p_high.push(record.p_high);
        table.n.push(record.n);
        table.low_sample_p80.push(record.low_sample_p80);
        table.low_sample_p95.push(record.low_sample_p95);
    }

    table.reconcile_lengths();
    table.clamp_quantiles();
    table
}

// Array input is taken record by record; an object of parallel arrays is
// transposed into per-index records using the longest property.
fn collect_records(raw: &Value) -> Vec<Map<String, Value>> {
    match raw {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_object().cloned())
            .collect(),
        Value::Object(map) => {
            let columns: Vec<(&String, &Vec<Value>)> = map
                .iter()
                .filter_map(|(name, value)| value.as_array().map(|items| (name, items)))
                .collect();
            let rows = columns
                .iter()
                .map(|(_, items)| items.len())
                .max()
                .unwrap_or(0);
            (0..rows)
                .map(|index| {
                    let mut record = Map::new();
                    for (name, items) in &columns {
                        if let Some(value) = items.get(index) {
                            record.insert((*name).clone(), value.clone());
                        }
                    }
                    record
                })
                .collect()
        }
        _ => Vec::new(),
    }
}

// First present, non-null alias wins; the winner is then coerced, it does
// not fall through to a later alias when coercion fails.
fn resolve_number(record: &Map<String, Value>, aliases: &[&str]) -> Option<f64> {
    for alias in aliases {
        match record.get(*alias) {
            None | Some(Value::Null) => continue,
            Some(value) => return coerce_number(value),
        }
    }
    None
}

fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => return None,
    };
    number.is_finite().then_some(number)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandMethod {
    #[default]
    HistoricalQuantiles,
    RollingStd,
    Bootstrap,
    QuantileReg,
}

impl BandMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BandMethod::HistoricalQuantiles => "historical_quantiles",
            BandMethod::RollingStd => "rolling_std",
            BandMethod::Bootstrap => "bootstrap",
            BandMethod::QuantileReg => "quantile_reg",
        }
    }
}

/// Parameters of a prediction-band fetch. `exclude_project` asks the backend
/// to leave that project out of the computation.
#[derive(Debug, Clone, PartialEq)]
pub struct BandQuery {
    pub filters: FilterSpec,
    pub method: BandMethod,
    pub level: u8,
    pub smooth: bool,
    pub exclude_project: Option<String>,
}

impl Default for BandQuery {
    fn default() -> Self {
        BandQuery {
            filters: FilterSpec::default(),
            method: BandMethod::default(),
            level: 80,
            smooth: true,
            exclude_project: None,
        }
    }
}

impl BandQuery {
    pub fn for_filters(filters: FilterSpec) -> Self {
        BandQuery {
            filters,
            ..Default::default()
        }
    }
}

#[async_trait]
pub trait BandService: Send + Sync {
    async fn fetch_bands(&self, query: &BandQuery) -> Result<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_of_arrays_preserves_explicit_bounds() {
        let raw = json!({"k": [0, 1], "p_low": [0.1, 0.2], "p_high": [0.3, 0.4]});
        let table = normalize_bands(&raw);
        assert_eq!(table.k, vec![0.0, 1.0]);
        assert_eq!(table.p_low, vec![Some(0.1), Some(0.2)]);
        assert_eq!(table.p_high, vec![Some(0.3), Some(0.4)]);
    }

    #[test]
    fn test_low_high_derived_from_p10_p90() {
        let raw = json!([
            {"k": 0, "p10": 0.1, "p90": 0.3},
            {"k": 1, "p10": 0.2, "p90": 0.4}
        ]);
        let table = normalize_bands(&raw);
        assert_eq!(table.p_low, vec![Some(0.1), Some(0.2)]);
        assert_eq!(table.p_high, vec![Some(0.3), Some(0.4)]);
        assert_eq!(table.p10, vec![Some(0.1), Some(0.2)]);
        assert_eq!(table.p90, vec![Some(0.3), Some(0.4)]);
    }

    #[test]
    fn test_alias_precedence_prefers_specific_over_fallback() {
        let raw = json!([{"k": 0, "hd_dn": 0.0, "hd_up": 0.1}]);
        let table = normalize_bands(&raw);
        assert_eq!(table.p_low, vec![Some(0.0)]);
        assert_eq!(table.p_high, vec![Some(0.1)]);

        // hd_dn sits before the p10 fallback in the chain.
        let raw = json!([{"k": 0, "hd_dn": 0.0, "p10": 0.05}]);
        let table = normalize_bands(&raw);
        assert_eq!(table.p_low, vec![Some(0.0)]);
        assert_eq!(table.p10, vec![Some(0.05)]);
    }

    #[test]
    fn test_median_aliases() {
        let table = normalize_bands(&json!([{"k": 0, "hd": 0.5}]));
        assert_eq!(table.p50, vec![Some(0.5)]);

        let table = normalize_bands(&json!([{"k": 0, "median": 0.4}]));
        assert_eq!(table.p50, vec![Some(0.4)]);

        let table = normalize_bands(&json!([{"k": 0, "p50": 0.6, "median": 0.4}]));
        assert_eq!(table.p50, vec![Some(0.6)]);
    }

    #[test]
    fn test_month_and_x_resolve_k() {
        let table = normalize_bands(&json!([{"month": 3, "p50": 0.1}, {"x": 5, "p50": 0.2}]));
        assert_eq!(table.k, vec![3.0, 5.0]);
    }

    #[test]
    fn test_numeric_strings_coerced() {
        let table = normalize_bands(&json!([{"k": "2", "p50": "0.5", "n": "12"}]));
        assert_eq!(table.k, vec![2.0]);
        assert_eq!(table.p50, vec![Some(0.5)]);
        assert_eq!(table.n, vec![Some(12.0)]);
    }

    #[test]
    fn test_low_sample_flags_coerced_and_aligned() {
        let raw = json!([
            {"k": 0, "p50": 0.1, "low_sample_p80": true},
            {"k": 1, "p50": 0.2}
        ]);
        let table = normalize_bands(&raw);
        assert_eq!(table.low_sample_p80, vec![Some(1.0), None]);
        assert_eq!(table.low_sample_p95, vec![None, None]);
        assert_eq!(table.low_sample_p80.len(), table.k.len());
    }

    #[test]
    fn test_records_without_finite_k_dropped() {
        let raw = json!([
            {"p50": 0.1},
            {"k": null, "p50": 0.2},
            {"k": "not-a-month", "p50": 0.3},
            {"k": 4, "p50": 0.4}
        ]);
        let table = normalize_bands(&raw);
        assert_eq!(table.k, vec![4.0]);
        assert_eq!(table.p50, vec![Some(0.4)]);
    }

    #[test]
    fn test_null_k_falls_through_to_month() {
        let table = normalize_bands(&json!([{"k": null, "month": 7, "p50": 0.1}]));
        assert_eq!(table.k, vec![7.0]);
    }

    #[test]
    fn test_k_sorted_ascending_with_stable_ties() {
        let raw = json!([
            {"k": 5, "p50": 0.5},
            {"k": 1, "p50": 0.1},
            {"k": 5, "p50": 0.6},
            {"k": 3, "p50": 0.3}
        ]);
        let table = normalize_bands(&raw);
        assert_eq!(table.k, vec![1.0, 3.0, 5.0, 5.0]);
        assert_eq!(table.p50, vec![Some(0.1), Some(0.3), Some(0.5), Some(0.6)]);
    }

    #[test]
    fn test_quantile_chain_clamped_upwards() {
        let raw = json!([{"k": 0, "p2_5": 0.5, "p10": 0.3, "p50": 0.4, "p90": 0.9}]);
        let table = normalize_bands(&raw);
        assert_eq!(table.p2_5, vec![Some(0.5)]);
        assert_eq!(table.p10, vec![Some(0.5)]);
        assert_eq!(table.p50, vec![Some(0.5)]);
        assert_eq!(table.p90, vec![Some(0.9)]);
    }

    #[test]
    fn test_chain_skips_absent_values() {
        let raw = json!([{"k": 0, "p2_5": 0.6, "p90": 0.2}]);
        let table = normalize_bands(&raw);
        assert_eq!(table.p2_5, vec![Some(0.6)]);
        assert_eq!(table.p10, vec![None]);
        assert_eq!(table.p90, vec![Some(0.6)]);
    }

    #[test]
    fn test_low_and_high_clamped_to_median() {
        let raw = json!({"k": [0], "p50": [0.5], "p_low": [0.6], "p_high": [0.4]});
        let table = normalize_bands(&raw);
        assert_eq!(table.p_low, vec![Some(0.5)]);
        assert_eq!(table.p_high, vec![Some(0.5)]);
    }

    #[test]
    fn test_missing_fields_stay_absent() {
        let table = normalize_bands(&json!([{"k": 0}]));
        assert_eq!(table.len(), 1);
        assert_eq!(table.p10, vec![None]);
        assert_eq!(table.p50, vec![None]);
        assert_eq!(table.n, vec![None]);
    }

    #[test]
    fn test_object_with_ragged_columns_leaves_holes() {
        let raw = json!({"k": [0, 1, 2], "p50": [0.1, 0.2]});
        let table = normalize_bands(&raw);
        assert_eq!(table.k, vec![0.0, 1.0, 2.0]);
        assert_eq!(table.p50, vec![Some(0.1), Some(0.2), None]);
    }

    #[test]
    fn test_degenerate_inputs_yield_empty_table() {
        for raw in [
            json!(null),
            json!(42),
            json!("bands"),
            json!(true),
            json!([]),
            json!({}),
            json!({"note": "no arrays here"}),
        ] {
            let table = normalize_bands(&raw);
            assert!(table.is_empty(), "expected empty table for {raw}");
        }
    }

    #[test]
    fn test_array_with_non_object_items_skips_them() {
        let raw = json!([5, null, "x", {"k": 1, "p50": 0.5}]);
        let table = normalize_bands(&raw);
        assert_eq!(table.k, vec![1.0]);
    }

    #[test]
    fn test_length_reconciliation_truncates_to_shortest() {
        let mut table = BandTable {
            k: vec![0.0, 1.0, 2.0],
            p50: vec![Some(0.1), Some(0.2)],
            ..Default::default()
        };
        table.reconcile_lengths();
        assert_eq!(table.k, vec![0.0, 1.0]);
        assert_eq!(table.p50, vec![Some(0.1), Some(0.2)]);
    }

    #[test]
    fn test_band_method_wire_names() {
        assert_eq!(BandMethod::default().as_str(), "historical_quantiles");
        assert_eq!(BandMethod::RollingStd.as_str(), "rolling_std");
        assert_eq!(BandMethod::Bootstrap.as_str(), "bootstrap");
        assert_eq!(BandMethod::QuantileReg.as_str(), "quantile_reg");
    }

    #[test]
    fn test_band_query_defaults() {
        let query = BandQuery::default();
        assert_eq!(query.method, BandMethod::HistoricalQuantiles);
        assert_eq!(query.level, 80);
        assert!(query.smooth);
        assert!(query.exclude_project.is_none());
    }
}
