use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::compare::{AddRequest, CompareEntry, CompareSet};
use crate::domain::{CurvePoint, compute_k_max, curve_k_limit, sample_curve};
use crate::filters::FilterSpec;
use crate::fit::{CurveFitService, FitResult};

/// Fit outcome for one comparison entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CompareFit {
    pub id: String,
    pub label: String,
    pub result: FitResult,
}

/// Coordinates the comparison set and its fitted results. Refreshes are
/// guarded by a generation counter: any mutation of the set, or a newer
/// refresh, makes an in-flight batch stale, and stale batches are never
/// applied to the stored results.
pub struct Workbench {
    service: Arc<dyn CurveFitService>,
    compare: Mutex<CompareSet>,
    results: Mutex<Vec<CompareFit>>,
    generation: AtomicU64,
}

impl Workbench {
    pub fn new(service: Arc<dyn CurveFitService>) -> Self {
        Workbench {
            service,
            compare: Mutex::new(CompareSet::new()),
            results: Mutex::new(Vec::new()),
            generation: AtomicU64::new(0),
        }
    }

    pub async fn add_comparison(&self, request: impl Into<AddRequest>) -> Option<String> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.compare.lock().await.add(request)
    }

    pub async fn remove_comparison(&self, id: &str) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.compare.lock().await.remove(id);
    }

    pub async fn clear_comparisons(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.compare.lock().await.clear();
    }

    pub async fn combine_comparisons(&self, ids: &[String]) -> Option<String> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.compare.lock().await.combine(ids)
    }

    pub async fn can_add_comparison(&self) -> bool {
        self.compare.lock().await.can_add()
    }

    /// True when some entry already carries exactly these filters.
    pub async fn contains_filters(&self, filters: &FilterSpec) -> bool {
        self.compare.lock().await.contains_filters(filters)
    }

    pub async fn comparisons(&self) -> Vec<CompareEntry> {
        self.compare.lock().await.entries().to_vec()
    }

    /// Last applied comparison batch.
    pub async fn results(&self) -> Vec<CompareFit> {
        self.results.lock().await.clone()
    }

    /// Fits every comparison entry concurrently and applies the batch,
    /// unless the set changed while the fetches were in flight. A failed
    /// fit empties the whole batch rather than applying a partial one.
    pub async fn refresh(&self) -> Vec<CompareFit> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let entries = self.compare.lock().await.entries().to_vec();

        let fetches = entries
            .iter()
            .map(|entry| self.service.fit_curve(&entry.filters));
        let outcomes = future::join_all(fetches).await;

        let mut batch = Vec::with_capacity(entries.len());
        let mut failed = false;
        for (entry, outcome) in entries.iter().zip(outcomes) {
            match outcome {
                Ok(result) => batch.push(CompareFit {
                    id: entry.id.clone(),
                    label: entry.label.clone(),
                    result,
                }),
                Err(error) => {
                    warn!("Comparison fit failed for '{}': {error:#}", entry.label);
                    failed = true;
                }
            }
        }
        if failed {
            batch.clear();
        }

        let mut results = self.results.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Discarding stale comparison batch (generation {generation})");
            return results.clone();
        }
        *results = batch.clone();
        batch
    }
}

/// Upper bound of the shared axis across the primary and comparison fits.
pub fn shared_k_max<'a>(results: impl IntoIterator<Item = &'a FitResult>) -> f64 {
    compute_k_max(results.into_iter().map(FitResult::k_upper_bound))
}

/// Samples one fitted curve over the shared axis, never past the fit's
/// own reported domain.
pub fn sampled_curve(result: &FitResult, k_max: f64) -> Vec<CurvePoint> {
    let Some(params) = &result.params else {
        return Vec::new();
    };
    let limit = curve_k_limit(result.k_upper_bound(), k_max);
    sample_curve(limit, |k| params.evaluate(k))
}
