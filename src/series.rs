use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Year range applied to timeseries requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearWindow {
    pub year_from: i32,
    pub year_to: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProjectMeta {
    #[serde(alias = "iatiidentifier", default)]
    pub iati_identifier: String,
    pub macrosector_id: Option<u32>,
    pub modality_id: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SeriesPoint {
    pub k: f64,
    pub d: f64,
}

/// Disbursement timeline of a single project.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SeriesPayload {
    #[serde(default)]
    pub project: ProjectMeta,
    #[serde(default)]
    pub series: Vec<SeriesPoint>,
}

impl SeriesPayload {
    /// Stand-in for a project whose fetch failed. Keeps the identifier so
    /// callers can still attribute the empty timeline.
    pub fn placeholder(identifier: &str) -> Self {
        SeriesPayload {
            project: ProjectMeta {
                iati_identifier: identifier.to_string(),
                macrosector_id: None,
                modality_id: None,
            },
            series: Vec::new(),
        }
    }
}

#[async_trait]
pub trait SeriesService: Send + Sync {
    async fn fetch_series(&self, identifier: &str, window: YearWindow) -> Result<SeriesPayload>;
}

type SharedFetch = Shared<BoxFuture<'static, Arc<SeriesPayload>>>;

/// Per-project timeseries cache. Concurrent requests for the same
/// identifier share one in-flight fetch, and a failed fetch settles to a
/// cached [`SeriesPayload::placeholder`] instead of being retried.
pub struct SeriesCache {
    service: Arc<dyn SeriesService>,
    in_flight: Mutex<HashMap<String, SharedFetch>>,
}

impl SeriesCache {
    pub fn new(service: Arc<dyn SeriesService>) -> Self {
        SeriesCache {
            service,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, identifier: &str, window: YearWindow) -> Arc<SeriesPayload> {
        let fetch = {
            let mut in_flight = self.in_flight.lock().await;
            if let Some(fetch) = in_flight.get(identifier) {
                debug!("Series cache hit for {identifier}");
                fetch.clone()
            } else {
                debug!("Series cache miss for {identifier}");
                let service = Arc::clone(&self.service);
                let id = identifier.to_string();
                let fetch = async move {
                    match service.fetch_series(&id, window).await {
                        Ok(payload) => Arc::new(payload),
                        Err(error) => {
                            warn!("Timeseries fetch failed for {id}: {error:#}");
                            Arc::new(SeriesPayload::placeholder(&id))
                        }
                    }
                }
                .boxed()
                .shared();
                in_flight.insert(identifier.to_string(), fetch.clone());
                fetch
            }
        };
        fetch.await
    }
}
