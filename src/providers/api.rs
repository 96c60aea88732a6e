use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::bands::{BandQuery, BandService};
use crate::filters::{FilterCatalog, FilterSpec};
use crate::fit::{CurveFitService, FitResult};
use crate::series::{SeriesPayload, SeriesService, YearWindow};

/// Client for the curve backend. One instance serves every endpoint:
/// curve fits, project timeseries, prediction bands, the filter catalog
/// and the health probe.
pub struct ApiClient {
    base: Url,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url.trim_end_matches('/'))
            .with_context(|| format!("Invalid API base URL: {base_url}"))?;
        let client = reqwest::Client::builder()
            .user_agent("curvas/0.2")
            .build()
            .context("Failed to create HTTP client")?;
        Ok(ApiClient { base, client })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("API base URL cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn fetch_catalog(&self) -> Result<FilterCatalog> {
        let url = self.endpoint(&["api", "filters"])?;
        debug!("Fetching filter catalog from {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to fetch filter catalog")?;
        if !response.status().is_success() {
            bail!(
                "Filter catalog request failed with status: {}",
                response.status()
            );
        }
        response
            .json()
            .await
            .context("Failed to parse filter catalog response")
    }

    pub async fn health(&self) -> Result<Value> {
        let url = self.endpoint(&["api", "health"])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to reach the API health endpoint")?;
        if !response.status().is_success() {
            bail!("Health check failed with status: {}", response.status());
        }
        response
            .json()
            .await
            .context("Failed to parse health response")
    }
}

// The flag travels as a query parameter, never in the fit body.
fn fit_request_body(filters: &FilterSpec) -> Result<Value> {
    let mut body =
        serde_json::to_value(filters).context("Failed to serialize filter payload")?;
    if let Some(map) = body.as_object_mut() {
        map.remove("fromFirstDisbursement");
    }
    Ok(body)
}

fn band_query_pairs(query: &BandQuery) -> Vec<(String, String)> {
    let mut pairs = vec![
        ("method".to_string(), query.method.as_str().to_string()),
        ("level".to_string(), query.level.to_string()),
        ("smooth".to_string(), query.smooth.to_string()),
    ];
    if let Some(identifier) = &query.exclude_project {
        pairs.push(("iatiidentifier".to_string(), identifier.clone()));
    }

    let filters = &query.filters;
    for id in &filters.macrosectors {
        pairs.push(("macrosectors".to_string(), id.to_string()));
    }
    for id in &filters.modalities {
        pairs.push(("modalities".to_string(), id.to_string()));
    }
    for code in &filters.countries {
        pairs.push(("countries".to_string(), code.clone()));
    }
    for code in &filters.mdbs {
        pairs.push(("mdbs".to_string(), code.clone()));
    }
    pairs.push(("ticketMin".to_string(), filters.ticket_min.to_string()));
    pairs.push(("ticketMax".to_string(), filters.ticket_max.to_string()));
    pairs.push(("yearFrom".to_string(), filters.year_from.to_string()));
    pairs.push(("yearTo".to_string(), filters.year_to.to_string()));
    pairs.push(("onlyExited".to_string(), filters.only_exited.to_string()));
    if filters.from_first_disbursement {
        pairs.push(("fromFirstDisbursement".to_string(), "true".to_string()));
    }
    pairs
}

#[async_trait]
impl CurveFitService for ApiClient {
    #[instrument(
        name = "CurveFit",
        skip(self, filters),
        fields(countries = ?filters.countries, mdbs = ?filters.mdbs)
    )]
    async fn fit_curve(&self, filters: &FilterSpec) -> Result<FitResult> {
        let url = self.endpoint(&["api", "curves", "fit"])?;
        debug!("Requesting curve fit from {url}");

        let mut request = self.client.post(url).json(&fit_request_body(filters)?);
        if filters.from_first_disbursement {
            request = request.query(&[("fromFirstDisbursement", "true")]);
        }

        let response = request
            .send()
            .await
            .context("Failed to request a curve fit")?;
        if !response.status().is_success() {
            bail!(
                "Curve fit request failed with status: {}",
                response.status()
            );
        }
        response
            .json()
            .await
            .context("Failed to parse curve fit response")
    }
}

#[async_trait]
impl SeriesService for ApiClient {
    async fn fetch_series(&self, identifier: &str, window: YearWindow) -> Result<SeriesPayload> {
        let url = self.endpoint(&["api", "projects", identifier, "timeseries"])?;
        debug!("Fetching timeseries for {identifier} from {url}");

        let response = self
            .client
            .get(url)
            .query(&[
                ("yearFrom", window.year_from.to_string()),
                ("yearTo", window.year_to.to_string()),
            ])
            .send()
            .await
            .with_context(|| format!("Failed to fetch timeseries for {identifier}"))?;
        if !response.status().is_success() {
            bail!(
                "Timeseries request for {identifier} failed with status: {}",
                response.status()
            );
        }
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse timeseries response for {identifier}"))
    }
}

#[async_trait]
impl BandService for ApiClient {
    async fn fetch_bands(&self, query: &BandQuery) -> Result<Value> {
        let url = self.endpoint(&["api", "curves", "prediction-bands"])?;
        debug!("Fetching prediction bands from {url}");

        let response = self
            .client
            .get(url)
            .query(&band_query_pairs(query))
            .send()
            .await
            .context("Failed to fetch prediction bands")?;
        if !response.status().is_success() {
            bail!(
                "Prediction band request failed with status: {}",
                response.status()
            );
        }
        response
            .json()
            .await
            .context("Failed to parse prediction band response")
    }
}
