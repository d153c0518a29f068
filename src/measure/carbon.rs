use super::{Measurement, MeasurementFetcher};
use crate::url::ResolvedUrl;
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

pub const CARBON_API_BASE: &str = "https://api.websitecarbon.com";

/// Client for the websitecarbon.com badge endpoint.
pub struct CarbonApiClient {
    base_url: String,
    client: reqwest::Client,
}

/// Wire shape of the badge endpoint. Both numbers are optional here on
/// purpose: the contract does not guarantee them, so presence is checked in
/// an explicit decode step instead of trusted.
#[derive(Debug, Deserialize)]
struct CarbonApiResponse {
    c: Option<f64>,
    p: Option<f64>,
    #[allow(dead_code)]
    url: Option<String>,
}

fn measurement_from_response(body: &CarbonApiResponse) -> Option<Measurement> {
    Some(Measurement {
        co2_per_view: body.c?,
        cleaner_than_percent: body.p?,
    })
}

impl CarbonApiClient {
    pub fn new() -> Self {
        Self::with_base_url(CARBON_API_BASE)
    }

    /// Point the client at a different base, e.g. a self-hosted proxy or a
    /// local stub.
    pub fn with_base_url(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .user_agent("carbonbadge/0.1 (+https://github.com/muk2/carbonbadge)")
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

impl Default for CarbonApiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MeasurementFetcher for CarbonApiClient {
    async fn measure(&self, url: &ResolvedUrl) -> Result<Measurement> {
        // The resolved URL is already percent-encoded; it goes on the query
        // string untouched.
        let request_url = format!("{}/b?url={}", self.base_url, url.as_str());

        let response = self.client.get(&request_url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "carbon API error: {}",
                response.status()
            ));
        }

        let body: CarbonApiResponse = response.json().await?;
        measurement_from_response(&body)
            .ok_or_else(|| anyhow::anyhow!("carbon API response missing measurement fields"))
    }
}
