pub mod carbon;

use anyhow::Result;
use async_trait::async_trait;

use crate::url::ResolvedUrl;

/// The pair of numbers the measurement API reports for a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Grams of CO2 per page view.
    pub co2_per_view: f64,
    /// Percentage of tested pages this page is cleaner than.
    pub cleaner_than_percent: f64,
}

/// Seam between the state machine and the network. One call, one GET, no
/// retries; a later activation is the only retry mechanism. Transport
/// failures, non-2xx statuses, malformed bodies, and bodies missing either
/// numeric field all come back as a plain error — callers never distinguish
/// further.
#[async_trait]
pub trait MeasurementFetcher: Send + Sync {
    async fn measure(&self, url: &ResolvedUrl) -> Result<Measurement>;
}
