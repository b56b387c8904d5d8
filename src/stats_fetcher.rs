use serde_json::Value;
use tracing::{debug, instrument};

use crate::fetch_error::FetchError;

/// Client for the hydrology statistics API.
///
/// A segment has two chart payloads: the streamflow statistics document and
/// the modeled-climatology hydrograph. They are always fetched as a pair.
#[derive(Clone)]
pub struct StatsFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl StatsFetcher {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    pub fn stats_url(&self, segment_id: &str) -> String {
        format!("{}/conus_hydrology/stats/{}", self.base_url, segment_id)
    }

    pub fn hydrograph_url(&self, segment_id: &str) -> String {
        format!(
            "{}/conus_hydrology/modeled_climatology/{}",
            self.base_url, segment_id
        )
    }

    /// Fetch the statistics and hydrograph payloads for a segment.
    ///
    /// Both requests go out concurrently and both must succeed; if either
    /// fails the pair fails, so a consumer never renders one chart against
    /// stale data for the other.
    #[instrument(skip(self), fields(segment_id = %segment_id))]
    pub async fn fetch_pair(&self, segment_id: &str) -> Result<(Value, Value), FetchError> {
        let stats_url = self.stats_url(segment_id);
        let hydrograph_url = self.hydrograph_url(segment_id);

        debug!("Requesting statistics and hydrograph payloads");
        let (stats, hydrograph) = tokio::join!(
            self.fetch_json(&stats_url),
            self.fetch_json(&hydrograph_url)
        );

        Ok((stats?, hydrograph?))
    }

    /// Earlier combined-endpoint variant: one document keyed by segment id,
    /// each entry carrying a `stats` field.
    #[instrument(skip(self), fields(segment_id = %segment_id))]
    pub async fn fetch_combined(&self, segment_id: &str) -> Result<Value, FetchError> {
        let url = format!("{}/conus_hydrology/{}", self.base_url, segment_id);
        let body = self.fetch_json(&url).await?;

        body.get(segment_id)
            .and_then(|entry| entry.get("stats"))
            .cloned()
            .ok_or_else(|| FetchError::Decode(format!("no stats entry for segment {segment_id}")))
    }

    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        debug!(%url, %status, "Received HTTP response");

        if !status.is_success() {
            return Err(FetchError::Http {
                status,
                url: url.to_string(),
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| FetchError::Decode(e.to_string()))
    }
}
