use std::time::Duration;

use remedy_core::config::MetricsConfig;
use remedy_core::error::RemedyError;
use reqwest::Client;
use tracing::{info, warn};

const DELETE_SERIES_PATH: &str = "/api/v1/admin/tsdb/delete_series";
const MATCH_ALL_SERIES: &str = "{__name__=~'.+'}";

/// Prometheus admin client. One attempt per call; the upstream status is
/// handed back untouched.
#[derive(Clone)]
pub(crate) struct MetricsCleaner {
    client: Client,
    base_url: String,
}

impl MetricsCleaner {
    pub(crate) fn from_config(cfg: &MetricsConfig) -> Result<Self, RemedyError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(cfg.connect_timeout_seconds.max(1)))
            .timeout(Duration::from_secs(cfg.timeout_seconds.max(1)))
            .build()
            .map_err(|err| RemedyError::UpstreamRequestFailed(format!("build client: {err}")))?;
        Ok(Self::new(client, &cfg.base_url))
    }

    pub(crate) fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub(crate) async fn delete_all_series(&self) -> Result<u16, RemedyError> {
        let url = format!("{}{DELETE_SERIES_PATH}", self.base_url);
        let resp = self
            .client
            .post(&url)
            .query(&[("match[]", MATCH_ALL_SERIES)])
            .send()
            .await
            .map_err(|err| {
                warn!("prometheus cleanup request failed url={url}: {err}");
                RemedyError::UpstreamRequestFailed(err.to_string())
            })?;
        let status = resp.status().as_u16();
        info!("prometheus cleanup status {status}");
        Ok(status)
    }
}
