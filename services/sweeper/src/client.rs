//! Calls into the api service on behalf of the scheduler

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

const CLEANUP_TIMEOUT: Duration = Duration::from_secs(300);
const WARM_TIMEOUT: Duration = Duration::from_secs(60);

/// Body returned by the gallery cleanup endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CleanupReport {
    pub purged: u64,
    pub revalidated: u64,
    pub marked_deleted: u64,
}

#[derive(Debug, Deserialize)]
struct FixturesBody {
    #[serde(default)]
    fixtures: Vec<serde_json::Value>,
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// POST the gallery cleanup endpoint with the shared bearer token
    pub async fn run_cleanup(&self, token: &str) -> Result<CleanupReport> {
        let res = self
            .http
            .post(self.endpoint("/api/admin/gallery/cleanup"))
            .bearer_auth(token)
            .timeout(CLEANUP_TIMEOUT)
            .send()
            .await
            .context("cleanup request failed")?
            .error_for_status()
            .context("cleanup endpoint returned an error")?;

        let report: CleanupReport = res.json().await.context("invalid cleanup response")?;
        Ok(report)
    }

    /// GET the fixtures endpoint so its upstream cache is filled
    pub async fn warm_fixtures(&self, cron_secret: &str) -> Result<usize> {
        let res = self
            .http
            .get(self.endpoint("/api/fixtures"))
            .header("x-cron-secret", cron_secret)
            .timeout(WARM_TIMEOUT)
            .send()
            .await
            .context("fixtures request failed")?
            .error_for_status()
            .context("fixtures endpoint returned an error")?;

        let body: FixturesBody = res.json().await.context("invalid fixtures response")?;
        info!(count = body.fixtures.len(), "Fixtures cache warmed");
        Ok(body.fixtures.len())
    }
}
