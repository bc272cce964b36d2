//! Liveness probes against the image CDN

use chrono::Utc;
use reqwest::{StatusCode, header};
use std::time::Duration;
use tracing::debug;

const REVALIDATE_TIMEOUT: Duration = Duration::from_secs(4);
const THUMB_TIMEOUT: Duration = Duration::from_secs(3);
const SWEEP_TIMEOUT: Duration = Duration::from_secs(4);
const DELETE_TIMEOUT: Duration = Duration::from_secs(4);

/// What a revalidation decided about an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevalidateVerdict {
    Alive,
    /// The CDN no longer serves the image
    Gone,
    /// Inconclusive answer; try again later
    Retry { status: Option<u16> },
}

/// Append a `_r=<millis>` cache buster
pub fn with_cache_buster(url: &str, stamp: i64) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{url}{sep}_r={stamp}")
}

fn is_gone(status: StatusCode) -> bool {
    status == StatusCode::NOT_FOUND || status == StatusCode::GONE
}

#[derive(Clone)]
pub struct CdnProber {
    http: reqwest::Client,
}

impl CdnProber {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// HEAD the url, falling back to a one-byte ranged GET where HEAD is refused
    async fn head_or_range(&self, url: &str, timeout: Duration) -> reqwest::Result<StatusCode> {
        let res = self
            .http
            .head(url)
            .header(header::CACHE_CONTROL, "no-cache")
            .header(header::PRAGMA, "no-cache")
            .timeout(timeout)
            .send()
            .await?;

        let status = res.status();
        if status != StatusCode::METHOD_NOT_ALLOWED && status != StatusCode::NOT_IMPLEMENTED {
            return Ok(status);
        }

        let res = self
            .http
            .get(url)
            .header(header::RANGE, "bytes=0-0")
            .header(header::CACHE_CONTROL, "no-cache")
            .header(header::PRAGMA, "no-cache")
            .timeout(timeout)
            .send()
            .await?;
        Ok(res.status())
    }

    /// Decide whether an image still exists on the CDN
    pub async fn revalidate(&self, display_url: &str, thumb_url: Option<&str>) -> RevalidateVerdict {
        let url = with_cache_buster(display_url, Utc::now().timestamp_millis());
        let status = match self.head_or_range(&url, REVALIDATE_TIMEOUT).await {
            Ok(status) => status,
            Err(e) => {
                debug!(error = %e, "display url probe failed");
                return RevalidateVerdict::Retry { status: None };
            }
        };

        if is_gone(status) {
            return RevalidateVerdict::Gone;
        }
        if status.as_u16() < 400 {
            return RevalidateVerdict::Alive;
        }

        // the thumbnail is a second opinion for auth/rate-limit/5xx answers
        if let Some(thumb) = thumb_url {
            let url = with_cache_buster(thumb, Utc::now().timestamp_millis());
            let thumb_status = self
                .http
                .head(&url)
                .header(header::CACHE_CONTROL, "no-cache")
                .header(header::PRAGMA, "no-cache")
                .timeout(THUMB_TIMEOUT)
                .send()
                .await
                .map(|res| res.status());
            if matches!(thumb_status, Ok(s) if is_gone(s)) {
                return RevalidateVerdict::Gone;
            }
        }

        RevalidateVerdict::Retry {
            status: Some(status.as_u16()),
        }
    }

    /// Cleanup sweep check: `true` only when the CDN answers 404/410
    pub async fn probe_gone(&self, display_url: &str) -> bool {
        let url = with_cache_buster(display_url, Utc::now().timestamp_millis());
        match self
            .http
            .head(&url)
            .header(header::CACHE_CONTROL, "no-cache")
            .timeout(SWEEP_TIMEOUT)
            .send()
            .await
        {
            Ok(res) => is_gone(res.status()),
            Err(e) => {
                debug!(error = %e, "sweep probe failed");
                false
            }
        }
    }

    /// Best-effort hit on the host's delete link; failures are only logged
    pub async fn request_remote_delete(&self, delete_url: &str) {
        match self.http.get(delete_url).timeout(DELETE_TIMEOUT).send().await {
            Ok(res) => debug!(status = res.status().as_u16(), "remote delete requested"),
            Err(e) => debug!(error = %e, "remote delete failed"),
        }
    }
}
