//! On-disk queue of pending POST requests

use chrono::{DateTime, Duration, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::QueueResult;

/// Queued requests older than this are dropped instead of replayed (24 hours)
pub const DEFAULT_MAX_RETENTION_SECS: i64 = 24 * 60 * 60;

/// Only POST requests are ever queued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    Post,
}

/// A request waiting for connectivity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedRequest {
    pub id: u64,
    pub url: String,
    pub method: RequestMethod,
    pub headers: BTreeMap<String, String>,
    pub body: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub retries: u32,
}

/// Outcome counts of one replay pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Delivered and removed
    pub sent: usize,
    /// Still queued with an incremented retry counter
    pub failed: usize,
    /// Dropped for exceeding the retention window
    pub expired: usize,
}

/// Result of a submit attempt
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The server answered; the status is passed through as-is
    Delivered { status: u16 },
    /// The request never reached the server and was queued under this id
    Queued { id: u64 },
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct QueueFile {
    next_id: u64,
    requests: Vec<QueuedRequest>,
}

/// Persisted FIFO of pending POST requests
pub struct OfflineQueue {
    path: PathBuf,
    state: Mutex<QueueFile>,
    replay_guard: Mutex<()>,
    max_retention: Duration,
}

impl OfflineQueue {
    /// Load the queue stored at `path`, starting empty when the file does not exist
    pub async fn open(path: impl AsRef<Path>) -> QueueResult<Self> {
        let path = path.as_ref().to_path_buf();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => QueueFile::default(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => QueueFile::default(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), pending = state.requests.len(), "offline queue opened");

        Ok(Self {
            path,
            state: Mutex::new(state),
            replay_guard: Mutex::new(()),
            max_retention: Duration::seconds(DEFAULT_MAX_RETENTION_SECS),
        })
    }

    pub fn with_max_retention(mut self, max_retention: Duration) -> Self {
        self.max_retention = max_retention;
        self
    }

    /// Append a request; it is persisted before this returns
    pub async fn enqueue(
        &self,
        url: impl Into<String>,
        headers: BTreeMap<String, String>,
        body: serde_json::Value,
    ) -> QueueResult<u64> {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let id = state.next_id;
        state.requests.push(QueuedRequest {
            id,
            url: url.into(),
            method: RequestMethod::Post,
            headers,
            body,
            created_at: Utc::now(),
            retries: 0,
        });
        persist(&self.path, &state).await?;

        info!(id, "request queued for replay");
        Ok(id)
    }

    /// Snapshot of the pending requests in replay order
    pub async fn pending(&self) -> Vec<QueuedRequest> {
        let state = self.state.lock().await;
        let mut items = state.requests.clone();
        items.sort_by_key(|r| (r.created_at, r.id));
        items
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.requests.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Replay every pending request once.
    ///
    /// A second call while a replay is in flight returns an empty summary.
    pub async fn process_queue(&self, client: &reqwest::Client) -> QueueResult<ReplaySummary> {
        let Ok(_guard) = self.replay_guard.try_lock() else {
            debug!("replay already in progress");
            return Ok(ReplaySummary::default());
        };

        let mut summary = ReplaySummary {
            expired: self.prune_expired().await?,
            ..ReplaySummary::default()
        };

        for item in self.pending().await {
            let delivered = match send(client, &item).await {
                Ok(status) if (200..300).contains(&status) => true,
                Ok(status) => {
                    warn!(id = item.id, status, "replay rejected");
                    false
                }
                Err(e) => {
                    warn!(id = item.id, error = %e, "replay failed");
                    false
                }
            };

            let mut state = self.state.lock().await;
            if delivered {
                state.requests.retain(|r| r.id != item.id);
                summary.sent += 1;
            } else {
                if let Some(r) = state.requests.iter_mut().find(|r| r.id == item.id) {
                    r.retries += 1;
                }
                summary.failed += 1;
            }
            persist(&self.path, &state).await?;
        }

        info!(
            sent = summary.sent,
            failed = summary.failed,
            expired = summary.expired,
            "offline queue replayed"
        );
        Ok(summary)
    }

    async fn prune_expired(&self) -> QueueResult<usize> {
        let cutoff = Utc::now() - self.max_retention;
        let mut state = self.state.lock().await;
        let before = state.requests.len();
        state.requests.retain(|r| r.created_at > cutoff);
        let dropped = before - state.requests.len();
        if dropped > 0 {
            persist(&self.path, &state).await?;
        }
        Ok(dropped)
    }
}

/// POST now; queue the request when the server cannot be reached
pub async fn submit_or_enqueue(
    queue: &OfflineQueue,
    client: &reqwest::Client,
    url: &str,
    headers: BTreeMap<String, String>,
    body: serde_json::Value,
) -> QueueResult<SubmitOutcome> {
    let attempt = client
        .post(url)
        .headers(header_map(&headers))
        .json(&body)
        .send()
        .await;

    match attempt {
        Ok(res) => Ok(SubmitOutcome::Delivered {
            status: res.status().as_u16(),
        }),
        Err(e) => {
            debug!(error = %e, url, "submit failed, queueing");
            let id = queue.enqueue(url, headers, body).await?;
            Ok(SubmitOutcome::Queued { id })
        }
    }
}

async fn send(client: &reqwest::Client, item: &QueuedRequest) -> reqwest::Result<u16> {
    let res = match item.method {
        RequestMethod::Post => client.post(&item.url),
    }
    .headers(header_map(&item.headers))
    .json(&item.body)
    .send()
    .await?;
    Ok(res.status().as_u16())
}

fn header_map(headers: &BTreeMap<String, String>) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(n), Ok(v)) => {
                map.insert(n, v);
            }
            _ => warn!(header = %name, "skipping invalid queued header"),
        }
    }
    map
}

async fn persist(path: &Path, state: &QueueFile) -> QueueResult<()> {
    let bytes = serde_json::to_vec_pretty(state)?;
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_map_skips_invalid_entries() {
        let mut headers = BTreeMap::new();
        headers.insert("authorization".to_string(), "Bearer abc".to_string());
        headers.insert("bad header".to_string(), "x".to_string());

        let map = header_map(&headers);
        assert_eq!(map.len(), 1);
        assert_eq!(map["authorization"], "Bearer abc");
    }

    #[test]
    fn queued_request_serializes_method_uppercase() {
        let req = QueuedRequest {
            id: 1,
            url: "http://localhost/api/trophies".into(),
            method: RequestMethod::Post,
            headers: BTreeMap::new(),
            body: serde_json::json!({"competition": "UCL"}),
            created_at: Utc::now(),
            retries: 0,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["method"], "POST");
    }
}
