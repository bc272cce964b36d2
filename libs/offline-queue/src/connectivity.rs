use std::{future::Future, sync::Arc, time::Duration};

use tracing::{debug, error, info};

use crate::queue::OfflineQueue;

/// Polls a health endpoint and replays the queue whenever the server comes back
pub struct ConnectivityWatcher {
    health_url: String,
    interval: Duration,
    client: reqwest::Client,
    queue: Arc<OfflineQueue>,
}

impl ConnectivityWatcher {
    pub fn new(
        health_url: impl Into<String>,
        interval: Duration,
        client: reqwest::Client,
        queue: Arc<OfflineQueue>,
    ) -> Self {
        Self {
            health_url: health_url.into(),
            interval,
            client,
            queue,
        }
    }

    /// Whether the health endpoint answers with a success status
    pub async fn probe(&self) -> bool {
        match self.client.get(&self.health_url).send().await {
            Ok(res) => res.status().is_success(),
            Err(e) => {
                debug!(error = %e, "health probe failed");
                false
            }
        }
    }

    /// Run until `shutdown` resolves.
    ///
    /// The watcher starts in the offline state, so the first successful probe
    /// triggers a replay of whatever was left over from a previous run.
    pub async fn run<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(self.interval);
        let mut online = false;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("connectivity watcher stopped");
                    return;
                }
                _ = ticker.tick() => {
                    let reachable = self.probe().await;
                    if reachable && !online {
                        info!(url = %self.health_url, "connection restored, replaying queue");
                        if let Err(e) = self.queue.process_queue(&self.client).await {
                            error!(error = %e, "queue replay failed");
                        }
                    } else if !reachable && online {
                        info!(url = %self.health_url, "connection lost");
                    }
                    online = reachable;
                }
            }
        }
    }
}
