use std::{
    collections::BTreeMap,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{Router, http::StatusCode, routing::{get, post}};
use offline_queue::{
    ConnectivityWatcher, OfflineQueue, SubmitOutcome, submit_or_enqueue,
};
use serde_json::json;
use tempfile::TempDir;

async fn spawn_server(hits: Arc<AtomicUsize>) -> SocketAddr {
    let app = Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .route(
            "/ok",
            post(move || {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    StatusCode::CREATED
                }
            }),
        )
        .route("/fail", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// An address nothing listens on
async fn closed_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

fn auth_headers() -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert("authorization".to_string(), "Bearer token".to_string());
    headers
}

#[tokio::test]
async fn queue_survives_reopen_with_increasing_ids() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("queue.json");

    let queue = OfflineQueue::open(&path).await.unwrap();
    let first = queue
        .enqueue("http://localhost/api/trophies", auth_headers(), json!({"competition": "UCL"}))
        .await
        .unwrap();
    let second = queue
        .enqueue("http://localhost/api/trophies", auth_headers(), json!({"competition": "EUROPA"}))
        .await
        .unwrap();
    assert!(second > first);
    drop(queue);

    let reopened = OfflineQueue::open(&path).await.unwrap();
    let pending = reopened.pending().await;
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].body["competition"], "UCL");
    assert_eq!(pending[1].body["competition"], "EUROPA");
    assert_eq!(pending[0].headers["authorization"], "Bearer token");

    let third = reopened
        .enqueue("http://localhost/api/trophies", BTreeMap::new(), json!({}))
        .await
        .unwrap();
    assert!(third > second);
}

#[tokio::test]
async fn replay_removes_delivered_and_counts_failures() {
    let hits = Arc::new(AtomicUsize::new(0));
    let addr = spawn_server(hits.clone()).await;
    let dir = TempDir::new().unwrap();
    let queue = OfflineQueue::open(dir.path().join("queue.json")).await.unwrap();
    let client = reqwest::Client::new();

    queue
        .enqueue(format!("http://{addr}/ok"), auth_headers(), json!({"competition": "UCL"}))
        .await
        .unwrap();
    queue
        .enqueue(format!("http://{addr}/fail"), auth_headers(), json!({"competition": "UCL"}))
        .await
        .unwrap();

    let summary = queue.process_queue(&client).await.unwrap();
    assert_eq!(summary.sent, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.expired, 0);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let pending = queue.pending().await;
    assert_eq!(pending.len(), 1);
    assert!(pending[0].url.ends_with("/fail"));
    assert_eq!(pending[0].retries, 1);

    queue.process_queue(&client).await.unwrap();
    assert_eq!(queue.pending().await[0].retries, 2);
}

#[tokio::test]
async fn unreachable_server_keeps_request_queued() {
    let addr = closed_addr().await;
    let dir = TempDir::new().unwrap();
    let queue = OfflineQueue::open(dir.path().join("queue.json")).await.unwrap();
    let client = reqwest::Client::new();

    queue
        .enqueue(format!("http://{addr}/api/trophies"), BTreeMap::new(), json!({}))
        .await
        .unwrap();

    let summary = queue.process_queue(&client).await.unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(queue.len().await, 1);
    assert_eq!(queue.pending().await[0].retries, 1);
}

#[tokio::test]
async fn stale_requests_are_dropped_before_replay() {
    let hits = Arc::new(AtomicUsize::new(0));
    let addr = spawn_server(hits.clone()).await;
    let dir = TempDir::new().unwrap();
    let queue = OfflineQueue::open(dir.path().join("queue.json"))
        .await
        .unwrap()
        .with_max_retention(chrono::Duration::zero());

    queue
        .enqueue(format!("http://{addr}/ok"), BTreeMap::new(), json!({}))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let summary = queue.process_queue(&reqwest::Client::new()).await.unwrap();
    assert_eq!(summary.expired, 1);
    assert_eq!(summary.sent, 0);
    assert!(queue.is_empty().await);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn submit_queues_only_on_transport_failure() {
    let hits = Arc::new(AtomicUsize::new(0));
    let addr = spawn_server(hits.clone()).await;
    let dir = TempDir::new().unwrap();
    let queue = OfflineQueue::open(dir.path().join("queue.json")).await.unwrap();
    let client = reqwest::Client::new();

    let delivered = submit_or_enqueue(&queue, &client, &format!("http://{addr}/ok"), BTreeMap::new(), json!({}))
        .await
        .unwrap();
    assert_eq!(delivered, SubmitOutcome::Delivered { status: 201 });

    // a server error is an answer, not a connectivity problem
    let rejected = submit_or_enqueue(&queue, &client, &format!("http://{addr}/fail"), BTreeMap::new(), json!({}))
        .await
        .unwrap();
    assert_eq!(rejected, SubmitOutcome::Delivered { status: 500 });
    assert!(queue.is_empty().await);

    let down = closed_addr().await;
    let queued = submit_or_enqueue(&queue, &client, &format!("http://{down}/ok"), BTreeMap::new(), json!({}))
        .await
        .unwrap();
    assert!(matches!(queued, SubmitOutcome::Queued { .. }));
    assert_eq!(queue.len().await, 1);
}

#[tokio::test]
async fn watcher_replays_when_server_is_reachable() {
    let hits = Arc::new(AtomicUsize::new(0));
    let addr = spawn_server(hits.clone()).await;
    let dir = TempDir::new().unwrap();
    let queue = Arc::new(OfflineQueue::open(dir.path().join("queue.json")).await.unwrap());

    queue
        .enqueue(format!("http://{addr}/ok"), auth_headers(), json!({"competition": "UCL"}))
        .await
        .unwrap();

    let watcher = ConnectivityWatcher::new(
        format!("http://{addr}/health"),
        Duration::from_millis(50),
        reqwest::Client::new(),
        queue.clone(),
    );
    assert!(watcher.probe().await);

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(watcher.run(async {
        let _ = stop_rx.await;
    }));

    let drained = tokio::time::timeout(Duration::from_secs(5), async {
        while !queue.is_empty().await {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(drained.is_ok());
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    stop_tx.send(()).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn probe_reports_offline_for_closed_port() {
    let addr = closed_addr().await;
    let dir = TempDir::new().unwrap();
    let queue = Arc::new(OfflineQueue::open(dir.path().join("queue.json")).await.unwrap());
    let watcher = ConnectivityWatcher::new(
        format!("http://{addr}/health"),
        Duration::from_secs(1),
        reqwest::Client::new(),
        queue,
    );
    assert!(!watcher.probe().await);
}
