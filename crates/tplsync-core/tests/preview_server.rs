//! Preview HTTP surface and the polling client

use std::time::Duration;

use reqwest::StatusCode;
use tokio::net::TcpListener;

use tplsync_core::preview::{router, LatestResponse, PreviewClient, PreviewPoller};
use tplsync_core::PreviewCache;

async fn spawn_preview(cache: PreviewCache) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(cache, "application/pdf", Duration::from_millis(500));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_preview_lifecycle() {
    let cache = PreviewCache::new();
    let base = spawn_preview(cache.clone()).await;
    let http = reqwest::Client::new();

    // Nothing rendered yet
    let response = http.get(format!("{}/preview", base)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let latest: LatestResponse = http
        .get(format!("{}/latest", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(latest.latest, None);

    let t1 = cache.store(b"%PDF one".to_vec()).timestamp_millis();
    let latest: LatestResponse = http
        .get(format!("{}/latest", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(latest.latest, Some(t1));

    let response = http.get(format!("{}/preview", base)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "application/pdf"
    );
    assert_eq!(response.bytes().await.unwrap().as_ref(), b"%PDF one");

    let t2 = cache.store(b"%PDF two".to_vec()).timestamp_millis();
    assert!(t2 > t1);
    let latest: LatestResponse = http
        .get(format!("{}/latest", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(latest.latest, Some(t2));
}

#[tokio::test]
async fn test_other_paths_serve_viewer() {
    let base = spawn_preview(PreviewCache::new()).await;

    for path in ["/", "/viewer", "/some/deep/path"] {
        let response = reqwest::get(format!("{}{}", base, path)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = response.text().await.unwrap();
        assert!(html.contains("const POLL_INTERVAL_MS = 500;"));
        assert!(html.contains("/latest"));
    }
}

#[tokio::test]
async fn test_client_refetches_only_on_change() {
    let cache = PreviewCache::new();
    let base = spawn_preview(cache.clone()).await;
    let client = PreviewClient::new(&base);
    let mut poller = PreviewPoller::new();

    assert!(client.poll(&mut poller).await.unwrap().is_none());

    let t1 = cache.store(b"first".to_vec()).timestamp_millis();
    let (seen, bytes) = client.poll(&mut poller).await.unwrap().unwrap();
    assert_eq!(seen, t1);
    assert_eq!(bytes.as_ref(), b"first");

    // Unchanged timestamp: no download
    assert!(client.poll(&mut poller).await.unwrap().is_none());

    cache.store(b"second".to_vec());
    let (_, bytes) = client.poll(&mut poller).await.unwrap().unwrap();
    assert_eq!(bytes.as_ref(), b"second");
}

#[tokio::test]
async fn test_client_retries_after_failed_download() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::http::StatusCode as AxumStatus;
    use axum::routing::get;
    use axum::{Json, Router};

    let downloads = Arc::new(AtomicUsize::new(0));
    let counter = downloads.clone();
    let app = Router::new()
        .route("/latest", get(|| async { Json(LatestResponse { latest: Some(5) }) }))
        .route(
            "/preview",
            get(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        (AxumStatus::INTERNAL_SERVER_ERROR, "busy".as_bytes())
                    } else {
                        (AxumStatus::OK, "rendered".as_bytes())
                    }
                }
            }),
        );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = PreviewClient::new(&base);
    let mut poller = PreviewPoller::new();

    assert!(client.poll(&mut poller).await.is_err());
    assert_eq!(poller.last_seen(), None);

    // Same timestamp, but the failed download is retried
    let (seen, bytes) = client.poll(&mut poller).await.unwrap().unwrap();
    assert_eq!(seen, 5);
    assert_eq!(bytes.as_ref(), b"rendered");
    assert_eq!(downloads.load(Ordering::SeqCst), 2);
}
