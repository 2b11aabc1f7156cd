//! Concurrency tests
//!
//! These tests verify the snapshot discipline of the retriever:
//! - Readers never observe a half-built cycle
//! - Overlapping refresh calls are serialized
//! - Fetches of one cycle run concurrently

use std::sync::Arc;
use std::time::{Duration, Instant};

use pagewatch::{HealthColor, ProjectKey};

use crate::helpers::*;

#[tokio::test]
async fn test_readers_see_previous_snapshot_during_cycle() {
    let fetcher = Arc::new(StubFetcher::with_delay(Duration::from_millis(300)));
    fetcher.set("http://a/status", healthy_page());
    fetcher.set("http://b/status", healthy_page());
    let retriever = Arc::new(create_retriever(
        vec![create_project("parnassys", &["http://a/status", "http://b/status"])],
        fetcher.clone(),
    ));
    let key = ProjectKey::new("parnassys");

    retriever.refresh().await;

    fetcher.set("http://a/status", StubResponse::Offline);
    fetcher.set("http://b/status", StubResponse::Offline);
    let cycle = {
        let retriever = retriever.clone();
        tokio::spawn(async move { retriever.refresh().await })
    };

    // mid-cycle: the complete previous snapshot
    tokio::time::sleep(Duration::from_millis(100)).await;
    let during = retriever.get_status(&key).await.unwrap();
    assert!(during.servers.iter().all(|s| s.color == HealthColor::Green));
    assert!(retriever.latest_alert("http://a/status").await.is_none());

    cycle.await.unwrap();

    let after = retriever.get_status(&key).await.unwrap();
    assert!(after.servers.iter().all(|s| s.color == HealthColor::Red));
    assert_eq!(after.alerts.len(), 2);
}

#[tokio::test]
async fn test_overlapping_refreshes_are_serialized() {
    let fetcher = Arc::new(StubFetcher::with_delay(Duration::from_millis(50)));
    fetcher.set("http://a/status", StubResponse::Error(500));
    let retriever = Arc::new(create_retriever(
        vec![create_project("parnassys", &["http://a/status"])],
        fetcher.clone(),
    ));

    let mut tasks = vec![];
    for _ in 0..5 {
        let retriever = retriever.clone();
        tasks.push(tokio::spawn(async move { retriever.refresh().await }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    // every cycle saw the alert of the one before it
    let latest = retriever.latest_alert("http://a/status").await.unwrap();
    assert_eq!(latest.chain_len(), 5);
    assert_eq!(fetcher.request_count(), 5);
}

#[tokio::test]
async fn test_fetches_run_concurrently() {
    let fetcher = Arc::new(StubFetcher::with_delay(Duration::from_millis(200)));
    let urls = [
        "http://a/status",
        "http://b/status",
        "http://c/status",
        "http://d/status",
    ];
    for url in urls {
        fetcher.set(url, healthy_page());
    }
    let retriever = create_retriever(
        vec![
            create_project("first", &urls[..2]),
            create_project("second", &urls[2..]),
        ],
        fetcher.clone(),
    )
    .with_max_concurrent_fetches(4);

    let start = Instant::now();
    retriever.refresh().await;
    let elapsed = start.elapsed();

    // sequential fetching would take at least 800ms
    assert!(elapsed < Duration::from_millis(600), "cycle took {elapsed:?}");
    assert_eq!(fetcher.request_count(), 4);

    let second = retriever
        .get_status(&ProjectKey::new("second"))
        .await
        .unwrap();
    let urls: Vec<&str> = second.servers.iter().map(|s| s.url.as_str()).collect();
    assert_eq!(urls, vec!["http://c/status", "http://d/status"]);
}

#[tokio::test]
async fn test_concurrent_status_queries() {
    let fetcher = Arc::new(StubFetcher::new());
    fetcher.set("http://a/status", healthy_page());
    let retriever = Arc::new(create_retriever(
        vec![create_project("parnassys", &["http://a/status"])],
        fetcher,
    ));
    retriever.refresh().await;

    let mut tasks = vec![];
    for _ in 0..20 {
        let retriever = retriever.clone();
        tasks.push(tokio::spawn(async move {
            retriever
                .get_status(&ProjectKey::new("parnassys"))
                .await
                .map(|status| status.server_count())
        }));
    }

    for task in tasks {
        assert_eq!(task.await.unwrap(), Some(1));
    }
}
