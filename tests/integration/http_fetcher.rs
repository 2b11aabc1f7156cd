//! HttpPageFetcher against a mock HTTP server

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use pagewatch::{
    HealthColor, ProjectKey,
    error::FetchError,
    extract::MetricExtractor,
    fetch::{HttpPageFetcher, PageFetcher, StatusPage},
    retriever::StatusRetriever,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

fn fetcher() -> HttpPageFetcher {
    HttpPageFetcher::new(Duration::from_secs(2)).unwrap()
}

async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_page_content_returned() {
    let mock_server = MockServer::start().await;
    mount(
        &mock_server,
        "/status",
        ResponseTemplate::new(200).set_body_string(create_status_page("3", "10 ms", "20")),
    )
    .await;

    let page = fetcher()
        .fetch(&format!("{}/status", mock_server.uri()))
        .await
        .unwrap();

    assert_matches!(page, StatusPage::Online(ref body) if body.contains("Actieve sessies:"));
}

#[tokio::test]
async fn test_service_unavailable_is_offline() {
    let mock_server = MockServer::start().await;
    mount(&mock_server, "/status", ResponseTemplate::new(503)).await;

    let page = fetcher()
        .fetch(&format!("{}/status", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(page, StatusPage::Offline);
}

#[tokio::test]
async fn test_server_error_is_fetch_error() {
    let mock_server = MockServer::start().await;
    mount(&mock_server, "/status", ResponseTemplate::new(500)).await;

    let result = fetcher()
        .fetch(&format!("{}/status", mock_server.uri()))
        .await;

    assert_matches!(result, Err(FetchError::Status(500)));
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let mock_server = MockServer::start().await;
    mount(
        &mock_server,
        "/status",
        ResponseTemplate::new(200).set_delay(Duration::from_secs(2)),
    )
    .await;

    let fetcher = HttpPageFetcher::new(Duration::from_millis(200)).unwrap();
    let result = fetcher
        .fetch(&format!("{}/status", mock_server.uri()))
        .await;

    assert_matches!(result, Err(FetchError::Timeout(_)));
}

#[tokio::test]
async fn test_invalid_url_is_request_error() {
    let result = fetcher().fetch("not a url").await;

    assert_matches!(result, Err(FetchError::Request(_)));
}

#[tokio::test]
async fn test_full_cycle_over_http() {
    let mock_server = MockServer::start().await;
    mount(
        &mock_server,
        "/app-1/status",
        ResponseTemplate::new(200).set_body_string(create_status_page("12", "45 ms", "600")),
    )
    .await;
    mount(&mock_server, "/app-2/status", ResponseTemplate::new(503)).await;
    mount(
        &mock_server,
        "/app-3/status",
        ResponseTemplate::new(200).set_body_string(create_status_page("many", "1", "1")),
    )
    .await;

    let base = mock_server.uri();
    let urls = [
        format!("{base}/app-1/status"),
        format!("{base}/app-2/status"),
        format!("{base}/app-3/status"),
    ];
    let urls: Vec<&str> = urls.iter().map(String::as_str).collect();

    let retriever = StatusRetriever::new(
        Arc::new(vec![create_project("parnassys", &urls)]),
        Arc::new(fetcher()),
        MetricExtractor::default(),
    );

    retriever.refresh().await;

    let status = retriever
        .get_status(&ProjectKey::new("parnassys"))
        .await
        .unwrap();
    let colors: Vec<HealthColor> = status.servers.iter().map(|s| s.color).collect();
    assert_eq!(
        colors,
        vec![HealthColor::Green, HealthColor::Red, HealthColor::Yellow]
    );
    assert_eq!(status.total_sessions(), Some(12));
    assert_eq!(status.alerts[0].message(), "Server 2 offline");
}
