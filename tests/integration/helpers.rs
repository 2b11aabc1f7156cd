//! Helper functions for integration tests

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pagewatch::{
    ProjectKey,
    config::ProjectConfig,
    error::{FetchError, FetchResult},
    extract::MetricExtractor,
    fetch::{PageFetcher, StatusPage},
    retriever::StatusRetriever,
};

/// Canned response of the stub fetcher
#[derive(Debug, Clone)]
pub enum StubResponse {
    Page(String),
    Offline,
    Error(u16),
}

/// PageFetcher serving canned responses per URL.
///
/// Unknown URLs fail with a request error.
#[derive(Debug, Default)]
pub struct StubFetcher {
    responses: Mutex<HashMap<String, StubResponse>>,
    delay: Option<Duration>,
    pub requests: AtomicUsize,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn set(&self, url: &str, response: StubResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<StatusPage> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let response = self.responses.lock().unwrap().get(url).cloned();
        match response {
            Some(StubResponse::Page(page)) => Ok(StatusPage::Online(page)),
            Some(StubResponse::Offline) => Ok(StatusPage::Offline),
            Some(StubResponse::Error(code)) => Err(FetchError::Status(code)),
            None => Err(FetchError::Request(format!("no route to {url}"))),
        }
    }
}

pub fn create_project(key: &str, urls: &[&str]) -> ProjectConfig {
    ProjectConfig {
        key: ProjectKey::new(key),
        urls: Some(urls.iter().map(|url| url.to_string()).collect()),
    }
}

pub fn create_retriever(
    projects: Vec<ProjectConfig>,
    fetcher: Arc<StubFetcher>,
) -> StatusRetriever {
    StatusRetriever::new(Arc::new(projects), fetcher, MetricExtractor::default())
}

/// Status page in the layout the monitored applications serve
pub fn create_status_page(sessions: &str, avg_request_time: &str, requests_per_minute: &str) -> String {
    format!(
        r#"<html>
  <body>
    <table class="status">
      <tr><td class="main_label">Versie:</td><td>2024.1</td></tr>
      <tr><td class="main_label">Actieve sessies:</td><td>{sessions}</td></tr>
      <tr><td class="main_label">Gestart op:</td><td>Sun Jan 14 10:22:31 +0100 2024</td></tr>
      <tr><td class="main_label">Gemiddelde requesttijd:</td><td>{avg_request_time}</td></tr>
      <tr><td class="main_label">Requests per minuut:</td><td>{requests_per_minute}</td></tr>
    </table>
  </body>
</html>"#
    )
}

pub fn healthy_page() -> StubResponse {
    StubResponse::Page(create_status_page("17", "123 ms", "300"))
}
