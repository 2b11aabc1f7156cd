//! Status page retrieval
//!
//! The retriever only depends on the [`PageFetcher`] trait. [`HttpPageFetcher`] is
//! the reqwest-backed implementation used by the hub.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{instrument, trace};

use crate::error::{FetchError, FetchResult};

/// Outcome of a successful fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusPage {
    /// The server is known to be down
    Offline,

    /// Raw HTML of the status page
    Online(String),
}

impl StatusPage {
    pub fn is_offline(&self) -> bool {
        matches!(self, StatusPage::Offline)
    }
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchResult<StatusPage>;
}

/// Fetches status pages over HTTP.
///
/// Refused connections and gateway errors (502, 503, 504) count as offline; any
/// other non-success status is a fetch error.
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pagewatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

fn is_offline_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> FetchResult<StatusPage> {
        trace!("requesting status page");

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) if e.is_connect() => {
                trace!("connection failed: {e}");
                return Ok(StatusPage::Offline);
            }
            Err(e) => return Err(e.into()),
        };

        let status = response.status();
        if is_offline_status(status) {
            trace!("server reports {status}");
            return Ok(StatusPage::Offline);
        }

        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;

        trace!("received {} bytes", body.len());
        Ok(StatusPage::Online(body))
    }
}
