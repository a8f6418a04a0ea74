//! Fetch collaborator.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use crate::error::ContentError;

/// Retrieves raw document text by URL.
///
/// `Ok(None)` means the document does not exist; transport problems are
/// errors.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Option<String>, ContentError>;
}

// == HTTP Fetcher ==
/// `reqwest` backed fetcher with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, ContentError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Option<String>, ContentError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        debug!(url, %status, "fetched document");

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ContentError::Fetch(format!("{} returned {}", url, status)));
        }

        Ok(Some(response.text().await?))
    }
}
