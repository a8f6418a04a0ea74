//! In-memory fetcher for tests and local development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::content::ContentFetcher;
use crate::error::ContentError;

/// A fetcher serving documents from a HashMap keyed by URL.
///
/// Unknown URLs return `Ok(None)`. Failure mode and an artificial delay can
/// be switched on to exercise breaker and cancellation paths.
#[derive(Debug, Default)]
pub struct MockFetcher {
    documents: RwLock<HashMap<String, String>>,
    failing: AtomicBool,
    delay_ms: AtomicU64,
    calls: AtomicUsize,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, url: impl Into<String>, text: impl Into<String>) {
        self.documents.write().await.insert(url.into(), text.into());
    }

    /// When set, every fetch returns a transport error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of fetches attempted so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<Option<String>, ContentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(ContentError::Fetch(format!("connection refused: {}", url)));
        }

        Ok(self.documents.read().await.get(url).cloned())
    }
}
