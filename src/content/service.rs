//! Content Service
//!
//! Orchestrates fetch → parse → cache for governance documents. This is the
//! outermost error boundary: every stage failure becomes `None` plus a
//! failed-request count, and callers poll health/diagnostics for the cause.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::TtlCache;
use crate::content::document::cache_key;
use crate::content::{
    validate_filename, ContentFetcher, Document, DocumentParser, DocumentType, RemoteFile,
    RequestCounters, ServiceDiagnostics, ServiceHealth,
};
use crate::error::CacheError;
use crate::resilience::{BreakerError, CircuitBreaker};

// == Content Service ==
pub struct ContentService {
    cache: TtlCache,
    fetch_breaker: Arc<CircuitBreaker>,
    cache_breaker: Arc<CircuitBreaker>,
    fetcher: Arc<dyn ContentFetcher>,
    parser: Arc<dyn DocumentParser>,
    base_url: String,
    counters: RequestCounters,
    /// Last seen blob SHA per cache key
    known_shas: Mutex<HashMap<String, String>>,
}

impl ContentService {
    pub fn new(
        cache: TtlCache,
        fetch_breaker: Arc<CircuitBreaker>,
        cache_breaker: Arc<CircuitBreaker>,
        fetcher: Arc<dyn ContentFetcher>,
        parser: Arc<dyn DocumentParser>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            fetch_breaker,
            cache_breaker,
            fetcher,
            parser,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            counters: RequestCounters::default(),
            known_shas: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }

    /// URL the fetcher is asked for.
    pub fn document_url(&self, doc_type: DocumentType, filename: &str) -> String {
        format!("{}/{}/{}", self.base_url, doc_type.directory(), filename)
    }

    // == Get Document ==
    /// Returns the document, from cache when possible.
    ///
    /// `None` covers "not found", "unreachable" and "unparseable" alike.
    /// The cache is written only after fetch and parse both succeed.
    pub async fn get_document(
        &self,
        doc_type: DocumentType,
        filename: &str,
        ttl_override: Option<Duration>,
    ) -> Option<Document> {
        self.counters.record_request();

        let document = self.load_document(doc_type, filename, ttl_override).await;
        match document {
            Some(_) => self.counters.record_success(),
            None => self.counters.record_failure(),
        }
        document
    }

    async fn load_document(
        &self,
        doc_type: DocumentType,
        filename: &str,
        ttl_override: Option<Duration>,
    ) -> Option<Document> {
        if let Err(err) = validate_filename(filename) {
            warn!(%doc_type, filename, error = %err, "rejected document request");
            return None;
        }
        let key = cache_key(doc_type, filename);

        if let Some(document) = self.read_cached(&key).await {
            return Some(document);
        }

        let url = self.document_url(doc_type, filename);
        let raw = match self.fetch_breaker.call(|| self.fetcher.fetch(&url)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                info!(%url, "document not found");
                return None;
            }
            Err(BreakerError::Open(name)) => {
                self.counters.record_breaker_trip();
                warn!(breaker = %name, %url, "fetch skipped, circuit open");
                return None;
            }
            Err(BreakerError::Inner(err)) => {
                warn!(%url, error = %err, "document fetch failed");
                return None;
            }
        };

        let (metadata, content) = match self.parser.parse(&raw) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(%doc_type, filename, error = %err, "document parse failed");
                return None;
            }
        };

        let document = Document {
            filename: filename.to_string(),
            doc_type,
            metadata,
            content,
            full_text: raw,
        };
        self.write_cached(&key, &document, ttl_override).await;
        Some(document)
    }

    async fn read_cached(&self, key: &str) -> Option<Document> {
        let cached = self
            .cache_breaker
            .call(|| async { Ok::<_, CacheError>(self.cache.get(key).await) })
            .await;

        match cached {
            Ok(Some(value)) => match serde_json::from_value::<Document>(value) {
                Ok(document) => {
                    debug!(key, "document served from cache");
                    Some(document)
                }
                Err(err) => {
                    warn!(key, error = %err, "cached value is not a document, dropping it");
                    self.cache.delete(key).await;
                    None
                }
            },
            Ok(None) => None,
            Err(BreakerError::Open(name)) => {
                self.counters.record_breaker_trip();
                debug!(breaker = %name, key, "cache read skipped, circuit open");
                None
            }
            Err(BreakerError::Inner(err)) => {
                warn!(key, error = %err, "cache read failed");
                None
            }
        }
    }

    /// Best effort; a failed write leaves the document served uncached.
    async fn write_cached(&self, key: &str, document: &Document, ttl: Option<Duration>) {
        let value = match serde_json::to_value(document) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "document could not be encoded for caching");
                return;
            }
        };

        // Key and size rejections are not cache faults.
        let write = self
            .cache_breaker
            .call(|| async {
                match self.cache.set(key, &value, ttl).await {
                    Err(err @ (CacheError::Validation(_) | CacheError::PayloadTooLarge { .. })) => {
                        Ok(Err(err))
                    }
                    other => other.map(Ok),
                }
            })
            .await;

        match write {
            Ok(Ok(())) => debug!(key, "document cached"),
            Ok(Err(err)) => {
                warn!(key, error = %err, "document not cacheable, serving uncached");
            }
            Err(BreakerError::Open(name)) => {
                self.counters.record_breaker_trip();
                debug!(breaker = %name, key, "cache write skipped, circuit open");
            }
            Err(BreakerError::Inner(err)) => {
                warn!(key, error = %err, "cache write failed, serving uncached");
            }
        }
    }

    // == Invalidation ==
    /// Drops a cached document, returning whether one was cached.
    pub async fn invalidate(&self, doc_type: DocumentType, filename: &str) -> bool {
        self.cache.delete(&cache_key(doc_type, filename)).await
    }

    /// Reconciles cached documents of one type with a remote listing.
    ///
    /// Entries are invalidated when their SHA changed, when they vanished
    /// from the listing, or when no SHA was ever recorded for them. Returns
    /// the number of cached documents dropped.
    pub async fn sync_listing(&self, doc_type: DocumentType, listing: &[RemoteFile]) -> usize {
        let mut known = self.known_shas.lock().await;
        let prefix = cache_key(doc_type, "");
        let mut invalidated = 0;

        for file in listing {
            if validate_filename(&file.name).is_err() {
                debug!(name = %file.name, "ignoring listing entry with unusable name");
                continue;
            }
            let key = cache_key(doc_type, &file.name);
            let stale = known.get(&key).map_or(true, |sha| sha != &file.sha);
            if stale && self.cache.delete(&key).await {
                invalidated += 1;
            }
            known.insert(key, file.sha.clone());
        }

        // Vanished documents: tracked ones and anything cached before a sync.
        let listed: HashSet<&str> = listing.iter().map(|f| f.name.as_str()).collect();
        let is_vanished = |key: &String| {
            key.strip_prefix(&prefix)
                .is_some_and(|name| !listed.contains(name))
        };
        let mut vanished: BTreeSet<String> =
            known.keys().filter(|k| is_vanished(*k)).cloned().collect();
        vanished.extend(self.cache.keys().await.into_iter().filter(|k| is_vanished(k)));

        for key in vanished {
            known.remove(&key);
            if self.cache.delete(&key).await {
                invalidated += 1;
            }
        }

        info!(%doc_type, files = listing.len(), invalidated, "synced remote listing");
        invalidated
    }

    // == Health ==
    pub async fn get_health_status(&self) -> ServiceHealth {
        let cache_hit_rate = self.cache.stats().await.hit_rate;
        ServiceHealth::new(self.counters.snapshot(), cache_hit_rate)
    }

    /// Zeroes request counters; cache contents and breakers are untouched.
    pub fn reset_health(&self) {
        self.counters.reset();
        info!("service health counters reset");
    }

    pub async fn get_service_diagnostics(&self) -> ServiceDiagnostics {
        let error_boundaries = [&self.fetch_breaker, &self.cache_breaker]
            .into_iter()
            .map(|breaker| (breaker.name().to_string(), breaker.snapshot()))
            .collect::<BTreeMap<_, _>>();

        ServiceDiagnostics {
            service_health: self.get_health_status().await,
            cache_statistics: self.cache.stats().await,
            error_boundaries,
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheStore, SecretKey, SecureSerializer};
    use crate::content::{FrontmatterParser, HealthStatus, MockFetcher};
    use crate::resilience::{BreakerConfig, CircuitState};
    use serde_json::json;

    const BASE: &str = "mem://content";
    const BIAS: &str = "---\ntitle: Algorithmic Bias\nseverity: high\n---\nModels may encode bias.\n";

    struct Harness {
        service: ContentService,
        fetcher: Arc<MockFetcher>,
        fetch_breaker: Arc<CircuitBreaker>,
        cache_breaker: Arc<CircuitBreaker>,
    }

    fn harness(fetch_threshold: u32) -> Harness {
        let secret = SecretKey::new("service-test-secret-0123456789abcdef").unwrap();
        let cache = TtlCache::new(CacheStore::new(
            100,
            Some(Duration::from_secs(300)),
            SecureSerializer::new(secret),
        ));
        let fetch_breaker = Arc::new(CircuitBreaker::new(
            "fetch",
            BreakerConfig {
                failure_threshold: fetch_threshold,
                recovery_timeout: Duration::from_secs(60),
            },
        ));
        let cache_breaker = Arc::new(CircuitBreaker::new("cache", BreakerConfig::default()));
        let fetcher = Arc::new(MockFetcher::new());

        let service = ContentService::new(
            cache,
            fetch_breaker.clone(),
            cache_breaker.clone(),
            fetcher.clone(),
            Arc::new(FrontmatterParser),
            format!("{}/", BASE),
        );

        Harness {
            service,
            fetcher,
            fetch_breaker,
            cache_breaker,
        }
    }

    #[tokio::test]
    async fn test_fetch_parse_and_cache() {
        let h = harness(3);
        h.fetcher.insert(format!("{}/risks/bias.md", BASE), BIAS).await;

        let doc = h
            .service
            .get_document(DocumentType::Risk, "bias.md", None)
            .await
            .unwrap();

        assert_eq!(doc.filename, "bias.md");
        assert_eq!(doc.doc_type, DocumentType::Risk);
        assert_eq!(doc.metadata["title"], json!("Algorithmic Bias"));
        assert_eq!(doc.content, "Models may encode bias.\n");
        assert_eq!(doc.full_text, BIAS);
        assert!(h.service.cache().exists("document:risk:bias.md").await);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_fetch() {
        let h = harness(3);
        h.fetcher.insert(format!("{}/risks/bias.md", BASE), BIAS).await;

        let first = h.service.get_document(DocumentType::Risk, "bias.md", None).await;
        let second = h.service.get_document(DocumentType::Risk, "bias.md", None).await;

        assert_eq!(first, second);
        assert_eq!(h.fetcher.call_count(), 1);

        let health = h.service.get_health_status().await;
        assert_eq!(health.total_requests, 2);
        assert_eq!(health.successful_requests, 2);
        assert_eq!(health.cache_hit_rate, 0.5);
    }

    #[tokio::test]
    async fn test_missing_document_counts_failure() {
        let h = harness(3);

        let doc = h
            .service
            .get_document(DocumentType::Mitigation, "missing.md", None)
            .await;

        assert!(doc.is_none());
        let health = h.service.get_health_status().await;
        assert_eq!(health.total_requests, 1);
        assert_eq!(health.failed_requests, 1);
        assert_eq!(h.fetch_breaker.failure_count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_failures_open_breaker() {
        let h = harness(2);
        h.fetcher.set_failing(true);

        for _ in 0..2 {
            assert!(h
                .service
                .get_document(DocumentType::Framework, "gdpr.md", None)
                .await
                .is_none());
        }
        assert_eq!(h.fetch_breaker.state(), CircuitState::Open);

        assert!(h
            .service
            .get_document(DocumentType::Framework, "gdpr.md", None)
            .await
            .is_none());
        assert_eq!(h.fetcher.call_count(), 2);

        let health = h.service.get_health_status().await;
        assert_eq!(health.failed_requests, 3);
        assert_eq!(health.circuit_breaker_trips, 1);
        assert_eq!(health.status, HealthStatus::Critical);
    }

    #[tokio::test]
    async fn test_parse_failure_is_not_cached() {
        let h = harness(3);
        h.fetcher
            .insert(format!("{}/risks/broken.md", BASE), "---\ntitle: x\n")
            .await;

        assert!(h
            .service
            .get_document(DocumentType::Risk, "broken.md", None)
            .await
            .is_none());
        assert!(h.service.cache().is_empty().await);
        assert_eq!(h.service.get_health_status().await.failed_requests, 1);
    }

    #[tokio::test]
    async fn test_invalid_filename_is_rejected_before_fetch() {
        let h = harness(3);

        assert!(h
            .service
            .get_document(DocumentType::Risk, "../../etc/passwd", None)
            .await
            .is_none());
        assert_eq!(h.fetcher.call_count(), 0);
        assert_eq!(h.service.get_health_status().await.failed_requests, 1);
    }

    #[tokio::test]
    async fn test_ttl_override() {
        let h = harness(3);
        h.fetcher.insert(format!("{}/risks/bias.md", BASE), BIAS).await;

        h.service
            .get_document(DocumentType::Risk, "bias.md", Some(Duration::ZERO))
            .await
            .unwrap();
        h.service
            .get_document(DocumentType::Risk, "bias.md", None)
            .await
            .unwrap();

        assert_eq!(h.fetcher.call_count(), 2);
    }

    #[tokio::test]
    async fn test_cache_write_failure_still_serves_document() {
        let h = harness(3);
        let filename = format!("{}.md", "a".repeat(240));
        h.fetcher
            .insert(format!("{}/risks/{}", BASE, filename), BIAS)
            .await;

        let doc = h
            .service
            .get_document(DocumentType::Risk, &filename, None)
            .await;

        assert!(doc.is_some());
        assert!(h.service.cache().is_empty().await);
        assert_eq!(h.service.get_health_status().await.successful_requests, 1);
    }

    #[tokio::test]
    async fn test_uncacheable_documents_do_not_open_cache_breaker() {
        let h = harness(3);
        for i in 0..5 {
            let filename = format!("{}{}.md", "b".repeat(240), i);
            h.fetcher
                .insert(format!("{}/risks/{}", BASE, filename), BIAS)
                .await;
            assert!(h
                .service
                .get_document(DocumentType::Risk, &filename, None)
                .await
                .is_some());
        }
        assert_eq!(h.cache_breaker.state(), CircuitState::Closed);
        assert_eq!(h.cache_breaker.failure_count(), 0);

        h.fetcher.insert(format!("{}/risks/bias.md", BASE), BIAS).await;
        h.service.get_document(DocumentType::Risk, "bias.md", None).await;
        assert!(h.service.cache().exists("document:risk:bias.md").await);
    }

    #[tokio::test]
    async fn test_cancelled_request_does_not_write_cache() {
        let h = harness(3);
        h.fetcher.insert(format!("{}/risks/bias.md", BASE), BIAS).await;
        h.fetcher.set_delay(Duration::from_millis(500));

        let result = tokio::time::timeout(
            Duration::from_millis(20),
            h.service.get_document(DocumentType::Risk, "bias.md", None),
        )
        .await;

        assert!(result.is_err());
        assert!(h.service.cache().is_empty().await);
        assert_eq!(h.fetch_breaker.failure_count(), 0);
    }

    #[tokio::test]
    async fn test_reset_health_keeps_cache_and_breakers() {
        let h = harness(1);
        h.fetcher.insert(format!("{}/risks/bias.md", BASE), BIAS).await;
        h.service.get_document(DocumentType::Risk, "bias.md", None).await;
        h.fetcher.set_failing(true);
        h.service.get_document(DocumentType::Risk, "other.md", None).await;

        h.service.reset_health();

        let health = h.service.get_health_status().await;
        assert_eq!(health.total_requests, 0);
        assert_eq!(health.success_rate, 0.0);
        assert_eq!(health.status, HealthStatus::Critical);
        assert_eq!(h.service.cache().len().await, 1);
        assert_eq!(h.fetch_breaker.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn test_diagnostics_bundle() {
        let h = harness(3);
        h.fetcher.set_failing(true);
        h.service.get_document(DocumentType::Risk, "x.md", None).await;

        let diagnostics = h.service.get_service_diagnostics().await;

        assert_eq!(diagnostics.service_health.failed_requests, 1);
        assert_eq!(diagnostics.cache_statistics.misses, 1);
        assert_eq!(diagnostics.error_boundaries["fetch"].failure_count, 1);
        assert_eq!(diagnostics.error_boundaries["cache"].failure_count, 0);
    }

    #[tokio::test]
    async fn test_sync_listing_invalidates_changed_and_removed() {
        let h = harness(3);
        for name in ["a.md", "b.md", "c.md"] {
            h.fetcher
                .insert(format!("{}/frameworks/{}", BASE, name), BIAS)
                .await;
        }
        let listing = |sha_b: &str| {
            vec![
                RemoteFile { name: "a.md".into(), sha: "1".into() },
                RemoteFile { name: "b.md".into(), sha: sha_b.into() },
            ]
        };

        for name in ["a.md", "b.md"] {
            h.service.get_document(DocumentType::Framework, name, None).await;
        }
        // First sync has no recorded SHAs, so cached copies are dropped.
        assert_eq!(h.service.sync_listing(DocumentType::Framework, &listing("2")).await, 2);

        for name in ["a.md", "b.md"] {
            h.service.get_document(DocumentType::Framework, name, None).await;
        }
        assert_eq!(h.service.sync_listing(DocumentType::Framework, &listing("2")).await, 0);
        assert_eq!(h.service.sync_listing(DocumentType::Framework, &listing("3")).await, 1);
        assert!(h.service.cache().exists("document:framework:a.md").await);
        assert!(!h.service.cache().exists("document:framework:b.md").await);

        let only_b = vec![RemoteFile { name: "b.md".into(), sha: "3".into() }];
        assert_eq!(h.service.sync_listing(DocumentType::Framework, &only_b).await, 1);
        assert!(!h.service.cache().exists("document:framework:a.md").await);
    }

    #[tokio::test]
    async fn test_sync_listing_drops_unlisted_documents_cached_before_any_sync() {
        let h = harness(3);
        h.fetcher
            .insert(format!("{}/frameworks/x.md", BASE), BIAS)
            .await;
        h.fetcher.insert(format!("{}/risks/y.md", BASE), BIAS).await;
        h.service.get_document(DocumentType::Framework, "x.md", None).await;
        h.service.get_document(DocumentType::Risk, "y.md", None).await;

        let listing = vec![RemoteFile { name: "a.md".into(), sha: "1".into() }];
        assert_eq!(h.service.sync_listing(DocumentType::Framework, &listing).await, 1);

        assert!(!h.service.cache().exists("document:framework:x.md").await);
        assert!(h.service.cache().exists("document:risk:y.md").await);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let h = harness(3);
        h.fetcher.insert(format!("{}/risks/bias.md", BASE), BIAS).await;
        h.service.get_document(DocumentType::Risk, "bias.md", None).await;

        assert!(h.service.invalidate(DocumentType::Risk, "bias.md").await);
        assert!(!h.service.invalidate(DocumentType::Risk, "bias.md").await);
    }
}
