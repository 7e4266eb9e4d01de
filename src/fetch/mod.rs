//! HTTP fetching with caching.
//!
//! Fetches pages from the site and caches them locally so an interrupted run
//! can be repeated without re-walking every leaderboard. Collection exports
//! are always fetched fresh; they are regenerated server-side.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

/// Errors that can occur during fetching.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Rate limited by {host}, retry after {retry_after_secs}s")]
    RateLimited { host: String, retry_after_secs: u64 },

    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("Content too large: {size} bytes (max {max_size})")]
    ContentTooLarge { size: usize, max_size: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FetchError {
    /// Transport failures, server errors and rate limiting are worth
    /// another attempt; everything else fails the same way twice.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Http(_) | FetchError::RateLimited { .. } => true,
            FetchError::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Whether a request may be answered from the local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Serve from cache when fresh, otherwise fetch and cache.
    Cached,

    /// Always go to the network.
    Fresh,
}

/// Source of page bodies.
///
/// `Fetcher` is the network implementation; the pipeline only ever sees this
/// trait, one request at a time.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch a URL and return its body as text.
    async fn fetch_text(&self, url: &Url, freshness: Freshness) -> Result<String, FetchError>;
}

/// Retry policy for transient fetch failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self
            .backoff_multiplier
            .powi(attempt.saturating_sub(1) as i32);
        Duration::from_millis((self.initial_delay_ms as f64 * factor) as u64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Result of a fetch operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    /// Original URL that was fetched
    pub url: Url,

    /// Path where content is cached
    pub cache_path: PathBuf,

    /// Content type (e.g., "text/html", "text/xml")
    pub content_type: Option<String>,

    /// Content length in bytes
    pub content_length: usize,

    /// When the content was fetched
    pub fetched_at: DateTime<Utc>,

    /// Whether this was served from cache
    pub from_cache: bool,
}

/// Metadata stored alongside cached content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub url: String,
    pub fetched_at: DateTime<Utc>,
    pub content_type: Option<String>,
    pub content_length: usize,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Directory to cache raw content
    pub cache_dir: PathBuf,

    /// How long cached content is considered fresh
    pub cache_ttl: Duration,

    /// Maximum content size to fetch (default 10MB)
    pub max_content_size: usize,

    /// Request timeout
    pub timeout: Duration,

    /// User agent string
    pub user_agent: String,

    /// Minimum gap between consecutive network requests
    pub request_delay: Duration,

    /// Retries for transient failures
    pub retry: RetryPolicy,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./data/raw"),
            cache_ttl: Duration::from_secs(900), // 15 minutes
            max_content_size: 10 * 1024 * 1024,  // 10MB
            timeout: Duration::from_secs(30),
            user_agent: concat!("play-ranks/", env!("CARGO_PKG_VERSION")).to_string(),
            request_delay: Duration::from_millis(500),
            retry: RetryPolicy::default(),
        }
    }
}

/// HTTP fetcher with local caching.
pub struct Fetcher {
    client: Client,
    config: FetcherConfig,
    last_request: Mutex<Option<Instant>>,
}

impl Fetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("play-ranks/0.1.0")),
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            config,
            last_request: Mutex::new(None),
        })
    }

    /// Fetch a URL, using cache if available and fresh.
    pub async fn fetch(&self, url: &Url) -> Result<FetchResult, FetchError> {
        let cache_path = self.cache_path_for_url(url);
        let meta_path = self.meta_path_for_url(url);

        if let Some(result) = self.check_cache(url, &cache_path, &meta_path).await? {
            return Ok(result);
        }

        self.fetch_with_retry(url, &cache_path, &meta_path).await
    }

    /// Force fetch from network, ignoring cache.
    pub async fn fetch_fresh(&self, url: &Url) -> Result<FetchResult, FetchError> {
        let cache_path = self.cache_path_for_url(url);
        let meta_path = self.meta_path_for_url(url);
        self.fetch_with_retry(url, &cache_path, &meta_path).await
    }

    /// Check if content is cached and fresh.
    async fn check_cache(
        &self,
        url: &Url,
        cache_path: &Path,
        meta_path: &Path,
    ) -> Result<Option<FetchResult>, FetchError> {
        if self.config.cache_ttl.is_zero() || !cache_path.exists() || !meta_path.exists() {
            return Ok(None);
        }

        let meta_content = fs::read_to_string(meta_path).await?;
        let meta: CacheMetadata = match serde_json::from_str(&meta_content) {
            Ok(m) => m,
            Err(_) => return Ok(None),
        };

        let age = Utc::now().signed_duration_since(meta.fetched_at);
        if age.num_seconds() > self.config.cache_ttl.as_secs() as i64 {
            debug!("Cache expired for {}", url);
            return Ok(None);
        }

        debug!("Serving {} from cache", url);
        Ok(Some(FetchResult {
            url: url.clone(),
            cache_path: cache_path.to_path_buf(),
            content_type: meta.content_type,
            content_length: meta.content_length,
            fetched_at: meta.fetched_at,
            from_cache: true,
        }))
    }

    /// Fetch from network, retrying transient failures per the retry policy.
    async fn fetch_with_retry(
        &self,
        url: &Url,
        cache_path: &Path,
        meta_path: &Path,
    ) -> Result<FetchResult, FetchError> {
        let policy = &self.config.retry;
        let mut attempt = 0;

        loop {
            match self.fetch_and_cache(url, cache_path, meta_path).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                    attempt += 1;
                    let delay = match &e {
                        FetchError::RateLimited {
                            retry_after_secs, ..
                        } => Duration::from_secs(*retry_after_secs).max(policy.delay_for(attempt)),
                        _ => policy.delay_for(attempt),
                    };
                    warn!(
                        "Fetch of {} failed ({}), retry {}/{} in {:?}",
                        url, e, attempt, policy.max_retries, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Wait out the politeness delay since the previous network request.
    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.config.request_delay {
                tokio::time::sleep(self.config.request_delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Fetch from network and cache the result.
    async fn fetch_and_cache(
        &self,
        url: &Url,
        cache_path: &Path,
        meta_path: &Path,
    ) -> Result<FetchResult, FetchError> {
        self.pace().await;
        info!("Fetching {}", url);

        let response = self.client.get(url.as_str()).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(FetchError::RateLimited {
                host: url.host_str().unwrap_or("unknown").to_string(),
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let content = response.bytes().await?;

        if content.len() > self.config.max_content_size {
            return Err(FetchError::ContentTooLarge {
                size: content.len(),
                max_size: self.config.max_content_size,
            });
        }

        if let Some(parent) = cache_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(cache_path).await?;
        file.write_all(&content).await?;
        file.flush().await?;

        let fetched_at = Utc::now();

        let meta = CacheMetadata {
            url: url.to_string(),
            fetched_at,
            content_type: content_type.clone(),
            content_length: content.len(),
            expires_at: Some(
                fetched_at + chrono::Duration::seconds(self.config.cache_ttl.as_secs() as i64),
            ),
        };

        let meta_json = serde_json::to_string_pretty(&meta)?;
        fs::write(meta_path, meta_json).await?;

        Ok(FetchResult {
            url: url.clone(),
            cache_path: cache_path.to_path_buf(),
            content_type,
            content_length: content.len(),
            fetched_at,
            from_cache: false,
        })
    }

    /// Generate a cache path for a URL.
    fn cache_path_for_url(&self, url: &Url) -> PathBuf {
        let hash = Self::url_hash(url);
        let host = url.host_str().unwrap_or("unknown");
        let extension = Self::extension_for_url(url);

        self.config
            .cache_dir
            .join(host)
            .join(format!("{}.{}", hash, extension))
    }

    /// Generate a metadata path for a URL.
    fn meta_path_for_url(&self, url: &Url) -> PathBuf {
        let hash = Self::url_hash(url);
        let host = url.host_str().unwrap_or("unknown");

        self.config
            .cache_dir
            .join(host)
            .join(format!("{}.meta.json", hash))
    }

    /// Hash a URL to a short string.
    fn url_hash(url: &Url) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_str().as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..8])
    }

    /// Collection exports come from the XML API; everything else is HTML.
    fn extension_for_url(url: &Url) -> &'static str {
        if url.path().contains("/xmlapi") {
            "xml"
        } else {
            "html"
        }
    }

    /// Read cached content as string.
    pub async fn read_cached_text(&self, result: &FetchResult) -> Result<String, FetchError> {
        Ok(fs::read_to_string(&result.cache_path).await?)
    }
}

#[async_trait]
impl PageSource for Fetcher {
    async fn fetch_text(&self, url: &Url, freshness: Freshness) -> Result<String, FetchError> {
        let result = match freshness {
            Freshness::Cached => self.fetch(url).await?,
            Freshness::Fresh => self.fetch_fresh(url).await?,
        };
        self.read_cached_text(&result).await
    }
}

/// Page source replaying canned responses, keyed by URL.
///
/// Each URL holds a queue of bodies; the last one repeats once the queue is
/// down to a single entry. Every request is logged for assertions.
#[cfg(test)]
pub struct ScriptedSource {
    responses: std::sync::Mutex<std::collections::HashMap<String, Vec<String>>>,
    requests: std::sync::Mutex<Vec<(String, Freshness)>>,
}

#[cfg(test)]
impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            responses: std::sync::Mutex::new(std::collections::HashMap::new()),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn respond(self, url: &Url, body: impl Into<String>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push(body.into());
        self
    }

    pub fn requests(&self) -> Vec<(String, Freshness)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self, url: &Url) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| u == url.as_str())
            .count()
    }
}

#[cfg(test)]
#[async_trait]
impl PageSource for ScriptedSource {
    async fn fetch_text(&self, url: &Url, freshness: Freshness) -> Result<String, FetchError> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), freshness));

        let mut responses = self.responses.lock().unwrap();
        match responses.get_mut(url.as_str()) {
            Some(queue) if queue.len() > 1 => Ok(queue.remove(0)),
            Some(queue) if !queue.is_empty() => Ok(queue[0].clone()),
            _ => Err(FetchError::HttpStatus {
                status: 404,
                message: "Not Found".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> FetcherConfig {
        FetcherConfig {
            cache_dir: temp_dir.path().to_path_buf(),
            cache_ttl: Duration::from_secs(3600),
            max_content_size: 1024 * 1024,
            timeout: Duration::from_secs(10),
            user_agent: "test-agent".to_string(),
            request_delay: Duration::from_millis(0),
            retry: RetryPolicy::default(),
        }
    }

    #[test]
    fn test_url_hash() {
        let url1 = Url::parse("https://boardgamegeek.com/playstats/thing/13/page/1").unwrap();
        let url2 = Url::parse("https://boardgamegeek.com/playstats/thing/13/page/2").unwrap();

        let hash1 = Fetcher::url_hash(&url1);
        let hash2 = Fetcher::url_hash(&url2);

        assert_ne!(hash1, hash2);
        assert_eq!(hash1.len(), 16); // 8 bytes = 16 hex chars
    }

    #[test]
    fn test_extension_for_url() {
        assert_eq!(
            Fetcher::extension_for_url(
                &Url::parse("https://www.boardgamegeek.com/xmlapi2/collection?username=a").unwrap()
            ),
            "xml"
        );
        assert_eq!(
            Fetcher::extension_for_url(
                &Url::parse("https://boardgamegeek.com/playstats/thing/13/page/1").unwrap()
            ),
            "html"
        );
    }

    #[test]
    fn test_cache_path_generation() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher = Fetcher::new(test_config(&temp_dir)).unwrap();

        let url = Url::parse("https://boardgamegeek.com/playstats/thing/13/page/1").unwrap();
        let cache_path = fetcher.cache_path_for_url(&url);

        assert!(cache_path.starts_with(temp_dir.path()));
        assert!(cache_path.to_string_lossy().contains("boardgamegeek.com"));
        assert!(cache_path.to_string_lossy().ends_with(".html"));
    }

    #[tokio::test]
    async fn test_fresh_cache_entry_is_served() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher = Fetcher::new(test_config(&temp_dir)).unwrap();

        // Nothing listens here; a cache miss would fail
        let url = Url::parse("http://127.0.0.1:9/playstats/thing/13/page/1").unwrap();
        let cache_path = fetcher.cache_path_for_url(&url);
        let meta_path = fetcher.meta_path_for_url(&url);
        std::fs::create_dir_all(cache_path.parent().unwrap()).unwrap();
        std::fs::write(&cache_path, "<html>cached</html>").unwrap();
        let meta = CacheMetadata {
            url: url.to_string(),
            fetched_at: Utc::now(),
            content_type: Some("text/html".to_string()),
            content_length: 19,
            expires_at: None,
        };
        std::fs::write(&meta_path, serde_json::to_string(&meta).unwrap()).unwrap();

        let body = fetcher.fetch_text(&url, Freshness::Cached).await.unwrap();
        assert_eq!(body, "<html>cached</html>");
    }

    #[tokio::test]
    async fn test_cache_metadata_serialization() {
        let meta = CacheMetadata {
            url: "https://boardgamegeek.com/playstats/thing/13/page/1".to_string(),
            fetched_at: Utc::now(),
            content_type: Some("text/html".to_string()),
            content_length: 1234,
            expires_at: None,
        };

        let json = serde_json::to_string(&meta).unwrap();
        let parsed: CacheMetadata = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.url, meta.url);
        assert_eq!(parsed.content_length, meta.content_length);
    }

    #[test]
    fn test_fetcher_config_default() {
        let config = FetcherConfig::default();

        assert_eq!(config.cache_dir, PathBuf::from("./data/raw"));
        assert_eq!(config.cache_ttl, Duration::from_secs(900));
        assert!(config.user_agent.starts_with("play-ranks/"));
    }

    #[test]
    fn test_retry_policy_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(4000));
    }

    #[test]
    fn test_retryable_errors() {
        assert!(FetchError::HttpStatus {
            status: 503,
            message: "Service Unavailable".to_string()
        }
        .is_retryable());
        assert!(FetchError::RateLimited {
            host: "boardgamegeek.com".to_string(),
            retry_after_secs: 5
        }
        .is_retryable());
        assert!(!FetchError::HttpStatus {
            status: 404,
            message: "Not Found".to_string()
        }
        .is_retryable());
        assert!(!FetchError::InvalidUrl("x".to_string()).is_retryable());
    }

    #[tokio::test]
    async fn test_scripted_source_replays_last_response() {
        let url = Url::parse("https://boardgamegeek.com/a").unwrap();
        let source = ScriptedSource::new().respond(&url, "one").respond(&url, "two");

        assert_eq!(source.fetch_text(&url, Freshness::Fresh).await.unwrap(), "one");
        assert_eq!(source.fetch_text(&url, Freshness::Fresh).await.unwrap(), "two");
        assert_eq!(source.fetch_text(&url, Freshness::Fresh).await.unwrap(), "two");
        assert_eq!(source.request_count(&url), 3);
    }
}
