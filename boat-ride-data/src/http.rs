//! Blocking HTTP access to the upstream feeds.
//!
//! Adapters talk to the network through the [`FeedClient`] trait so they can
//! be exercised against canned responses. [`HttpClient`] is the production
//! implementation: a `reqwest` client driven by an owned Tokio runtime, with
//! a fixed number of attempts and exponential backoff plus jitter between
//! them.
//!
//! Only transport failures (connection errors and timeouts) are retried. An
//! HTTP error status is returned straight away, except `404 Not Found`,
//! which is reported as a missing resource rather than an error.

use std::time::Duration;

use log::warn;
use rand::Rng;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};

use boat_ride_core::ProviderError;

/// Default user agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = "boat-ride-engine/0.1";

const ACCEPT_HEADER: &str =
    "application/geo+json, application/json, text/plain;q=0.9, */*;q=0.8";
const DEFAULT_TIMEOUT_SECS: u64 = 25;
const DEFAULT_TRIES: u32 = 4;
const DEFAULT_BACKOFF_MS: u64 = 800;
const DEFAULT_JITTER_FRACTION: f64 = 0.25;

/// Source of upstream documents.
pub trait FeedClient: Send + Sync + std::fmt::Debug {
    /// Fetch `url` as text.
    ///
    /// Returns `Ok(None)` when the server reports the resource missing.
    fn get_text(&self, url: &str) -> Result<Option<String>, ProviderError>;
}

/// Fetch `url` and decode it as JSON.
///
/// A missing resource is an error here; callers that tolerate absence use
/// [`FeedClient::get_text`] directly.
pub fn fetch_json<T: DeserializeOwned>(
    feed: &dyn FeedClient,
    url: &str,
) -> Result<T, ProviderError> {
    let text = feed.get_text(url)?.ok_or_else(|| ProviderError::Http {
        url: url.to_owned(),
        status: StatusCode::NOT_FOUND.as_u16(),
        message: "resource not found".to_owned(),
    })?;
    serde_json::from_str(&text).map_err(|err| ProviderError::Parse {
        url: url.to_owned(),
        message: err.to_string(),
    })
}

/// Whether a failure is worth another attempt.
pub fn is_transient(err: &ProviderError) -> bool {
    matches!(
        err,
        ProviderError::Network { .. } | ProviderError::Timeout { .. }
    )
}

/// Delay before retrying after attempt number `attempt` (zero-based).
///
/// The delay doubles with each attempt and is stretched by `jitter`, a
/// fraction of the delay clamped to `[0, 1]`.
///
/// ```
/// use std::time::Duration;
/// use boat_ride_data::http::backoff_delay;
///
/// let base = Duration::from_millis(800);
/// assert_eq!(backoff_delay(base, 0, 0.0), Duration::from_millis(800));
/// assert_eq!(backoff_delay(base, 2, 0.0), Duration::from_millis(3200));
/// ```
pub fn backoff_delay(base: Duration, attempt: u32, jitter: f64) -> Duration {
    let factor = f64::from(2_u32.saturating_pow(attempt)) * (1.0 + jitter.clamp(0.0, 1.0));
    Duration::try_from_secs_f64(base.as_secs_f64() * factor).unwrap_or(Duration::MAX)
}

/// Errors raised while building an [`HttpClient`].
#[derive(Debug, Error)]
pub enum HttpClientBuildError {
    /// The `reqwest` client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// The Tokio runtime could not be built.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Configuration for [`HttpClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpClientConfig {
    /// User agent sent with every request.
    pub user_agent: String,
    /// Connect and request timeout.
    pub timeout: Duration,
    /// Total attempts per request, including the first.
    pub tries: u32,
    /// Delay before the first retry.
    pub backoff: Duration,
    /// Upper bound of the random stretch applied to each delay.
    pub jitter_fraction: f64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            tries: DEFAULT_TRIES,
            backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
            jitter_fraction: DEFAULT_JITTER_FRACTION,
        }
    }
}

impl HttpClientConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the total number of attempts. Zero is treated as one.
    #[must_use]
    pub fn with_tries(mut self, tries: u32) -> Self {
        self.tries = tries;
        self
    }

    /// Set the delay before the first retry.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Set the jitter bound, as a fraction of each delay.
    #[must_use]
    pub fn with_jitter_fraction(mut self, fraction: f64) -> Self {
        self.jitter_fraction = fraction;
        self
    }
}

/// Retrying HTTP client exposed through a blocking interface.
///
/// Outside a Tokio runtime, requests run on the client's own runtime. Inside
/// a multi-threaded runtime they run on the caller's runtime via
/// [`tokio::task::block_in_place`]. A `current_thread` runtime cannot be
/// re-entered or moved off its thread, so there the client's own runtime is
/// driven from a scoped helper thread while the caller blocks.
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    runtime: Runtime,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Build a client with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn new() -> Result<Self, HttpClientBuildError> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Build a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn with_config(config: HttpClientConfig) -> Result<Self, HttpClientBuildError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HEADER));
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(HttpClientBuildError::HttpClient)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(HttpClientBuildError::Runtime)?;
        Ok(Self {
            client,
            config,
            runtime,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    async fn get_once(&self, url: &str) -> Result<Option<String>, ProviderError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| self.convert_error(&err, url))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .map_err(|err| self.convert_error(&err, url))?;
        response
            .text()
            .await
            .map(Some)
            .map_err(|err| self.convert_error(&err, url))
    }

    async fn get_with_retry(&self, url: &str) -> Result<Option<String>, ProviderError> {
        let tries = self.config.tries.max(1);
        let mut attempt = 0;
        loop {
            match self.get_once(url).await {
                Err(err) if is_transient(&err) && attempt + 1 < tries => {
                    let jitter = rand::thread_rng().gen_range(0.0..=self.jitter_bound());
                    let delay = backoff_delay(self.config.backoff, attempt, jitter);
                    warn!(
                        "attempt {} of {tries} for {url} failed, retrying in {delay:?}: {err}",
                        attempt + 1
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }

    fn jitter_bound(&self) -> f64 {
        if self.config.jitter_fraction.is_finite() {
            self.config.jitter_fraction.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    fn convert_error(&self, error: &reqwest::Error, url: &str) -> ProviderError {
        if error.is_timeout() {
            return ProviderError::Timeout {
                url: url.to_owned(),
                timeout_secs: self.config.timeout.as_secs(),
            };
        }
        if let Some(status) = error.status() {
            return ProviderError::Http {
                url: url.to_owned(),
                status: status.as_u16(),
                message: error.to_string(),
            };
        }
        if error.is_decode() || error.is_body() {
            return ProviderError::Parse {
                url: url.to_owned(),
                message: error.to_string(),
            };
        }
        ProviderError::Network {
            url: url.to_owned(),
            message: error.to_string(),
        }
    }
}

impl FeedClient for HttpClient {
    fn get_text(&self, url: &str) -> Result<Option<String>, ProviderError> {
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(self.get_with_retry(url)))
            }
            Ok(_) => std::thread::scope(|scope| {
                scope
                    .spawn(|| self.runtime.block_on(self.get_with_retry(url)))
                    .join()
                    .unwrap_or_else(|_| {
                        Err(ProviderError::Network {
                            url: url.to_owned(),
                            message: "request thread panicked".to_owned(),
                        })
                    })
            }),
            Err(_) => self.runtime.block_on(self.get_with_retry(url)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubFeed;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0.0, 800)]
    #[case(1, 0.0, 1600)]
    #[case(3, 0.0, 6400)]
    #[case(0, 0.25, 1000)]
    #[case(1, 5.0, 3200)]
    fn backoff_doubles_and_stretches(
        #[case] attempt: u32,
        #[case] jitter: f64,
        #[case] expected_ms: u64,
    ) {
        let delay = backoff_delay(Duration::from_millis(800), attempt, jitter);
        assert_eq!(delay.as_millis(), u128::from(expected_ms));
    }

    #[rstest]
    fn only_transport_failures_are_transient() {
        let network = ProviderError::Network {
            url: "u".to_owned(),
            message: "refused".to_owned(),
        };
        let http = ProviderError::Http {
            url: "u".to_owned(),
            status: 500,
            message: "boom".to_owned(),
        };
        assert!(is_transient(&network));
        assert!(!is_transient(&http));
    }

    #[rstest]
    fn config_builder_pattern() {
        let config = HttpClientConfig::new()
            .with_user_agent("test-agent/1.0")
            .with_timeout(Duration::from_secs(5))
            .with_tries(2)
            .with_backoff(Duration::from_millis(10))
            .with_jitter_fraction(0.0);
        assert_eq!(config.user_agent, "test-agent/1.0");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.tries, 2);
        assert_eq!(config.backoff, Duration::from_millis(10));
    }

    #[rstest]
    fn unreachable_host_is_a_network_error() {
        let client = HttpClient::with_config(
            HttpClientConfig::new()
                .with_tries(2)
                .with_backoff(Duration::from_millis(1))
                .with_timeout(Duration::from_secs(2)),
        )
        .expect("client should build");
        let err = client
            .get_text("http://127.0.0.1:9/unreachable")
            .expect_err("nothing listens on the discard port");
        assert!(is_transient(&err), "unexpected error {err:?}");
    }

    #[rstest]
    fn requests_inside_a_current_thread_runtime_fail_cleanly() {
        let client = HttpClient::with_config(
            HttpClientConfig::new()
                .with_tries(1)
                .with_timeout(Duration::from_secs(2)),
        )
        .expect("client should build");
        let outer = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime should build");
        let outcome = outer.block_on(async { client.get_text("http://127.0.0.1:9/") });
        let err = outcome.expect_err("nothing listens on the discard port");
        assert!(is_transient(&err), "unexpected error {err:?}");
    }

    #[rstest]
    fn fetch_json_reports_missing_documents() {
        let feed = StubFeed::new();
        let err = fetch_json::<serde_json::Value>(&feed, "https://example.test/none")
            .expect_err("missing document");
        assert!(matches!(err, ProviderError::Http { status: 404, .. }));
    }

    #[rstest]
    fn fetch_json_reports_malformed_documents() {
        let feed = StubFeed::new().with_text("https://example.test/bad", "{not json");
        let err = fetch_json::<serde_json::Value>(&feed, "https://example.test/bad")
            .expect_err("malformed document");
        assert!(matches!(err, ProviderError::Parse { .. }));
    }
}
