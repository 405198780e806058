//! Canned feeds for exercising adapters without a network.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use boat_ride_core::ProviderError;

use crate::http::FeedClient;

#[derive(Debug, Clone)]
enum StubResponse {
    Text(String),
    Error(ProviderError),
}

/// [`FeedClient`] answering from a fixed table of URLs.
///
/// A URL is looked up verbatim first and then without its query string, so
/// a response registered for an endpoint answers every query against it.
/// Unregistered URLs behave like `404 Not Found`. Every request is recorded.
///
/// # Examples
///
/// ```
/// use boat_ride_data::http::FeedClient;
/// use boat_ride_data::test_support::StubFeed;
///
/// let feed = StubFeed::new().with_text("https://example.test/a", "hello");
/// assert_eq!(feed.get_text("https://example.test/a?x=1")?.as_deref(), Some("hello"));
/// assert_eq!(feed.get_text("https://example.test/b")?, None);
/// assert_eq!(feed.request_count("https://example.test/a"), 1);
/// # Ok::<(), boat_ride_core::ProviderError>(())
/// ```
#[derive(Debug, Default)]
pub struct StubFeed {
    responses: HashMap<String, StubResponse>,
    requests: Mutex<Vec<String>>,
}

impl StubFeed {
    /// Feed with no registered URLs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with `body`.
    #[must_use]
    pub fn with_text(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.responses
            .insert(url.into(), StubResponse::Text(body.into()));
        self
    }

    /// Answer `url` with the serialised `body`.
    #[must_use]
    pub fn with_json(self, url: impl Into<String>, body: &serde_json::Value) -> Self {
        self.with_text(url, body.to_string())
    }

    /// Fail every request for `url` with `error`.
    #[must_use]
    pub fn with_error(mut self, url: impl Into<String>, error: ProviderError) -> Self {
        self.responses.insert(url.into(), StubResponse::Error(error));
        self
    }

    /// Every URL requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many requests matched `endpoint`, ignoring query strings.
    pub fn request_count(&self, endpoint: &str) -> usize {
        self.requests()
            .iter()
            .filter(|url| url.as_str() == endpoint || strip_query(url) == endpoint)
            .count()
    }
}

fn strip_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(endpoint, _)| endpoint)
}

impl FeedClient for StubFeed {
    fn get_text(&self, url: &str) -> Result<Option<String>, ProviderError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_owned());
        let response = self
            .responses
            .get(url)
            .or_else(|| self.responses.get(strip_query(url)));
        match response {
            Some(StubResponse::Text(body)) => Ok(Some(body.clone())),
            Some(StubResponse::Error(err)) => Err(err.clone()),
            None => Ok(None),
        }
    }
}
