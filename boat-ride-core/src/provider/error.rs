use thiserror::Error;

use crate::TripPlanError;

/// Errors from [`crate::provider::EnvProvider::get_env_series`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// The plan could not be expanded into sample positions.
    #[error("invalid trip plan: {0}")]
    InvalidPlan(#[from] TripPlanError),

    /// A network error occurred while contacting an upstream service.
    ///
    /// Covers connection refusals, DNS failures, and TLS errors.
    #[error("network error contacting {url}: {message}")]
    Network {
        /// The URL that failed.
        url: String,
        /// Description of the failure.
        message: String,
    },

    /// The request exceeded its timeout on every attempt.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// The URL that timed out.
        url: String,
        /// Timeout applied to each attempt, in seconds.
        timeout_secs: u64,
    },

    /// The upstream service answered with a non-success status.
    #[error("HTTP {status} from {url}: {message}")]
    Http {
        /// The URL that failed.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Response excerpt or reason phrase.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("failed to parse response from {url}: {message}")]
    Parse {
        /// The URL whose body failed to parse.
        url: String,
        /// Parser diagnostic.
        message: String,
    },

    /// The source is unusable for this plan.
    #[error("{provider} is unavailable: {message}")]
    Unavailable {
        /// Adapter name.
        provider: String,
        /// Why the adapter gave up.
        message: String,
    },
}
