//! Provider token grammar and chain assembly.
//!
//! A provider string such as `"nws+ndbc+fetch+coops"` names adapters in
//! precedence order. Tokens are joined by `+`, trimmed and matched without
//! regard to case; empty tokens are skipped. A string with no tokens at all
//! selects [`DEFAULT_PROVIDERS`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use boat_ride_core::{EnvProvider, FallbackProvider, ProviderChain};
use boat_ride_geo::{Coastline, FetchCalculator, FetchProvider};
use log::info;
use thiserror::Error;

use crate::coops::{CoopsConfig, CoopsProvider};
use crate::http::FeedClient;
use crate::mock::MockProvider;
use crate::ndbc::{NdbcConfig, NdbcProvider};
use crate::nws::NwsProvider;
use crate::nwps::NwpsProvider;
use crate::usace::UsaceProvider;

/// Adapters used when the provider string names none.
pub const DEFAULT_PROVIDERS: [ProviderToken; 2] = [ProviderToken::Nws, ProviderToken::Ndbc];

/// Tokens understood by [`parse_provider_tokens`], for messages.
pub const SUPPORTED_TOKENS: &str = "nws, ndbc, fetch, nwps, coops (tide), usace, mock";

/// Errors from the provider grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A token names no known adapter.
    #[error("unknown provider token '{token}' (supported: {SUPPORTED_TOKENS})")]
    UnknownToken {
        /// The offending token, trimmed and lowercased.
        token: String,
    },
}

/// One adapter named in a provider string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderToken {
    /// NWS forecast wind and precipitation.
    Nws,
    /// NDBC buoy waves.
    Ndbc,
    /// Fetch, heading and waterway from the route and coastline.
    Fetch,
    /// NWPS nearshore waves.
    Nwps,
    /// CO-OPS tide predictions; also spelt `tide`.
    Coops,
    /// USACE river gauges.
    Usace,
    /// Synthetic conditions.
    Mock,
}

impl ProviderToken {
    /// Canonical token text.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nws => "nws",
            Self::Ndbc => "ndbc",
            Self::Fetch => "fetch",
            Self::Nwps => "nwps",
            Self::Coops => "coops",
            Self::Usace => "usace",
            Self::Mock => "mock",
        }
    }
}

impl fmt::Display for ProviderToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderToken {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_lowercase();
        match token.as_str() {
            "nws" => Ok(Self::Nws),
            "ndbc" => Ok(Self::Ndbc),
            "fetch" => Ok(Self::Fetch),
            "nwps" => Ok(Self::Nwps),
            "coops" | "tide" => Ok(Self::Coops),
            "usace" => Ok(Self::Usace),
            "mock" => Ok(Self::Mock),
            _ => Err(RegistryError::UnknownToken { token }),
        }
    }
}

/// Split a provider string into tokens.
///
/// ```
/// use boat_ride_data::registry::{ProviderToken, parse_provider_tokens};
///
/// let tokens = parse_provider_tokens(" NWS + tide ++fetch")?;
/// assert_eq!(tokens, [ProviderToken::Nws, ProviderToken::Coops, ProviderToken::Fetch]);
/// assert_eq!(parse_provider_tokens("")?, [ProviderToken::Nws, ProviderToken::Ndbc]);
/// # Ok::<(), boat_ride_data::registry::RegistryError>(())
/// ```
pub fn parse_provider_tokens(spec: &str) -> Result<Vec<ProviderToken>, RegistryError> {
    let tokens = spec
        .split('+')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::parse)
        .collect::<Result<Vec<ProviderToken>, _>>()?;
    if tokens.is_empty() {
        return Ok(DEFAULT_PROVIDERS.to_vec());
    }
    Ok(tokens)
}

/// Builds provider chains from token strings.
///
/// Network adapters share one [`FeedClient`]. The `fetch` adapter measures
/// against a coastline only when one is configured. The coastline is shared,
/// but every chain gets its own [`FetchCalculator`], so a long-lived registry
/// does not accumulate the fetch caches of past runs.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    feed: Arc<dyn FeedClient>,
    coastline: Option<Arc<Coastline>>,
    ndbc: NdbcConfig,
    coops: CoopsConfig,
    tolerant: bool,
}

impl ProviderRegistry {
    /// Registry whose network adapters read through `feed`.
    pub fn new(feed: Arc<dyn FeedClient>) -> Self {
        Self {
            feed,
            coastline: None,
            ndbc: NdbcConfig::default(),
            coops: CoopsConfig::default(),
            tolerant: false,
        }
    }

    /// Measure fetch against `coastline`.
    #[must_use]
    pub fn with_coastline(mut self, coastline: Arc<Coastline>) -> Self {
        self.coastline = Some(coastline);
        self
    }

    /// A fresh calculator over the configured coastline, if any.
    pub fn fetch_calculator(&self) -> Option<Arc<FetchCalculator>> {
        self.coastline
            .as_ref()
            .map(|coast| Arc::new(FetchCalculator::new(Arc::clone(coast))))
    }

    /// Configure the `ndbc` adapter.
    #[must_use]
    pub fn with_ndbc_config(mut self, config: NdbcConfig) -> Self {
        self.ndbc = config;
        self
    }

    /// Configure the `coops` adapter.
    #[must_use]
    pub fn with_coops_config(mut self, config: CoopsConfig) -> Self {
        self.coops = config;
        self
    }

    /// Wrap every adapter in a [`FallbackProvider`] so a failing source
    /// contributes a neutral series instead of aborting the run.
    #[must_use]
    pub fn with_tolerance(mut self, tolerant: bool) -> Self {
        self.tolerant = tolerant;
        self
    }

    /// Instantiate the adapter for `token`.
    pub fn build_provider(&self, token: ProviderToken) -> Box<dyn EnvProvider> {
        let feed = Arc::clone(&self.feed);
        let provider: Box<dyn EnvProvider> = match token {
            ProviderToken::Nws => Box::new(NwsProvider::new(feed)),
            ProviderToken::Ndbc => Box::new(NdbcProvider::with_config(feed, self.ndbc.clone())),
            ProviderToken::Fetch => {
                let fetch = FetchProvider::new();
                Box::new(match self.fetch_calculator() {
                    Some(calc) => fetch.with_calculator(calc),
                    None => fetch,
                })
            }
            ProviderToken::Nwps => Box::new(NwpsProvider::new()),
            ProviderToken::Coops => Box::new(CoopsProvider::with_config(feed, self.coops.clone())),
            ProviderToken::Usace => Box::new(UsaceProvider::new()),
            ProviderToken::Mock => Box::new(MockProvider::new()),
        };
        if self.tolerant {
            Box::new(FallbackProvider::new(provider))
        } else {
            provider
        }
    }

    /// Parse `spec` and build the chain it names.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownToken`] for the first unrecognised
    /// token; no adapters are built in that case.
    pub fn build_chain(&self, spec: &str) -> Result<ProviderChain, RegistryError> {
        let tokens = parse_provider_tokens(spec)?;
        let names: Vec<&str> = tokens.iter().map(|t| t.as_str()).collect();
        info!("provider chain: {}", names.join("+"));
        Ok(ProviderChain::from_providers(
            tokens.into_iter().map(|t| self.build_provider(t)).collect(),
        ))
    }
}
