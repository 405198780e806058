//! Feed adapters for live marine data.
//!
//! Each module wraps one upstream service behind the
//! [`EnvProvider`](boat_ride_core::EnvProvider) contract:
//! - [`nws`] hourly and gridded forecasts (wind, gusts, precipitation);
//! - [`ndbc`] buoy wave observations;
//! - [`coops`] tide predictions;
//! - [`nwps`] and [`usace`] placeholders that only record provenance;
//! - [`mock`] deterministic synthetic conditions.
//!
//! Network adapters read through a shared [`FeedClient`]; the blocking
//! [`HttpClient`] retries transient failures with jittered backoff.
//! [`ProviderRegistry`] turns a provider string such as `"nws+ndbc+fetch"`
//! into a [`ProviderChain`](boat_ride_core::ProviderChain).

#![forbid(unsafe_code)]

pub mod coops;
pub mod http;
pub mod mock;
pub mod ndbc;
pub mod nwps;
pub mod nws;
pub mod registry;
pub mod usace;
mod util;

#[doc(hidden)]
pub mod test_support;

pub use coops::{CoopsConfig, CoopsProvider};
pub use http::{FeedClient, HttpClient, HttpClientBuildError, HttpClientConfig};
pub use mock::MockProvider;
pub use ndbc::{NdbcConfig, NdbcProvider};
pub use nwps::NwpsProvider;
pub use nws::NwsProvider;
pub use registry::{ProviderRegistry, ProviderToken, RegistryError, parse_provider_tokens};
pub use usace::UsaceProvider;
