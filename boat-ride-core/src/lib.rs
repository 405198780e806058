//! Core domain types and the fusion engine for boat ride scoring.
//!
//! The crate covers everything that runs in memory once upstream data has
//! been fetched:
//! - [`route`] resamples a raw polyline into evenly spaced points with
//!   bearings;
//! - [`schedule`] expands a [`TripPlan`] into sample times and positions;
//! - [`fetch`] and [`waves`] hold the fetch weighting and the inland wave
//!   growth approximation;
//! - [`EnvProvider`] is the contract every data source adapter satisfies;
//! - [`ProviderChain`] merges adapter series into one fused series.
//!
//! Scoring lives in `boat-ride-scorer`; HTTP adapters live in
//! `boat-ride-data`; coastline ray-casting lives in `boat-ride-geo`.

#![forbid(unsafe_code)]

mod boat;
pub mod chain;
mod env;
pub mod fallback;
pub mod fetch;
pub mod provider;
pub mod route;
pub mod schedule;
mod score;
mod trip;
pub mod waves;

#[doc(hidden)]
pub mod test_support;

pub use boat::{BoatProfile, BoatProfileError};
pub use chain::{ChainError, ProviderChain};
pub use env::{EnvAtPoint, EnvMetadata, TidePhase};
pub use fallback::FallbackProvider;
pub use fetch::{DirectionalFetch, FetchResult, Waterway};
pub use provider::{EnvProvider, EnvSeries, ProviderError};
pub use route::{NormalizedPoint, NormalizedRoute, RouteError};
pub use waves::WaveModelError;
pub use schedule::SamplePosition;
pub use score::{RideLabel, RideScore};
pub use trip::{LOCAL_TIME_FORMAT, RoutePoint, TripPlan, TripPlanError};
