//! Facade crate for the boat ride comfort engine.
//!
//! This crate re-exports the domain types, the fusion chain and the scorer.
//! Coastline fetch and the live HTTP adapters sit behind the `geo` and
//! `http-providers` features.

#![forbid(unsafe_code)]

pub use boat_ride_core::{
    BoatProfile, ChainError, EnvAtPoint, EnvMetadata, EnvProvider, EnvSeries, FallbackProvider,
    FetchResult, ProviderChain, ProviderError, RideLabel, RideScore, RoutePoint, TidePhase,
    TripPlan, TripPlanError, Waterway,
};
pub use boat_ride_scorer::{RunError, ScoringFeedback, ScoringPreferences, run_trip, score};

#[cfg(feature = "geo")]
pub use boat_ride_geo::{Coastline, CoastlineError, FetchCalculator, FetchProvider, SharedCoastline};

#[cfg(feature = "http-providers")]
pub use boat_ride_data::{HttpClient, HttpClientConfig, ProviderRegistry, RegistryError};
