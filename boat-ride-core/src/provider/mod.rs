//! Data source adapters.
//!
//! The [`EnvProvider`] trait abstracts every source of environmental data:
//! weather forecasts, buoy observations, tide predictions and locally
//! derived quantities such as fetch. An adapter receives a [`TripPlan`]
//! and returns one [`EnvAtPoint`] per scheduled sample.
//!
//! Missing data is never an error; adapters leave fields unset. Errors are
//! reserved for a source that cannot produce a series at all.
//!
//! [`TripPlan`]: crate::TripPlan
//! [`EnvAtPoint`]: crate::EnvAtPoint

mod adapter;
mod error;

pub use adapter::{EnvProvider, EnvSeries, neutral_series};
pub use error::ProviderError;
