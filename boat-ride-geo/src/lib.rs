//! Coastline geometry and fetch measurement.
//!
//! - [`Coastline`] holds shoreline segments in an R\*-tree, built from
//!   line strings or loaded from GeoJSON.
//! - [`FetchCalculator`] casts rays from a point and reports the distance
//!   to shore in each direction.
//! - [`FetchProvider`] is the adapter that feeds fetch into a provider
//!   chain.

#![forbid(unsafe_code)]

pub mod calculator;
pub mod coastline;
pub mod provider;

pub use calculator::FetchCalculator;
pub use coastline::{CoastSegment, Coastline, CoastlineError, SharedCoastline};
pub use provider::FetchProvider;
