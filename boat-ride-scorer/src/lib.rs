//! Ride comfort scoring for fused environmental samples.
//!
//! - [`score`] maps one [`EnvAtPoint`](boat_ride_core::EnvAtPoint) and a
//!   [`BoatProfile`](boat_ride_core::BoatProfile) to a
//!   [`RideScore`](boat_ride_core::RideScore) with reasons and diagnostics.
//! - [`ScoringPreferences`] personalises the penalty weights and can be
//!   nudged from rider feedback.
//! - [`run_trip`] drives a whole trip through a
//!   [`ProviderChain`](boat_ride_core::ProviderChain).
//!
//! The heuristic is an engineered approximation tuned for small craft,
//! not a validated seakeeping model.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod engine;
mod preferences;
mod scoring;

pub use engine::{RunError, run_trip};
pub use preferences::{
    ALIGNED_WITHIN, FeedbackError, Factor, MULTIPLIER_MAX, MULTIPLIER_MIN, NUDGE_STEP, OFFSET_MAX,
    OFFSET_MIN, OFFSET_STEP, PreferenceField, ScoringFeedback, ScoringPreferences, implied_score,
};
pub use scoring::{angle_diff_deg, score, tide_flow_dir_est};
