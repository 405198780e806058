//! One scoring run from trip plan to ordered scores.

#![forbid(unsafe_code)]

use boat_ride_core::{ChainError, ProviderChain, RideScore, TripPlan, TripPlanError};
use log::{debug, info};
use thiserror::Error;

use crate::{ScoringPreferences, score};

/// Reasons a run produces no scores.
#[derive(Debug, Error)]
pub enum RunError {
    /// The plan cannot be sampled.
    #[error("invalid trip plan: {0}")]
    InvalidPlan(#[from] TripPlanError),
    /// An adapter failed or misbehaved.
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// Validate `plan`, fuse the chain's series and score every sample.
///
/// Scores are sorted by sample time.
///
/// # Errors
///
/// Returns [`RunError::InvalidPlan`] before any adapter runs when the plan
/// is malformed, and [`RunError::Chain`] when fusion fails. No partial
/// results are returned.
///
/// # Examples
///
/// ```
/// use boat_ride_core::ProviderChain;
/// use boat_ride_core::test_support::{PositionProvider, sample_plan};
/// use boat_ride_scorer::run_trip;
///
/// let chain = ProviderChain::new().with_provider(PositionProvider::constant_wind(8.0, 200.0));
/// let scores = run_trip(&sample_plan(), &chain, None)?;
/// assert_eq!(scores.len(), 5);
/// assert!(scores.windows(2).all(|w| w[0].t_local <= w[1].t_local));
/// # Ok::<(), boat_ride_scorer::RunError>(())
/// ```
pub fn run_trip(
    plan: &TripPlan,
    chain: &ProviderChain,
    prefs: Option<&ScoringPreferences>,
) -> Result<Vec<RideScore>, RunError> {
    plan.validate()?;
    info!(
        "scoring trip {} with providers [{}]",
        plan.trip_id,
        chain.names().join(", ")
    );
    let series = chain.get_env_series(plan)?;
    let mut scores: Vec<RideScore> = series
        .iter()
        .map(|env| score(&plan.boat, env, prefs))
        .collect();
    scores.sort_by_key(|s| s.t_local);
    debug!("scored {} samples for trip {}", scores.len(), plan.trip_id);
    Ok(scores)
}
