//! The `fetch` adapter: per-sample fetch, heading, depth and waterway.

use std::sync::Arc;

use boat_ride_core::{EnvAtPoint, EnvProvider, EnvSeries, ProviderError, TripPlan};

use crate::FetchCalculator;

/// Provenance key recording where `fetch_nm` came from.
pub const FETCH_SOURCE_KEY: &str = "fetch_source";

/// Adapter contributing fetch and route context to every sample.
///
/// Fetch comes from, in order of preference: an explicit waypoint
/// override, the coastline calculator's minimum fetch, and the plan's
/// default fetch. When the calculator is used its directional result is
/// attached so the chain can refine fetch for the wind direction.
#[derive(Debug, Clone, Default)]
pub struct FetchProvider {
    calculator: Option<Arc<FetchCalculator>>,
}

impl FetchProvider {
    /// Adapter that relies on waypoint overrides and the plan default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Measure fetch with `calculator` where no override applies.
    #[must_use]
    pub fn with_calculator(mut self, calculator: Arc<FetchCalculator>) -> Self {
        self.calculator = Some(calculator);
        self
    }
}

impl EnvProvider for FetchProvider {
    fn name(&self) -> &str {
        "fetch"
    }

    fn get_env_series(&self, plan: &TripPlan) -> Result<EnvSeries, ProviderError> {
        let positions = plan.sample_positions()?;
        let measured = self.calculator.as_ref().map(|calc| {
            let points: Vec<(f64, f64)> = positions.iter().map(|p| (p.lat, p.lon)).collect();
            calc.compute_fetch_batch(&points)
        });

        Ok(positions
            .iter()
            .enumerate()
            .map(|(i, pos)| {
                let mut env = EnvAtPoint::empty(pos.t_local, pos.lat, pos.lon);
                let result = measured.as_ref().and_then(|all| all.get(i)).cloned();
                let meta = &mut env.meta;
                meta.route_heading_deg = Some(pos.route_heading_deg);
                meta.depth_m = pos.depth_m;
                match (&result, pos.fetch_overridden) {
                    (_, true) => {
                        meta.fetch_nm = Some(pos.fetch_override_nm);
                        meta.note(FETCH_SOURCE_KEY, "override");
                    }
                    (Some(result), false) => {
                        meta.fetch_nm = Some(result.min_fetch_nm);
                        meta.fetch_result = Some(Arc::clone(result));
                        meta.note(FETCH_SOURCE_KEY, "coastline");
                    }
                    (None, false) => {
                        meta.fetch_nm = Some(pos.fetch_override_nm);
                        meta.note(FETCH_SOURCE_KEY, "default");
                    }
                }
                meta.waterway = pos.waterway.or(result.map(|r| r.waterway));
                env
            })
            .collect())
    }
}
