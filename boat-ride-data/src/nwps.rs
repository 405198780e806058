//! Nearshore Wave Prediction System grids.
//!
//! Regional endpoint selection is not implemented, so no sample receives
//! NWPS waves. Each sample records the missing endpoint. Wave provenance is
//! left alone so that an earlier wave source keeps its attribution.

use boat_ride_core::{EnvAtPoint, EnvProvider, EnvSeries, ProviderError, TripPlan};
use serde_json::Value;

/// The `nwps` adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct NwpsProvider;

impl NwpsProvider {
    /// Create the adapter.
    pub fn new() -> Self {
        Self
    }

    /// Grid endpoint serving `(lat, lon)`, if any region covers it.
    fn endpoint_for(self, _lat: f64, _lon: f64) -> Option<String> {
        None
    }
}

impl EnvProvider for NwpsProvider {
    fn name(&self) -> &str {
        "nwps"
    }

    fn get_env_series(&self, plan: &TripPlan) -> Result<EnvSeries, ProviderError> {
        Ok(plan
            .sample_positions()?
            .iter()
            .map(|pos| {
                let mut env = EnvAtPoint::empty(pos.t_local, pos.lat, pos.lon);
                let endpoint = self.endpoint_for(pos.lat, pos.lon);
                env.meta
                    .note("nwps_endpoint", endpoint.map_or(Value::Null, Value::String));
                env
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boat_ride_core::test_support::sample_plan;
    use rstest::rstest;

    #[rstest]
    fn samples_carry_no_waves() {
        let series = NwpsProvider::new()
            .get_env_series(&sample_plan())
            .expect("valid plan");
        assert_eq!(series.len(), 5);
        for env in &series {
            assert_eq!(env.wave_height_ft, None);
            assert_eq!(env.meta.waves_source, None);
            assert_eq!(env.meta.provenance.get("nwps_endpoint"), Some(&Value::Null));
        }
    }
}
