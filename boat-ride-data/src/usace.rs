//! USACE river gauges.
//!
//! No gauge feed is wired up yet. The adapter honours the series contract
//! and marks each sample so reports show the layer was requested.

use boat_ride_core::{EnvAtPoint, EnvProvider, EnvSeries, ProviderError, TripPlan};

/// Provenance note attached to every sample.
pub const USACE_NOTE: &str = "gauge feed not wired";

/// The `usace` adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsaceProvider;

impl UsaceProvider {
    /// Create the adapter.
    pub fn new() -> Self {
        Self
    }
}

impl EnvProvider for UsaceProvider {
    fn name(&self) -> &str {
        "usace"
    }

    fn get_env_series(&self, plan: &TripPlan) -> Result<EnvSeries, ProviderError> {
        Ok(plan
            .sample_positions()?
            .iter()
            .map(|pos| {
                let mut env = EnvAtPoint::empty(pos.t_local, pos.lat, pos.lon);
                env.meta.note("water_source", "usace");
                env.meta.note("usace_note", USACE_NOTE);
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
    fn one_marked_sample_per_position() {
        let series = UsaceProvider::new()
            .get_env_series(&sample_plan())
            .expect("valid plan");
        assert_eq!(series.len(), 5);
        assert!(series.iter().all(|env| env.current_kt.is_none()));
        assert!(
            series
                .iter()
                .all(|env| env.meta.provenance.contains_key("usace_note"))
        );
    }
}
