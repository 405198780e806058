//! Deterministic synthetic conditions for offline runs.
//!
//! Conditions follow one sine cycle over the trip window, nudged by a
//! position-dependent term so that samples along the route differ.

use std::f64::consts::TAU;

use boat_ride_core::{EnvAtPoint, EnvProvider, EnvSeries, ProviderError, TripPlan};

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10_f64.powi(decimals);
    (value * scale).round() / scale
}

/// The `mock` adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockProvider;

impl MockProvider {
    /// Create the adapter.
    pub fn new() -> Self {
        Self
    }
}

impl EnvProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn get_env_series(&self, plan: &TripPlan) -> Result<EnvSeries, ProviderError> {
        let positions = plan.sample_positions()?;
        let start = plan.start()?;
        let window_s = ((plan.end()? - start).num_seconds() as f64).max(1.0);

        Ok(positions
            .iter()
            .map(|pos| {
                let phase = (pos.t_local - start).num_seconds() as f64 / window_s;
                let wiggle = (phase * TAU).sin();
                let geo = ((pos.lat + pos.lon) * 10.0).sin();

                let wind = 10.0 + 8.0 * wiggle.max(0.0) + 2.0 * geo;
                let gust = wind + 5.0 + 2.0 * (-wiggle).max(0.0);
                let waves = 1.0 + 1.5 * wiggle.max(0.0) + 0.5 * geo.abs();
                let period = 6.0 + 2.0 * (1.0 - phase);
                let precip = (0.15 + 0.35 * (-wiggle).max(0.0)).clamp(0.0, 1.0);
                let tide = 1.5 * (phase * TAU).sin();
                let current = 0.5 + 0.6 * (phase * TAU).cos().abs();

                let mut env = EnvAtPoint::empty(pos.t_local, pos.lat, pos.lon);
                env.wind_speed_kt = Some(round_to(wind, 2));
                env.wind_gust_kt = Some(round_to(gust, 2));
                env.wind_dir_deg = Some(round_to((220.0 + 40.0 * wiggle).rem_euclid(360.0), 1));
                env.wave_height_ft = Some(round_to(waves, 2));
                env.wave_period_s = Some(round_to(period, 2));
                env.wave_dir_deg = Some(round_to((200.0 + 30.0 * geo).rem_euclid(360.0), 1));
                env.precip_prob = Some(round_to(precip, 3));
                env.tide_ft = Some(round_to(tide, 2));
                env.current_kt = Some(round_to(current, 2));
                env.current_dir_deg = Some(round_to((90.0 + 60.0 * geo).rem_euclid(360.0), 1));
                env.meta.weather_source = Some("mock".to_owned());
                env.meta.waves_source = Some("mock".to_owned());
                env.meta.tide_source = Some("mock".to_owned());
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
    fn series_is_deterministic_and_complete() {
        let plan = sample_plan();
        let first = MockProvider::new().get_env_series(&plan).expect("valid plan");
        let second = MockProvider::new().get_env_series(&plan).expect("valid plan");
        assert_eq!(first, second);
        assert_eq!(first.len(), 5);
        for env in &first {
            assert!(env.wind_speed_kt.is_some_and(|w| (6.0..=20.0).contains(&w)));
            assert!(env.precip_prob.is_some_and(|p| (0.0..=1.0).contains(&p)));
            assert!(env.wind_gust_kt >= env.wind_speed_kt);
        }
    }

    #[rstest]
    fn wind_peaks_a_quarter_of_the_way_through() {
        let series = MockProvider::new()
            .get_env_series(&sample_plan())
            .expect("valid plan");
        let winds: Vec<f64> = series.iter().filter_map(|e| e.wind_speed_kt).collect();
        let peak = winds.iter().copied().fold(f64::MIN, f64::max);
        assert_eq!(winds.get(1).copied(), Some(peak));
    }
}
