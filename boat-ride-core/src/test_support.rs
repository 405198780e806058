//! Deterministic adapters and fixtures shared by unit and behaviour tests.

use crate::{
    BoatProfile, EnvAtPoint, EnvProvider, EnvSeries, ProviderError, RoutePoint, SamplePosition,
    TripPlan,
};

/// A two-waypoint, one-hour trip sampled every 15 minutes (five samples).
pub fn sample_plan() -> TripPlan {
    TripPlan::new(
        BoatProfile::default(),
        vec![RoutePoint::new(40.0, -73.0), RoutePoint::new(40.05, -73.0)],
        "2026-01-22 08:00",
        "2026-01-22 09:00",
    )
    .with_trip_id("test-trip")
}

/// Adapter returning a fixed series regardless of the plan.
#[derive(Debug, Clone)]
pub struct FixedProvider {
    name: String,
    series: EnvSeries,
}

impl FixedProvider {
    /// Create an adapter that always returns `series`.
    pub fn new(name: impl Into<String>, series: EnvSeries) -> Self {
        Self {
            name: name.into(),
            series,
        }
    }
}

impl EnvProvider for FixedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_env_series(&self, _plan: &TripPlan) -> Result<EnvSeries, ProviderError> {
        Ok(self.series.clone())
    }
}

type SampleFn = dyn Fn(&SamplePosition) -> EnvAtPoint + Send + Sync;

/// Adapter that builds each sample from its scheduled position.
pub struct PositionProvider {
    name: String,
    sample: Box<SampleFn>,
}

impl std::fmt::Debug for PositionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionProvider")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl PositionProvider {
    /// Create an adapter that maps every position through `sample`.
    pub fn new<F>(name: impl Into<String>, sample: F) -> Self
    where
        F: Fn(&SamplePosition) -> EnvAtPoint + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            sample: Box::new(sample),
        }
    }

    /// Adapter reporting a constant wind at every sample.
    pub fn constant_wind(wind_kt: f64, wind_dir_deg: f64) -> Self {
        Self::new("constant-wind", move |pos| {
            let mut env = EnvAtPoint::empty(pos.t_local, pos.lat, pos.lon);
            env.wind_speed_kt = Some(wind_kt);
            env.wind_dir_deg = Some(wind_dir_deg);
            env.meta.weather_source = Some("constant".to_owned());
            env
        })
    }
}

impl EnvProvider for PositionProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_env_series(&self, plan: &TripPlan) -> Result<EnvSeries, ProviderError> {
        Ok(plan
            .sample_positions()?
            .iter()
            .map(|pos| (self.sample)(pos))
            .collect())
    }
}

/// Adapter that always fails.
#[derive(Debug, Clone)]
pub struct FailingProvider {
    name: String,
    error: ProviderError,
}

impl FailingProvider {
    /// Fail with the supplied error.
    pub fn with_error(name: impl Into<String>, error: ProviderError) -> Self {
        Self {
            name: name.into(),
            error,
        }
    }

    /// Fail with a connection-refused network error.
    pub fn network(name: impl Into<String>) -> Self {
        let name = name.into();
        let error = ProviderError::Network {
            url: format!("http://{name}.invalid/"),
            message: "connection refused".to_owned(),
        };
        Self { name, error }
    }
}

impl EnvProvider for FailingProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_env_series(&self, _plan: &TripPlan) -> Result<EnvSeries, ProviderError> {
        Err(self.error.clone())
    }
}
