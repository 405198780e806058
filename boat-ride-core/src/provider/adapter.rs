//! The adapter trait and the series type it produces.

use crate::{EnvAtPoint, TripPlan};

use super::error::ProviderError;

/// One sample per scheduled time, in schedule order.
pub type EnvSeries = Vec<EnvAtPoint>;

/// A source of environmental samples along a trip.
///
/// Implementations must return exactly one sample per entry of
/// [`TripPlan::sample_positions`], at that entry's time and position.
/// Fields the source cannot supply stay `None`.
///
/// # Examples
///
/// ```rust
/// use boat_ride_core::{EnvAtPoint, EnvProvider, EnvSeries, ProviderError, TripPlan};
///
/// struct Breeze;
///
/// impl EnvProvider for Breeze {
///     fn name(&self) -> &str {
///         "breeze"
///     }
///
///     fn get_env_series(&self, plan: &TripPlan) -> Result<EnvSeries, ProviderError> {
///         Ok(plan
///             .sample_positions()?
///             .into_iter()
///             .map(|pos| {
///                 let mut env = EnvAtPoint::empty(pos.t_local, pos.lat, pos.lon);
///                 env.wind_speed_kt = Some(8.0);
///                 env
///             })
///             .collect())
///     }
/// }
/// ```
pub trait EnvProvider: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Produce a series aligned with the plan's sample schedule.
    fn get_env_series(&self, plan: &TripPlan) -> Result<EnvSeries, ProviderError>;
}

impl<P: EnvProvider + ?Sized> EnvProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn get_env_series(&self, plan: &TripPlan) -> Result<EnvSeries, ProviderError> {
        (**self).get_env_series(plan)
    }
}

/// A series with every measured field unset.
pub fn neutral_series(plan: &TripPlan) -> Result<EnvSeries, ProviderError> {
    Ok(plan
        .sample_positions()?
        .into_iter()
        .map(|pos| EnvAtPoint::empty(pos.t_local, pos.lat, pos.lon))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingProvider, sample_plan};
    use rstest::rstest;

    #[rstest]
    fn neutral_series_follows_the_schedule() {
        let plan = sample_plan();
        let series = neutral_series(&plan).expect("valid plan");
        let times = plan.sample_times().expect("valid plan");
        assert_eq!(series.len(), times.len());
        assert!(series.iter().all(|env| env.wind_speed_kt.is_none()));
    }

    #[rstest]
    fn boxed_provider_delegates() {
        let boxed: Box<dyn EnvProvider> = Box::new(FailingProvider::network("boom"));
        assert_eq!(boxed.name(), "boom");
        assert!(boxed.get_env_series(&sample_plan()).is_err());
    }
}
