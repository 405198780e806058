//! Tolerate the total failure of one adapter.
//!
//! [`FallbackProvider`] wraps an adapter and, when it fails, substitutes a
//! neutral series with every measured field unset. The chain itself never
//! does this; callers opt in per adapter.

use log::warn;

use crate::provider::neutral_series;
use crate::{EnvProvider, EnvSeries, ProviderError, TripPlan};

/// Provenance key naming the adapter a neutral series stands in for.
pub const FALLBACK_NOTE_KEY: &str = "fallback_note";

/// Adapter wrapper that swallows failures.
///
/// # Examples
///
/// ```
/// use boat_ride_core::{EnvProvider, FallbackProvider};
/// use boat_ride_core::test_support::{FailingProvider, sample_plan};
///
/// let tolerant = FallbackProvider::new(FailingProvider::network("nws"));
/// let series = tolerant.get_env_series(&sample_plan())?;
/// assert!(series.iter().all(|env| env.wind_speed_kt.is_none()));
/// # Ok::<(), boat_ride_core::ProviderError>(())
/// ```
#[derive(Debug)]
pub struct FallbackProvider<P> {
    inner: P,
}

impl<P: EnvProvider> FallbackProvider<P> {
    /// Wrap `inner`.
    pub fn new(inner: P) -> Self {
        Self { inner }
    }

    /// The wrapped adapter.
    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: EnvProvider> EnvProvider for FallbackProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    /// Returns the wrapped adapter's series, or a neutral one on failure.
    ///
    /// An invalid plan still fails: there is no schedule to fill.
    fn get_env_series(&self, plan: &TripPlan) -> Result<EnvSeries, ProviderError> {
        match self.inner.get_env_series(plan) {
            Ok(series) => Ok(series),
            Err(err) => {
                warn!(
                    "provider {} failed, substituting neutral series: {err}",
                    self.inner.name()
                );
                let mut series = neutral_series(plan)?;
                let note = format!("{} unavailable: {err}", self.inner.name());
                for env in &mut series {
                    env.meta.note(FALLBACK_NOTE_KEY, note.clone());
                }
                Ok(series)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingProvider, PositionProvider, sample_plan};
    use rstest::rstest;

    #[rstest]
    fn passes_through_success() {
        let tolerant = FallbackProvider::new(PositionProvider::constant_wind(9.0, 180.0));
        let series = tolerant
            .get_env_series(&sample_plan())
            .expect("inner adapter succeeds");
        assert!(series.iter().all(|env| env.wind_speed_kt == Some(9.0)));
        assert!(series.iter().all(|env| env.meta.provenance.is_empty()));
    }

    #[rstest]
    fn substitutes_neutral_series_on_failure() {
        let plan = sample_plan();
        let tolerant = FallbackProvider::new(FailingProvider::network("ndbc"));
        let series = tolerant.get_env_series(&plan).expect("fallback succeeds");
        let positions = plan.sample_positions().expect("valid plan");

        assert_eq!(series.len(), positions.len());
        for (env, pos) in series.iter().zip(&positions) {
            assert_eq!(env.t_local, pos.t_local);
            assert_eq!(env.wave_height_ft, None);
            let note = env
                .meta
                .provenance
                .get(FALLBACK_NOTE_KEY)
                .and_then(|v| v.as_str())
                .expect("fallback note");
            assert!(note.starts_with("ndbc unavailable"));
        }
    }

    #[rstest]
    fn invalid_plan_still_fails() {
        let mut plan = sample_plan();
        plan.route.clear();
        let tolerant = FallbackProvider::new(FailingProvider::network("nws"));
        assert!(tolerant.get_env_series(&plan).is_err());
    }
}
