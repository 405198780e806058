//! Ordered fusion of adapter series.
//!
//! A [`ProviderChain`] runs its adapters in order and folds each new series
//! onto the running result, sample by sample. Later adapters take
//! precedence for any field they set. Two corrections ride along with the
//! overlay:
//!
//! - a distant offshore buoy is not allowed to dictate wave height in
//!   sheltered water (small fetch), so its wave fields are suppressed;
//! - a sample that ends up with wind and fetch but no waves gets a
//!   synthesised inland chop from [`crate::waves`].
//!
//! Once every adapter has been merged, samples that carry a directional
//! fetch result have their fetch refined for the resolved wind direction.

use log::debug;
use thiserror::Error;

use crate::fetch::effective_fetch;
use crate::waves::{InlandWaveInputs, compute_inland_waves};
use crate::{EnvAtPoint, EnvMetadata, EnvProvider, EnvSeries, ProviderError, TripPlan};

/// Fetch (nm) at or below which water counts as protected.
pub const SUPPRESS_MAX_FETCH_NM: f64 = 2.0;
/// Buoy distance (nm) at or beyond which the buoy counts as remote.
pub const SUPPRESS_MIN_BUOY_DISTANCE_NM: f64 = 10.0;
/// Reason recorded when buoy waves are suppressed.
pub const SUPPRESSION_REASON: &str = "protected_water_small_fetch_and_far_buoy";
/// Method recorded when fetch is refined for wind direction.
pub const EFFECTIVE_FETCH_METHOD: &str = "spm_weighted";

/// Errors from [`ProviderChain::get_env_series`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChainError {
    /// An adapter returned a series of the wrong length.
    #[error("{provider} returned {actual} samples but the running series has {expected}")]
    LengthMismatch {
        /// Adapter that misbehaved.
        provider: String,
        /// Length of the running series.
        expected: usize,
        /// Length the adapter returned.
        actual: usize,
    },
    /// An adapter failed outright.
    #[error("provider {provider} failed")]
    Provider {
        /// Adapter that failed.
        provider: String,
        /// Underlying failure.
        #[source]
        source: ProviderError,
    },
}

/// Ordered list of adapters merged into a single series.
///
/// # Examples
///
/// ```
/// use boat_ride_core::ProviderChain;
/// use boat_ride_core::test_support::{PositionProvider, sample_plan};
///
/// let chain = ProviderChain::new()
///     .with_provider(PositionProvider::constant_wind(12.0, 270.0));
/// let series = chain.get_env_series(&sample_plan())?;
/// assert!(series.iter().all(|env| env.wind_speed_kt == Some(12.0)));
/// # Ok::<(), boat_ride_core::ChainError>(())
/// ```
#[derive(Default)]
pub struct ProviderChain {
    providers: Vec<Box<dyn EnvProvider>>,
}

impl std::fmt::Debug for ProviderChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderChain")
            .field("providers", &self.names())
            .finish()
    }
}

impl ProviderChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a chain from boxed adapters, in precedence order.
    pub fn from_providers(providers: Vec<Box<dyn EnvProvider>>) -> Self {
        Self { providers }
    }

    /// Append an adapter; it overlays every adapter already present.
    #[must_use]
    pub fn with_provider<P>(mut self, provider: P) -> Self
    where
        P: EnvProvider + 'static,
    {
        self.push(Box::new(provider));
        self
    }

    /// Append a boxed adapter.
    pub fn push(&mut self, provider: Box<dyn EnvProvider>) {
        self.providers.push(provider);
    }

    /// Number of adapters.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the chain has no adapters.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Adapter names in precedence order.
    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Run every adapter and merge their series.
    ///
    /// An empty chain yields an empty series. The first failure or length
    /// mismatch aborts the run.
    pub fn get_env_series(&self, plan: &TripPlan) -> Result<EnvSeries, ChainError> {
        let mut providers = self.providers.iter();
        let Some(first) = providers.next() else {
            return Ok(Vec::new());
        };
        let mut series = run_provider(first.as_ref(), plan)?;

        for provider in providers {
            let overlay = run_provider(provider.as_ref(), plan)?;
            if overlay.len() != series.len() {
                return Err(ChainError::LengthMismatch {
                    provider: provider.name().to_owned(),
                    expected: series.len(),
                    actual: overlay.len(),
                });
            }
            series = series
                .into_iter()
                .zip(overlay.iter())
                .map(|(base, over)| merge_sample(base, over))
                .collect();
        }

        apply_effective_fetch(&mut series);
        Ok(series)
    }
}

fn run_provider(provider: &dyn EnvProvider, plan: &TripPlan) -> Result<EnvSeries, ChainError> {
    debug!("running provider {}", provider.name());
    provider
        .get_env_series(plan)
        .map_err(|source| ChainError::Provider {
            provider: provider.name().to_owned(),
            source,
        })
}

/// Whether buoy waves should be dropped for this pair of samples.
///
/// `fetch_nm` and `ndbc_distance_nm` are read from the overlay first and
/// then the base, so the decision does not depend on adapter order.
pub fn should_suppress_buoy_waves(base: &EnvMetadata, overlay: &EnvMetadata) -> bool {
    let fetch_nm = overlay.fetch_nm.or(base.fetch_nm);
    let distance_nm = overlay.ndbc_distance_nm.or(base.ndbc_distance_nm);
    match (fetch_nm, distance_nm) {
        (Some(fetch), Some(distance)) => {
            fetch <= SUPPRESS_MAX_FETCH_NM && distance >= SUPPRESS_MIN_BUOY_DISTANCE_NM
        }
        _ => false,
    }
}

/// Merge `overlay` onto `base` for one sample.
pub fn merge_sample(mut base: EnvAtPoint, overlay: &EnvAtPoint) -> EnvAtPoint {
    let suppress = should_suppress_buoy_waves(&base.meta, &overlay.meta);
    if suppress {
        debug!(
            "suppressing buoy waves at {} ({}, {})",
            base.t_local, base.lat, base.lon
        );
        base.clear_waves();
    }

    base.overlay_fields(overlay);
    if suppress {
        base.clear_waves();
    }

    base.meta.overlay(&overlay.meta);
    if suppress {
        base.meta.ndbc_suppressed = Some(true);
        base.meta.ndbc_suppressed_reason = Some(SUPPRESSION_REASON.to_owned());
    }

    fill_inland_waves(&mut base);
    base
}

fn fill_inland_waves(env: &mut EnvAtPoint) {
    if env.wave_height_ft.is_some() {
        return;
    }
    let (Some(wind_kt), Some(fetch_nm)) = (env.wind_speed_kt, env.meta.fetch_nm) else {
        return;
    };
    let inputs = InlandWaveInputs::new(wind_kt, fetch_nm).with_depth_m(env.meta.depth_m);
    match compute_inland_waves(inputs) {
        Ok((height_ft, period_s)) => {
            env.wave_height_ft = Some(height_ft);
            env.wave_period_s = Some(period_s);
            env.meta.waves_source = Some("fetch".to_owned());
            env.meta.wave_source_note = Some(format!("fetch_chop({fetch_nm}nm)"));
        }
        Err(err) => {
            env.meta.fetch_chop_error = Some(err.to_string());
        }
    }
}

/// Refine `fetch_nm` for the resolved wind direction where possible.
pub fn apply_effective_fetch(series: &mut [EnvAtPoint]) {
    for env in series {
        let (Some(result), Some(wind_dir)) = (env.meta.fetch_result.as_deref(), env.wind_dir_deg)
        else {
            continue;
        };
        env.meta.fetch_nm = Some(effective_fetch(result, wind_dir));
        env.meta.fetch_effective_method = Some(EFFECTIVE_FETCH_METHOD.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FetchResult;
    use crate::test_support::{FailingProvider, FixedProvider, PositionProvider, sample_plan};
    use chrono::NaiveDateTime;
    use rstest::{fixture, rstest};
    use std::sync::Arc;

    #[fixture]
    fn t0() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2026, 1, 22)
            .and_then(|d| d.and_hms_opt(8, 0, 0))
            .expect("valid timestamp")
    }

    fn buoy(t: NaiveDateTime, distance_nm: f64) -> EnvAtPoint {
        let mut env = EnvAtPoint::empty(t, 40.0, -73.0);
        env.wave_height_ft = Some(5.0);
        env.wave_period_s = Some(9.0);
        env.wave_dir_deg = Some(120.0);
        env.meta.ndbc_distance_nm = Some(distance_nm);
        env.meta.waves_source = Some("ndbc".to_owned());
        env
    }

    fn fetch_sample(t: NaiveDateTime, fetch_nm: f64) -> EnvAtPoint {
        let mut env = EnvAtPoint::empty(t, 40.0, -73.0);
        env.meta.fetch_nm = Some(fetch_nm);
        env
    }

    #[rstest]
    #[case(2.0, 10.0, true)]
    #[case(1.0, 45.0, true)]
    #[case(2.01, 45.0, false)]
    #[case(1.0, 9.99, false)]
    fn suppression_gate(
        #[case] fetch: f64,
        #[case] distance: f64,
        #[case] expected: bool,
    ) {
        let base = EnvMetadata {
            fetch_nm: Some(fetch),
            ..EnvMetadata::default()
        };
        let overlay = EnvMetadata {
            ndbc_distance_nm: Some(distance),
            ..EnvMetadata::default()
        };
        assert_eq!(should_suppress_buoy_waves(&base, &overlay), expected);
        assert_eq!(should_suppress_buoy_waves(&overlay, &base), expected);
    }

    #[rstest]
    fn gate_needs_both_keys() {
        let only_fetch = EnvMetadata {
            fetch_nm: Some(0.5),
            ..EnvMetadata::default()
        };
        assert!(!should_suppress_buoy_waves(&only_fetch, &EnvMetadata::default()));
    }

    #[rstest]
    fn far_buoy_over_small_fetch_is_replaced_by_chop(t0: NaiveDateTime) {
        let mut base = fetch_sample(t0, 1.0);
        base.wind_speed_kt = Some(15.0);
        let merged = merge_sample(base, &buoy(t0, 30.0));

        assert_eq!(merged.meta.ndbc_suppressed, Some(true));
        assert_eq!(
            merged.meta.ndbc_suppressed_reason.as_deref(),
            Some(SUPPRESSION_REASON)
        );
        assert_eq!(merged.meta.waves_source.as_deref(), Some("fetch"));
        let height = merged.wave_height_ft.expect("synthesised height");
        assert!(height < 5.0);
        assert_eq!(merged.wave_dir_deg, None);
    }

    #[rstest]
    fn suppression_holds_in_either_order(t0: NaiveDateTime) {
        let merged = merge_sample(buoy(t0, 30.0), &fetch_sample(t0, 1.5));
        assert_eq!(merged.wave_height_ft, None);
        assert_eq!(merged.meta.ndbc_suppressed, Some(true));
    }

    #[rstest]
    fn near_buoy_keeps_its_waves(t0: NaiveDateTime) {
        let merged = merge_sample(fetch_sample(t0, 1.0), &buoy(t0, 4.0));
        assert_eq!(merged.wave_height_ft, Some(5.0));
        assert_eq!(merged.meta.ndbc_suppressed, None);
        assert_eq!(merged.meta.waves_source.as_deref(), Some("ndbc"));
    }

    #[rstest]
    fn overlay_wins_only_where_set(t0: NaiveDateTime) {
        let mut base = EnvAtPoint::empty(t0, 40.0, -73.0);
        base.wind_speed_kt = Some(10.0);
        base.precip_prob = Some(0.2);
        let mut over = EnvAtPoint::empty(t0, 40.0, -73.0);
        over.wind_speed_kt = Some(14.0);

        let merged = merge_sample(base, &over);
        assert_eq!(merged.wind_speed_kt, Some(14.0));
        assert_eq!(merged.precip_prob, Some(0.2));
    }

    #[rstest]
    fn chop_is_not_synthesised_without_wind(t0: NaiveDateTime) {
        let merged = merge_sample(fetch_sample(t0, 1.0), &EnvAtPoint::empty(t0, 40.0, -73.0));
        assert_eq!(merged.wave_height_ft, None);
        assert_eq!(merged.meta.waves_source, None);
    }

    #[rstest]
    fn chop_failure_is_recorded(t0: NaiveDateTime) {
        let mut base = fetch_sample(t0, f64::NAN);
        base.wind_speed_kt = Some(10.0);
        let merged = merge_sample(base, &EnvAtPoint::empty(t0, 40.0, -73.0));
        assert_eq!(merged.wave_height_ft, None);
        assert!(merged.meta.fetch_chop_error.is_some());
    }

    #[rstest]
    fn empty_chain_yields_empty_series() {
        let series = ProviderChain::new()
            .get_env_series(&sample_plan())
            .expect("empty chain succeeds");
        assert!(series.is_empty());
    }

    #[rstest]
    fn length_mismatch_aborts() {
        let chain = ProviderChain::new()
            .with_provider(PositionProvider::constant_wind(10.0, 0.0))
            .with_provider(FixedProvider::new("short", Vec::new()));
        let err = chain
            .get_env_series(&sample_plan())
            .expect_err("mismatch should fail");
        assert_eq!(
            err,
            ChainError::LengthMismatch {
                provider: "short".to_owned(),
                expected: 5,
                actual: 0,
            }
        );
    }

    #[rstest]
    fn adapter_errors_propagate() {
        let chain = ProviderChain::new()
            .with_provider(PositionProvider::constant_wind(10.0, 0.0))
            .with_provider(FailingProvider::network("nws"));
        let err = chain
            .get_env_series(&sample_plan())
            .expect_err("failure should propagate");
        assert!(matches!(
            err,
            ChainError::Provider { ref provider, source: ProviderError::Network { .. } }
                if provider == "nws"
        ));
    }

    #[rstest]
    fn single_adapter_only_gets_effective_fetch() {
        let result = Arc::new(FetchResult::from_directions(
            (0..16).map(|i| (f64::from(i) * 22.5, if i == 4 { 12.0 } else { 1.0 })),
        ));
        let provider = PositionProvider::new("fetch+wind", move |pos| {
            let mut env = EnvAtPoint::empty(pos.t_local, pos.lat, pos.lon);
            env.wind_speed_kt = Some(10.0);
            env.wind_dir_deg = Some(90.0);
            env.meta.fetch_nm = Some(1.0);
            env.meta.fetch_result = Some(Arc::clone(&result));
            env
        });
        let series = ProviderChain::new()
            .with_provider(provider)
            .get_env_series(&sample_plan())
            .expect("single adapter succeeds");

        for env in &series {
            assert_eq!(env.wave_height_ft, None, "no gap-fill for one adapter");
            assert_eq!(
                env.meta.fetch_effective_method.as_deref(),
                Some(EFFECTIVE_FETCH_METHOD)
            );
            assert!(env.meta.fetch_nm.is_some_and(|f| f > 1.0));
        }
    }
}
