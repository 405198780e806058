//! Fetch-limited wave growth for sheltered water.
//!
//! An engineered approximation in the shape of the SMB/JONSWAP growth
//! curves, with a coarse shallow-water cap. It is tuned to give plausible
//! chop on rivers and bays when no wave observation exists. It is not a
//! validated physical model and should not be read as a forecast.
//!
//! # Examples
//! ```
//! use boat_ride_core::waves::{InlandWaveInputs, compute_inland_waves};
//!
//! let (height_ft, period_s) =
//!     compute_inland_waves(InlandWaveInputs::new(20.0, 2.0)).expect("finite inputs");
//! assert!(height_ft > 0.0 && height_ft <= 6.0);
//! assert!(period_s >= 2.4 && period_s <= 8.5);
//! ```

use thiserror::Error;

const GRAVITY: f64 = 9.81;
const KT_TO_MPS: f64 = 0.514_444;
const NM_TO_M: f64 = 1852.0;
const M_TO_FT: f64 = 3.28084;

const MIN_FETCH_NM: f64 = 0.05;
const MAX_FETCH_NM: f64 = 25.0;
const MAX_HEIGHT_FT: f64 = 6.0;
const MAX_PERIOD_S: f64 = 8.5;

/// Inputs to [`compute_inland_waves`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InlandWaveInputs {
    /// Sustained wind in knots.
    pub wind_kt: f64,
    /// Fetch in nautical miles.
    pub fetch_nm: f64,
    /// Water depth in metres, when known.
    pub depth_m: Option<f64>,
}

impl InlandWaveInputs {
    /// Inputs for deep or unknown-depth water.
    pub fn new(wind_kt: f64, fetch_nm: f64) -> Self {
        Self {
            wind_kt,
            fetch_nm,
            depth_m: None,
        }
    }

    /// Limit growth by water depth.
    #[must_use]
    pub fn with_depth_m(mut self, depth_m: Option<f64>) -> Self {
        self.depth_m = depth_m;
        self
    }
}

/// Errors from [`compute_inland_waves`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WaveModelError {
    /// An input was NaN or infinite.
    #[error("{field} must be finite, got {value}")]
    NonFinite {
        /// Offending input.
        field: &'static str,
        /// Offending value.
        value: f64,
    },
}

fn finite(field: &'static str, value: f64) -> Result<f64, WaveModelError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(WaveModelError::NonFinite { field, value })
    }
}

/// Estimate significant wave height (ft) and peak period (s).
///
/// Calm wind or zero fetch yields `(0, 0)`. Depth at or below zero is
/// treated as unknown.
pub fn compute_inland_waves(inputs: InlandWaveInputs) -> Result<(f64, f64), WaveModelError> {
    let wind_kt = finite("wind_kt", inputs.wind_kt)?;
    let fetch_nm = finite("fetch_nm", inputs.fetch_nm)?;
    let depth_m = inputs
        .depth_m
        .map(|d| finite("depth_m", d))
        .transpose()?
        .filter(|&d| d > 0.0);

    if wind_kt <= 0.0 || fetch_nm <= 0.0 {
        return Ok((0.0, 0.0));
    }

    let fetch_nm = fetch_nm.clamp(MIN_FETCH_NM, MAX_FETCH_NM);
    let u = wind_kt * KT_TO_MPS;
    let f = fetch_nm * NM_TO_M;
    let x = GRAVITY * f / (u * u).max(1e-9);

    let mut hs_m = (u * u / GRAVITY) * 0.283 * (0.0125 * x.powf(0.42)).tanh();
    let mut tp_s = (u / GRAVITY) * 7.54 * (0.077 * x.powf(0.25)).tanh();

    if let Some(depth) = depth_m {
        hs_m = hs_m.min(0.6 * depth);
        tp_s *= (depth / 20.0).powf(0.25).min(1.0);
    }

    let height_ft = (hs_m * M_TO_FT).clamp(0.0, MAX_HEIGHT_FT);
    let min_period = 2.0 + 0.2 * fetch_nm;
    let period_s = tp_s.min(MAX_PERIOD_S).max(min_period);
    Ok((height_ft, period_s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 5.0)]
    #[case(-3.0, 5.0)]
    #[case(15.0, 0.0)]
    #[case(15.0, -1.0)]
    fn calm_or_no_fetch_is_flat(#[case] wind: f64, #[case] fetch: f64) {
        assert_eq!(
            compute_inland_waves(InlandWaveInputs::new(wind, fetch)),
            Ok((0.0, 0.0))
        );
    }

    #[rstest]
    fn moderate_breeze_over_two_miles() {
        let (h, t) = compute_inland_waves(InlandWaveInputs::new(20.0, 2.0)).expect("finite inputs");
        assert!(h > 0.0 && h <= 6.0, "height {h}");
        assert!((2.4..=8.5).contains(&t), "period {t}");
    }

    #[rstest]
    fn height_grows_with_wind() {
        let light = compute_inland_waves(InlandWaveInputs::new(8.0, 3.0)).expect("finite inputs");
        let strong = compute_inland_waves(InlandWaveInputs::new(25.0, 3.0)).expect("finite inputs");
        assert!(strong.0 > light.0);
    }

    #[rstest]
    fn shallow_water_caps_height_and_period() {
        let deep = compute_inland_waves(InlandWaveInputs::new(30.0, 10.0)).expect("finite inputs");
        let shallow = compute_inland_waves(InlandWaveInputs::new(30.0, 10.0).with_depth_m(Some(0.5)))
            .expect("finite inputs");
        assert!(shallow.0 <= 0.6 * 0.5 * M_TO_FT + 1e-9);
        assert!(shallow.0 < deep.0);
        assert!(shallow.1 <= deep.1);
    }

    #[rstest]
    fn non_positive_depth_is_ignored() {
        let deep = compute_inland_waves(InlandWaveInputs::new(18.0, 4.0)).expect("finite inputs");
        let zero = compute_inland_waves(InlandWaveInputs::new(18.0, 4.0).with_depth_m(Some(0.0)))
            .expect("finite inputs");
        assert_eq!(deep, zero);
    }

    #[rstest]
    fn huge_fetch_is_clamped() {
        let capped = compute_inland_waves(InlandWaveInputs::new(20.0, 25.0)).expect("finite inputs");
        let huge = compute_inland_waves(InlandWaveInputs::new(20.0, 500.0)).expect("finite inputs");
        assert_eq!(capped, huge);
    }

    #[rstest]
    fn nan_wind_is_rejected() {
        let err = compute_inland_waves(InlandWaveInputs::new(f64::NAN, 1.0))
            .expect_err("NaN should be rejected");
        assert!(matches!(err, WaveModelError::NonFinite { field: "wind_kt", .. }));
    }
}
