//! Vessel characteristics used by the scoring heuristic.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Physical dimensions and comfort limits of a boat.
///
/// `max_safe_wind_kt` and `max_safe_wave_ft` are the points at which the
/// scorer starts reporting conditions as "above comfort limit".
/// `comfort_bias` shifts every score by up to eight points in either
/// direction; positive values describe a more tolerant crew.
///
/// # Examples
///
/// ```
/// use boat_ride_core::BoatProfile;
///
/// let boat = BoatProfile::default();
/// assert_eq!(boat.max_safe_wind_kt, 25.0);
/// assert!(boat.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoatProfile {
    /// Display name.
    pub name: String,
    /// Length overall in feet.
    pub length_ft: f64,
    /// Beam in feet.
    pub beam_ft: f64,
    /// Draft in feet.
    pub draft_ft: f64,
    /// Crew tolerance in `[-1, 1]`.
    pub comfort_bias: f64,
    /// Wind speed (knots) the crew still considers comfortable.
    pub max_safe_wind_kt: f64,
    /// Significant wave height (feet) the crew still considers comfortable.
    pub max_safe_wave_ft: f64,
}

impl Default for BoatProfile {
    fn default() -> Self {
        Self {
            name: "My Boat".to_owned(),
            length_ft: 22.0,
            beam_ft: 8.5,
            draft_ft: 1.5,
            comfort_bias: 0.0,
            max_safe_wind_kt: 25.0,
            max_safe_wave_ft: 4.0,
        }
    }
}

/// Errors returned by [`BoatProfile::validate`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BoatProfileError {
    /// Comfort bias fell outside `[-1, 1]`.
    #[error("comfort bias {value} must be between -1 and 1")]
    ComfortBiasOutOfRange {
        /// Offending value.
        value: f64,
    },
    /// A comfort limit was zero, negative, or not a number.
    #[error("{field} must be a positive number, got {value}")]
    NonPositiveLimit {
        /// Name of the limit.
        field: &'static str,
        /// Offending value.
        value: f64,
    },
}

impl BoatProfile {
    /// Check the invariants the scorer relies on.
    pub fn validate(&self) -> Result<(), BoatProfileError> {
        if !(-1.0..=1.0).contains(&self.comfort_bias) {
            return Err(BoatProfileError::ComfortBiasOutOfRange {
                value: self.comfort_bias,
            });
        }
        for (field, value) in [
            ("max_safe_wind_kt", self.max_safe_wind_kt),
            ("max_safe_wave_ft", self.max_safe_wave_ft),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(BoatProfileError::NonPositiveLimit { field, value });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(-1.0)]
    #[case(0.0)]
    #[case(1.0)]
    fn accepts_boundary_bias(#[case] bias: f64) {
        let boat = BoatProfile {
            comfort_bias: bias,
            ..BoatProfile::default()
        };
        assert!(boat.validate().is_ok());
    }

    #[rstest]
    #[case(-1.1)]
    #[case(1.5)]
    fn rejects_out_of_range_bias(#[case] bias: f64) {
        let boat = BoatProfile {
            comfort_bias: bias,
            ..BoatProfile::default()
        };
        assert!(matches!(
            boat.validate(),
            Err(BoatProfileError::ComfortBiasOutOfRange { .. })
        ));
    }

    #[rstest]
    fn rejects_zero_wind_limit() {
        let boat = BoatProfile {
            max_safe_wind_kt: 0.0,
            ..BoatProfile::default()
        };
        let err = boat.validate().expect_err("zero limit should fail");
        assert!(matches!(
            err,
            BoatProfileError::NonPositiveLimit {
                field: "max_safe_wind_kt",
                ..
            }
        ));
    }

    #[rstest]
    fn partial_json_uses_defaults() {
        let boat: BoatProfile =
            serde_json::from_str(r#"{"max_safe_wind_kt": 18}"#).expect("valid profile JSON");
        assert_eq!(boat.max_safe_wind_kt, 18.0);
        assert_eq!(boat.max_safe_wave_ft, 4.0);
    }
}
