//! Scored samples.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Qualitative comfort band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RideLabel {
    /// 80 and above.
    Great,
    /// 60 to below 80.
    Ok,
    /// 40 to below 60.
    Rough,
    /// Below 40.
    Avoid,
}

impl RideLabel {
    /// Band a score.
    ///
    /// ```
    /// use boat_ride_core::RideLabel;
    ///
    /// assert_eq!(RideLabel::from_score(80.0), RideLabel::Great);
    /// assert_eq!(RideLabel::from_score(79.9), RideLabel::Ok);
    /// assert_eq!(RideLabel::from_score(39.9), RideLabel::Avoid);
    /// ```
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::Great
        } else if score >= 60.0 {
            Self::Ok
        } else if score >= 40.0 {
            Self::Rough
        } else {
            Self::Avoid
        }
    }

    /// Return the label as a lowercase `&str`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Great => "great",
            Self::Ok => "ok",
            Self::Rough => "rough",
            Self::Avoid => "avoid",
        }
    }
}

impl std::fmt::Display for RideLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comfort score for one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideScore {
    /// Local sample time.
    pub t_local: NaiveDateTime,
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
    /// Score in `[0, 100]`, rounded to one decimal.
    pub score_0_100: f64,
    /// Band for [`RideScore::score_0_100`].
    pub label: RideLabel,
    /// Human-readable penalty explanations, in evaluation order.
    #[serde(default)]
    pub reasons: Vec<String>,
    /// Intermediate values and provenance. Unset values are omitted.
    #[serde(default)]
    pub detail: BTreeMap<String, serde_json::Value>,
}
