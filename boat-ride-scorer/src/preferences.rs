//! Per-user adjustments to the comfort heuristic.
//!
//! [`ScoringPreferences`] scales individual penalty terms and shifts the
//! final score. [`ScoringPreferences::nudge`] learns from a rating the rider
//! gives a scored sample: when the rating disagrees with the score, the
//! multipliers of the conditions that were present move one small step, or
//! the overall offset moves when no condition stood out.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Smallest allowed multiplier.
pub const MULTIPLIER_MIN: f64 = 0.2;
/// Largest allowed multiplier.
pub const MULTIPLIER_MAX: f64 = 3.0;
/// Smallest allowed overall offset.
pub const OFFSET_MIN: f64 = -20.0;
/// Largest allowed overall offset.
pub const OFFSET_MAX: f64 = 20.0;
/// Multiplier change per disagreeing rating.
pub const NUDGE_STEP: f64 = 0.03;
/// Offset change per disagreeing rating.
pub const OFFSET_STEP: f64 = 1.0;
/// Ratings whose implied score is this close to the original are ignored.
pub const ALIGNED_WITHIN: f64 = 5.0;

/// A group of penalty terms sharing one multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Factor {
    /// Sustained wind, gusts and wind against waves.
    Wind,
    /// Wave height.
    Wave,
    /// Short wave period.
    Period,
    /// Wave steepness.
    Chop,
    /// Precipitation.
    Precip,
    /// Tidal flow and wind against tidal flow.
    Tide,
}

impl Factor {
    /// Every factor, in field order.
    pub const ALL: [Self; 6] = [
        Self::Wind,
        Self::Wave,
        Self::Period,
        Self::Chop,
        Self::Precip,
        Self::Tide,
    ];

    /// Name of the multiplier field for this factor.
    #[must_use]
    pub const fn field_name(self) -> &'static str {
        match self {
            Self::Wind => "wind_multiplier",
            Self::Wave => "wave_multiplier",
            Self::Period => "period_multiplier",
            Self::Chop => "chop_multiplier",
            Self::Precip => "precip_multiplier",
            Self::Tide => "tide_multiplier",
        }
    }
}

/// Snapshot keys that mark a factor as present, with the magnitude the
/// value must exceed.
const CONDITION_FACTORS: [(&str, Factor, f64); 8] = [
    ("wind_kt", Factor::Wind, 5.0),
    ("wind_gust_kt", Factor::Wind, 10.0),
    ("wave_ft", Factor::Wave, 0.5),
    ("wave_period_s", Factor::Period, 0.0),
    ("wave_steepness", Factor::Chop, 0.015),
    ("pop", Factor::Precip, 0.1),
    ("tide_rate_ft_per_hr", Factor::Tide, 0.3),
    ("tide_ft", Factor::Tide, 0.0),
];

/// A preference changed by [`ScoringPreferences::nudge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreferenceField {
    /// The multiplier for one factor.
    Multiplier(Factor),
    /// The overall offset.
    OverallOffset,
}

impl PreferenceField {
    /// Field name as stored.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Multiplier(factor) => factor.field_name(),
            Self::OverallOffset => "overall_offset",
        }
    }
}

impl fmt::Display for PreferenceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by [`ScoringPreferences::nudge`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeedbackError {
    /// Ratings run from 1 to 5.
    #[error("rating {rating} is outside 1..=5")]
    InvalidRating {
        /// Rating supplied.
        rating: u8,
    },
    /// The rated score was not a valid comfort score.
    #[error("original score {score} is outside 0..=100")]
    ScoreOutOfRange {
        /// Score supplied.
        score: f64,
    },
}

/// A rider's verdict on one scored sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringFeedback {
    /// Score the engine reported.
    pub original_score: f64,
    /// Rider's rating from 1 (awful) to 5 (perfect).
    pub user_rating: u8,
    /// Conditions at the time, keyed as in [`RideScore::detail`](boat_ride_core::RideScore).
    #[serde(default)]
    pub conditions_snapshot: BTreeMap<String, Value>,
}

impl ScoringFeedback {
    /// Feedback without a conditions snapshot.
    #[must_use]
    pub const fn new(original_score: f64, user_rating: u8) -> Self {
        Self {
            original_score,
            user_rating,
            conditions_snapshot: BTreeMap::new(),
        }
    }

    /// Attach the conditions the rating refers to.
    #[must_use]
    pub fn with_conditions(mut self, conditions: BTreeMap<String, Value>) -> Self {
        self.conditions_snapshot = conditions;
        self
    }
}

/// Score implied by a 1-5 rating.
#[must_use]
pub const fn implied_score(rating: u8) -> Option<f64> {
    match rating {
        1 => Some(10.0),
        2 => Some(35.0),
        3 => Some(60.0),
        4 => Some(80.0),
        5 => Some(95.0),
        _ => None,
    }
}

/// Multipliers for each penalty factor plus an additive offset.
///
/// Multipliers stay within [`MULTIPLIER_MIN`]..=[`MULTIPLIER_MAX`] and the
/// offset within [`OFFSET_MIN`]..=[`OFFSET_MAX`]; the setters clamp and the
/// scorer clamps again before use.
///
/// # Examples
///
/// ```
/// use boat_ride_scorer::{Factor, ScoringPreferences};
///
/// let prefs = ScoringPreferences::new()
///     .with_multiplier(Factor::Wind, 5.0)
///     .with_overall_offset(-3.0);
/// assert_eq!(prefs.multiplier(Factor::Wind), 3.0);
/// assert_eq!(prefs.overall_offset, -3.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPreferences {
    /// Scales wind, gust and wind-against-waves penalties.
    pub wind_multiplier: f64,
    /// Scales the wave height penalty.
    pub wave_multiplier: f64,
    /// Scales the short period penalty.
    pub period_multiplier: f64,
    /// Scales the steepness penalty.
    pub chop_multiplier: f64,
    /// Scales the precipitation penalty.
    pub precip_multiplier: f64,
    /// Scales the tidal flow penalties.
    pub tide_multiplier: f64,
    /// Added to the clamped score.
    pub overall_offset: f64,
}

impl Default for ScoringPreferences {
    fn default() -> Self {
        Self {
            wind_multiplier: 1.0,
            wave_multiplier: 1.0,
            period_multiplier: 1.0,
            chop_multiplier: 1.0,
            precip_multiplier: 1.0,
            tide_multiplier: 1.0,
            overall_offset: 0.0,
        }
    }
}

impl ScoringPreferences {
    /// Neutral preferences.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Multiplier for `factor`.
    #[must_use]
    pub const fn multiplier(&self, factor: Factor) -> f64 {
        match factor {
            Factor::Wind => self.wind_multiplier,
            Factor::Wave => self.wave_multiplier,
            Factor::Period => self.period_multiplier,
            Factor::Chop => self.chop_multiplier,
            Factor::Precip => self.precip_multiplier,
            Factor::Tide => self.tide_multiplier,
        }
    }

    const fn multiplier_mut(&mut self, factor: Factor) -> &mut f64 {
        match factor {
            Factor::Wind => &mut self.wind_multiplier,
            Factor::Wave => &mut self.wave_multiplier,
            Factor::Period => &mut self.period_multiplier,
            Factor::Chop => &mut self.chop_multiplier,
            Factor::Precip => &mut self.precip_multiplier,
            Factor::Tide => &mut self.tide_multiplier,
        }
    }

    /// Set the multiplier for `factor`, clamped to the allowed range.
    #[must_use]
    pub fn with_multiplier(mut self, factor: Factor, value: f64) -> Self {
        *self.multiplier_mut(factor) = value.clamp(MULTIPLIER_MIN, MULTIPLIER_MAX);
        self
    }

    /// Set the overall offset, clamped to the allowed range.
    #[must_use]
    pub fn with_overall_offset(mut self, offset: f64) -> Self {
        self.overall_offset = offset.clamp(OFFSET_MIN, OFFSET_MAX);
        self
    }

    /// Copy with every value forced into its allowed range.
    #[must_use]
    pub fn clamped(&self) -> Self {
        Factor::ALL
            .into_iter()
            .fold(*self, |prefs, factor| {
                prefs.with_multiplier(factor, prefs.multiplier(factor))
            })
            .with_overall_offset(self.overall_offset)
    }

    /// Adjust the preferences towards a rider's rating.
    ///
    /// A rating implying a score within [`ALIGNED_WITHIN`] points of the
    /// original changes nothing. Otherwise every factor present in the
    /// snapshot has its multiplier moved by [`NUDGE_STEP`]: down when the
    /// rider liked the ride more than the score suggested, up when less.
    /// With no factor present the offset moves by [`OFFSET_STEP`] instead.
    ///
    /// Returns the fields that changed, in field order.
    ///
    /// # Errors
    ///
    /// Returns [`FeedbackError`] for a rating outside 1-5 or a score
    /// outside 0-100.
    ///
    /// # Examples
    ///
    /// ```
    /// use boat_ride_scorer::{PreferenceField, ScoringFeedback, ScoringPreferences};
    ///
    /// let mut prefs = ScoringPreferences::new();
    /// let changed = prefs.nudge(&ScoringFeedback::new(50.0, 5))?;
    /// assert_eq!(changed, [PreferenceField::OverallOffset]);
    /// assert_eq!(prefs.overall_offset, 1.0);
    /// # Ok::<(), boat_ride_scorer::FeedbackError>(())
    /// ```
    #[expect(
        clippy::float_arithmetic,
        reason = "nudging moves multipliers by fractional steps"
    )]
    pub fn nudge(
        &mut self,
        feedback: &ScoringFeedback,
    ) -> Result<Vec<PreferenceField>, FeedbackError> {
        let implied = implied_score(feedback.user_rating).ok_or(FeedbackError::InvalidRating {
            rating: feedback.user_rating,
        })?;
        if !(0.0..=100.0).contains(&feedback.original_score) {
            return Err(FeedbackError::ScoreOutOfRange {
                score: feedback.original_score,
            });
        }

        let mismatch = implied - feedback.original_score;
        if mismatch.abs() < ALIGNED_WITHIN {
            debug!("rating agrees with score (mismatch {mismatch:+.0}); no nudge");
            return Ok(Vec::new());
        }
        let direction = if mismatch > 0.0 { 1.0 } else { -1.0 };

        let active = active_factors(&feedback.conditions_snapshot);
        let mut changed = Vec::new();
        if active.is_empty() {
            let before = self.overall_offset;
            self.overall_offset = (before + OFFSET_STEP * direction).clamp(OFFSET_MIN, OFFSET_MAX);
            if (self.overall_offset - before).abs() > f64::EPSILON {
                changed.push(PreferenceField::OverallOffset);
            }
        } else {
            for factor in active {
                let slot = self.multiplier_mut(factor);
                let before = *slot;
                *slot = (before - NUDGE_STEP * direction).clamp(MULTIPLIER_MIN, MULTIPLIER_MAX);
                if (*slot - before).abs() > f64::EPSILON {
                    changed.push(PreferenceField::Multiplier(factor));
                }
            }
        }
        debug!(
            "nudged {} preference(s) (mismatch {mismatch:+.0})",
            changed.len()
        );
        Ok(changed)
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Factors whose conditions were significant, in field order.
fn active_factors(snapshot: &BTreeMap<String, Value>) -> Vec<Factor> {
    Factor::ALL
        .into_iter()
        .filter(|factor| {
            CONDITION_FACTORS.iter().any(|(key, owner, threshold)| {
                owner == factor
                    && snapshot
                        .get(*key)
                        .and_then(as_number)
                        .is_some_and(|v| v.abs() > *threshold)
            })
        })
        .collect()
}
