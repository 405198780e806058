//! The comfort heuristic.
//!
//! A sample starts at 100 points. Each condition that makes a ride less
//! comfortable subtracts a penalty, and conditions that are unknown simply
//! subtract nothing. Penalties grow faster than linearly so that moderate
//! conditions cost little and conditions past the boat's limits dominate.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::f64::consts::PI;

use boat_ride_core::{BoatProfile, EnvAtPoint, EnvMetadata, RideLabel, RideScore, TidePhase};
use serde_json::Value;

use crate::{Factor, ScoringPreferences};

const GRAVITY_M_S2: f64 = 9.81;
const FEET_PER_METRE: f64 = 3.28084;
const COMFORT_BIAS_POINTS: f64 = 8.0;
const DEFAULT_WAVE_SOURCE: &str = "model/obs";

const TIDE_FLOW_MIN_FT_PER_HR: f64 = 1.0;
const TIDE_FLOW_FULL_FT_PER_HR: f64 = 3.0;
const TIDE_WIND_MIN_KT: f64 = 3.0;
const TIDE_WIND_FULL_KT: f64 = 15.0;
const TIDE_WIND_MAX_FETCH_NM: f64 = 12.0;
const TIDE_WIND_MIN_ANGLE_DEG: f64 = 135.0;
const TIDE_WIND_MAX_POINTS: f64 = 4.0;

/// Smallest circular difference between two bearings, in `[0, 180]`.
///
/// ```
/// use boat_ride_scorer::angle_diff_deg;
///
/// assert_eq!(angle_diff_deg(350.0, 10.0), 20.0);
/// assert_eq!(angle_diff_deg(90.0, 270.0), 180.0);
/// ```
#[must_use]
#[expect(clippy::float_arithmetic, reason = "bearing arithmetic")]
pub fn angle_diff_deg(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    if d > 180.0 { 360.0 - d } else { d }
}

/// Estimated direction of tidal flow, using the route heading as a proxy
/// for the channel axis: flood runs along the heading and ebb against it.
/// Slack water, or a missing heading or phase, gives no estimate.
#[must_use]
#[expect(clippy::float_arithmetic, reason = "bearing arithmetic")]
pub fn tide_flow_dir_est(route_heading_deg: Option<f64>, phase: Option<TidePhase>) -> Option<f64> {
    let heading = route_heading_deg?;
    match phase? {
        TidePhase::Flood => Some(heading.rem_euclid(360.0)),
        TidePhase::Ebb => Some((heading + 180.0).rem_euclid(360.0)),
        TidePhase::Slack => None,
    }
}

/// Deep-water wavelength `g T² / 2π` in metres.
#[expect(clippy::float_arithmetic, reason = "linear wave theory")]
fn deepwater_wavelength_m(period_s: f64) -> Option<f64> {
    (period_s > 0.0).then(|| GRAVITY_M_S2 * period_s.powi(2) / (2.0 * PI))
}

/// Ratio of wave height to deep-water wavelength.
#[expect(clippy::float_arithmetic, reason = "unit conversion")]
fn steepness(wave_ft: f64, period_s: Option<f64>) -> Option<f64> {
    if wave_ft <= 0.0 {
        return None;
    }
    let length_m = deepwater_wavelength_m(period_s?)?;
    Some(wave_ft / FEET_PER_METRE / length_m)
}

const fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// Sample fields with the defaults the heuristic assumes.
struct Conditions {
    wind_kt: f64,
    gust_kt: Option<f64>,
    wind_dir_deg: Option<f64>,
    pop: f64,
    wave_ft: f64,
    period_s: Option<f64>,
    wave_dir_deg: Option<f64>,
    steepness: Option<f64>,
}

impl Conditions {
    fn from_env(env: &EnvAtPoint) -> Self {
        let wave_ft = env.wave_height_ft.unwrap_or(0.0);
        Self {
            wind_kt: env.wind_speed_kt.unwrap_or(0.0),
            gust_kt: env.wind_gust_kt,
            wind_dir_deg: env.wind_dir_deg,
            pop: env.precip_prob.unwrap_or(0.0),
            wave_ft,
            period_s: env.wave_period_s,
            wave_dir_deg: env.wave_dir_deg,
            steepness: steepness(wave_ft, env.wave_period_s),
        }
    }
}

/// Running penalty total and the reasons behind it.
struct Tally {
    prefs: ScoringPreferences,
    penalty: f64,
    reasons: Vec<String>,
}

impl Tally {
    const fn new(prefs: ScoringPreferences) -> Self {
        Self {
            prefs,
            penalty: 0.0,
            reasons: Vec::new(),
        }
    }

    #[expect(clippy::float_arithmetic, reason = "penalties are weighted sums")]
    fn charge(&mut self, factor: Factor, points: f64) {
        self.penalty += points * self.prefs.multiplier(factor);
    }

    fn explain(&mut self, reason: String) {
        self.reasons.push(reason);
    }
}

#[expect(clippy::float_arithmetic, reason = "penalty curves")]
fn wind_penalties(tally: &mut Tally, boat: &BoatProfile, c: &Conditions) {
    let limit = boat.max_safe_wind_kt.max(1.0);
    if c.wind_kt > 0.0 {
        let ratio = c.wind_kt / limit;
        tally.charge(Factor::Wind, 35.0 * ratio.powf(1.3));
        if ratio > 1.0 {
            tally.explain(format!("Wind {:.0} kt above comfort limit", c.wind_kt));
        }
    }

    if let Some(gust) = c.gust_kt.filter(|g| *g > c.wind_kt && *g > 0.0) {
        let excess = gust - c.wind_kt;
        let ratio = excess / (0.35 * boat.max_safe_wind_kt).max(1.0);
        tally.charge(Factor::Wind, 10.0 * ratio.powf(1.2));
        if excess >= 8.0 {
            tally.explain(format!("Gusty (+{excess:.0} kt)"));
        }
    }
}

#[expect(clippy::float_arithmetic, reason = "penalty curves")]
fn wave_penalties(tally: &mut Tally, boat: &BoatProfile, c: &Conditions) {
    if c.wave_ft <= 0.0 {
        return;
    }
    let ratio = c.wave_ft / boat.max_safe_wave_ft.max(0.5);
    tally.charge(Factor::Wave, 50.0 * ratio.powf(1.4));
    if ratio > 1.0 {
        tally.explain(format!("Seas {:.1} ft above comfort limit", c.wave_ft));
    }

    if let Some(period) = c.period_s.filter(|p| *p > 0.0 && *p < 8.0) {
        let shortness = (8.0 - period) / 4.0;
        tally.charge(Factor::Period, 12.0 * shortness.powf(1.4));
        if period <= 6.0 {
            tally.explain(format!("Short period seas ({period:.0}s)"));
        }
    }

    if let Some(steep) = c.steepness.filter(|s| *s > 0.02) {
        tally.charge(Factor::Chop, 14.0 * ((steep - 0.02) / 0.02).powf(1.2));
        if steep >= 0.03 {
            tally.explain("Steep seas".to_owned());
        }
    }

    if let (Some(wind_dir), Some(wave_dir)) = (c.wind_dir_deg, c.wave_dir_deg)
        && c.wind_kt > 0.0
    {
        let delta = angle_diff_deg(wind_dir, wave_dir);
        let opposition = ((delta - 90.0) / 90.0).max(0.0);
        let strength = (c.wind_kt / boat.max_safe_wind_kt.max(1.0)).min(1.0);
        tally.charge(Factor::Wind, 10.0 * opposition * strength);
        if delta >= 140.0 {
            tally.explain("Wind against seas".to_owned());
        }
    }
}

/// Penalty for wind blowing against the estimated tidal flow, with the
/// angle between them.
///
/// Only a running tide, a real breeze and fairly sheltered water qualify,
/// and only near-opposition counts: the angle factor ramps quadratically
/// from 135° to 180°.
#[expect(clippy::float_arithmetic, reason = "penalty curves")]
fn wind_vs_tide_penalty(wind_kt: f64, wind_dir_deg: Option<f64>, meta: &EnvMetadata) -> Option<(f64, f64)> {
    let wind_dir = wind_dir_deg?;
    let rate = meta.tide_rate_ft_per_hr?.abs();
    let flow_dir = tide_flow_dir_est(meta.route_heading_deg, meta.tide_phase)?;

    if rate < TIDE_FLOW_MIN_FT_PER_HR || wind_kt < TIDE_WIND_MIN_KT {
        return None;
    }
    if meta.fetch_nm.is_some_and(|f| f > TIDE_WIND_MAX_FETCH_NM) {
        return None;
    }
    let delta = angle_diff_deg(wind_dir, flow_dir);
    if delta < TIDE_WIND_MIN_ANGLE_DEG {
        return None;
    }

    let rate_factor = clamp01(
        (rate - TIDE_FLOW_MIN_FT_PER_HR) / (TIDE_FLOW_FULL_FT_PER_HR - TIDE_FLOW_MIN_FT_PER_HR),
    );
    let wind_factor = clamp01((wind_kt - TIDE_WIND_MIN_KT) / (TIDE_WIND_FULL_KT - TIDE_WIND_MIN_KT));
    let ramp = clamp01((delta - TIDE_WIND_MIN_ANGLE_DEG) / (180.0 - TIDE_WIND_MIN_ANGLE_DEG));
    // 1 at 4 nm of fetch, 0 at 12 nm.
    let context = meta
        .fetch_nm
        .map_or(1.0, |f| clamp01((TIDE_WIND_MAX_FETCH_NM - f) / 8.0));

    let points = TIDE_WIND_MAX_POINTS * ramp * ramp * rate_factor * wind_factor * context;
    (points > 0.0).then_some((points, delta))
}

#[expect(clippy::float_arithmetic, reason = "penalty curves")]
fn tide_penalties(tally: &mut Tally, c: &Conditions, meta: &EnvMetadata) {
    let Some(rate) = meta.tide_rate_ft_per_hr.map(f64::abs) else {
        return;
    };
    if rate <= 0.3 {
        return;
    }
    let r = ((rate - 0.3) / 1.2).min(1.0);
    tally.charge(Factor::Tide, 8.0 * r.powf(1.3));
    if rate >= 1.0 {
        tally.explain("Strong tidal flow".to_owned());
    }

    if let Some((points, delta)) = wind_vs_tide_penalty(c.wind_kt, c.wind_dir_deg, meta) {
        tally.charge(Factor::Tide, points);
        tally.explain(format!("Wind vs tide flow (est) (\u{394}={delta:.0}\u{b0})"));
    }
}

#[expect(clippy::float_arithmetic, reason = "penalty curves")]
fn precip_penalty(tally: &mut Tally, c: &Conditions) {
    if c.pop <= 0.0 {
        return;
    }
    tally.charge(Factor::Precip, 15.0 * c.pop);
    if c.pop >= 0.6 {
        tally.explain(format!("High rain chance ({:.0}%)", (c.pop * 100.0).trunc()));
    }
}

fn put(detail: &mut BTreeMap<String, Value>, key: &str, value: Option<Value>) {
    if let Some(v) = value {
        detail.insert(key.to_owned(), v);
    }
}

fn detail_map(env: &EnvAtPoint, c: &Conditions, prefs: Option<&ScoringPreferences>) -> BTreeMap<String, Value> {
    let meta = &env.meta;
    let flow_dir = tide_flow_dir_est(meta.route_heading_deg, meta.tide_phase);
    let mut detail = BTreeMap::new();
    put(&mut detail, "wind_kt", Some(c.wind_kt.into()));
    put(&mut detail, "wind_gust_kt", c.gust_kt.map(Value::from));
    put(&mut detail, "wind_dir_deg", c.wind_dir_deg.map(Value::from));
    put(&mut detail, "pop", Some(c.pop.into()));
    put(&mut detail, "wave_ft", Some(c.wave_ft.into()));
    put(&mut detail, "wave_period_s", c.period_s.map(Value::from));
    put(&mut detail, "wave_dir_deg", c.wave_dir_deg.map(Value::from));
    put(&mut detail, "wave_steepness", c.steepness.map(Value::from));
    put(&mut detail, "tide_ft", env.tide_ft.map(Value::from));
    put(
        &mut detail,
        "tide_phase",
        meta.tide_phase.and_then(|p| serde_json::to_value(p).ok()),
    );
    put(
        &mut detail,
        "tide_rate_ft_per_hr",
        meta.tide_rate_ft_per_hr.map(Value::from),
    );
    put(
        &mut detail,
        "route_heading_deg",
        meta.route_heading_deg.map(Value::from),
    );
    put(&mut detail, "tide_flow_dir_est_deg", flow_dir.map(Value::from));
    put(
        &mut detail,
        "wind_vs_tide_flow_delta_deg",
        c.wind_dir_deg
            .zip(flow_dir)
            .map(|(wind, flow)| angle_diff_deg(wind, flow).into()),
    );

    let wave_source = meta
        .waves_source
        .clone()
        .unwrap_or_else(|| DEFAULT_WAVE_SOURCE.to_owned());
    detail.insert("wave_source".to_owned(), Value::String(wave_source));
    detail.insert(
        "fetch_nm".to_owned(),
        meta.fetch_nm.map_or(Value::Null, Value::from),
    );
    detail.insert("providers".to_owned(), meta.to_json());
    put(
        &mut detail,
        "preferences",
        prefs.and_then(|p| serde_json::to_value(p).ok()),
    );
    detail
}

#[expect(clippy::float_arithmetic, reason = "rounding to one decimal")]
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Score one fused sample for `boat`.
///
/// Penalties are computed independently and each is scaled by its
/// preference multiplier. The boat's comfort bias adds up to ±8 points and
/// the result is clamped to `[0, 100]`. The preferences' overall offset is
/// applied to that clamped value, which is clamped again and rounded to one
/// decimal. Without preferences every multiplier is 1 and the offset 0.
///
/// # Examples
///
/// ```
/// use boat_ride_core::{BoatProfile, EnvAtPoint, RideLabel};
/// use boat_ride_scorer::score;
/// use chrono::NaiveDate;
///
/// let t = NaiveDate::from_ymd_opt(2026, 1, 22)
///     .and_then(|d| d.and_hms_opt(8, 0, 0))
///     .expect("valid time");
/// let mut env = EnvAtPoint::empty(t, 40.0, -73.0);
/// env.wind_speed_kt = Some(30.0);
///
/// let scored = score(&BoatProfile::default(), &env, None);
/// assert_eq!(scored.score_0_100, 55.6);
/// assert_eq!(scored.label, RideLabel::Rough);
/// assert_eq!(scored.reasons, ["Wind 30 kt above comfort limit"]);
/// ```
#[must_use]
#[expect(clippy::float_arithmetic, reason = "final score assembly")]
pub fn score(boat: &BoatProfile, env: &EnvAtPoint, prefs: Option<&ScoringPreferences>) -> RideScore {
    let effective = prefs.map_or_else(ScoringPreferences::default, ScoringPreferences::clamped);
    let conditions = Conditions::from_env(env);
    let mut tally = Tally::new(effective);

    wind_penalties(&mut tally, boat, &conditions);
    wave_penalties(&mut tally, boat, &conditions);
    tide_penalties(&mut tally, &conditions, &env.meta);
    precip_penalty(&mut tally, &conditions);

    let base = (100.0 - tally.penalty + boat.comfort_bias * COMFORT_BIAS_POINTS).clamp(0.0, 100.0);
    let value = round1((base + effective.overall_offset).clamp(0.0, 100.0));

    RideScore {
        t_local: env.t_local,
        lat: env.lat,
        lon: env.lon,
        score_0_100: value,
        // Banded after rounding so the label always agrees with the score.
        label: RideLabel::from_score(value),
        reasons: tally.reasons,
        detail: detail_map(env, &conditions, prefs.map(|_| &effective)),
    }
}
