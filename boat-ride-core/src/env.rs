//! Environmental snapshots produced by adapters and fused by the chain.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{FetchResult, Waterway};

/// Direction of tidal flow at a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TidePhase {
    /// Rising water.
    Flood,
    /// Falling water.
    Ebb,
    /// Turning water.
    Slack,
}

impl TidePhase {
    /// Rate (ft/hr) beyond which the tide counts as running.
    pub const SLACK_THRESHOLD_FT_PER_HR: f64 = 0.05;

    /// Classify a tide rate in ft/hr.
    ///
    /// ```
    /// use boat_ride_core::TidePhase;
    ///
    /// assert_eq!(TidePhase::from_rate(0.4), TidePhase::Flood);
    /// assert_eq!(TidePhase::from_rate(-0.4), TidePhase::Ebb);
    /// assert_eq!(TidePhase::from_rate(0.05), TidePhase::Slack);
    /// ```
    pub fn from_rate(rate_ft_per_hr: f64) -> Self {
        if rate_ft_per_hr > Self::SLACK_THRESHOLD_FT_PER_HR {
            Self::Flood
        } else if rate_ft_per_hr < -Self::SLACK_THRESHOLD_FT_PER_HR {
            Self::Ebb
        } else {
            Self::Slack
        }
    }
}

/// Metadata attached to a sample.
///
/// Keys the engine reads are typed fields. Anything adapter-specific goes
/// into [`EnvMetadata::provenance`]. The fetch handle travels alongside but
/// never serialises.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvMetadata {
    /// Fetch in nautical miles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_nm: Option<f64>,
    /// Waterway tag or classification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waterway: Option<Waterway>,
    /// Water depth in metres.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth_m: Option<f64>,
    /// Course over ground in degrees true.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_heading_deg: Option<f64>,
    /// Rate of change of tide height.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tide_rate_ft_per_hr: Option<f64>,
    /// Flood, ebb or slack.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tide_phase: Option<TidePhase>,
    /// Buoy station identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ndbc_station: Option<String>,
    /// Distance to the buoy in nautical miles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ndbc_distance_nm: Option<f64>,
    /// Observation time reported by the buoy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ndbc_obs_time: Option<NaiveDateTime>,
    /// Set when buoy waves were discarded as unrepresentative.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ndbc_suppressed: Option<bool>,
    /// Why buoy waves were discarded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ndbc_suppressed_reason: Option<String>,
    /// Which source produced the wave fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waves_source: Option<String>,
    /// Free-form note about how waves were derived.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wave_source_note: Option<String>,
    /// Which source produced the weather fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_source: Option<String>,
    /// Which source produced the tide fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tide_source: Option<String>,
    /// How `fetch_nm` was refined, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_effective_method: Option<String>,
    /// Why inland wave synthesis failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_chop_error: Option<String>,
    /// Adapter-specific notes.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub provenance: BTreeMap<String, serde_json::Value>,
    /// Directional fetch for this sample, when a coastline was available.
    #[serde(skip)]
    pub fetch_result: Option<Arc<FetchResult>>,
}

macro_rules! overlay_fields {
    ($target:ident, $other:ident; $($field:ident),+ $(,)?) => {
        $(
            if $other.$field.is_some() {
                $target.$field = $other.$field.clone();
            }
        )+
    };
}

impl EnvMetadata {
    /// Copy every field that `other` sets onto `self`.
    ///
    /// Provenance entries merge key by key with `other` winning.
    pub fn overlay(&mut self, other: &Self) {
        overlay_fields!(self, other;
            fetch_nm,
            waterway,
            depth_m,
            route_heading_deg,
            tide_rate_ft_per_hr,
            tide_phase,
            ndbc_station,
            ndbc_distance_nm,
            ndbc_obs_time,
            ndbc_suppressed,
            ndbc_suppressed_reason,
            waves_source,
            wave_source_note,
            weather_source,
            tide_source,
            fetch_effective_method,
            fetch_chop_error,
            fetch_result,
        );
        for (key, value) in &other.provenance {
            self.provenance.insert(key.clone(), value.clone());
        }
    }

    /// Record an adapter-specific note.
    pub fn note(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.provenance.insert(key.into(), value.into());
    }

    /// Serialise the metadata, dropping unset keys and the fetch handle.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::Value::Object(Default::default()))
    }
}

/// Conditions at one place and time along the route.
///
/// Every measured field is optional: adapters leave fields they cannot
/// observe unset and the chain fills them from other sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvAtPoint {
    /// Local sample time.
    pub t_local: NaiveDateTime,
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
    /// Sustained wind in knots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_speed_kt: Option<f64>,
    /// Gusts in knots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_gust_kt: Option<f64>,
    /// Direction the wind blows from, degrees true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_dir_deg: Option<f64>,
    /// Significant wave height in feet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wave_height_ft: Option<f64>,
    /// Dominant wave period in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wave_period_s: Option<f64>,
    /// Direction waves come from, degrees true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wave_dir_deg: Option<f64>,
    /// Probability of precipitation in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precip_prob: Option<f64>,
    /// Tide height in feet above datum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tide_ft: Option<f64>,
    /// Current speed in knots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_kt: Option<f64>,
    /// Direction the current sets toward, degrees true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_dir_deg: Option<f64>,
    /// Provenance and derived values.
    #[serde(default)]
    pub meta: EnvMetadata,
}

impl EnvAtPoint {
    /// A sample with every measured field unset.
    pub fn empty(t_local: NaiveDateTime, lat: f64, lon: f64) -> Self {
        Self {
            t_local,
            lat,
            lon,
            wind_speed_kt: None,
            wind_gust_kt: None,
            wind_dir_deg: None,
            wave_height_ft: None,
            wave_period_s: None,
            wave_dir_deg: None,
            precip_prob: None,
            tide_ft: None,
            current_kt: None,
            current_dir_deg: None,
            meta: EnvMetadata::default(),
        }
    }

    /// Clear the wave height, period and direction.
    pub fn clear_waves(&mut self) {
        self.wave_height_ft = None;
        self.wave_period_s = None;
        self.wave_dir_deg = None;
    }

    /// Copy every measured field `other` sets onto `self`.
    ///
    /// Time and position stay as they are.
    pub fn overlay_fields(&mut self, other: &Self) {
        overlay_fields!(self, other;
            wind_speed_kt,
            wind_gust_kt,
            wind_dir_deg,
            wave_height_ft,
            wave_period_s,
            wave_dir_deg,
            precip_prob,
            tide_ft,
            current_kt,
            current_dir_deg,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::{fixture, rstest};

    #[fixture]
    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 22)
            .and_then(|d| d.and_hms_opt(8, 0, 0))
            .expect("valid timestamp")
    }

    #[rstest]
    fn overlay_keeps_base_where_overlay_is_unset(t0: NaiveDateTime) {
        let mut base = EnvAtPoint::empty(t0, 1.0, 2.0);
        base.wind_speed_kt = Some(10.0);
        base.tide_ft = Some(1.5);
        let mut over = EnvAtPoint::empty(t0, 1.0, 2.0);
        over.wind_speed_kt = Some(12.0);

        base.overlay_fields(&over);
        assert_eq!(base.wind_speed_kt, Some(12.0));
        assert_eq!(base.tide_ft, Some(1.5));
    }

    #[rstest]
    fn metadata_overlay_merges_provenance() {
        let mut base = EnvMetadata {
            fetch_nm: Some(1.0),
            ..EnvMetadata::default()
        };
        base.note("a", 1);
        base.note("b", 2);
        let mut other = EnvMetadata {
            waves_source: Some("ndbc".to_owned()),
            ..EnvMetadata::default()
        };
        other.note("b", 3);

        base.overlay(&other);
        assert_eq!(base.fetch_nm, Some(1.0));
        assert_eq!(base.waves_source.as_deref(), Some("ndbc"));
        assert_eq!(base.provenance.get("a"), Some(&serde_json::json!(1)));
        assert_eq!(base.provenance.get("b"), Some(&serde_json::json!(3)));
    }

    #[rstest]
    fn fetch_handle_never_serialises() {
        let meta = EnvMetadata {
            fetch_nm: Some(2.0),
            fetch_result: Some(Arc::new(FetchResult::from_directions(vec![(0.0, 2.0)]))),
            ..EnvMetadata::default()
        };
        let json = meta.to_json();
        assert_eq!(json, serde_json::json!({ "fetch_nm": 2.0 }));
    }

    #[rstest]
    fn sample_serialises_local_time(t0: NaiveDateTime) {
        let env = EnvAtPoint::empty(t0, 1.0, 2.0);
        let json = serde_json::to_value(&env).expect("serialisable sample");
        assert_eq!(json["t_local"], "2026-01-22T08:00:00");
    }
}
