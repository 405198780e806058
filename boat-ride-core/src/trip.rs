//! Trip plans: the request every run starts from.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::route::RouteError;
use crate::{BoatProfile, BoatProfileError, Waterway};

/// Format accepted for [`TripPlan::start_time_local`] and
/// [`TripPlan::end_time_local`].
pub const LOCAL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One waypoint of a planned route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
    /// Optional waypoint label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Fetch override in nautical miles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_nm: Option<f64>,
    /// Waterway tag for the water around this waypoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waterway: Option<Waterway>,
    /// Water depth in metres, used to limit inland wave growth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_m: Option<f64>,
}

impl RoutePoint {
    /// Construct an untagged waypoint.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            name: None,
            fetch_nm: None,
            waterway: None,
            depth_m: None,
        }
    }

    /// Attach a waypoint label.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach a fetch override.
    #[must_use]
    pub fn with_fetch_nm(mut self, fetch_nm: f64) -> Self {
        self.fetch_nm = Some(fetch_nm);
        self
    }

    /// Attach a waterway tag.
    #[must_use]
    pub fn with_waterway(mut self, waterway: Waterway) -> Self {
        self.waterway = Some(waterway);
        self
    }

    /// Attach a water depth.
    #[must_use]
    pub fn with_depth_m(mut self, depth_m: f64) -> Self {
        self.depth_m = Some(depth_m);
        self
    }
}

/// A planned trip: who is going, where, and when.
///
/// Times are wall-clock strings in [`LOCAL_TIME_FORMAT`]. The `timezone`
/// field is carried as a label for upstream services; arithmetic on the
/// schedule happens on naive local times.
///
/// # Examples
///
/// ```
/// use boat_ride_core::{BoatProfile, RoutePoint, TripPlan};
///
/// let plan = TripPlan::new(
///     BoatProfile::default(),
///     vec![RoutePoint::new(40.0, -73.0), RoutePoint::new(40.1, -73.0)],
///     "2026-01-22 08:00",
///     "2026-01-22 09:00",
/// )
/// .with_sample_every_minutes(30);
///
/// assert_eq!(plan.sample_times().expect("valid plan").len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripPlan {
    /// Caller-supplied identifier.
    #[serde(default = "default_trip_id")]
    pub trip_id: String,
    /// Vessel making the trip.
    #[serde(default)]
    pub boat: BoatProfile,
    /// Ordered waypoints.
    pub route: Vec<RoutePoint>,
    /// Departure, local wall-clock time.
    pub start_time_local: String,
    /// Arrival, local wall-clock time.
    pub end_time_local: String,
    /// Minutes between samples.
    #[serde(default = "default_sample_every_minutes")]
    pub sample_every_minutes: u32,
    /// Cruise speed in knots.
    #[serde(default = "default_cruise_speed_kt")]
    pub cruise_speed_kt: f64,
    /// IANA timezone name for the local times.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Fetch in nautical miles used when no waypoint override applies.
    #[serde(default = "default_fetch_nm")]
    pub default_fetch_nm: f64,
}

fn default_trip_id() -> String {
    "sample".to_owned()
}

fn default_sample_every_minutes() -> u32 {
    15
}

fn default_cruise_speed_kt() -> f64 {
    18.0
}

fn default_timezone() -> String {
    "America/New_York".to_owned()
}

fn default_fetch_nm() -> f64 {
    1.0
}

/// Reasons a [`TripPlan`] cannot be run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TripPlanError {
    /// The route has no waypoints.
    #[error("trip plan has no route points")]
    EmptyRoute,
    /// The sample interval is zero.
    #[error("sample interval must be at least one minute")]
    ZeroSampleInterval,
    /// A time string did not match [`LOCAL_TIME_FORMAT`].
    #[error("invalid {field} {value:?}: expected YYYY-MM-DD HH:MM")]
    InvalidTime {
        /// Which field failed to parse.
        field: &'static str,
        /// The rejected string.
        value: String,
        /// Parser diagnostic.
        #[source]
        source: chrono::ParseError,
    },
    /// The trip ends before it starts.
    #[error("trip ends at {end} before it starts at {start}")]
    EndBeforeStart {
        /// Parsed start.
        start: NaiveDateTime,
        /// Parsed end.
        end: NaiveDateTime,
    },
    /// The boat profile is invalid.
    #[error("invalid boat profile: {0}")]
    Boat(#[from] BoatProfileError),
    /// The route could not be resampled.
    #[error(transparent)]
    Route(#[from] RouteError),
}

impl TripPlan {
    /// Build a plan with default sampling, speed, timezone and fetch.
    pub fn new(
        boat: BoatProfile,
        route: Vec<RoutePoint>,
        start_time_local: impl Into<String>,
        end_time_local: impl Into<String>,
    ) -> Self {
        Self {
            trip_id: default_trip_id(),
            boat,
            route,
            start_time_local: start_time_local.into(),
            end_time_local: end_time_local.into(),
            sample_every_minutes: default_sample_every_minutes(),
            cruise_speed_kt: default_cruise_speed_kt(),
            timezone: default_timezone(),
            default_fetch_nm: default_fetch_nm(),
        }
    }

    /// Set the trip identifier.
    #[must_use]
    pub fn with_trip_id(mut self, trip_id: impl Into<String>) -> Self {
        self.trip_id = trip_id.into();
        self
    }

    /// Set the sample interval in minutes.
    #[must_use]
    pub fn with_sample_every_minutes(mut self, minutes: u32) -> Self {
        self.sample_every_minutes = minutes;
        self
    }

    /// Set the fallback fetch in nautical miles.
    #[must_use]
    pub fn with_default_fetch_nm(mut self, fetch_nm: f64) -> Self {
        self.default_fetch_nm = fetch_nm;
        self
    }

    /// Set the timezone label.
    #[must_use]
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    /// Parsed departure time.
    pub fn start(&self) -> Result<NaiveDateTime, TripPlanError> {
        parse_local("start_time_local", &self.start_time_local)
    }

    /// Parsed arrival time.
    pub fn end(&self) -> Result<NaiveDateTime, TripPlanError> {
        parse_local("end_time_local", &self.end_time_local)
    }

    /// Check that the plan can be sampled and scored.
    pub fn validate(&self) -> Result<(), TripPlanError> {
        if self.route.is_empty() {
            return Err(TripPlanError::EmptyRoute);
        }
        if self.sample_every_minutes == 0 {
            return Err(TripPlanError::ZeroSampleInterval);
        }
        let start = self.start()?;
        let end = self.end()?;
        if end < start {
            return Err(TripPlanError::EndBeforeStart { start, end });
        }
        self.boat.validate()?;
        Ok(())
    }
}

fn parse_local(field: &'static str, value: &str) -> Result<NaiveDateTime, TripPlanError> {
    NaiveDateTime::parse_from_str(value.trim(), LOCAL_TIME_FORMAT).map_err(|source| {
        TripPlanError::InvalidTime {
            field,
            value: value.to_owned(),
            source,
        }
    })
}
