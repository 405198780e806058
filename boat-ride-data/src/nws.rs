//! Wind and precipitation from National Weather Service forecasts.
//!
//! Each sample position is resolved through `/points/{lat},{lon}`, which
//! names two forecast products. The hourly forecast is tried first; when it
//! is unavailable or yields nothing for the sample, the raw gridded forecast
//! is used instead. Forecast timestamps carry a UTC offset that is dropped,
//! so they are compared with sample times as local wall-clock values.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use boat_ride_core::{EnvAtPoint, EnvProvider, EnvSeries, ProviderError, SamplePosition, TripPlan};
use chrono::{DateTime, NaiveDateTime};
use log::debug;
use serde::Deserialize;

use crate::http::{FeedClient, fetch_json};
use crate::util::{memoize, nearest_index};

/// Public NWS API root.
pub const NWS_BASE_URL: &str = "https://api.weather.gov";

const MPH_TO_KT: f64 = 0.868_976;
const MPS_TO_KT: f64 = 1.943_844;
const KMH_TO_KT: f64 = 0.539_957;

const HOURLY_PATH: &str = "forecastHourly";
const GRID_PATH: &str = "forecastGridData";

/// Parse an hourly forecast wind string such as `"10 mph"` or
/// `"5 to 10 mph"` into knots, taking the midpoint of a range.
///
/// ```
/// use boat_ride_data::nws::parse_wind_speed_kt;
///
/// let kt = parse_wind_speed_kt("5 to 15 mph").expect("parsable");
/// assert!((kt - 10.0 * 0.868_976).abs() < 1e-9);
/// assert_eq!(parse_wind_speed_kt("calm"), None);
/// ```
pub fn parse_wind_speed_kt(text: &str) -> Option<f64> {
    let lowered = text.to_lowercase().replace("mph", "");
    let trimmed = lowered.trim();
    if let Some((lo, hi)) = trimmed.split_once("to") {
        let lo: f64 = lo.trim().parse().ok()?;
        let hi: f64 = hi.trim().parse().ok()?;
        return Some((lo + hi) / 2.0 * MPH_TO_KT);
    }
    let first: f64 = trimmed.split_whitespace().next()?.parse().ok()?;
    Some(first * MPH_TO_KT)
}

/// Convert a numeric or 16-point compass direction to degrees true.
pub fn direction_to_deg(text: &str) -> Option<f64> {
    let cleaned = text.trim().to_uppercase();
    if let Ok(deg) = cleaned.parse::<f64>() {
        return Some(deg);
    }
    let deg = match cleaned.as_str() {
        "N" => 0.0,
        "NNE" => 22.5,
        "NE" => 45.0,
        "ENE" => 67.5,
        "E" => 90.0,
        "ESE" => 112.5,
        "SE" => 135.0,
        "SSE" => 157.5,
        "S" => 180.0,
        "SSW" => 202.5,
        "SW" => 225.0,
        "WSW" => 247.5,
        "W" => 270.0,
        "WNW" => 292.5,
        "NW" => 315.0,
        "NNW" => 337.5,
        _ => return None,
    };
    Some(deg)
}

fn parse_offset_time(text: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.naive_local())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PointsProperties {
    #[serde(default)]
    forecast_hourly: Option<String>,
    #[serde(default)]
    forecast_grid_data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PointsResponse {
    properties: PointsProperties,
}

#[derive(Debug, Deserialize)]
struct Quantity {
    #[serde(default)]
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPeriod {
    start_time: String,
    #[serde(default)]
    wind_speed: Option<String>,
    #[serde(default)]
    wind_direction: Option<serde_json::Value>,
    #[serde(default)]
    probability_of_precipitation: Option<Quantity>,
}

#[derive(Debug, Default, Deserialize)]
struct HourlyProperties {
    #[serde(default)]
    periods: Vec<RawPeriod>,
}

#[derive(Debug, Deserialize)]
struct HourlyResponse {
    #[serde(default)]
    properties: HourlyProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGridValue {
    #[serde(default)]
    valid_time: String,
    #[serde(default)]
    value: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawGridLayer {
    #[serde(default, alias = "unitCode")]
    uom: Option<String>,
    #[serde(default)]
    values: Vec<RawGridValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridProperties {
    #[serde(default)]
    wind_speed: RawGridLayer,
    #[serde(default)]
    wind_direction: RawGridLayer,
    #[serde(default)]
    probability_of_precipitation: RawGridLayer,
}

#[derive(Debug, Deserialize)]
struct GridResponse {
    #[serde(default)]
    properties: GridProperties,
}

/// Forecast values at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Reading {
    wind_speed_kt: Option<f64>,
    wind_dir_deg: Option<f64>,
    precip_prob: Option<f64>,
}

impl Reading {
    fn is_empty(&self) -> bool {
        self.wind_speed_kt.is_none() && self.wind_dir_deg.is_none() && self.precip_prob.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct HourlyPeriod {
    start: NaiveDateTime,
    reading: Reading,
}

fn hourly_periods(response: HourlyResponse) -> Vec<HourlyPeriod> {
    response
        .properties
        .periods
        .into_iter()
        .filter_map(|raw| {
            let start = parse_offset_time(&raw.start_time)?;
            let wind_dir_deg = match raw.wind_direction {
                Some(serde_json::Value::String(text)) => direction_to_deg(&text),
                Some(serde_json::Value::Number(n)) => n.as_f64(),
                _ => None,
            };
            Some(HourlyPeriod {
                start,
                reading: Reading {
                    wind_speed_kt: raw.wind_speed.as_deref().and_then(parse_wind_speed_kt),
                    wind_dir_deg,
                    precip_prob: raw
                        .probability_of_precipitation
                        .and_then(|q| q.value)
                        .map(|pct| pct / 100.0),
                },
            })
        })
        .collect()
}

/// Time series for one gridded forecast layer.
#[derive(Debug, Clone, Default, PartialEq)]
struct GridSeries {
    points: Vec<(NaiveDateTime, Option<f64>)>,
}

impl GridSeries {
    fn from_layer(layer: RawGridLayer, convert: impl Fn(f64) -> f64) -> Self {
        let points = layer
            .values
            .into_iter()
            .filter_map(|raw| {
                // validTime is "<start>/<ISO 8601 duration>".
                let start = raw.valid_time.split('/').next()?;
                Some((parse_offset_time(start)?, raw.value.map(&convert)))
            })
            .collect();
        Self { points }
    }

    fn nearest(&self, t: NaiveDateTime) -> Option<f64> {
        let i = nearest_index(self.points.iter().map(|(ti, _)| *ti), t)?;
        self.points.get(i).and_then(|(_, v)| *v)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct GridForecast {
    wind_speed: GridSeries,
    wind_dir: GridSeries,
    precip: GridSeries,
}

impl GridForecast {
    fn from_response(response: GridResponse) -> Self {
        let props = response.properties;
        let unit = props.wind_speed.uom.clone().unwrap_or_default();
        let to_kt = move |v: f64| {
            if unit.contains("m_s-1") {
                v * MPS_TO_KT
            } else if unit.contains("km_h-1") || unit.contains("km/h") {
                v * KMH_TO_KT
            } else {
                v
            }
        };
        Self {
            wind_speed: GridSeries::from_layer(props.wind_speed, to_kt),
            wind_dir: GridSeries::from_layer(props.wind_direction, |v| v),
            precip: GridSeries::from_layer(props.probability_of_precipitation, |v| v / 100.0),
        }
    }

    fn reading_at(&self, t: NaiveDateTime) -> Reading {
        Reading {
            wind_speed_kt: self.wind_speed.nearest(t),
            wind_dir_deg: self.wind_dir.nearest(t),
            precip_prob: self.precip.nearest(t),
        }
    }
}

/// The `nws` adapter.
///
/// Responses are cached per instance: point metadata by position rounded to
/// four decimals, forecasts by URL.
#[derive(Debug)]
pub struct NwsProvider {
    feed: Arc<dyn FeedClient>,
    base_url: String,
    points: Mutex<HashMap<String, PointsProperties>>,
    hourly: Mutex<HashMap<String, Arc<Vec<HourlyPeriod>>>>,
    grids: Mutex<HashMap<String, Arc<GridForecast>>>,
}

impl NwsProvider {
    /// Adapter reading from the public NWS API through `feed`.
    pub fn new(feed: Arc<dyn FeedClient>) -> Self {
        Self {
            feed,
            base_url: NWS_BASE_URL.to_owned(),
            points: Mutex::new(HashMap::new()),
            hourly: Mutex::new(HashMap::new()),
            grids: Mutex::new(HashMap::new()),
        }
    }

    /// Use a different API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn points(&self, lat: f64, lon: f64) -> Result<PointsProperties, ProviderError> {
        let key = format!("{lat:.4},{lon:.4}");
        let url = format!("{}/points/{key}", self.base_url.trim_end_matches('/'));
        memoize(&self.points, key, || {
            debug!("resolving NWS point {url}");
            fetch_json::<PointsResponse>(self.feed.as_ref(), &url).map(|r| r.properties)
        })
    }

    fn hourly(&self, url: &str) -> Result<Arc<Vec<HourlyPeriod>>, ProviderError> {
        memoize(&self.hourly, url.to_owned(), || {
            debug!("fetching NWS hourly forecast {url}");
            fetch_json::<HourlyResponse>(self.feed.as_ref(), url)
                .map(|r| Arc::new(hourly_periods(r)))
        })
    }

    fn grid(&self, url: &str) -> Result<Arc<GridForecast>, ProviderError> {
        memoize(&self.grids, url.to_owned(), || {
            debug!("fetching NWS grid forecast {url}");
            fetch_json::<GridResponse>(self.feed.as_ref(), url)
                .map(|r| Arc::new(GridForecast::from_response(r)))
        })
    }

    fn sample(&self, pos: &SamplePosition) -> Result<EnvAtPoint, ProviderError> {
        let props = self.points(pos.lat, pos.lon)?;
        let mut reading = Reading::default();
        let mut path = HOURLY_PATH.to_owned();

        if let Some(url) = props.forecast_hourly.as_deref() {
            match self.hourly(url) {
                Ok(periods) => {
                    let nearest = nearest_index(periods.iter().map(|p| p.start), pos.t_local);
                    if let Some(period) = nearest.and_then(|i| periods.get(i)) {
                        reading = period.reading;
                    }
                }
                Err(ProviderError::Http { status, .. }) => {
                    path = format!("{HOURLY_PATH}_error_{status}");
                }
                Err(err) => return Err(err),
            }
        }

        if reading.is_empty() {
            if let Some(url) = props.forecast_grid_data.as_deref() {
                reading = self.grid(url)?.reading_at(pos.t_local);
                path = GRID_PATH.to_owned();
            }
        }

        let mut env = EnvAtPoint::empty(pos.t_local, pos.lat, pos.lon);
        env.wind_speed_kt = reading.wind_speed_kt;
        env.wind_dir_deg = reading.wind_dir_deg;
        env.precip_prob = reading.precip_prob;
        env.meta.weather_source = Some("nws".to_owned());
        env.meta.note("nws_path", path);
        Ok(env)
    }
}

impl EnvProvider for NwsProvider {
    fn name(&self) -> &str {
        "nws"
    }

    fn get_env_series(&self, plan: &TripPlan) -> Result<EnvSeries, ProviderError> {
        plan.sample_positions()?
            .iter()
            .map(|pos| self.sample(pos))
            .collect()
    }
}
