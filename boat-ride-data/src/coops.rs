//! Tide predictions from NOAA CO-OPS.
//!
//! One station serves the whole trip: either a configured station or the
//! station nearest the route's centroid. Six-minute predictions covering the
//! trip window plus padding are interpolated to each sample time, and the
//! local slope gives the tide rate and phase. A failed prediction request is
//! recorded in each sample's provenance rather than failing the adapter.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use boat_ride_core::{
    EnvAtPoint, EnvProvider, EnvSeries, ProviderError, RoutePoint, TidePhase, TripPlan,
};
use chrono::{Duration, NaiveDateTime};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::http::{FeedClient, fetch_json};
use crate::util::{haversine_nm, memoize, nearest_index};

/// CO-OPS metadata API station list.
pub const STATIONS_URL: &str = "https://api.tidesandcurrents.noaa.gov/mdapi/prod/webapi/stations.json";
/// CO-OPS data API endpoint.
pub const DATA_URL: &str = "https://api.tidesandcurrents.noaa.gov/api/prod/datagetter";

const ROW_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";
const QUERY_TIME_FORMAT: &str = "%Y%m%d %H:%M";
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Configuration for [`CoopsProvider`].
#[derive(Debug, Clone, PartialEq)]
pub struct CoopsConfig {
    /// Always use this station instead of the nearest one.
    pub station_id: Option<String>,
    /// Vertical datum of the predictions.
    pub datum: String,
    /// `english` for feet.
    pub units: String,
    /// Time zone of returned timestamps; `lst_ldt` is station local time.
    pub time_zone: String,
    /// Prediction interval in minutes, as the API expects it.
    pub interval: String,
    /// Data product.
    pub product: String,
    /// Hours of predictions fetched either side of the trip window.
    pub padding_hours: i64,
    /// Station list URL.
    pub stations_url: String,
    /// Data API URL.
    pub data_url: String,
}

impl Default for CoopsConfig {
    fn default() -> Self {
        Self {
            station_id: None,
            datum: "MLLW".to_owned(),
            units: "english".to_owned(),
            time_zone: "lst_ldt".to_owned(),
            interval: "6".to_owned(),
            product: "predictions".to_owned(),
            padding_hours: 6,
            stations_url: STATIONS_URL.to_owned(),
            data_url: DATA_URL.to_owned(),
        }
    }
}

impl CoopsConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin every trip to `station_id`.
    #[must_use]
    pub fn with_station_id(mut self, station_id: impl Into<String>) -> Self {
        self.station_id = Some(station_id.into());
        self
    }

    /// Use a different vertical datum.
    #[must_use]
    pub fn with_datum(mut self, datum: impl Into<String>) -> Self {
        self.datum = datum.into();
        self
    }

    /// Fetch `hours` of predictions either side of the trip.
    #[must_use]
    pub fn with_padding_hours(mut self, hours: i64) -> Self {
        self.padding_hours = hours;
        self
    }

    /// Use different API endpoints.
    #[must_use]
    pub fn with_urls(mut self, stations_url: impl Into<String>, data_url: impl Into<String>) -> Self {
        self.stations_url = stations_url.into();
        self.data_url = data_url.into();
        self
    }
}

/// Predicted tide heights in time order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TideSeries {
    points: Vec<(NaiveDateTime, f64)>,
}

impl TideSeries {
    /// Build a series from `(time, height)` rows, sorting them by time.
    pub fn new(mut points: Vec<(NaiveDateTime, f64)>) -> Self {
        points.sort_by_key(|(t, _)| *t);
        Self { points }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series has no rows.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Height at `t` by linear interpolation, clamped to the end rows.
    pub fn height_at(&self, t: NaiveDateTime) -> Option<f64> {
        let (first, last) = (self.points.first()?, self.points.last()?);
        if t <= first.0 {
            return Some(first.1);
        }
        if t >= last.0 {
            return Some(last.1);
        }
        let upper = self.points.iter().position(|(ti, _)| *ti >= t)?;
        let (t1, v1) = *self.points.get(upper)?;
        let (t0, v0) = *self.points.get(upper.checked_sub(1)?)?;
        let span = (t1 - t0).num_seconds();
        if span <= 0 {
            return Some(v0);
        }
        let w = (t - t0).num_seconds() as f64 / span as f64;
        Some(v0 + w * (v1 - v0))
    }

    /// Rate of change (ft/hr) at `t` by central difference around the
    /// nearest row. Needs at least three rows.
    ///
    /// ```
    /// use boat_ride_data::coops::TideSeries;
    /// use chrono::NaiveDate;
    ///
    /// let at = |h| NaiveDate::from_ymd_opt(2026, 1, 22).and_then(|d| d.and_hms_opt(h, 0, 0)).expect("valid");
    /// let tide = TideSeries::new(vec![(at(8), 1.0), (at(9), 2.0), (at(10), 3.0)]);
    /// assert_eq!(tide.rate_at(at(9)), Some(1.0));
    /// ```
    pub fn rate_at(&self, t: NaiveDateTime) -> Option<f64> {
        if self.points.len() < 3 {
            return None;
        }
        let idx = nearest_index(self.points.iter().map(|(ti, _)| *ti), t)?;
        let lo = idx.saturating_sub(1);
        let hi = (idx + 1).min(self.points.len() - 1);
        let ((t0, v0), (t1, v1)) = (*self.points.get(lo)?, *self.points.get(hi)?);
        let hours = (t1 - t0).num_seconds() as f64 / SECONDS_PER_HOUR;
        if hi == lo || hours == 0.0 {
            return None;
        }
        Some((v1 - v0) / hours)
    }
}

/// A CO-OPS station.
#[derive(Debug, Clone, PartialEq)]
pub struct CoopsStation {
    /// Station identifier.
    pub id: String,
    /// Station name.
    pub name: String,
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
}

fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse the station list, skipping malformed entries.
pub fn parse_stations(doc: &Value) -> Vec<CoopsStation> {
    doc.get("stations")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|st| {
            let id = text(st.get("id"))?;
            Some(CoopsStation {
                name: text(st.get("name")).unwrap_or_else(|| id.clone()),
                lat: number(st.get("lat"))?,
                lon: number(st.get("lng"))?,
                id,
            })
        })
        .collect()
}

/// Parse prediction rows (`{"t": "...", "v": "..."}`), skipping bad ones.
pub fn parse_predictions(doc: &Value) -> TideSeries {
    let rows = doc
        .get("predictions")
        .or_else(|| doc.get("data"))
        .and_then(Value::as_array);
    let points = rows
        .into_iter()
        .flatten()
        .filter_map(|row| {
            let t = row.get("t")?.as_str()?;
            let t = NaiveDateTime::parse_from_str(t, ROW_TIME_FORMAT).ok()?;
            Some((t, number(row.get("v"))?))
        })
        .collect();
    TideSeries::new(points)
}

fn centroid(route: &[RoutePoint]) -> (f64, f64) {
    if route.is_empty() {
        return (0.0, 0.0);
    }
    let n = route.len() as f64;
    let (lat, lon) = route
        .iter()
        .fold((0.0, 0.0), |(lat, lon), p| (lat + p.lat, lon + p.lon));
    (lat / n, lon / n)
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Clone, PartialEq)]
struct Predictions {
    series: Arc<TideSeries>,
    provenance: Vec<(String, Value)>,
}

/// The `coops` (also `tide`) adapter.
#[derive(Debug)]
pub struct CoopsProvider {
    feed: Arc<dyn FeedClient>,
    config: CoopsConfig,
    stations: Mutex<Option<Arc<Vec<CoopsStation>>>>,
    predictions: Mutex<HashMap<String, Predictions>>,
}

impl CoopsProvider {
    /// Adapter with the default configuration.
    pub fn new(feed: Arc<dyn FeedClient>) -> Self {
        Self::with_config(feed, CoopsConfig::default())
    }

    /// Adapter with explicit configuration.
    pub fn with_config(feed: Arc<dyn FeedClient>, config: CoopsConfig) -> Self {
        Self {
            feed,
            config,
            stations: Mutex::new(None),
            predictions: Mutex::new(HashMap::new()),
        }
    }

    fn stations(&self) -> Result<Arc<Vec<CoopsStation>>, ProviderError> {
        let mut guard = self
            .stations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(stations) = guard.as_ref() {
            return Ok(Arc::clone(stations));
        }
        let doc: Value = fetch_json(self.feed.as_ref(), &self.config.stations_url)?;
        let stations = Arc::new(parse_stations(&doc));
        debug!("loaded {} CO-OPS stations", stations.len());
        *guard = Some(Arc::clone(&stations));
        Ok(stations)
    }

    fn station_for(&self, lat: f64, lon: f64) -> Result<Option<(CoopsStation, Option<f64>)>, ProviderError> {
        if let Some(id) = &self.config.station_id {
            let pinned = CoopsStation {
                id: id.clone(),
                name: id.clone(),
                lat,
                lon,
            };
            return Ok(Some((pinned, None)));
        }
        let stations = self.stations()?;
        Ok(stations
            .iter()
            .map(|s| (haversine_nm(lat, lon, s.lat, s.lon), s))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(d, s)| (s.clone(), Some(d))))
    }

    fn predictions_url(&self, station_id: &str, begin: NaiveDateTime, end: NaiveDateTime) -> Result<String, ProviderError> {
        let c = &self.config;
        let begin = begin.format(QUERY_TIME_FORMAT).to_string();
        let end = end.format(QUERY_TIME_FORMAT).to_string();
        url::Url::parse_with_params(
            &c.data_url,
            [
                ("format", "json"),
                ("product", c.product.as_str()),
                ("station", station_id),
                ("begin_date", begin.as_str()),
                ("end_date", end.as_str()),
                ("datum", c.datum.as_str()),
                ("units", c.units.as_str()),
                ("time_zone", c.time_zone.as_str()),
                ("interval", c.interval.as_str()),
            ],
        )
        .map(String::from)
        .map_err(|err| ProviderError::Unavailable {
            provider: "coops".to_owned(),
            message: format!("invalid data URL {}: {err}", c.data_url),
        })
    }

    fn predictions(
        &self,
        station_id: &str,
        begin: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Predictions, ProviderError> {
        let url = self.predictions_url(station_id, begin, end)?;
        memoize(&self.predictions, url.clone(), || {
            debug!("fetching CO-OPS predictions {url}");
            let doc: Value = fetch_json(self.feed.as_ref(), &url)?;
            if let Ok(api_error) = serde_json::from_value::<ApiError>(
                doc.get("error").cloned().unwrap_or(Value::Null),
            ) {
                return Err(ProviderError::Unavailable {
                    provider: "coops".to_owned(),
                    message: api_error.message,
                });
            }
            let series = parse_predictions(&doc);
            let c = &self.config;
            let provenance = vec![
                ("coops_station".to_owned(), json!(station_id)),
                ("coops_product".to_owned(), json!(c.product)),
                ("coops_datum".to_owned(), json!(c.datum)),
                ("coops_units".to_owned(), json!(c.units)),
                ("coops_tz".to_owned(), json!(c.time_zone)),
                ("coops_interval".to_owned(), json!(c.interval)),
                ("coops_begin".to_owned(), json!(begin.format(ROW_TIME_FORMAT).to_string())),
                ("coops_end".to_owned(), json!(end.format(ROW_TIME_FORMAT).to_string())),
                ("coops_rows".to_owned(), json!(series.len())),
            ];
            Ok(Predictions {
                series: Arc::new(series),
                provenance,
            })
        })
    }
}

impl EnvProvider for CoopsProvider {
    fn name(&self) -> &str {
        "coops"
    }

    fn get_env_series(&self, plan: &TripPlan) -> Result<EnvSeries, ProviderError> {
        let positions = plan.sample_positions()?;
        let padding = Duration::hours(self.config.padding_hours);
        let (begin, end) = (plan.start()? - padding, plan.end()? + padding);
        let (lat0, lon0) = centroid(&plan.route);

        let mut provenance: Vec<(String, Value)> = Vec::new();
        let mut series = Arc::new(TideSeries::default());
        match self.station_for(lat0, lon0)? {
            Some((station, distance_nm)) => {
                provenance.push(("coops_station_id".to_owned(), json!(station.id)));
                provenance.push(("coops_station_name".to_owned(), json!(station.name)));
                provenance.push(("coops_station_distance_nm".to_owned(), json!(distance_nm)));
                match self.predictions(&station.id, begin, end) {
                    Ok(found) => {
                        series = found.series;
                        provenance.extend(found.provenance);
                    }
                    Err(err) => {
                        warn!("CO-OPS predictions for {} unavailable: {err}", station.id);
                        provenance.push(("coops_error".to_owned(), json!(err.to_string())));
                    }
                }
            }
            None => {
                provenance.push((
                    "coops_error".to_owned(),
                    json!("No CO-OPS stations available"),
                ));
            }
        }

        Ok(positions
            .iter()
            .map(|pos| {
                let mut env = EnvAtPoint::empty(pos.t_local, pos.lat, pos.lon);
                env.tide_ft = series.height_at(pos.t_local);
                let rate = series.rate_at(pos.t_local);
                env.meta.tide_source = Some("coops".to_owned());
                env.meta.tide_rate_ft_per_hr = rate;
                env.meta.tide_phase = rate.map(TidePhase::from_rate);
                for (key, value) in &provenance {
                    env.meta.note(key.clone(), value.clone());
                }
                env
            })
            .collect())
    }
}
