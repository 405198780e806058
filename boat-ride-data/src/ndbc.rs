//! Observed waves from NDBC buoys.
//!
//! The active station list is scanned for the nearest stations to each
//! sample. The first of those whose realtime2 standard meteorological file
//! reports significant wave height supplies that sample's waves, taken from
//! the observation closest in time. Observation times are UTC in the feed
//! and are compared with sample times as given.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use boat_ride_core::{EnvAtPoint, EnvProvider, EnvSeries, ProviderError, SamplePosition, TripPlan};
use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, warn};

use crate::http::FeedClient;
use crate::util::{haversine_nm, memoize, nearest_index};

/// NDBC active station list.
pub const ACTIVE_STATIONS_URL: &str = "https://www.ndbc.noaa.gov/activestations.xml";
/// Directory holding realtime2 files, one `{station}.txt` per station.
pub const REALTIME_BASE_URL: &str = "https://www.ndbc.noaa.gov/data/realtime2";

const M_TO_FT: f64 = 3.28084;
const MISSING_VALUES: [&str; 3] = ["MM", "99", "999"];

/// Configuration for [`NdbcProvider`].
#[derive(Debug, Clone, PartialEq)]
pub struct NdbcConfig {
    /// Station list URL.
    pub active_stations_url: String,
    /// Realtime2 directory URL.
    pub realtime_base_url: String,
    /// Stations further than this (nm) are never used.
    pub max_distance_nm: f64,
    /// How many of the nearest stations are probed for wave data.
    pub candidate_limit: usize,
    /// How many of the most recent observations are considered.
    pub max_rows: usize,
}

impl Default for NdbcConfig {
    fn default() -> Self {
        Self {
            active_stations_url: ACTIVE_STATIONS_URL.to_owned(),
            realtime_base_url: REALTIME_BASE_URL.to_owned(),
            max_distance_nm: 200.0,
            candidate_limit: 50,
            max_rows: 200,
        }
    }
}

impl NdbcConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the station list from `url`.
    #[must_use]
    pub fn with_active_stations_url(mut self, url: impl Into<String>) -> Self {
        self.active_stations_url = url.into();
        self
    }

    /// Fetch realtime2 files from under `url`.
    #[must_use]
    pub fn with_realtime_base_url(mut self, url: impl Into<String>) -> Self {
        self.realtime_base_url = url.into();
        self
    }

    /// Ignore stations beyond `nm`.
    #[must_use]
    pub fn with_max_distance_nm(mut self, nm: f64) -> Self {
        self.max_distance_nm = nm;
        self
    }

    /// Probe at most `limit` stations per sample.
    #[must_use]
    pub fn with_candidate_limit(mut self, limit: usize) -> Self {
        self.candidate_limit = limit;
        self
    }
}

/// An entry in the active station list.
#[derive(Debug, Clone, PartialEq)]
pub struct NdbcStation {
    /// Station identifier, e.g. `44025`.
    pub id: String,
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
    /// Descriptive name, possibly empty.
    pub name: String,
}

/// Parse `<station id=".." lat=".." lon=".." name=".."/>` elements.
///
/// Elements without an id or with unparsable coordinates are skipped.
pub fn parse_active_stations(xml: &str) -> Vec<NdbcStation> {
    xml.split("<station")
        .skip(1)
        .filter(|chunk| chunk.starts_with(char::is_whitespace))
        .filter_map(|chunk| {
            let tag = chunk.split('>').next()?;
            let id = attribute(tag, "id")?.trim().to_owned();
            if id.is_empty() {
                return None;
            }
            Some(NdbcStation {
                lat: attribute(tag, "lat")?.trim().parse().ok()?,
                lon: attribute(tag, "lon")?.trim().parse().ok()?,
                name: attribute(tag, "name")
                    .map(|n| unescape(n.trim()))
                    .unwrap_or_default(),
                id,
            })
        })
        .collect()
}

fn attribute<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    ['"', '\''].into_iter().find_map(|quote| {
        let marker = format!(" {name}={quote}");
        let start = tag.find(&marker)? + marker.len();
        let rest = tag.get(start..)?;
        rest.find(quote).and_then(|end| rest.get(..end))
    })
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Waves reported by one realtime2 row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveObservation {
    /// Observation time (UTC).
    pub obs_time: NaiveDateTime,
    /// Significant wave height in feet.
    pub wave_height_ft: Option<f64>,
    /// Dominant period, or average period when dominant is missing.
    pub period_s: Option<f64>,
    /// Mean wave direction in degrees true.
    pub direction_deg: Option<f64>,
}

fn significant_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

fn header_columns(line: &str) -> Vec<&str> {
    line.trim_start_matches('#').split_whitespace().collect()
}

/// Whether a realtime2 file reports significant wave height.
pub fn reports_waves(text: &str) -> bool {
    let lines = significant_lines(text);
    lines.len() >= 3
        && lines
            .first()
            .is_some_and(|header| header_columns(header).contains(&"WVHT"))
}

fn reading(value: &str) -> Option<f64> {
    if MISSING_VALUES.contains(&value) {
        return None;
    }
    value.parse().ok()
}

fn expand_year(yy: i32) -> i32 {
    if yy >= 1900 {
        yy
    } else if yy < 70 {
        2000 + yy
    } else {
        1900 + yy
    }
}

/// Parse the wave columns of a realtime2 standard meteorological file.
///
/// The first line names the columns and the second gives units. At most
/// `max_rows` data rows are read, newest first as in the feed. Files missing
/// a required column yield no observations; malformed rows are skipped.
pub fn parse_realtime(text: &str, max_rows: usize) -> Vec<WaveObservation> {
    let lines = significant_lines(text);
    let Some(header) = lines.first() else {
        return Vec::new();
    };
    let columns = header_columns(header);
    let col = |name: &str| columns.iter().position(|c| *c == name);

    let (Some(wvht), Some(mwd), Some(yy), Some(month), Some(day), Some(hour)) = (
        col("WVHT"),
        col("MWD"),
        col("YY"),
        col("MM"),
        col("DD"),
        col("hh"),
    ) else {
        return Vec::new();
    };
    let (dpd, apd, minute) = (col("DPD"), col("APD"), col("mm"));
    if dpd.is_none() && apd.is_none() {
        return Vec::new();
    }

    lines
        .iter()
        .skip(2)
        .take(max_rows)
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            let int = |i: usize| parts.get(i).and_then(|p| p.parse::<u32>().ok());
            let float = |i: Option<usize>| i.and_then(|i| parts.get(i)).and_then(|p| reading(p));

            let year = expand_year(parts.get(yy)?.parse().ok()?);
            let minute = minute.and_then(int).unwrap_or(0);
            let obs_time = NaiveDate::from_ymd_opt(year, int(month)?, int(day)?)?
                .and_hms_opt(int(hour)?, minute, 0)?;
            Some(WaveObservation {
                obs_time,
                wave_height_ft: float(Some(wvht)).map(|m| m * M_TO_FT),
                period_s: float(dpd).or_else(|| float(apd)),
                direction_deg: float(Some(mwd)),
            })
        })
        .collect()
}

/// Station chosen for a sample.
#[derive(Debug, Clone, PartialEq)]
struct StationPick {
    station: NdbcStation,
    distance_nm: f64,
}

type StationText = Option<Arc<str>>;

/// The `ndbc` adapter.
#[derive(Debug)]
pub struct NdbcProvider {
    feed: Arc<dyn FeedClient>,
    config: NdbcConfig,
    stations: Mutex<Option<Arc<Vec<NdbcStation>>>>,
    texts: Mutex<HashMap<String, StationText>>,
    has_waves: Mutex<HashMap<String, bool>>,
}

impl NdbcProvider {
    /// Adapter with the default configuration.
    pub fn new(feed: Arc<dyn FeedClient>) -> Self {
        Self::with_config(feed, NdbcConfig::default())
    }

    /// Adapter with explicit configuration.
    pub fn with_config(feed: Arc<dyn FeedClient>, config: NdbcConfig) -> Self {
        Self {
            feed,
            config,
            stations: Mutex::new(None),
            texts: Mutex::new(HashMap::new()),
            has_waves: Mutex::new(HashMap::new()),
        }
    }

    fn stations(&self) -> Result<Arc<Vec<NdbcStation>>, ProviderError> {
        let mut guard = self
            .stations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(stations) = guard.as_ref() {
            return Ok(Arc::clone(stations));
        }
        let url = &self.config.active_stations_url;
        let xml = self
            .feed
            .get_text(url)?
            .ok_or_else(|| ProviderError::Unavailable {
                provider: "ndbc".to_owned(),
                message: format!("station list {url} not found"),
            })?;
        let stations = Arc::new(parse_active_stations(&xml));
        debug!("loaded {} NDBC stations", stations.len());
        *guard = Some(Arc::clone(&stations));
        Ok(stations)
    }

    fn station_text(&self, id: &str) -> Result<StationText, ProviderError> {
        memoize(&self.texts, id.to_owned(), || {
            let url = format!(
                "{}/{id}.txt",
                self.config.realtime_base_url.trim_end_matches('/')
            );
            Ok(self.feed.get_text(&url)?.map(Arc::from))
        })
    }

    fn pick_station(&self, lat: f64, lon: f64) -> Result<Option<StationPick>, ProviderError> {
        let stations = self.stations()?;
        let mut ranked: Vec<(f64, &NdbcStation)> = stations
            .iter()
            .map(|s| (haversine_nm(lat, lon, s.lat, s.lon), s))
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

        for (distance_nm, station) in ranked.into_iter().take(self.config.candidate_limit) {
            if distance_nm > self.config.max_distance_nm {
                break;
            }
            let known = self
                .has_waves
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&station.id)
                .copied();
            let has_waves = match known {
                Some(known) => known,
                None => {
                    let found = self
                        .station_text(&station.id)?
                        .is_some_and(|text| reports_waves(&text));
                    self.has_waves
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(station.id.clone(), found);
                    found
                }
            };
            if has_waves {
                return Ok(Some(StationPick {
                    station: station.clone(),
                    distance_nm,
                }));
            }
        }
        Ok(None)
    }

    fn sample(&self, pos: &SamplePosition) -> Result<EnvAtPoint, ProviderError> {
        let mut env = EnvAtPoint::empty(pos.t_local, pos.lat, pos.lon);
        env.meta.waves_source = Some("ndbc".to_owned());

        let Some(pick) = self.pick_station(pos.lat, pos.lon)? else {
            warn!(
                "no NDBC wave station within {} nm of ({}, {})",
                self.config.max_distance_nm, pos.lat, pos.lon
            );
            return Ok(env);
        };
        env.meta.ndbc_station = Some(pick.station.id.clone());
        env.meta.ndbc_distance_nm = Some((pick.distance_nm * 10.0).round() / 10.0);

        if let Some(text) = self.station_text(&pick.station.id)? {
            let observations = parse_realtime(&text, self.config.max_rows);
            let nearest = nearest_index(observations.iter().map(|o| o.obs_time), pos.t_local);
            if let Some(obs) = nearest.and_then(|i| observations.get(i)) {
                env.wave_height_ft = obs.wave_height_ft;
                env.wave_period_s = obs.period_s;
                env.wave_dir_deg = obs.direction_deg;
                env.meta.ndbc_obs_time = Some(obs.obs_time);
            }
        }
        Ok(env)
    }
}

impl EnvProvider for NdbcProvider {
    fn name(&self) -> &str {
        "ndbc"
    }

    fn get_env_series(&self, plan: &TripPlan) -> Result<EnvSeries, ProviderError> {
        plan.sample_positions()?
            .iter()
            .map(|pos| self.sample(pos))
            .collect()
    }
}
