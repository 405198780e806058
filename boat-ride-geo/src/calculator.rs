//! Ray-cast fetch against a coastline.
//!
//! From each point, sixteen rays are cast at 22.5° intervals out to 50 nm.
//! The distance to the first shoreline crossing along each ray is that
//! direction's fetch. Distances are measured in degrees and converted at
//! 60 nm per degree, a planar approximation that ignores the narrowing of
//! longitude degrees away from the equator.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use boat_ride_core::FetchResult;
use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use geo::{Coord, Line, Rect};
use log::debug;

use crate::Coastline;

/// Number of rays cast from each point.
pub const NUM_RAYS: u32 = 16;
/// Angle between consecutive rays.
pub const RAY_STEP_DEG: f64 = 360.0 / 16.0;
/// Length of each ray; also the fetch reported when nothing is hit.
pub const MAX_RAY_NM: f64 = 50.0;
/// Nautical miles per degree of arc.
pub const NM_PER_DEG: f64 = 60.0;
/// Smallest fetch reported for a ray that hits land.
pub const MIN_HIT_NM: f64 = 0.01;

const MAX_RAY_DEG: f64 = MAX_RAY_NM / NM_PER_DEG;
const BBOX_BUFFER_DEG: f64 = MAX_RAY_DEG + 0.1;
/// Fetch results are cached per point rounded to this many degrees.
const POINT_KEY_SCALE: f64 = 1e5;

type Clip = Arc<Vec<Line<f64>>>;

/// Computes [`FetchResult`]s for points near a coastline.
///
/// Clipped shoreline and per-point results are cached for the lifetime of
/// the calculator and never evicted, so a calculator should live for one run.
/// The caches sit behind mutexes so one calculator can be shared between
/// adapters.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use boat_ride_geo::{Coastline, FetchCalculator};
/// use geo::LineString;
///
/// // A north-south shore one nautical mile east of the origin.
/// let shore = LineString::from(vec![(1.0 / 60.0, -1.0), (1.0 / 60.0, 1.0)]);
/// let calc = FetchCalculator::new(Arc::new(Coastline::from_line_strings(vec![shore])));
/// let result = calc.compute_fetch(0.0, 0.0);
/// assert!((result.min_fetch_nm - 1.0).abs() < 1e-6);
/// assert_eq!(result.max_fetch_nm, 50.0);
/// ```
#[derive(Debug)]
pub struct FetchCalculator {
    coastline: Arc<Coastline>,
    clip_cache: Mutex<HashMap<String, Clip>>,
    fetch_cache: Mutex<HashMap<(i64, i64), Arc<FetchResult>>>,
}

impl FetchCalculator {
    /// Create a calculator over `coastline`.
    pub fn new(coastline: Arc<Coastline>) -> Self {
        Self {
            coastline,
            clip_cache: Mutex::new(HashMap::new()),
            fetch_cache: Mutex::new(HashMap::new()),
        }
    }

    /// The coastline rays are cast against.
    pub fn coastline(&self) -> &Arc<Coastline> {
        &self.coastline
    }

    /// Number of points whose fetch is cached.
    pub fn cached_points(&self) -> usize {
        self.fetch_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Fetch in every ray direction from `(lat, lon)`.
    pub fn compute_fetch(&self, lat: f64, lon: f64) -> Arc<FetchResult> {
        if let Some(cached) = self.cached(lat, lon) {
            return cached;
        }
        let clip = self.clip(bbox_around(&[(lat, lon)]));
        self.cast_and_store(&clip, lat, lon)
    }

    /// Fetch for many `(lat, lon)` points, clipping the coastline once.
    ///
    /// Results are returned in input order.
    pub fn compute_fetch_batch(&self, points: &[(f64, f64)]) -> Vec<Arc<FetchResult>> {
        if points.is_empty() {
            return Vec::new();
        }
        let clip = self.clip(bbox_around(points));
        points
            .iter()
            .map(|&(lat, lon)| {
                self.cached(lat, lon)
                    .unwrap_or_else(|| self.cast_and_store(&clip, lat, lon))
            })
            .collect()
    }

    fn cached(&self, lat: f64, lon: f64) -> Option<Arc<FetchResult>> {
        let cache = self
            .fetch_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        cache.get(&point_key(lat, lon)).cloned()
    }

    fn cast_and_store(&self, clip: &[Line<f64>], lat: f64, lon: f64) -> Arc<FetchResult> {
        let result = Arc::new(cast_rays(clip, lat, lon));
        self.fetch_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(point_key(lat, lon), Arc::clone(&result));
        result
    }

    fn clip(&self, rect: Rect<f64>) -> Clip {
        let key = clip_key(&rect);
        let mut cache = self
            .clip_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(clip) = cache.get(&key) {
            debug!("coastline clip cache hit for {key}");
            return Arc::clone(clip);
        }
        let clip = Arc::new(self.coastline.segments_in(&rect));
        debug!("clipped {} coastline segments for {key}", clip.len());
        cache.insert(key, Arc::clone(&clip));
        clip
    }
}

fn point_key(lat: f64, lon: f64) -> (i64, i64) {
    (
        (lat * POINT_KEY_SCALE).round() as i64,
        (lon * POINT_KEY_SCALE).round() as i64,
    )
}

fn clip_key(rect: &Rect<f64>) -> String {
    format!(
        "{:.2},{:.2},{:.2},{:.2}",
        rect.min().x,
        rect.min().y,
        rect.max().x,
        rect.max().y
    )
}

fn bbox_around(points: &[(f64, f64)]) -> Rect<f64> {
    let (min_lat, max_lat, min_lon, max_lon) = points.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
        |(lo_lat, hi_lat, lo_lon, hi_lon), &(lat, lon)| {
            (lo_lat.min(lat), hi_lat.max(lat), lo_lon.min(lon), hi_lon.max(lon))
        },
    );
    Rect::new(
        Coord {
            x: min_lon - BBOX_BUFFER_DEG,
            y: min_lat - BBOX_BUFFER_DEG,
        },
        Coord {
            x: max_lon + BBOX_BUFFER_DEG,
            y: max_lat + BBOX_BUFFER_DEG,
        },
    )
}

/// Cast every ray from `(lat, lon)` against `clip`.
pub fn cast_rays(clip: &[Line<f64>], lat: f64, lon: f64) -> FetchResult {
    let origin = Coord { x: lon, y: lat };
    FetchResult::from_directions((0..NUM_RAYS).map(|i| {
        let direction = f64::from(i) * RAY_STEP_DEG;
        let rad = direction.to_radians();
        let end = Coord {
            x: lon + MAX_RAY_DEG * rad.sin(),
            y: lat + MAX_RAY_DEG * rad.cos(),
        };
        let fetch = nearest_hit_deg(Line::new(origin, end), clip)
            .map_or(MAX_RAY_NM, |deg| (deg * NM_PER_DEG).clamp(MIN_HIT_NM, MAX_RAY_NM));
        (direction, fetch)
    }))
}

fn nearest_hit_deg(ray: Line<f64>, clip: &[Line<f64>]) -> Option<f64> {
    let origin = ray.start;
    let distance = |c: Coord<f64>| (c.x - origin.x).hypot(c.y - origin.y);
    clip.iter()
        .filter_map(|segment| match line_intersection(ray, *segment)? {
            LineIntersection::SinglePoint { intersection, .. } => Some(distance(intersection)),
            LineIntersection::Collinear { intersection } => {
                Some(distance(intersection.start).min(distance(intersection.end)))
            }
        })
        .reduce(f64::min)
}
