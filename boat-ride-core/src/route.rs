//! Route normalisation: resample an irregular polyline at a fixed spacing.
//!
//! Raw routes arrive as a handful of hand-placed waypoints with wildly
//! uneven gaps. Normalising them yields points every `spacing_m` metres
//! along the great-circle path, each carrying its cumulative distance and
//! forward bearing, so that downstream consumers can locate a sample by
//! distance alone.
//!
//! # Examples
//! ```
//! use boat_ride_core::RoutePoint;
//! use boat_ride_core::route::{DEFAULT_SPACING_M, normalize_route};
//!
//! let raw = vec![RoutePoint::new(0.0, 0.0), RoutePoint::new(0.0, 0.01)];
//! let route = normalize_route(&raw, DEFAULT_SPACING_M, "demo").expect("valid spacing");
//! assert_eq!(route.points.len(), 4);
//! assert!((route.total_distance_m - 1111.95).abs() < 0.1);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{RoutePoint, Waterway};

/// Mean Earth radius used for great-circle distances.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
/// Spacing used when callers have no preference.
pub const DEFAULT_SPACING_M: f64 = 500.0;
/// Metres per nautical mile.
pub const METRES_PER_NM: f64 = 1852.0;

/// Errors raised while normalising a route.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    /// Spacing was zero, negative, or not a number.
    #[error("route spacing must be a positive finite number of metres, got {spacing_m}")]
    InvalidSpacing {
        /// The rejected spacing.
        spacing_m: f64,
    },
}

/// One resampled point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPoint {
    /// Position in the resampled sequence.
    pub index: usize,
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
    /// Distance from the start of the route in metres.
    pub cum_dist_m: f64,
    /// Distance from the previous resampled point in metres.
    pub seg_dist_m: f64,
    /// Initial bearing toward the next point, degrees true.
    pub bearing_deg_true: f64,
    /// Waterway tag inherited from the bracketing raw waypoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waterway: Option<Waterway>,
}

/// A route resampled at a fixed spacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRoute {
    /// Caller-supplied identifier.
    pub route_id: String,
    /// Requested spacing between points in metres.
    pub spacing_m: f64,
    /// Great-circle length of the raw polyline in metres.
    pub total_distance_m: f64,
    /// Resampled points, ordered by cumulative distance.
    pub points: Vec<NormalizedPoint>,
    /// Digest of the raw coordinates, absent for empty routes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_hash: Option<String>,
}

impl NormalizedRoute {
    /// Number of resampled points.
    pub fn point_count(&self) -> usize {
        self.points.len()
    }
}

/// Great-circle distance between two points in metres.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1r, lat2r) = (lat1.to_radians(), lat2.to_radians());
    let dlat = lat2r - lat1r;
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2) + lat1r.cos() * lat2r.cos() * (dlon / 2.0).sin().powi(2);
    EARTH_RADIUS_M * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Initial bearing from the first point toward the second, in `[0, 360)`.
pub fn bearing_deg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1r, lat2r) = (lat1.to_radians(), lat2.to_radians());
    let dlon = (lon2 - lon1).to_radians();
    let x = dlon.sin() * lat2r.cos();
    let y = lat1r.cos() * lat2r.sin() - lat1r.sin() * lat2r.cos() * dlon.cos();
    (x.atan2(y).to_degrees() + 360.0) % 360.0
}

/// Cumulative great-circle distance at each raw waypoint.
pub fn cumulative_distances(points: &[RoutePoint]) -> Vec<f64> {
    let mut cum = Vec::with_capacity(points.len());
    let mut total = 0.0;
    let mut previous: Option<&RoutePoint> = None;
    for point in points {
        if let Some(prev) = previous {
            total += haversine_m(prev.lat, prev.lon, point.lat, point.lon);
        }
        cum.push(total);
        previous = Some(point);
    }
    cum
}

/// Stable 12-hex-digit digest of the raw coordinates.
///
/// FNV-1a over the little-endian bits of each latitude/longitude pair.
pub fn route_hash(points: &[RoutePoint]) -> String {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let digest = points
        .iter()
        .flat_map(|p| [p.lat.to_bits(), p.lon.to_bits()])
        .flat_map(u64::to_le_bytes)
        .fold(OFFSET, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(PRIME)
        });
    let hex = format!("{digest:016x}");
    hex.chars().take(12).collect()
}

/// Resample `raw` every `spacing_m` metres.
///
/// Empty input yields an empty route and a zero-length route collapses to a
/// single point with bearing 0. Otherwise points are produced at every
/// multiple of `spacing_m` up to the total distance, with the exact end of
/// the route always included.
pub fn normalize_route(
    raw: &[RoutePoint],
    spacing_m: f64,
    route_id: impl Into<String>,
) -> Result<NormalizedRoute, RouteError> {
    if !spacing_m.is_finite() || spacing_m <= 0.0 {
        return Err(RouteError::InvalidSpacing { spacing_m });
    }
    let route_id = route_id.into();
    let Some(first) = raw.first() else {
        return Ok(NormalizedRoute {
            route_id,
            spacing_m,
            total_distance_m: 0.0,
            points: Vec::new(),
            source_hash: None,
        });
    };

    let cum = cumulative_distances(raw);
    let total = cum.last().copied().unwrap_or(0.0);
    let source_hash = Some(route_hash(raw));

    if total <= 0.0 {
        return Ok(NormalizedRoute {
            route_id,
            spacing_m,
            total_distance_m: 0.0,
            points: vec![NormalizedPoint {
                index: 0,
                lat: first.lat,
                lon: first.lon,
                cum_dist_m: 0.0,
                seg_dist_m: 0.0,
                bearing_deg_true: 0.0,
                waterway: first.waterway,
            }],
            source_hash,
        });
    }

    let targets = target_distances(total, spacing_m);
    let mut points = Vec::with_capacity(targets.len());
    let mut segment = 0_usize;
    let mut previous_target = 0.0;
    let last_segment = raw.len().saturating_sub(2);

    for (index, &target) in targets.iter().enumerate() {
        while segment < last_segment && cum.get(segment + 1).is_some_and(|&d| d < target) {
            segment += 1;
        }
        let a = raw.get(segment).unwrap_or(first);
        let b = raw.get(segment + 1).unwrap_or(a);
        let start = cum.get(segment).copied().unwrap_or(0.0);
        let end = cum.get(segment + 1).copied().unwrap_or(start);
        let length = end - start;
        let frac = if length > 0.0 {
            ((target - start) / length).clamp(0.0, 1.0)
        } else {
            0.0
        };
        points.push(NormalizedPoint {
            index,
            lat: a.lat + frac * (b.lat - a.lat),
            lon: a.lon + frac * (b.lon - a.lon),
            cum_dist_m: target,
            seg_dist_m: target - previous_target,
            bearing_deg_true: 0.0,
            waterway: a.waterway.or(b.waterway),
        });
        previous_target = target;
    }

    assign_bearings(&mut points);

    Ok(NormalizedRoute {
        route_id,
        spacing_m,
        total_distance_m: total,
        points,
        source_hash,
    })
}

fn target_distances(total: f64, spacing_m: f64) -> Vec<f64> {
    // Multiply rather than accumulate so long routes do not drift.
    let mut targets: Vec<f64> = (0_u32..)
        .map(|i| f64::from(i) * spacing_m)
        .take_while(|&d| d <= total)
        .collect();
    if targets.last().is_none_or(|&d| d < total) {
        targets.push(total);
    }
    targets
}

fn assign_bearings(points: &mut [NormalizedPoint]) {
    let coords: Vec<(f64, f64)> = points.iter().map(|p| (p.lat, p.lon)).collect();
    for (i, point) in points.iter_mut().enumerate() {
        let pair = match (coords.get(i), coords.get(i + 1)) {
            (Some(&here), Some(&next)) => Some((here, next)),
            (Some(&here), None) => i
                .checked_sub(1)
                .and_then(|p| coords.get(p))
                .map(|&prev| (prev, here)),
            _ => None,
        };
        point.bearing_deg_true = pair.map_or(0.0, |((lat1, lon1), (lat2, lon2))| {
            bearing_deg(lat1, lon1, lat2, lon2)
        });
    }
}
