//! Sample schedule: when each sample is taken and where the boat is then.
//!
//! The boat is assumed to progress uniformly along the route over the trip
//! window, so a sample taken a quarter of the way through the window sits a
//! quarter of the way along the route's great-circle length.

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::route::{DEFAULT_SPACING_M, cumulative_distances, normalize_route};
use crate::{RoutePoint, TripPlan, TripPlanError, Waterway};

/// Where the boat is expected to be at one sample time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePosition {
    /// Local sample time.
    pub t_local: NaiveDateTime,
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
    /// Course over ground in degrees true.
    pub route_heading_deg: f64,
    /// Fetch interpolated between waypoint overrides, in nautical miles.
    pub fetch_override_nm: f64,
    /// Whether either bracketing waypoint set an explicit fetch.
    pub fetch_overridden: bool,
    /// Waterway tag from the bracketing waypoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waterway: Option<Waterway>,
    /// Water depth from the bracketing waypoints, in metres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_m: Option<f64>,
}

impl TripPlan {
    /// Every sample time from start to end inclusive.
    ///
    /// ```
    /// use boat_ride_core::{BoatProfile, RoutePoint, TripPlan};
    ///
    /// let plan = TripPlan::new(
    ///     BoatProfile::default(),
    ///     vec![RoutePoint::new(0.0, 0.0)],
    ///     "2026-01-22 08:00",
    ///     "2026-01-22 08:40",
    /// )
    /// .with_sample_every_minutes(15);
    /// let times = plan.sample_times().expect("valid plan");
    /// assert_eq!(times.len(), 3);
    /// ```
    pub fn sample_times(&self) -> Result<Vec<NaiveDateTime>, TripPlanError> {
        if self.sample_every_minutes == 0 {
            return Err(TripPlanError::ZeroSampleInterval);
        }
        let start = self.start()?;
        let end = self.end()?;
        if end < start {
            return Err(TripPlanError::EndBeforeStart { start, end });
        }
        let step = TimeDelta::minutes(i64::from(self.sample_every_minutes));
        let mut times = Vec::new();
        let mut t = start;
        while t <= end {
            times.push(t);
            t += step;
        }
        Ok(times)
    }

    /// Position, heading and local context at every sample time.
    pub fn sample_positions(&self) -> Result<Vec<SamplePosition>, TripPlanError> {
        let Some(first) = self.route.first() else {
            return Err(TripPlanError::EmptyRoute);
        };
        let times = self.sample_times()?;
        let (Some(&start), Some(&end)) = (times.first(), times.last()) else {
            return Ok(Vec::new());
        };

        let cum = cumulative_distances(&self.route);
        let total = cum.last().copied().unwrap_or(0.0);
        if total <= 0.0 {
            return Ok(times
                .into_iter()
                .map(|t_local| self.position_between(t_local, first, first, 0.0, 0.0))
                .collect());
        }

        let normalized = normalize_route(&self.route, DEFAULT_SPACING_M, self.trip_id.as_str())?;
        let window_s = ((end - start).num_seconds() as f64).max(1.0);

        Ok(times
            .into_iter()
            .map(|t_local| {
                let elapsed_s = (t_local - start).num_seconds() as f64;
                let target = (elapsed_s / window_s).clamp(0.0, 1.0) * total;
                let (segment, u) = locate(&cum, target);
                let a = self.route.get(segment).unwrap_or(first);
                let b = self.route.get(segment + 1).unwrap_or(a);
                let heading = normalized
                    .points
                    .iter()
                    .take_while(|p| p.cum_dist_m <= target)
                    .last()
                    .map_or(0.0, |p| p.bearing_deg_true);
                self.position_between(t_local, a, b, u, heading)
            })
            .collect())
    }

    fn position_between(
        &self,
        t_local: NaiveDateTime,
        a: &RoutePoint,
        b: &RoutePoint,
        u: f64,
        route_heading_deg: f64,
    ) -> SamplePosition {
        let fetch_a = a.fetch_nm.unwrap_or(self.default_fetch_nm);
        let fetch_b = b.fetch_nm.unwrap_or(self.default_fetch_nm);
        let depth_m = match (a.depth_m, b.depth_m) {
            (Some(da), Some(db)) => Some(da + u * (db - da)),
            (da, db) => da.or(db),
        };
        SamplePosition {
            t_local,
            lat: a.lat + u * (b.lat - a.lat),
            lon: a.lon + u * (b.lon - a.lon),
            route_heading_deg,
            fetch_override_nm: fetch_a + u * (fetch_b - fetch_a),
            fetch_overridden: a.fetch_nm.is_some() || b.fetch_nm.is_some(),
            waterway: a.waterway.or(b.waterway),
            depth_m,
        }
    }
}

/// Raw segment containing `target` metres and the fraction along it.
fn locate(cum: &[f64], target: f64) -> (usize, f64) {
    let last_segment = cum.len().saturating_sub(2);
    let segment = cum
        .iter()
        .skip(1)
        .position(|&d| d >= target)
        .unwrap_or(last_segment)
        .min(last_segment);
    let start = cum.get(segment).copied().unwrap_or(0.0);
    let end = cum.get(segment + 1).copied().unwrap_or(start);
    let u = if end > start {
        ((target - start) / (end - start)).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (segment, u)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BoatProfile;
    use rstest::{fixture, rstest};

    #[fixture]
    fn plan() -> TripPlan {
        TripPlan::new(
            BoatProfile::default(),
            vec![
                RoutePoint::new(0.0, 0.0).with_fetch_nm(1.0),
                RoutePoint::new(0.0, 0.1).with_fetch_nm(3.0),
            ],
            "2026-01-22 08:00",
            "2026-01-22 09:00",
        )
        .with_sample_every_minutes(30)
    }

    #[rstest]
    fn zero_length_window_has_one_sample(mut plan: TripPlan) {
        plan.end_time_local = plan.start_time_local.clone();
        let times = plan.sample_times().expect("valid plan");
        assert_eq!(times.len(), 1);
    }

    #[rstest]
    fn positions_progress_along_the_route(plan: TripPlan) {
        let positions = plan.sample_positions().expect("valid plan");
        let lons: Vec<f64> = positions.iter().map(|p| p.lon).collect();
        assert_eq!(lons.len(), 3);
        assert!(lons.first().is_some_and(|&lon| lon.abs() < 1e-9));
        assert!(lons.get(1).is_some_and(|&lon| (lon - 0.05).abs() < 1e-6));
        assert!(lons.last().is_some_and(|&lon| (lon - 0.1).abs() < 1e-9));
        for p in &positions {
            assert!((p.route_heading_deg - 90.0).abs() < 1e-3);
        }
    }

    #[rstest]
    fn fetch_override_is_interpolated(plan: TripPlan) {
        let positions = plan.sample_positions().expect("valid plan");
        let mid = positions.get(1).expect("three samples");
        assert!((mid.fetch_override_nm - 2.0).abs() < 1e-6);
        assert!(mid.fetch_overridden);
    }

    #[rstest]
    fn missing_override_uses_default(mut plan: TripPlan) {
        for point in &mut plan.route {
            point.fetch_nm = None;
        }
        let plan = plan.with_default_fetch_nm(4.5);
        let positions = plan.sample_positions().expect("valid plan");
        assert!(positions.iter().all(|p| (p.fetch_override_nm - 4.5).abs() < 1e-9));
        assert!(positions.iter().all(|p| !p.fetch_overridden));
    }

    #[rstest]
    fn single_point_route_pins_every_sample(mut plan: TripPlan) {
        plan.route.truncate(1);
        let positions = plan.sample_positions().expect("valid plan");
        assert_eq!(positions.len(), 3);
        assert!(positions.iter().all(|p| p.lat == 0.0 && p.lon == 0.0));
        assert!(positions.iter().all(|p| p.route_heading_deg == 0.0));
    }

    #[rstest]
    fn empty_route_is_an_error(mut plan: TripPlan) {
        plan.route.clear();
        assert_eq!(plan.sample_positions(), Err(TripPlanError::EmptyRoute));
    }
}
