//! Fetch distances and the waterway classification derived from them.
//!
//! Fetch is the stretch of open water the wind can blow across before
//! reaching a point. `boat-ride-geo` measures it by ray-casting against a
//! coastline; this module holds the result type and the pure functions the
//! fusion engine applies to it.
//!
//! # Examples
//! ```
//! use boat_ride_core::{FetchResult, Waterway};
//!
//! let result = FetchResult::from_directions(vec![(0.0, 2.0), (90.0, 30.0)]);
//! assert_eq!(result.min_fetch_nm, 2.0);
//! assert_eq!(result.waterway, Waterway::Inland);
//! ```

use serde::{Deserialize, Serialize};

/// Minimum fetch (nm) below which water counts as inland.
pub const INLAND_FETCH_NM: f64 = 3.0;
/// Minimum fetch (nm) below which water counts as coastal.
pub const COASTAL_FETCH_NM: f64 = 20.0;
/// Half-width of the directional window used by [`effective_fetch`].
pub const EFFECTIVE_FETCH_HALF_WIDTH_DEG: f64 = 45.0;

/// Broad exposure class of a body of water.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waterway {
    /// Rivers, creeks and small bays.
    Inland,
    /// Sounds and nearshore waters.
    Coastal,
    /// Open ocean.
    Offshore,
}

impl Waterway {
    /// Return the waterway as a lowercase `&str`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inland => "inland",
            Self::Coastal => "coastal",
            Self::Offshore => "offshore",
        }
    }

    /// Classify water by its minimum fetch.
    ///
    /// ```
    /// use boat_ride_core::Waterway;
    ///
    /// assert_eq!(Waterway::classify(2.9), Waterway::Inland);
    /// assert_eq!(Waterway::classify(3.0), Waterway::Coastal);
    /// assert_eq!(Waterway::classify(20.0), Waterway::Offshore);
    /// ```
    pub fn classify(min_fetch_nm: f64) -> Self {
        if min_fetch_nm < INLAND_FETCH_NM {
            Self::Inland
        } else if min_fetch_nm < COASTAL_FETCH_NM {
            Self::Coastal
        } else {
            Self::Offshore
        }
    }
}

impl std::fmt::Display for Waterway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Waterway {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inland" => Ok(Self::Inland),
            "coastal" => Ok(Self::Coastal),
            "offshore" => Ok(Self::Offshore),
            _ => Err(format!("unknown waterway '{s}'")),
        }
    }
}

/// Fetch along one compass bearing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalFetch {
    /// Ray bearing in degrees true.
    pub direction_deg: f64,
    /// Open-water distance in nautical miles.
    pub fetch_nm: f64,
}

/// Fetch measured along a fan of rays from one point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
    /// Per-ray fetch, in ray order.
    pub directions: Vec<DirectionalFetch>,
    /// Shortest ray.
    pub min_fetch_nm: f64,
    /// Longest ray.
    pub max_fetch_nm: f64,
    /// Classification of [`FetchResult::min_fetch_nm`].
    pub waterway: Waterway,
}

impl FetchResult {
    /// Build a result from `(direction_deg, fetch_nm)` pairs.
    ///
    /// An empty list produces zero fetch classified as inland.
    pub fn from_directions<I>(directions: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let directions: Vec<DirectionalFetch> = directions
            .into_iter()
            .map(|(direction_deg, fetch_nm)| DirectionalFetch {
                direction_deg,
                fetch_nm,
            })
            .collect();
        let (min_fetch_nm, max_fetch_nm) = if directions.is_empty() {
            (0.0, 0.0)
        } else {
            directions.iter().fold((f64::INFINITY, 0.0_f64), |(lo, hi), d| {
                (lo.min(d.fetch_nm), hi.max(d.fetch_nm))
            })
        };
        Self {
            directions,
            min_fetch_nm,
            max_fetch_nm,
            waterway: Waterway::classify(min_fetch_nm),
        }
    }
}

/// Smallest angle between two bearings, in `[0, 180]`.
pub fn angular_difference_deg(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs() % 360.0;
    if diff > 180.0 { 360.0 - diff } else { diff }
}

/// Wind-weighted fetch for a given wind direction.
///
/// Rays within 45° of the wind direction contribute with `cos²` of their
/// angular offset. With no contributing ray the minimum fetch is returned.
///
/// ```
/// use boat_ride_core::FetchResult;
/// use boat_ride_core::fetch::effective_fetch;
///
/// let result = FetchResult::from_directions(vec![(0.0, 10.0), (180.0, 1.0)]);
/// assert_eq!(effective_fetch(&result, 0.0), 10.0);
/// assert_eq!(effective_fetch(&result, 90.0), 1.0);
/// ```
pub fn effective_fetch(result: &FetchResult, wind_dir_deg: f64) -> f64 {
    let (weighted_sum, total_weight) =
        result
            .directions
            .iter()
            .fold((0.0, 0.0), |(sum, total), ray| {
                let diff = angular_difference_deg(ray.direction_deg, wind_dir_deg);
                if diff > EFFECTIVE_FETCH_HALF_WIDTH_DEG {
                    return (sum, total);
                }
                let weight = diff.to_radians().cos().powi(2);
                (sum + weight * ray.fetch_nm, total + weight)
            });
    if total_weight <= 0.0 {
        result.min_fetch_nm
    } else {
        weighted_sum / total_weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sixteen_rays(fetch: impl Fn(f64) -> f64) -> FetchResult {
        FetchResult::from_directions((0..16).map(|i| {
            let direction = f64::from(i) * 22.5;
            (direction, fetch(direction))
        }))
    }

    #[rstest]
    #[case(0.0, Waterway::Inland)]
    #[case(2.99, Waterway::Inland)]
    #[case(3.0, Waterway::Coastal)]
    #[case(19.99, Waterway::Coastal)]
    #[case(20.0, Waterway::Offshore)]
    fn classification_boundaries(#[case] fetch: f64, #[case] expected: Waterway) {
        assert_eq!(Waterway::classify(fetch), expected);
    }

    #[rstest]
    #[case(10.0, 350.0, 20.0)]
    #[case(0.0, 180.0, 180.0)]
    #[case(720.0, 45.0, 45.0)]
    fn angular_difference_wraps(#[case] a: f64, #[case] b: f64, #[case] expected: f64) {
        assert!((angular_difference_deg(a, b) - expected).abs() < 1e-9);
    }

    #[rstest]
    fn uniform_fetch_is_its_own_average() {
        let result = sixteen_rays(|_| 7.5);
        for wind in [0.0, 33.0, 200.0, 359.0] {
            assert!((effective_fetch(&result, wind) - 7.5).abs() < 1e-9);
        }
    }

    #[rstest]
    fn weighting_favours_rays_near_the_wind() {
        // Long fetch to the north only.
        let result = sixteen_rays(|d| if d == 0.0 { 40.0 } else { 1.0 });
        let north = effective_fetch(&result, 0.0);
        let offset = effective_fetch(&result, 30.0);
        assert!(north > offset, "north {north} should exceed offset {offset}");
        assert!(offset > 1.0);
    }

    #[rstest]
    fn empty_result_falls_back_to_minimum() {
        let result = FetchResult::from_directions(Vec::new());
        assert_eq!(result.min_fetch_nm, 0.0);
        assert_eq!(effective_fetch(&result, 90.0), 0.0);
    }

    #[rstest]
    fn waterway_parses_case_insensitively() {
        assert_eq!("Coastal".parse::<Waterway>(), Ok(Waterway::Coastal));
        assert!("lake".parse::<Waterway>().is_err());
    }
}
