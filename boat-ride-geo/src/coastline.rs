//! Coastline geometry indexed for bounding-box queries.
//!
//! Shorelines are stored as individual line segments in an R\*-tree so that
//! the fetch calculator can pull out just the handful of segments around a
//! sample point. Coordinates are longitude (`x`) and latitude (`y`) in
//! decimal degrees.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use camino::{Utf8Path, Utf8PathBuf};
use geo::{Coord, Line, LineString, Rect};
use log::{debug, info};
use rstar::{AABB, RTree, RTreeObject};
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading a coastline.
#[derive(Debug, Error)]
pub enum CoastlineError {
    /// The file could not be read.
    #[error("failed to read coastline from {path}: {source}")]
    Io {
        /// Coastline file.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file was not valid GeoJSON.
    #[error("failed to decode coastline GeoJSON from {path}: {source}")]
    Decode {
        /// Coastline file.
        path: Utf8PathBuf,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
    /// An in-memory document was not valid GeoJSON.
    #[error("invalid coastline GeoJSON: {0}")]
    Parse(#[source] serde_json::Error),
}

/// One straight piece of shoreline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoastSegment(pub Line<f64>);

impl RTreeObject for CoastSegment {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        let Line { start, end } = self.0;
        AABB::from_corners([start.x, start.y], [end.x, end.y])
    }
}

/// Immutable, spatially indexed shoreline.
///
/// # Examples
///
/// ```
/// use boat_ride_geo::Coastline;
/// use geo::{LineString, Rect, coord};
///
/// let coast = Coastline::from_line_strings(vec![LineString::from(vec![(0.0, 1.0), (1.0, 1.0)])]);
/// let near = Rect::new(coord! { x: 0.0, y: 0.5 }, coord! { x: 0.5, y: 1.5 });
/// assert_eq!(coast.segments_in(&near).len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct Coastline {
    index: RTree<CoastSegment>,
}

impl Coastline {
    /// Index every segment of `lines`.
    pub fn from_line_strings<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = LineString<f64>>,
    {
        let segments: Vec<CoastSegment> = lines
            .into_iter()
            .flat_map(|line| line.lines().map(CoastSegment).collect::<Vec<_>>())
            .filter(|segment| segment.0.start != segment.0.end)
            .collect();
        Self {
            index: RTree::bulk_load(segments),
        }
    }

    /// Parse a GeoJSON document.
    ///
    /// Line strings and polygon rings become shoreline; points and unknown
    /// geometry types are ignored.
    pub fn from_geojson_str(text: &str) -> Result<Self, CoastlineError> {
        let document: GeoJson = serde_json::from_str(text).map_err(CoastlineError::Parse)?;
        Ok(Self::from_document(document))
    }

    /// Read and parse a GeoJSON file.
    pub fn load_geojson(path: &Utf8Path) -> Result<Self, CoastlineError> {
        let text = boat_ride_fs::read_to_string(path).map_err(|source| CoastlineError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document: GeoJson =
            serde_json::from_str(&text).map_err(|source| CoastlineError::Decode {
                path: path.to_path_buf(),
                source,
            })?;
        let coastline = Self::from_document(document);
        info!(
            "loaded {} coastline segments from {path}",
            coastline.segment_count()
        );
        Ok(coastline)
    }

    fn from_document(document: GeoJson) -> Self {
        let mut lines = Vec::new();
        document.collect_lines(&mut lines);
        Self::from_line_strings(lines)
    }

    /// Number of indexed segments.
    pub fn segment_count(&self) -> usize {
        self.index.size()
    }

    /// Whether the coastline has no segments.
    pub fn is_empty(&self) -> bool {
        self.index.size() == 0
    }

    /// Segments whose bounding boxes intersect `rect`.
    pub fn segments_in(&self, rect: &Rect<f64>) -> Vec<Line<f64>> {
        let envelope =
            AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);
        self.index
            .locate_in_envelope_intersecting(&envelope)
            .map(|segment| segment.0)
            .collect()
    }
}

/// A coastline file loaded on first use and shared afterwards.
#[derive(Debug)]
pub struct SharedCoastline {
    path: Utf8PathBuf,
    cell: OnceLock<Arc<Coastline>>,
    loading: Mutex<()>,
}

impl SharedCoastline {
    /// Defer loading `path` until [`SharedCoastline::get`] is first called.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            cell: OnceLock::new(),
            loading: Mutex::new(()),
        }
    }

    /// Path the coastline is loaded from.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Load the coastline if needed and return a shared handle.
    ///
    /// Concurrent first callers wait for a single load. A failed load is not
    /// cached; the next call retries.
    pub fn get(&self) -> Result<Arc<Coastline>, CoastlineError> {
        if let Some(coastline) = self.cell.get() {
            debug!("coastline {} already loaded", self.path);
            return Ok(Arc::clone(coastline));
        }
        let _guard = self.loading.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(coastline) = self.cell.get() {
            return Ok(Arc::clone(coastline));
        }
        let loaded = Arc::new(Coastline::load_geojson(&self.path)?);
        Ok(Arc::clone(self.cell.get_or_init(|| loaded)))
    }

    /// Whether the coastline has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }
}

type Position = Vec<f64>;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum GeoJson {
    FeatureCollection {
        features: Vec<GeoJson>,
    },
    Feature {
        geometry: Option<Box<GeoJson>>,
    },
    GeometryCollection {
        geometries: Vec<GeoJson>,
    },
    LineString {
        coordinates: Vec<Position>,
    },
    MultiLineString {
        coordinates: Vec<Vec<Position>>,
    },
    Polygon {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
    #[serde(other)]
    Other,
}

impl GeoJson {
    fn collect_lines(self, out: &mut Vec<LineString<f64>>) {
        match self {
            Self::FeatureCollection { features } => {
                features.into_iter().for_each(|f| f.collect_lines(out));
            }
            Self::Feature { geometry } => {
                if let Some(geometry) = geometry {
                    geometry.collect_lines(out);
                }
            }
            Self::GeometryCollection { geometries } => {
                geometries.into_iter().for_each(|g| g.collect_lines(out));
            }
            Self::LineString { coordinates } => out.push(to_line_string(&coordinates)),
            Self::MultiLineString { coordinates } | Self::Polygon { coordinates } => {
                out.extend(coordinates.iter().map(|line| to_line_string(line)));
            }
            Self::MultiPolygon { coordinates } => {
                out.extend(
                    coordinates
                        .iter()
                        .flatten()
                        .map(|ring| to_line_string(ring)),
                );
            }
            Self::Other => {}
        }
    }
}

fn to_line_string(positions: &[Position]) -> LineString<f64> {
    positions
        .iter()
        .filter_map(|p| match p.as_slice() {
            [x, y, ..] => Some(Coord { x: *x, y: *y }),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::coord;
    use rstest::rstest;

    fn rect(min: (f64, f64), max: (f64, f64)) -> Rect<f64> {
        Rect::new(coord! { x: min.0, y: min.1 }, coord! { x: max.0, y: max.1 })
    }

    #[rstest]
    fn indexes_each_segment() {
        let coast = Coastline::from_line_strings(vec![LineString::from(vec![
            (0.0, 0.0),
            (1.0, 0.0),
            (1.0, 1.0),
        ])]);
        assert_eq!(coast.segment_count(), 2);
        assert_eq!(coast.segments_in(&rect((0.9, 0.5), (1.1, 0.6))).len(), 1);
        assert!(coast.segments_in(&rect((5.0, 5.0), (6.0, 6.0))).is_empty());
    }

    #[rstest]
    fn degenerate_segments_are_dropped() {
        let coast =
            Coastline::from_line_strings(vec![LineString::from(vec![(0.0, 0.0), (0.0, 0.0)])]);
        assert!(coast.is_empty());
    }

    #[rstest]
    fn geojson_geometries_are_flattened() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {}, "geometry":
                    {"type": "LineString", "coordinates": [[0, 0], [1, 0]]}},
                {"type": "Feature", "properties": {}, "geometry":
                    {"type": "Polygon", "coordinates": [[[0, 0], [0, 1], [1, 1], [0, 0]]]}},
                {"type": "Feature", "properties": {}, "geometry":
                    {"type": "Point", "coordinates": [3, 3]}},
                {"type": "Feature", "properties": {}, "geometry": null}
            ]
        }"#;
        let coast = Coastline::from_geojson_str(text).expect("valid GeoJSON");
        assert_eq!(coast.segment_count(), 4);
    }

    #[rstest]
    fn bare_multilinestring_is_accepted() {
        let text = r#"{"type": "MultiLineString",
            "coordinates": [[[0, 0, 5], [0, 1, 5]], [[2, 2], [3, 3]]]}"#;
        let coast = Coastline::from_geojson_str(text).expect("valid GeoJSON");
        assert_eq!(coast.segment_count(), 2);
    }

    #[rstest]
    fn malformed_document_is_rejected() {
        let err = Coastline::from_geojson_str("{\"type\": \"LineString\"}")
            .expect_err("coordinates are required");
        assert!(matches!(err, CoastlineError::Parse(_)));
    }

    #[rstest]
    fn concurrent_first_callers_share_one_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("shore.geojson"))
            .expect("utf-8 path");
        std::fs::write(
            &path,
            r#"{"type": "LineString", "coordinates": [[0, 0], [0, 1]]}"#,
        )
        .expect("write coastline");
        let shared = SharedCoastline::new(path);
        assert!(!shared.is_loaded());

        let handles: Vec<Arc<Coastline>> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8).map(|_| scope.spawn(|| shared.get())).collect();
            workers
                .into_iter()
                .map(|w| w.join().expect("worker").expect("coastline loads"))
                .collect()
        });
        let first = handles.first().expect("eight handles");
        assert!(handles.iter().all(|h| Arc::ptr_eq(h, first)));
        assert!(shared.is_loaded());
    }
}
