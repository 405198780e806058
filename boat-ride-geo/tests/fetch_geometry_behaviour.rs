//! Behavioural tests for coastline loading and fetch measurement.

use std::cell::RefCell;
use std::sync::Arc;

use boat_ride_core::{FetchResult, Waterway};
use boat_ride_geo::{Coastline, CoastlineError, FetchCalculator, SharedCoastline};
use camino::Utf8PathBuf;
use geo::LineString;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

const ONE_NM_DEG: f64 = 1.0 / 60.0;

/// Shared state threaded through each scenario.
#[derive(Default)]
struct GeoWorld {
    coastline: RefCell<Option<Arc<Coastline>>>,
    shared: RefCell<Option<SharedCoastline>>,
    loads: RefCell<Vec<Result<Arc<Coastline>, CoastlineError>>>,
    result: RefCell<Option<Arc<FetchResult>>>,
    dir: RefCell<Option<TempDir>>,
}

#[fixture]
fn world() -> GeoWorld {
    GeoWorld::default()
}

fn channel_geojson() -> String {
    format!(
        r#"{{"type": "FeatureCollection", "features": [
            {{"type": "Feature", "properties": {{}}, "geometry":
                {{"type": "LineString", "coordinates": [[{w}, -1.0], [{w}, 1.0]]}}}},
            {{"type": "Feature", "properties": {{}}, "geometry":
                {{"type": "LineString", "coordinates": [[{e}, -1.0], [{e}, 1.0]]}}}}
        ]}}"#,
        w = -ONE_NM_DEG,
        e = ONE_NM_DEG,
    )
}

#[given("a channel with shores one nautical mile either side")]
fn channel(#[from(world)] world: &GeoWorld) {
    let coast = Coastline::from_line_strings(vec![
        LineString::from(vec![(-ONE_NM_DEG, -1.0), (-ONE_NM_DEG, 1.0)]),
        LineString::from(vec![(ONE_NM_DEG, -1.0), (ONE_NM_DEG, 1.0)]),
    ]);
    *world.coastline.borrow_mut() = Some(Arc::new(coast));
}

#[given("a coastline with no shore nearby")]
fn far_shore(#[from(world)] world: &GeoWorld) {
    let coast =
        Coastline::from_line_strings(vec![LineString::from(vec![(20.0, 20.0), (21.0, 20.0)])]);
    *world.coastline.borrow_mut() = Some(Arc::new(coast));
}

#[given("a GeoJSON coastline file describing the channel")]
fn channel_file(#[from(world)] world: &GeoWorld) {
    let dir = TempDir::new().expect("temp dir");
    let path = Utf8PathBuf::from_path_buf(dir.path().join("coast.geojson")).expect("utf-8 path");
    boat_ride_fs::write_string(&path, &channel_geojson()).expect("write coastline");
    *world.shared.borrow_mut() = Some(SharedCoastline::new(path));
    *world.dir.borrow_mut() = Some(dir);
}

#[given("a GeoJSON coastline path that does not exist")]
fn missing_file(#[from(world)] world: &GeoWorld) {
    let dir = TempDir::new().expect("temp dir");
    let path = Utf8PathBuf::from_path_buf(dir.path().join("absent.geojson")).expect("utf-8 path");
    *world.shared.borrow_mut() = Some(SharedCoastline::new(path));
    *world.dir.borrow_mut() = Some(dir);
}

#[when("fetch is measured in mid-channel")]
fn measure(#[from(world)] world: &GeoWorld) {
    let coast = world.coastline.borrow().clone().expect("coastline configured");
    let result = FetchCalculator::new(coast).compute_fetch(0.0, 0.0);
    *world.result.borrow_mut() = Some(result);
}

#[when("the shared coastline is requested twice")]
fn request_twice(#[from(world)] world: &GeoWorld) {
    let shared = world.shared.borrow();
    let shared = shared.as_ref().expect("shared coastline configured");
    let mut loads = world.loads.borrow_mut();
    loads.push(shared.get());
    loads.push(shared.get());
}

fn with_result<T>(world: &GeoWorld, f: impl FnOnce(&FetchResult) -> T) -> T {
    let borrowed = world.result.borrow();
    f(borrowed.as_deref().expect("fetch measured"))
}

#[then("the minimum fetch is 1 nautical mile")]
fn min_one(#[from(world)] world: &GeoWorld) {
    with_result(world, |r| assert!((r.min_fetch_nm - 1.0).abs() < 1e-6));
}

#[then("the water is classified inland")]
fn inland(#[from(world)] world: &GeoWorld) {
    with_result(world, |r| assert_eq!(r.waterway, Waterway::Inland));
}

#[then("every direction reports 50 nautical miles")]
fn all_capped(#[from(world)] world: &GeoWorld) {
    with_result(world, |r| {
        assert_eq!(r.directions.len(), 16);
        assert!(r.directions.iter().all(|d| d.fetch_nm == 50.0));
    });
}

#[then("the water is classified offshore")]
fn offshore(#[from(world)] world: &GeoWorld) {
    with_result(world, |r| assert_eq!(r.waterway, Waterway::Offshore));
}

#[then("both requests return the same coastline")]
fn same_coastline(#[from(world)] world: &GeoWorld) {
    let loads = world.loads.borrow();
    let [Ok(first), Ok(second)] = loads.as_slice() else {
        panic!("expected two successful loads, got {loads:?}");
    };
    assert!(Arc::ptr_eq(first, second));
}

#[then("the coastline holds 2 segments")]
fn two_segments(#[from(world)] world: &GeoWorld) {
    let loads = world.loads.borrow();
    let Some(Ok(coast)) = loads.first() else {
        panic!("expected a loaded coastline");
    };
    assert_eq!(coast.segment_count(), 2);
}

#[then("loading fails with an I/O error")]
fn io_error(#[from(world)] world: &GeoWorld) {
    let loads = world.loads.borrow();
    assert_eq!(loads.len(), 2);
    assert!(loads.iter().all(|l| matches!(l, Err(CoastlineError::Io { .. }))));
}

macro_rules! register_scenario {
    ($fn_name:ident, $title:literal) => {
        #[scenario(path = "tests/features/fetch_geometry.feature", name = $title)]
        fn $fn_name(world: GeoWorld) {
            let _ = world;
        }
    };
}

register_scenario!(narrow_channel, "a narrow channel reports inland fetch");
register_scenario!(open_water, "open water reports the ray cap");
register_scenario!(shared_file, "a coastline file is loaded once and shared");
register_scenario!(missing_coastline, "a missing coastline file is reported");
