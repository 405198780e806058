//! Behavioural tests for [`ProviderRegistry`].

use std::cell::RefCell;
use std::sync::Arc;

use boat_ride_core::fallback::FALLBACK_NOTE_KEY;
use boat_ride_core::test_support::sample_plan;
use boat_ride_core::{ChainError, EnvSeries, ProviderChain};
use boat_ride_data::test_support::StubFeed;
use boat_ride_data::{ProviderRegistry, RegistryError};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

#[derive(Default)]
struct RegistryWorld {
    registry: RefCell<Option<ProviderRegistry>>,
    chain: RefCell<Option<Result<ProviderChain, RegistryError>>>,
    run: RefCell<Option<Result<EnvSeries, ChainError>>>,
}

#[fixture]
fn world() -> RegistryWorld {
    RegistryWorld::default()
}

fn build(world: &RegistryWorld, spec: &str) {
    let registry = world.registry.borrow();
    let registry = registry.as_ref().expect("registry configured");
    *world.chain.borrow_mut() = Some(registry.build_chain(spec));
}

fn series(world: &RegistryWorld) -> EnvSeries {
    world
        .run
        .borrow()
        .as_ref()
        .expect("chain has run")
        .as_ref()
        .expect("chain succeeded")
        .clone()
}

#[given("a registry over an empty feed")]
fn strict_registry(#[from(world)] world: &RegistryWorld) {
    *world.registry.borrow_mut() = Some(ProviderRegistry::new(Arc::new(StubFeed::new())));
}

#[given("a tolerant registry over an empty feed")]
fn tolerant_registry(#[from(world)] world: &RegistryWorld) {
    *world.registry.borrow_mut() =
        Some(ProviderRegistry::new(Arc::new(StubFeed::new())).with_tolerance(true));
}

#[when("the chain {spec} is built")]
fn build_chain(#[from(world)] world: &RegistryWorld, spec: String) {
    build(world, spec.trim_matches('"'));
}

#[when("the chain {spec} is built and run")]
fn build_and_run(#[from(world)] world: &RegistryWorld, spec: String) {
    build(world, spec.trim_matches('"'));
    let chain = world.chain.borrow();
    let chain = chain
        .as_ref()
        .expect("chain built")
        .as_ref()
        .expect("valid provider string");
    *world.run.borrow_mut() = Some(chain.get_env_series(&sample_plan()));
}

#[then("the chain names are {names}")]
fn chain_names(#[from(world)] world: &RegistryWorld, names: String) {
    let chain = world.chain.borrow();
    let chain = chain
        .as_ref()
        .expect("chain built")
        .as_ref()
        .expect("valid provider string");
    assert_eq!(chain.names().join("+"), names.trim_matches('"'));
}

#[then("every sample has wind and a 1 nautical mile default fetch")]
fn wind_and_default_fetch(#[from(world)] world: &RegistryWorld) {
    let series = series(world);
    assert_eq!(series.len(), 5);
    for env in &series {
        assert!(env.wind_speed_kt.is_some());
        assert_eq!(env.meta.fetch_nm, Some(1.0));
        assert_eq!(
            env.meta.provenance.get("fetch_source"),
            Some(&serde_json::json!("default"))
        );
    }
}

#[then("the build fails naming {token}")]
fn build_fails(#[from(world)] world: &RegistryWorld, token: String) {
    let chain = world.chain.borrow();
    let err = chain
        .as_ref()
        .expect("chain built")
        .as_ref()
        .expect_err("unknown token");
    assert_eq!(
        err,
        &RegistryError::UnknownToken {
            token: token.trim_matches('"').to_owned()
        }
    );
}

#[then("the run fails in provider {name}")]
fn run_fails(#[from(world)] world: &RegistryWorld, name: String) {
    let run = world.run.borrow();
    let err = run
        .as_ref()
        .expect("chain has run")
        .as_ref()
        .expect_err("missing feed");
    match err {
        ChainError::Provider { provider, .. } => assert_eq!(provider, name.trim_matches('"')),
        other => panic!("unexpected error: {other}"),
    }
}

#[then("every sample notes that nws was unavailable")]
fn nws_unavailable(#[from(world)] world: &RegistryWorld) {
    for env in &series(world) {
        assert!(env.wind_speed_kt.is_none());
        let note = env
            .meta
            .provenance
            .get(FALLBACK_NOTE_KEY)
            .and_then(|v| v.as_str())
            .expect("fallback note");
        assert!(note.starts_with("nws unavailable"), "note {note}");
    }
}

#[then("every sample has a 1 nautical mile default fetch")]
fn default_fetch(#[from(world)] world: &RegistryWorld) {
    for env in &series(world) {
        assert_eq!(env.meta.fetch_nm, Some(1.0));
    }
}

macro_rules! register_scenario {
    ($fn_name:ident, $title:literal) => {
        #[scenario(path = "tests/features/provider_registry.feature", name = $title)]
        fn $fn_name(world: RegistryWorld) {
            let _ = world;
        }
    };
}

register_scenario!(offline_chain, "an offline chain needs no network");
register_scenario!(unknown_token, "an unknown token is rejected");
register_scenario!(strict_chain_fails, "a missing forecast aborts a strict chain");
register_scenario!(tolerant_chain, "a tolerant chain survives a missing forecast");
