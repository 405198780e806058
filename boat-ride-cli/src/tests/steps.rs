//! Behaviour-driven steps for the `score` command.

use super::helpers::{OfflineChainBuilder, TripWorkspace, write_utf8};
use super::*;
use crate::score::run_score_with;
use boat_ride_core::{ChainError, RideScore};
use boat_ride_data::RegistryError;
use boat_ride_scorer::RunError;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;

struct ScoreWorld {
    workspace: TripWorkspace,
    include_trip: RefCell<bool>,
    cli_args: RefCell<Vec<String>>,
    stdout: RefCell<Vec<u8>>,
    result: RefCell<Option<Result<(), CliError>>>,
}

impl ScoreWorld {
    fn new() -> Self {
        Self {
            workspace: TripWorkspace::new(),
            include_trip: RefCell::new(true),
            cli_args: RefCell::new(Vec::new()),
            stdout: RefCell::new(Vec::new()),
            result: RefCell::new(None),
        }
    }

    fn output_path(&self) -> camino::Utf8PathBuf {
        self.workspace.root.join("out").join("scores.json")
    }

    fn build_command_line(&self) -> Vec<String> {
        let mut argv = vec!["boat-ride".to_owned(), "score".to_owned()];
        if *self.include_trip.borrow() {
            argv.push(self.workspace.trip.as_str().to_owned());
        }
        argv.extend(self.cli_args.borrow().iter().cloned());
        argv
    }

    fn error(&self) -> std::cell::Ref<'_, CliError> {
        std::cell::Ref::map(self.result.borrow(), |result| {
            result
                .as_ref()
                .expect("result recorded")
                .as_ref()
                .expect_err("expected failure")
        })
    }
}

#[fixture]
fn world() -> ScoreWorld {
    ScoreWorld::new()
}

#[given("a trip plan exists on disk")]
fn trip_exists(#[from(world)] world: &ScoreWorld) {
    world.workspace.write_sample_trip();
}

#[given("the provider string {spec}")]
fn provider_string(#[from(world)] world: &ScoreWorld, spec: String) {
    world.cli_args.borrow_mut().extend([
        format!("--{ARG_PROVIDER}"),
        spec.trim_matches('"').to_owned(),
    ]);
}

#[given("scores are written to an output file")]
fn output_requested(#[from(world)] world: &ScoreWorld) {
    world
        .cli_args
        .borrow_mut()
        .extend([format!("--{ARG_OUTPUT}"), world.output_path().into_string()]);
}

#[given("failing providers are tolerated")]
fn tolerate_failures(#[from(world)] world: &ScoreWorld) {
    world.cli_args.borrow_mut().push(format!("--{ARG_TOLERANT}"));
}

#[given("I omit the trip path")]
fn omit_trip(#[from(world)] world: &ScoreWorld) {
    *world.include_trip.borrow_mut() = false;
}

#[given("the trip file contains invalid JSON")]
fn invalid_trip(#[from(world)] world: &ScoreWorld) {
    write_utf8(&world.workspace.trip, b"{ not valid json");
    world
        .cli_args
        .borrow_mut()
        .extend([format!("--{ARG_PROVIDER}"), "mock".to_owned()]);
}

#[when("I run the score command")]
fn run_score_command(#[from(world)] world: &ScoreWorld) {
    let invocation = world.build_command_line();
    let parsed = Cli::try_parse_from(invocation).map_err(CliError::from);
    let outcome = parsed.and_then(|cli| match cli.command {
        Command::Score(args) => {
            let mut buffer = world.stdout.borrow_mut();
            run_score_with(args, &OfflineChainBuilder, &mut *buffer)
        }
    });
    world.result.replace(Some(outcome));
}

#[then("the command succeeds")]
fn command_succeeds(#[from(world)] world: &ScoreWorld) {
    let borrowed = world.result.borrow();
    if let Err(err) = borrowed.as_ref().expect("result recorded") {
        panic!("expected success, found {err:?}");
    }
}

#[then("the summary lists {count} samples")]
fn summary_lists(#[from(world)] world: &ScoreWorld, count: String) {
    let count: usize = count.parse().expect("numeric count");
    let stdout = String::from_utf8(world.stdout.borrow().clone()).expect("stdout utf-8");
    let mut lines = stdout.lines();
    let header = lines.next().expect("header line");
    assert!(header.starts_with("time"), "{header}");
    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), count, "{stdout}");
    assert!(rows.iter().all(|row| row.starts_with("2026-01-22 ")));
}

#[then("the output file holds {count} scores in time order")]
fn output_holds(#[from(world)] world: &ScoreWorld, count: String) {
    let count: usize = count.parse().expect("numeric count");
    let text = boat_ride_fs::read_to_string(&world.output_path()).expect("output written");
    let scores: Vec<RideScore> = serde_json::from_str(&text).expect("output is JSON scores");
    assert_eq!(scores.len(), count);
    assert!(scores.windows(2).all(|w| match w {
        [a, b] => a.t_local <= b.t_local,
        _ => true,
    }));
    assert!(scores.iter().all(|s| (0.0..=100.0).contains(&s.score_0_100)));
}

#[then("the command fails naming the provider token {token}")]
fn fails_on_token(#[from(world)] world: &ScoreWorld, token: String) {
    match &*world.error() {
        CliError::Providers(RegistryError::UnknownToken { token: found }) => {
            assert_eq!(found, token.trim_matches('"'));
        }
        other => panic!("expected Providers, found {other:?}"),
    }
}

#[then("the command fails because the trip path is missing")]
fn fails_missing_trip(#[from(world)] world: &ScoreWorld) {
    match &*world.error() {
        CliError::MissingArgument { field, .. } => assert_eq!(*field, ARG_TRIP),
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[then("the command fails because the trip JSON is invalid")]
fn fails_invalid_trip(#[from(world)] world: &ScoreWorld) {
    match &*world.error() {
        CliError::ParseTrip { .. } => {}
        other => panic!("expected ParseTrip, found {other:?}"),
    }
}

#[then("the command fails because provider {name} failed")]
fn fails_on_provider(#[from(world)] world: &ScoreWorld, name: String) {
    match &*world.error() {
        CliError::Run(RunError::Chain(ChainError::Provider { provider, .. })) => {
            assert_eq!(provider, name.trim_matches('"'));
        }
        other => panic!("expected a provider failure, found {other:?}"),
    }
}

macro_rules! register_score_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/score_command.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: ScoreWorld) {
            let _ = world;
        }
    };
}

register_score_scenario!(score_offline, "scoring a trip with offline providers");
register_score_scenario!(score_unknown_provider, "rejecting an unknown provider");
register_score_scenario!(score_missing_trip, "rejecting a missing trip path");
register_score_scenario!(score_invalid_trip, "rejecting malformed trip JSON");
register_score_scenario!(score_strict_failure, "an unreachable forecast aborts a strict run");
register_score_scenario!(
    score_tolerated_failure,
    "an unreachable forecast is tolerated on request"
);
