//! The `score` subcommand.

use std::io::Write;
use std::sync::Arc;

use boat_ride_core::{LOCAL_TIME_FORMAT, ProviderChain, RideScore, TripPlan};
use boat_ride_data::{HttpClient, HttpClientConfig, ProviderRegistry, parse_provider_tokens};
use boat_ride_geo::Coastline;
use boat_ride_scorer::{ScoringPreferences, run_trip};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_COASTLINE, ARG_OUTPUT, ARG_PREFERENCES, ARG_PROVIDER, ARG_TOLERANT, ARG_TRIP,
    ARG_USER_AGENT, CliError, DEFAULT_PROVIDER, ENV_TRIP,
};

/// CLI arguments for the `score` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Score a trip plan sample by sample. The plan is a JSON \
                 TripPlan; providers are named with a '+'-joined string \
                 such as nws+ndbc+fetch+coops. Options can also come from \
                 configuration files or BOAT_RIDE_* environment variables.",
    about = "Score the comfort of a trip plan"
)]
#[ortho_config(prefix = "BOAT_RIDE")]
pub(crate) struct ScoreArgs {
    /// Path to a JSON trip plan.
    #[arg(value_name = "trip.json")]
    #[serde(default)]
    pub(crate) trip: Option<Utf8PathBuf>,
    /// Data providers in precedence order.
    #[arg(long = ARG_PROVIDER, value_name = "tokens")]
    #[serde(default)]
    pub(crate) provider: Option<String>,
    /// GeoJSON coastline used by the `fetch` provider.
    #[arg(long = ARG_COASTLINE, value_name = "path")]
    #[serde(default)]
    pub(crate) coastline: Option<Utf8PathBuf>,
    /// Write the scores as pretty JSON to this path.
    #[arg(long = ARG_OUTPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
    /// Keep scoring when a provider fails, using neutral data in its place.
    #[arg(
        long = ARG_TOLERANT,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_name = "bool"
    )]
    #[serde(default)]
    pub(crate) tolerant: Option<bool>,
    /// JSON scoring preferences (multipliers and overall offset).
    #[arg(long = ARG_PREFERENCES, value_name = "path")]
    #[serde(default)]
    pub(crate) preferences: Option<Utf8PathBuf>,
    /// User-Agent sent to upstream services.
    #[arg(long = ARG_USER_AGENT, value_name = "agent")]
    #[serde(default)]
    pub(crate) user_agent: Option<String>,
}

impl ScoreArgs {
    pub(crate) fn into_config(self) -> Result<ScoreConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ScoreConfig::try_from(merged)
    }
}

/// Resolved `score` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScoreConfig {
    pub(crate) trip: Utf8PathBuf,
    pub(crate) provider: String,
    pub(crate) coastline: Option<Utf8PathBuf>,
    pub(crate) output: Option<Utf8PathBuf>,
    pub(crate) tolerant: bool,
    pub(crate) preferences: Option<Utf8PathBuf>,
    pub(crate) user_agent: Option<String>,
}

impl ScoreConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        Self::require_existing(&self.trip, ARG_TRIP)?;
        if let Some(path) = &self.coastline {
            Self::require_existing(path, ARG_COASTLINE)?;
        }
        if let Some(path) = &self.preferences {
            Self::require_existing(path, ARG_PREFERENCES)?;
        }
        Ok(())
    }

    fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
        match boat_ride_fs::is_regular_file(path) {
            Ok(true) => Ok(()),
            Ok(false) if path.as_std_path().exists() => Err(CliError::SourcePathNotFile {
                field,
                path: path.to_path_buf(),
            }),
            Ok(false) => Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            }),
            Err(source) => Err(CliError::InspectSourcePath {
                field,
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

impl TryFrom<ScoreArgs> for ScoreConfig {
    type Error = CliError;

    fn try_from(args: ScoreArgs) -> Result<Self, Self::Error> {
        let trip = args.trip.ok_or(CliError::MissingArgument {
            field: ARG_TRIP,
            env: ENV_TRIP,
        })?;
        let provider = args
            .provider
            .unwrap_or_else(|| DEFAULT_PROVIDER.to_owned());
        parse_provider_tokens(&provider)?;
        Ok(Self {
            trip,
            provider,
            coastline: args.coastline,
            output: args.output,
            tolerant: args.tolerant.unwrap_or(false),
            preferences: args.preferences,
            user_agent: args.user_agent,
        })
    }
}

/// Builds the provider chain for one invocation.
pub(crate) trait ChainBuilder {
    fn build(&self, config: &ScoreConfig) -> Result<ProviderChain, CliError>;
}

/// Live adapters over HTTP, with coastline fetch when configured.
pub(crate) struct DefaultChainBuilder;

impl ChainBuilder for DefaultChainBuilder {
    fn build(&self, config: &ScoreConfig) -> Result<ProviderChain, CliError> {
        let http = match &config.user_agent {
            Some(agent) => HttpClientConfig::new().with_user_agent(agent.clone()),
            None => HttpClientConfig::new(),
        };
        let client = HttpClient::with_config(http)?;
        let mut registry =
            ProviderRegistry::new(Arc::new(client)).with_tolerance(config.tolerant);
        if let Some(path) = &config.coastline {
            let coastline = Coastline::load_geojson(path)?;
            info!(
                "loaded {} coastline segments from {path}",
                coastline.segment_count()
            );
            registry = registry.with_coastline(Arc::new(coastline));
        }
        Ok(registry.build_chain(&config.provider)?)
    }
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_score_with(args, &DefaultChainBuilder, &mut stdout)
}

pub(crate) fn run_score_with(
    args: ScoreArgs,
    builder: &dyn ChainBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    let scores = execute_score(&config, builder)?;
    write_summary(writer, &scores)?;
    if let Some(path) = &config.output {
        write_scores(path, &scores)?;
    }
    Ok(())
}

fn execute_score(
    config: &ScoreConfig,
    builder: &dyn ChainBuilder,
) -> Result<Vec<RideScore>, CliError> {
    let plan = load_trip(&config.trip)?;
    let prefs = config
        .preferences
        .as_deref()
        .map(load_preferences)
        .transpose()?;
    let chain = builder.build(config)?;
    Ok(run_trip(&plan, &chain, prefs.as_ref())?)
}

/// Load a JSON-encoded [`TripPlan`].
pub(crate) fn load_trip(path: &Utf8Path) -> Result<TripPlan, CliError> {
    let text = boat_ride_fs::read_to_string(path).map_err(|source| CliError::ReadTrip {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::ParseTrip {
        path: path.to_path_buf(),
        source,
    })
}

/// Load JSON [`ScoringPreferences`]; missing fields take neutral values.
pub(crate) fn load_preferences(path: &Utf8Path) -> Result<ScoringPreferences, CliError> {
    let text =
        boat_ride_fs::read_to_string(path).map_err(|source| CliError::ReadPreferences {
            path: path.to_path_buf(),
            source,
        })?;
    let prefs: ScoringPreferences =
        serde_json::from_str(&text).map_err(|source| CliError::ParsePreferences {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(prefs.clamped())
}

/// One line per sample: time, position, score, label and reasons.
pub(crate) fn format_score_line(score: &RideScore) -> String {
    let reasons = if score.reasons.is_empty() {
        "-".to_owned()
    } else {
        score.reasons.join("; ")
    };
    format!(
        "{}  {:>9.4} {:>10.4}  {:>5.1}  {:<5}  {reasons}",
        score.t_local.format(LOCAL_TIME_FORMAT),
        score.lat,
        score.lon,
        score.score_0_100,
        score.label.as_str(),
    )
}

fn write_summary(writer: &mut dyn Write, scores: &[RideScore]) -> Result<(), CliError> {
    writeln!(
        writer,
        "{:<16}  {:>9} {:>10}  {:>5}  {:<5}  reasons",
        "time", "lat", "lon", "score", "label"
    )
    .map_err(CliError::WriteOutput)?;
    for score in scores {
        writeln!(writer, "{}", format_score_line(score)).map_err(CliError::WriteOutput)?;
    }
    Ok(())
}

fn write_scores(path: &Utf8Path, scores: &[RideScore]) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(scores).map_err(CliError::SerialiseScores)?;
    let write = |source| CliError::WriteScores {
        path: path.to_path_buf(),
        source,
    };
    boat_ride_fs::ensure_parent_dir(path).map_err(write)?;
    boat_ride_fs::write_string(path, &payload).map_err(write)?;
    info!("wrote {} scores to {path}", scores.len());
    Ok(())
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ScoreConfig, CliError> {
    let merged = ScoreArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ScoreConfig::try_from(merged)
}
