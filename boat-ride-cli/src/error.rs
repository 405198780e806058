//! Error type for the `boat-ride` command.

use std::sync::Arc;

use boat_ride_data::{HttpClientBuildError, RegistryError};
use boat_ride_geo::CoastlineError;
use boat_ride_scorer::RunError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors emitted by the `boat-ride` command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Flag name.
        field: &'static str,
        /// Environment variable that would also satisfy it.
        env: &'static str,
    },
    /// A referenced input path does not exist.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        /// Flag name.
        field: &'static str,
        /// Path as configured.
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a regular file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        /// Flag name.
        field: &'static str,
        /// Path as configured.
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        /// Flag name.
        field: &'static str,
        /// Path as configured.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// The provider string names an unknown adapter.
    #[error("invalid --provider: {0}")]
    Providers(#[from] RegistryError),
    /// Reading the trip file failed.
    #[error("failed to read trip plan at {path:?}: {source}")]
    ReadTrip {
        /// Trip file.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// The trip file is not a valid trip plan.
    #[error("failed to parse trip plan JSON at {path:?}: {source}")]
    ParseTrip {
        /// Trip file.
        path: Utf8PathBuf,
        /// Decoder failure.
        #[source]
        source: serde_json::Error,
    },
    /// Reading the preferences file failed.
    #[error("failed to read preferences at {path:?}: {source}")]
    ReadPreferences {
        /// Preferences file.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// The preferences file is not valid JSON preferences.
    #[error("failed to parse preferences JSON at {path:?}: {source}")]
    ParsePreferences {
        /// Preferences file.
        path: Utf8PathBuf,
        /// Decoder failure.
        #[source]
        source: serde_json::Error,
    },
    /// The coastline could not be loaded.
    #[error(transparent)]
    LoadCoastline(#[from] CoastlineError),
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    BuildHttpClient(#[from] HttpClientBuildError),
    /// Scoring the trip failed.
    #[error("scoring failed: {0}")]
    Run(#[from] RunError),
    /// Serialising the scores failed.
    #[error("failed to serialise scores: {0}")]
    SerialiseScores(#[source] serde_json::Error),
    /// Writing the scores file failed.
    #[error("failed to write scores to {path:?}: {source}")]
    WriteScores {
        /// Output file.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
    /// Writing the summary to the terminal failed.
    #[error("failed to write summary: {0}")]
    WriteOutput(#[source] std::io::Error),
}
