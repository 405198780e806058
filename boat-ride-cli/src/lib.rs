//! Command-line front end for scoring planned boat trips.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};

mod error;
mod score;

pub use error::CliError;

use score::{ScoreArgs, run_score};

pub(crate) const ARG_TRIP: &str = "trip";
pub(crate) const ARG_PROVIDER: &str = "provider";
pub(crate) const ARG_COASTLINE: &str = "coastline";
pub(crate) const ARG_OUTPUT: &str = "output";
pub(crate) const ARG_TOLERANT: &str = "tolerant";
pub(crate) const ARG_PREFERENCES: &str = "preferences";
pub(crate) const ARG_USER_AGENT: &str = "user-agent";
pub(crate) const ENV_TRIP: &str = "BOAT_RIDE_CMDS_SCORE_TRIP";

/// Provider string used when none is configured.
pub const DEFAULT_PROVIDER: &str = "nws+ndbc+fetch+coops";

/// Run the CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns [`CliError::ArgumentParsing`] for invalid flags (including
/// `--help`, which clap reports as an error) and the relevant variant for
/// any configuration, input or scoring failure.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Score(args) => run_score(args),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "boat-ride",
    about = "Score the comfort of a planned boat trip from marine forecasts",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Score every sample along a trip plan.
    Score(ScoreArgs),
}

#[cfg(test)]
mod tests;
