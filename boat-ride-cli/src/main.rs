//! Entry point for the `boat-ride` command.
#![forbid(unsafe_code)]

use boat_ride_cli::CliError;

fn main() {
    env_logger::init();
    match boat_ride_cli::run() {
        Ok(()) => {}
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("boat-ride: {err}");
            std::process::exit(1);
        }
    }
}
