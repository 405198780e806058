//! Temporary trip workspaces and a network-free chain builder.

use std::sync::Arc;

use boat_ride_core::ProviderChain;
use boat_ride_core::test_support::sample_plan;
use boat_ride_data::ProviderRegistry;
use boat_ride_data::test_support::StubFeed;
use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

use crate::CliError;
use crate::score::{ChainBuilder, ScoreConfig};

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    std::fs::write(path.as_std_path(), contents).expect("write fixture file");
}

/// A temporary directory holding a trip plan.
pub(super) struct TripWorkspace {
    _dir: TempDir,
    pub(super) root: Utf8PathBuf,
    pub(super) trip: Utf8PathBuf,
}

impl TripWorkspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        let trip = root.join("trip.json");
        Self {
            _dir: dir,
            root,
            trip,
        }
    }

    /// Write the five-sample test plan.
    pub(super) fn write_sample_trip(&self) {
        let payload = serde_json::to_string_pretty(&sample_plan()).expect("serialise plan");
        write_utf8(&self.trip, payload.as_bytes());
    }
}

/// Builds chains from the configured provider string over a feed that
/// answers nothing, so only offline adapters produce data.
pub(super) struct OfflineChainBuilder;

impl ChainBuilder for OfflineChainBuilder {
    fn build(&self, config: &ScoreConfig) -> Result<ProviderChain, CliError> {
        Ok(ProviderRegistry::new(Arc::new(StubFeed::new()))
            .with_tolerance(config.tolerant)
            .build_chain(&config.provider)?)
    }
}
