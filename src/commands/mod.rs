//! CLI command implementations
//!
//! Commands load configuration, wire the system implementations of the
//! pipeline seams together, and print results in human or JSON form.

pub mod doctor;
pub mod init;
pub mod run;
pub mod schedule;

pub use doctor::run_doctor;
pub use init::run_init;
pub use run::run_once;
pub use schedule::{run_next, run_schedule};

use crate::core::config::NightlyConfig;
use crate::core::error::{ConfigError, NightlyResult};
use crate::core::process::ProcessRunner;
use crate::core::vcs::SystemGit;
use crate::pipeline::gate::RepositoryIdentity;
use std::path::Path;
use tracing::debug;

/// Load from an explicit file, or search the current directory
pub(crate) fn load_config(config_path: Option<&Path>) -> NightlyResult<NightlyConfig> {
  match config_path {
    Some(path) => NightlyConfig::load_file(path),
    None => NightlyConfig::load(&std::env::current_dir()?),
  }
}

/// Identity the gate is evaluated on
///
/// Resolution order: explicit value (`--repository` / `GITHUB_REPOSITORY`),
/// then the configured remote of the local checkout.
pub(crate) fn resolve_identity(
  explicit: Option<&str>,
  config: &NightlyConfig,
  runner: &dyn ProcessRunner,
) -> NightlyResult<RepositoryIdentity> {
  if let Some(raw) = explicit.map(str::trim).filter(|s| !s.is_empty()) {
    return RepositoryIdentity::parse(raw);
  }

  let url = SystemGit::open(runner, &config.checkout_path())
    .and_then(|repo| repo.remote_url(&config.repository.remote))
    .map_err(|err| ConfigError::UnknownIdentity {
      reason: err.to_string(),
    })?;
  debug!(remote = %config.repository.remote, url = %url, "deriving identity from remote");
  RepositoryIdentity::from_remote_url(&url)
}
