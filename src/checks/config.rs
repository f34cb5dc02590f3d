//! Configuration validity check

use super::trait_def::{Check, CheckContext, CheckResult};
use crate::core::error::NightlyResult;
use crate::pipeline::provision::ToolchainSpec;

/// Config loads, validates, and pins a toolchain
pub struct ConfigCheck;

impl Check for ConfigCheck {
  fn name(&self) -> &str {
    "config"
  }

  fn description(&self) -> &str {
    "Validates nightly.toml"
  }

  fn run(&self, ctx: &CheckContext) -> NightlyResult<CheckResult> {
    let Some(config) = ctx.config else {
      let reason = ctx
        .config_error
        .clone()
        .unwrap_or_else(|| "No configuration loaded".to_string());
      return Ok(CheckResult::error(
        self.name(),
        reason,
        Some("Run `nightly-rail init --canonical <owner/name>` to create nightly.toml"),
      ));
    };

    if let Err(err) = ToolchainSpec::parse(&config.toolchain.python) {
      return Ok(CheckResult::error(self.name(), err.to_string(), err.help_message()));
    }

    let mode = if config.build.nightly { "nightly" } else { "release" };
    Ok(
      CheckResult::pass(
        self.name(),
        format!(
          "canonical {}, Python {}, {} builds at {} UTC",
          config.repository.canonical, config.toolchain.python, mode, config.schedule.time
        ),
      )
      .with_details(serde_json::json!({
        "canonical": config.repository.canonical,
        "python": config.toolchain.python,
        "nightly": config.build.nightly,
        "schedule": config.schedule.time,
        "repository_url": config.publish.repository_url,
      })),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::config::NightlyConfig;
  use crate::core::process::fake::FakeRunner;

  #[test]
  fn test_missing_config_is_error() {
    let runner = FakeRunner::new();
    let ctx = CheckContext {
      config: None,
      config_error: Some("No nightly-rail configuration found.".to_string()),
      repository: None,
      runner: &runner,
      thorough: false,
    };
    let result = ConfigCheck.run(&ctx).unwrap();
    assert!(!result.passed);
    assert!(result.suggestion.unwrap().contains("init"));
  }

  #[test]
  fn test_unpinned_toolchain_is_error() {
    let runner = FakeRunner::new();
    let mut config = NightlyConfig::new("pymc-devs/pytensor", ".".into());
    config.toolchain.python.clear();
    let ctx = CheckContext {
      config: Some(&config),
      config_error: None,
      repository: None,
      runner: &runner,
      thorough: false,
    };
    assert!(!ConfigCheck.run(&ctx).unwrap().passed);
  }
}
