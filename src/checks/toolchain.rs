//! Interpreter availability check

use super::trait_def::{Check, CheckContext, CheckResult};
use crate::core::error::NightlyResult;
use crate::pipeline::provision::{Provisioner, ToolchainSpec};

/// An interpreter matching the pinned version can be found
pub struct ToolchainCheck;

impl Check for ToolchainCheck {
  fn name(&self) -> &str {
    "toolchain"
  }

  fn description(&self) -> &str {
    "Finds an interpreter matching the pinned version"
  }

  fn run(&self, ctx: &CheckContext) -> NightlyResult<CheckResult> {
    let Some(config) = ctx.config else {
      return Ok(CheckResult::pass(self.name(), "Skipped (no configuration)"));
    };
    let Ok(spec) = ToolchainSpec::parse(&config.toolchain.python) else {
      return Ok(CheckResult::pass(self.name(), "Skipped (no toolchain pinned)"));
    };

    match Provisioner::new(ctx.runner, config).resolve_interpreter(&spec) {
      Ok((path, version)) => Ok(CheckResult::pass(
        self.name(),
        format!("Python {} ({})", version, path.display()),
      )),
      Err(err) => Ok(CheckResult::error(self.name(), err.to_string(), err.help_message())),
    }
  }
}
