//! Repository identity check

use super::trait_def::{Check, CheckContext, CheckResult};
use crate::core::error::NightlyResult;
use crate::pipeline::gate::{Gate, GateDecision, RepositoryIdentity};

/// Whether this checkout would pass the gate
pub struct IdentityCheck;

impl Check for IdentityCheck {
  fn name(&self) -> &str {
    "identity"
  }

  fn description(&self) -> &str {
    "Compares the current repository with the canonical one"
  }

  fn run(&self, ctx: &CheckContext) -> NightlyResult<CheckResult> {
    let Some(config) = ctx.config else {
      return Ok(CheckResult::pass(self.name(), "Skipped (no configuration)"));
    };
    let Some(current) = &ctx.repository else {
      return Ok(CheckResult::warning(
        self.name(),
        "Could not determine the current repository identity",
        Some("Pass --repository owner/name, set GITHUB_REPOSITORY, or add an origin remote"),
      ));
    };

    let gate = Gate::new(RepositoryIdentity::parse(&config.repository.canonical)?);
    match gate.evaluate(current) {
      GateDecision::Pass => Ok(CheckResult::pass(
        self.name(),
        format!("{} is canonical; runs will publish", current),
      )),
      GateDecision::Skip { reason } => Ok(CheckResult::warning(
        self.name(),
        format!("{}; runs here will be skipped", reason),
        None::<String>,
      )),
    }
  }
}
