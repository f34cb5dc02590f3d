//! Publish credential presence check

use super::trait_def::{Check, CheckContext, CheckResult};
use crate::core::error::NightlyResult;
use crate::pipeline::credential::{CredentialSource, EnvCredentialSource};

/// The publish secret is visible to this process (value never read out)
pub struct CredentialCheck;

impl Check for CredentialCheck {
  fn name(&self) -> &str {
    "credential"
  }

  fn description(&self) -> &str {
    "Checks the publish credential is present"
  }

  fn run(&self, ctx: &CheckContext) -> NightlyResult<CheckResult> {
    let Some(config) = ctx.config else {
      return Ok(CheckResult::pass(self.name(), "Skipped (no configuration)"));
    };

    let source = EnvCredentialSource::new(&config.publish.username, &config.publish.token_env);
    if source.is_present() {
      Ok(CheckResult::pass(
        self.name(),
        format!("{} is set (identity {})", source.describe(), config.publish.username),
      ))
    } else {
      Ok(CheckResult::error(
        self.name(),
        format!("{} is not set; runs on the canonical repository would fail", source.describe()),
        Some(format!(
          "Expose the index token to the job as {}",
          source.describe()
        )),
      ))
    }
  }
}
