//! Checkout history check

use super::trait_def::{Check, CheckContext, CheckResult};
use crate::core::error::NightlyResult;
use crate::core::vcs::SystemGit;

/// Full history is available for version labeling
pub struct HistoryCheck;

impl Check for HistoryCheck {
  fn name(&self) -> &str {
    "history"
  }

  fn description(&self) -> &str {
    "Checks the checkout has full history"
  }

  fn run(&self, ctx: &CheckContext) -> NightlyResult<CheckResult> {
    let Some(config) = ctx.config else {
      return Ok(CheckResult::pass(self.name(), "Skipped (no configuration)"));
    };
    if let Some(url) = &config.repository.clone_url {
      return Ok(CheckResult::pass(
        self.name(),
        format!("Runs clone {} with full history", url),
      ));
    }

    let path = config.checkout_path();
    let repo = match SystemGit::open(ctx.runner, &path) {
      Ok(repo) => repo,
      Err(err) => {
        return Ok(CheckResult::error(
          self.name(),
          err.to_string(),
          Some("Point [repository] path at a git checkout, or set clone_url"),
        ));
      }
    };

    if repo.is_shallow()? {
      return Ok(CheckResult::warning(
        self.name(),
        format!("{} is a shallow clone; runs will fetch the missing history", path.display()),
        Some("Check out with full history (fetch-depth: 0)"),
      ));
    }

    let label = match repo.describe()? {
      Some(d) => format!("{} commits after {}", d.distance, d.tag),
      None => "no tags reachable".to_string(),
    };
    Ok(CheckResult::pass(self.name(), format!("Full history ({})", label)))
  }
}
