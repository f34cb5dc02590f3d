//! Check runner for executing health checks

use super::trait_def::{Check, CheckContext, CheckResult};
use crate::core::error::NightlyResult;
use std::sync::Arc;

/// Check runner that executes multiple checks
pub struct CheckRunner {
  checks: Vec<Arc<dyn Check>>,
}

impl CheckRunner {
  pub fn new() -> Self {
    Self { checks: Vec::new() }
  }

  pub fn add_check(&mut self, check: Arc<dyn Check>) {
    self.checks.push(check);
  }

  /// Run all checks and collect results
  pub fn run_all(&self, ctx: &CheckContext) -> NightlyResult<Vec<CheckResult>> {
    let mut results = Vec::new();

    for check in &self.checks {
      if check.is_expensive() && !ctx.thorough {
        continue;
      }

      match check.run(ctx) {
        Ok(result) => results.push(result),
        Err(err) => {
          // A check that cannot run is itself a finding
          results.push(CheckResult::error(
            check.name(),
            format!("Check failed to run: {}", err),
            err.help_message(),
          ));
        }
      }
    }

    Ok(results)
  }

  /// Get all registered checks
  pub fn checks(&self) -> &[Arc<dyn Check>] {
    &self.checks
  }
}

impl Default for CheckRunner {
  fn default() -> Self {
    Self::new()
  }
}

/// Create a runner with all built-in checks
pub fn create_default_runner() -> CheckRunner {
  let mut runner = CheckRunner::new();

  runner.add_check(Arc::new(super::config::ConfigCheck));
  runner.add_check(Arc::new(super::toolchain::ToolchainCheck));
  runner.add_check(Arc::new(super::credential::CredentialCheck));
  runner.add_check(Arc::new(super::identity::IdentityCheck));
  runner.add_check(Arc::new(super::history::HistoryCheck));
  runner.add_check(Arc::new(super::index::IndexReachabilityCheck));

  runner
}
