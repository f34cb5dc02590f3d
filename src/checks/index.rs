//! Package index reachability check

use super::trait_def::{Check, CheckContext, CheckResult};
use crate::core::error::NightlyResult;
use reqwest::blocking::Client;
use std::time::Duration;

/// The upload endpoint answers HTTP (any status)
pub struct IndexReachabilityCheck;

impl Check for IndexReachabilityCheck {
  fn name(&self) -> &str {
    "index-reachable"
  }

  fn description(&self) -> &str {
    "Tests connectivity to the package index"
  }

  fn is_expensive(&self) -> bool {
    true
  }

  fn run(&self, ctx: &CheckContext) -> NightlyResult<CheckResult> {
    let Some(config) = ctx.config else {
      return Ok(CheckResult::pass(self.name(), "Skipped (no configuration)"));
    };
    let url = &config.publish.repository_url;

    let client = match Client::builder().timeout(Duration::from_secs(15)).build() {
      Ok(client) => client,
      Err(e) => return Ok(CheckResult::error(self.name(), e.to_string(), None::<String>)),
    };

    // The legacy upload API only accepts POST; any response proves reachability
    match client.get(url).send() {
      Ok(response) => Ok(CheckResult::pass(
        self.name(),
        format!("{} answered HTTP {}", url, response.status().as_u16()),
      )),
      Err(e) => Ok(CheckResult::error(
        self.name(),
        format!("Cannot reach {}: {}", url, e),
        Some("Check network access and proxy settings ([environment] passthrough)"),
      )),
    }
  }
}
