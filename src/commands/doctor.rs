//! Health check command for diagnosing issues
//!
//! The doctor command runs all health checks and reports any issues found.

use super::{load_config, resolve_identity};
use crate::checks::{CheckContext, Severity, create_default_runner};
use crate::core::error::{ExitCode, NightlyResult, ResultExt};
use crate::core::process::SystemRunner;
use std::path::Path;

/// Run the doctor command
///
/// Exits with the configuration error code if any check reports an error.
pub fn run_doctor(config_path: Option<&Path>, repository: Option<String>, thorough: bool, json: bool) -> NightlyResult<()> {
  let (config, config_error) = match load_config(config_path) {
    Ok(config) => (Some(config), None),
    Err(err) => (None, Some(err.to_string())),
  };

  let passthrough = config
    .as_ref()
    .map(|c| c.environment.passthrough.clone())
    .unwrap_or_default();
  let process_runner = SystemRunner::new(&passthrough);

  let identity = config
    .as_ref()
    .and_then(|c| resolve_identity(repository.as_deref(), c, &process_runner).ok());

  let ctx = CheckContext {
    config: config.as_ref(),
    config_error,
    repository: identity,
    runner: &process_runner,
    thorough,
  };

  let runner = create_default_runner();
  let results = runner.run_all(&ctx)?;
  let has_errors = results
    .iter()
    .any(|r| !r.passed && r.severity == Severity::Error);

  if json {
    let json_output = serde_json::to_string_pretty(&results).context("Failed to serialize JSON")?;
    println!("{}", json_output);
  } else {
    println!("🏥 Running health checks...\n");

    println!("📋 Registered checks:");
    for check in runner.checks() {
      let note = if check.is_expensive() && !thorough {
        " (skipped, use --thorough)"
      } else {
        ""
      };
      println!("   • {}: {}{}", check.name(), check.description(), note);
    }
    println!();

    let mut has_warnings = false;
    for result in &results {
      let icon = if result.passed { "✅" } else { "❌" };
      println!("{} {}: {}", icon, result.check_name, result.message);

      if !result.passed {
        if let Some(ref suggestion) = result.suggestion {
          println!("   💡 Fix: {}", suggestion);
        }
        if result.severity == Severity::Warning {
          has_warnings = true;
        }
      }
      println!();
    }

    let passed_count = results.iter().filter(|r| r.passed).count();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Summary: {}/{} checks passed", passed_count, results.len());

    if has_errors {
      println!("\n⚠️  Critical issues found. Scheduled runs would fail.");
    } else if has_warnings {
      println!("\n⚠️  Some warnings found. Consider addressing them.");
    } else {
      println!("\n✨ All checks passed! Ready for the nightly run.");
    }
  }

  if has_errors {
    std::process::exit(ExitCode::Config.as_i32());
  }
  Ok(())
}
