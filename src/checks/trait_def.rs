//! Check trait abstraction for health checks
//!
//! Every `doctor` diagnostic implements [`Check`], so adding one means adding
//! a type and registering it in the runner.

use crate::core::config::NightlyConfig;
use crate::core::error::NightlyResult;
use crate::core::process::ProcessRunner;
use crate::pipeline::gate::RepositoryIdentity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level for check results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
  /// Informational message (not an issue)
  Info,
  /// Warning (non-blocking, but should be addressed)
  Warning,
  /// Error (a run would fail)
  Error,
}

impl fmt::Display for Severity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Severity::Info => write!(f, "INFO"),
      Severity::Warning => write!(f, "WARN"),
      Severity::Error => write!(f, "ERROR"),
    }
  }
}

/// Result of running a check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
  pub check_name: String,
  pub passed: bool,
  /// Severity level (if failed)
  pub severity: Severity,
  pub message: String,
  /// Optional suggested fix
  pub suggestion: Option<String>,
  /// Additional metadata (for JSON output)
  #[serde(skip_serializing_if = "Option::is_none")]
  pub details: Option<serde_json::Value>,
}

impl CheckResult {
  pub fn pass(check_name: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      check_name: check_name.into(),
      passed: true,
      severity: Severity::Info,
      message: message.into(),
      suggestion: None,
      details: None,
    }
  }

  pub fn error(
    check_name: impl Into<String>,
    message: impl Into<String>,
    suggestion: Option<impl Into<String>>,
  ) -> Self {
    Self {
      check_name: check_name.into(),
      passed: false,
      severity: Severity::Error,
      message: message.into(),
      suggestion: suggestion.map(|s| s.into()),
      details: None,
    }
  }

  pub fn warning(
    check_name: impl Into<String>,
    message: impl Into<String>,
    suggestion: Option<impl Into<String>>,
  ) -> Self {
    Self {
      check_name: check_name.into(),
      passed: false,
      severity: Severity::Warning,
      message: message.into(),
      suggestion: suggestion.map(|s| s.into()),
      details: None,
    }
  }

  pub fn with_details(mut self, details: serde_json::Value) -> Self {
    self.details = Some(details);
    self
  }
}

/// Context passed to checks
pub struct CheckContext<'a> {
  /// Loaded configuration; None when loading failed
  pub config: Option<&'a NightlyConfig>,
  /// Why the configuration could not be loaded
  pub config_error: Option<String>,
  /// Identity the run would be gated on, if it could be determined
  pub repository: Option<RepositoryIdentity>,
  pub runner: &'a dyn ProcessRunner,
  /// Whether to run expensive checks (network)
  pub thorough: bool,
}

/// Health check trait
///
/// ```rust,ignore
/// struct MyCheck;
///
/// impl Check for MyCheck {
///   fn name(&self) -> &str {
///     "my-check"
///   }
///
///   fn description(&self) -> &str {
///     "Validates my requirement"
///   }
///
///   fn run(&self, ctx: &CheckContext) -> NightlyResult<CheckResult> {
///     Ok(CheckResult::pass(self.name(), "All good"))
///   }
/// }
/// ```
pub trait Check: Send + Sync {
  /// Unique name for this check (kebab-case)
  fn name(&self) -> &str;

  /// Human-readable description of what this check validates
  fn description(&self) -> &str;

  fn run(&self, ctx: &CheckContext) -> NightlyResult<CheckResult>;

  /// Whether this check is expensive (requires network, etc.)
  fn is_expensive(&self) -> bool {
    false
  }
}
