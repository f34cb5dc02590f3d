//! Canonical-repository gate
//!
//! The gate is a pure predicate over an explicitly supplied identity. It runs
//! before anything with side effects, so a fork or mirror that inherits the
//! schedule never provisions, builds or publishes.

use crate::core::error::{ConfigError, NightlyError, NightlyResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// `owner/name` designation of a repository
///
/// Comparison is exact and case-sensitive. No normalization happens at any
/// point, including when the identity is derived from a remote URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RepositoryIdentity(String);

impl RepositoryIdentity {
  /// Parse `owner/name`; both halves non-empty, exactly one slash, no whitespace
  pub fn parse(raw: &str) -> NightlyResult<Self> {
    let valid = match raw.split_once('/') {
      Some((owner, name)) => {
        !owner.is_empty() && !name.is_empty() && !name.contains('/') && !raw.chars().any(char::is_whitespace)
      }
      None => false,
    };

    if !valid {
      return Err(NightlyError::Config(ConfigError::Invalid {
        reason: format!("repository identity '{}' is not of the form owner/name", raw),
      }));
    }

    Ok(Self(raw.to_string()))
  }

  /// Derive identity from a GitHub-style remote URL
  ///
  /// Accepts `https://host/owner/name(.git)`, `ssh://git@host/owner/name(.git)`
  /// and `git@host:owner/name(.git)`.
  pub fn from_remote_url(url: &str) -> NightlyResult<Self> {
    let trimmed = url.trim().trim_end_matches('/');
    let path = if let Some((_, rest)) = trimmed.split_once("://") {
      rest.split_once('/').map(|(_, p)| p).unwrap_or("")
    } else if let Some((_, rest)) = trimmed.split_once(':') {
      rest
    } else {
      trimmed
    };
    let path = path.strip_suffix(".git").unwrap_or(path);

    // Keep the last two segments (hosts like GitLab allow nested groups)
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 2 {
      return Err(NightlyError::Config(ConfigError::Invalid {
        reason: format!("cannot derive owner/name from remote URL '{}'", url),
      }));
    }
    let n = segments.len();
    Self::parse(&format!("{}/{}", segments[n - 2], segments[n - 1]))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for RepositoryIdentity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Result of evaluating the gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
  Pass,
  Skip { reason: String },
}

impl GateDecision {
  pub fn is_pass(&self) -> bool {
    matches!(self, GateDecision::Pass)
  }
}

/// Compares the current repository against the canonical one
#[derive(Debug, Clone)]
pub struct Gate {
  canonical: RepositoryIdentity,
}

impl Gate {
  pub fn new(canonical: RepositoryIdentity) -> Self {
    Self { canonical }
  }

  pub fn canonical(&self) -> &RepositoryIdentity {
    &self.canonical
  }

  pub fn evaluate(&self, current: &RepositoryIdentity) -> GateDecision {
    if current == &self.canonical {
      GateDecision::Pass
    } else {
      GateDecision::Skip {
        reason: format!("{} is not the canonical repository {}", current, self.canonical),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn id(s: &str) -> RepositoryIdentity {
    RepositoryIdentity::parse(s).unwrap()
  }

  #[test]
  fn test_canonical_passes() {
    let gate = Gate::new(id("pymc-devs/pytensor"));
    assert_eq!(gate.evaluate(&id("pymc-devs/pytensor")), GateDecision::Pass);
  }

  #[test]
  fn test_every_other_identity_skips() {
    let gate = Gate::new(id("pymc-devs/pytensor"));
    for other in [
      "someone/fork",
      "pymc-devs/pytensor-fork",
      "pymc-devs/Pytensor",
      "PyMC-Devs/pytensor",
      "pymc-devs/pytenso",
      "pymc-dev/pytensor",
      "pymc-devs/pytensor.git",
      "*/pytensor",
      "pymc-devs/*",
    ] {
      let decision = gate.evaluate(&id(other));
      assert!(!decision.is_pass(), "{} must not pass the gate", other);
    }
  }

  #[test]
  fn test_parse_rejects_malformed() {
    for bad in ["", "pytensor", "/pytensor", "pymc-devs/", "a/b/c", "pymc devs/pytensor"] {
      assert!(RepositoryIdentity::parse(bad).is_err(), "{:?} should be rejected", bad);
    }
  }

  #[test]
  fn test_from_remote_url_variants() {
    for url in [
      "https://github.com/pymc-devs/pytensor.git",
      "https://github.com/pymc-devs/pytensor",
      "https://github.com/pymc-devs/pytensor/",
      "git@github.com:pymc-devs/pytensor.git",
      "ssh://git@github.com/pymc-devs/pytensor.git",
    ] {
      assert_eq!(RepositoryIdentity::from_remote_url(url).unwrap(), id("pymc-devs/pytensor"), "{}", url);
    }
  }

  #[test]
  fn test_from_remote_url_preserves_case() {
    let derived = RepositoryIdentity::from_remote_url("https://github.com/PyMC-Devs/PyTensor.git").unwrap();
    assert_eq!(derived.as_str(), "PyMC-Devs/PyTensor");
    assert!(!Gate::new(id("pymc-devs/pytensor")).evaluate(&derived).is_pass());
  }

  #[test]
  fn test_from_remote_url_rejects_bare_host() {
    assert!(RepositoryIdentity::from_remote_url("https://github.com/").is_err());
  }
}
