//! Publish credentials
//!
//! A [`Credential`] is acquired from its [`CredentialSource`] inside the
//! publish step and dropped when that step returns. It cannot be serialized,
//! and both `Debug` and `Display` redact the secret.

use crate::core::error::{ConfigError, NightlyResult};
use crate::core::process::{EnvLookup, parent_env};
use std::fmt;

/// Opaque secret value
pub struct Secret(String);

impl Secret {
  pub fn new(value: impl Into<String>) -> Self {
    Self(value.into())
  }

  /// The raw value, for the one place that has to send it
  pub fn expose(&self) -> &str {
    &self.0
  }
}

impl fmt::Debug for Secret {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Secret(***)")
  }
}

impl fmt::Display for Secret {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "***")
  }
}

impl Drop for Secret {
  fn drop(&mut self) {
    // Best effort; the allocator may already hold copies
    let len = self.0.len();
    self.0.clear();
    self.0.extend(std::iter::repeat_n('\0', len));
  }
}

/// Identity/secret pair for the package index
#[derive(Debug)]
pub struct Credential {
  pub identity: String,
  pub secret: Secret,
}

/// Where credentials come from
pub trait CredentialSource {
  /// Human-readable location, used in diagnostics (never the value)
  fn describe(&self) -> String;

  /// Acquire the credential; absence is a configuration error
  fn acquire(&self) -> NightlyResult<Credential>;

  /// Whether a credential is available, without handing it out
  fn is_present(&self) -> bool;
}

/// Secret read from an environment variable at acquisition time
pub struct EnvCredentialSource {
  identity: String,
  var: String,
  lookup: EnvLookup,
}

impl EnvCredentialSource {
  pub fn new(identity: impl Into<String>, var: impl Into<String>) -> Self {
    Self {
      identity: identity.into(),
      var: var.into(),
      lookup: parent_env(),
    }
  }

  #[cfg(test)]
  pub fn with_lookup(mut self, lookup: EnvLookup) -> Self {
    self.lookup = lookup;
    self
  }

  fn read(&self) -> Option<String> {
    (self.lookup)(&self.var).filter(|v| !v.trim().is_empty())
  }
}

impl CredentialSource for EnvCredentialSource {
  fn describe(&self) -> String {
    format!("${}", self.var)
  }

  fn acquire(&self) -> NightlyResult<Credential> {
    let value = self.read().ok_or_else(|| ConfigError::MissingCredential {
      source: self.describe(),
    })?;
    Ok(Credential {
      identity: self.identity.clone(),
      secret: Secret::new(value),
    })
  }

  fn is_present(&self) -> bool {
    self.read().is_some()
  }
}

#[cfg(test)]
pub mod fake {
  use super::*;
  use std::cell::Cell;

  /// In-memory source that counts acquisitions
  pub struct StaticCredentialSource {
    value: Option<String>,
    pub acquisitions: Cell<usize>,
  }

  impl StaticCredentialSource {
    pub fn present(value: &str) -> Self {
      Self {
        value: Some(value.to_string()),
        acquisitions: Cell::new(0),
      }
    }

    pub fn absent() -> Self {
      Self {
        value: None,
        acquisitions: Cell::new(0),
      }
    }
  }

  impl CredentialSource for StaticCredentialSource {
    fn describe(&self) -> String {
      "test source".to_string()
    }

    fn acquire(&self) -> NightlyResult<Credential> {
      self.acquisitions.set(self.acquisitions.get() + 1);
      let value = self.value.clone().ok_or_else(|| ConfigError::MissingCredential {
        source: self.describe(),
      })?;
      Ok(Credential {
        identity: "__token__".to_string(),
        secret: Secret::new(value),
      })
    }

    fn is_present(&self) -> bool {
      self.value.is_some()
    }
  }
}
