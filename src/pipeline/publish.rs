//! Upload to the package index
//!
//! The publisher takes ownership of a [`StagedArtifact`], acquires the
//! credential for the duration of the upload only, and sends the file through
//! a [`PackageIndex`]. Only transport failures are retried, and only when the
//! retry policy allows more than one attempt.

use super::build::StagedArtifact;
use super::credential::{Credential, CredentialSource};
use crate::core::config::PublishConfig;
use crate::core::error::{BuildError, NightlyResult, PublishError};
use reqwest::StatusCode;
use reqwest::blocking::{Client, multipart};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

/// Longest response body kept in an error message
const MAX_BODY_IN_ERROR: usize = 512;

/// What the index accepted
#[derive(Debug, Clone, Serialize)]
pub struct UploadReceipt {
  pub endpoint: String,
  pub file_name: String,
  pub status: u16,
  pub attempts: u32,
}

/// A package index that accepts sdist uploads
pub trait PackageIndex {
  fn endpoint(&self) -> &str;

  /// Upload one artifact; a single attempt
  fn upload(&self, artifact: &StagedArtifact, credential: &Credential) -> Result<u16, PublishError>;
}

/// Legacy upload API over HTTPS (multipart form, basic auth)
pub struct HttpIndex {
  endpoint: String,
  client: Client,
}

impl HttpIndex {
  pub fn new(config: &PublishConfig) -> NightlyResult<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .user_agent(concat!("nightly-rail/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| PublishError::Network {
        endpoint: config.repository_url.clone(),
        reason: e.to_string(),
      })?;
    Ok(Self {
      endpoint: config.repository_url.clone(),
      client,
    })
  }

  fn form(artifact: &StagedArtifact) -> std::io::Result<multipart::Form> {
    multipart::Form::new()
      .text(":action", "file_upload")
      .text("protocol_version", "1")
      .text("metadata_version", "2.1")
      .text("name", artifact.name().to_string())
      .text("version", artifact.version().to_string())
      .text("filetype", "sdist")
      .text("pyversion", "source")
      .text("sha256_digest", artifact.sha256().to_string())
      .file("content", artifact.path())
  }
}

impl PackageIndex for HttpIndex {
  fn endpoint(&self) -> &str {
    &self.endpoint
  }

  fn upload(&self, artifact: &StagedArtifact, credential: &Credential) -> Result<u16, PublishError> {
    let form = Self::form(artifact).map_err(|e| PublishError::Network {
      endpoint: self.endpoint.clone(),
      reason: format!("failed to read {}: {}", artifact.file_name(), e),
    })?;

    let response = self
      .client
      .post(&self.endpoint)
      .basic_auth(&credential.identity, Some(credential.secret.expose()))
      .multipart(form)
      .send()
      .map_err(|e| PublishError::Network {
        endpoint: self.endpoint.clone(),
        reason: e.to_string(),
      })?;

    let status = response.status();
    if status.is_success() {
      return Ok(status.as_u16());
    }
    let body = response.text().unwrap_or_default();
    Err(classify_rejection(status, &body, artifact.file_name()))
  }
}

/// Map a non-success response to a publish error
fn classify_rejection(status: StatusCode, body: &str, file_name: &str) -> PublishError {
  let lower = body.to_ascii_lowercase();
  match status {
    StatusCode::CONFLICT => PublishError::Duplicate {
      file_name: file_name.to_string(),
    },
    StatusCode::BAD_REQUEST if lower.contains("already exists") || lower.contains("file name has already been used") => {
      PublishError::Duplicate {
        file_name: file_name.to_string(),
      }
    }
    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PublishError::Unauthorized {
      status: status.as_u16(),
    },
    _ => PublishError::Rejected {
      status: status.as_u16(),
      body: truncate(body, MAX_BODY_IN_ERROR),
    },
  }
}

fn truncate(text: &str, max: usize) -> String {
  let text = text.trim();
  match text.char_indices().nth(max) {
    Some((idx, _)) => format!("{}...", &text[..idx]),
    None => text.to_string(),
  }
}

/// How many upload attempts, and how long to wait between them
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  pub delay: Duration,
}

impl RetryPolicy {
  pub fn from_config(config: &PublishConfig) -> Self {
    Self {
      max_attempts: config.max_attempts.max(1),
      delay: Duration::from_secs(config.retry_delay_secs),
    }
  }

  #[cfg(test)]
  pub fn once() -> Self {
    Self {
      max_attempts: 1,
      delay: Duration::ZERO,
    }
  }
}

pub struct Publisher<'a> {
  index: &'a dyn PackageIndex,
  credentials: &'a dyn CredentialSource,
  policy: RetryPolicy,
}

impl<'a> Publisher<'a> {
  pub fn new(index: &'a dyn PackageIndex, credentials: &'a dyn CredentialSource, policy: RetryPolicy) -> Self {
    Self {
      index,
      credentials,
      policy,
    }
  }

  /// Upload the artifact. The credential lives only inside this call.
  pub fn publish(&self, artifact: StagedArtifact) -> NightlyResult<UploadReceipt> {
    let size = std::fs::metadata(artifact.path()).map(|m| m.len()).unwrap_or(0);
    if size == 0 {
      return Err(
        BuildError::EmptyArtifact {
          path: artifact.path().to_path_buf(),
        }
        .into(),
      );
    }

    let credential = self.credentials.acquire()?;

    let mut attempt = 1;
    loop {
      info!(
        endpoint = self.index.endpoint(),
        file = artifact.file_name(),
        attempt,
        "uploading"
      );
      match self.index.upload(&artifact, &credential) {
        Ok(status) => {
          return Ok(UploadReceipt {
            endpoint: self.index.endpoint().to_string(),
            file_name: artifact.file_name().to_string(),
            status,
            attempts: attempt,
          });
        }
        Err(err) if err.is_transient() && attempt < self.policy.max_attempts => {
          warn!(error = %err, attempt, "upload failed, retrying");
          std::thread::sleep(self.policy.delay);
          attempt += 1;
        }
        Err(err) => return Err(err.into()),
      }
    }
  }
}
