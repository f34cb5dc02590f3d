//! Error types for nightly-rail with contextual messages and exit codes
//!
//! Errors are grouped the way the run history reports them: configuration
//! problems, build failures (anything before an artifact is staged) and
//! publish failures (anything after). A skipped run is an outcome, not an
//! error, so it has no variant here.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for nightly-rail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// Configuration error (missing credential, missing toolchain spec, bad config)
  Config = 1,
  /// Build failure (provisioning, install, build)
  Build = 2,
  /// Publish failure (network, index rejection)
  Publish = 3,
  /// System error (I/O, unexpected)
  System = 4,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Failure category surfaced in run records and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
  Configuration,
  Build,
  Publish,
  System,
}

impl FailureKind {
  pub fn exit_code(self) -> ExitCode {
    match self {
      FailureKind::Configuration => ExitCode::Config,
      FailureKind::Build => ExitCode::Build,
      FailureKind::Publish => ExitCode::Publish,
      FailureKind::System => ExitCode::System,
    }
  }
}

impl fmt::Display for FailureKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FailureKind::Configuration => write!(f, "ConfigurationError"),
      FailureKind::Build => write!(f, "BuildFailure"),
      FailureKind::Publish => write!(f, "PublishFailure"),
      FailureKind::System => write!(f, "SystemError"),
    }
  }
}

/// Main error type for nightly-rail
#[derive(Debug)]
pub enum NightlyError {
  /// Configuration errors
  Config(ConfigError),

  /// Provisioning, install and build errors
  Build(BuildError),

  /// Upload errors
  Publish(PublishError),

  /// Git operation errors
  Git(GitError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl NightlyError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    NightlyError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    NightlyError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      NightlyError::Message { message, context, help } => NightlyError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      NightlyError::Io(err) => NightlyError::Message {
        message: format!("I/O error: {}", err),
        context: Some(ctx_str),
        help: None,
      },
      _ => self,
    }
  }

  /// Category of this error as reported in the run record
  pub fn kind(&self) -> FailureKind {
    match self {
      NightlyError::Config(_) => FailureKind::Configuration,
      NightlyError::Build(_) | NightlyError::Git(_) => FailureKind::Build,
      NightlyError::Publish(_) => FailureKind::Publish,
      NightlyError::Io(_) | NightlyError::Message { .. } => FailureKind::System,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    self.kind().exit_code()
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      NightlyError::Config(e) => e.help_message(),
      NightlyError::Build(e) => e.help_message(),
      NightlyError::Publish(e) => e.help_message(),
      NightlyError::Git(e) => e.help_message(),
      NightlyError::Message { help, .. } => help.clone(),
      NightlyError::Io(_) => None,
    }
  }
}

impl fmt::Display for NightlyError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      NightlyError::Config(e) => write!(f, "{}", e),
      NightlyError::Build(e) => write!(f, "{}", e),
      NightlyError::Publish(e) => write!(f, "{}", e),
      NightlyError::Git(e) => write!(f, "{}", e),
      NightlyError::Io(e) => write!(f, "I/O error: {}", e),
      NightlyError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for NightlyError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      NightlyError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for NightlyError {
  fn from(err: io::Error) -> Self {
    NightlyError::Io(err)
  }
}

impl From<String> for NightlyError {
  fn from(msg: String) -> Self {
    NightlyError::message(msg)
  }
}

impl From<&str> for NightlyError {
  fn from(msg: &str) -> Self {
    NightlyError::message(msg)
  }
}

impl From<ConfigError> for NightlyError {
  fn from(err: ConfigError) -> Self {
    NightlyError::Config(err)
  }
}

impl From<BuildError> for NightlyError {
  fn from(err: BuildError) -> Self {
    NightlyError::Build(err)
  }
}

impl From<PublishError> for NightlyError {
  fn from(err: PublishError) -> Self {
    NightlyError::Publish(err)
  }
}

impl From<GitError> for NightlyError {
  fn from(err: GitError) -> Self {
    NightlyError::Git(err)
  }
}

impl From<toml_edit::de::Error> for NightlyError {
  fn from(err: toml_edit::de::Error) -> Self {
    NightlyError::Config(ConfigError::Invalid {
      reason: format!("TOML deserialization error: {}", err),
    })
  }
}

impl From<toml_edit::ser::Error> for NightlyError {
  fn from(err: toml_edit::ser::Error) -> Self {
    NightlyError::message(format!("TOML serialization error: {}", err))
  }
}

impl From<serde_json::Error> for NightlyError {
  fn from(err: serde_json::Error) -> Self {
    NightlyError::message(format!("JSON error: {}", err))
  }
}

impl From<std::string::FromUtf8Error> for NightlyError {
  fn from(err: std::string::FromUtf8Error) -> Self {
    NightlyError::message(format!("UTF-8 conversion error: {}", err))
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// nightly.toml not found
  NotFound { search_root: PathBuf },

  /// Missing required field
  MissingField { field: String },

  /// Toolchain version specifier absent or empty
  MissingToolchain,

  /// Publish credential absent from the secret source
  MissingCredential { source: String },

  /// Field present but invalid
  Invalid { reason: String },

  /// No explicit identity and none derivable from the checkout
  UnknownIdentity { reason: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::NotFound { .. } => Some("Run `nightly-rail init` to create a configuration file.".to_string()),
      ConfigError::MissingToolchain => {
        Some("Pin the interpreter in nightly.toml:\n  [toolchain]\n  python = \"3.9\"".to_string())
      }
      ConfigError::MissingCredential { source } => Some(format!(
        "Expose the publish token to the job as {}. This is a configuration problem, not a build failure.",
        source
      )),
      ConfigError::UnknownIdentity { .. } => Some(
        "Pass --repository <owner/name>, set GITHUB_REPOSITORY, or configure [repository] remote to a remote that exists"
          .to_string(),
      ),
      _ => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::NotFound { search_root } => {
        write!(
          f,
          "No nightly-rail configuration found.\nExpected file: {}/nightly.toml",
          search_root.display()
        )
      }
      ConfigError::MissingField { field } => {
        write!(f, "Missing required field in config: {}", field)
      }
      ConfigError::MissingToolchain => write!(f, "No toolchain version specifier configured"),
      ConfigError::MissingCredential { source } => {
        write!(f, "Publish credential not available (expected in {})", source)
      }
      ConfigError::Invalid { reason } => write!(f, "Invalid configuration: {}", reason),
      ConfigError::UnknownIdentity { reason } => write!(f, "Cannot determine repository identity: {}", reason),
    }
  }
}

/// Failures before an artifact is staged
#[derive(Debug)]
pub enum BuildError {
  /// No interpreter matching the pinned version
  ToolchainUnavailable { spec: String, tried: Vec<String> },

  /// A subprocess exited unsuccessfully
  CommandFailed {
    command: String,
    status: Option<i32>,
    stderr: String,
  },

  /// A subprocess could not be started at all
  Spawn { command: String, reason: String },

  /// Checkout history is still shallow after provisioning
  ShallowHistory { path: PathBuf },

  /// Build produced no source distribution
  MissingArtifact { staging: PathBuf },

  /// Build produced more than one artifact
  UnexpectedArtifacts { staging: PathBuf, found: Vec<String> },

  /// Artifact file is empty
  EmptyArtifact { path: PathBuf },

  /// Artifact file name does not follow `<name>-<version>.tar.gz`
  MalformedArtifactName { file_name: String },

  /// Version label does not match the build mode (nightly vs release)
  ModeMismatch { version: String, nightly: bool },
}

impl BuildError {
  fn help_message(&self) -> Option<String> {
    match self {
      BuildError::ToolchainUnavailable { spec, .. } => Some(format!(
        "Install Python {} or point [toolchain] interpreter at a matching executable.",
        spec
      )),
      BuildError::ShallowHistory { .. } => {
        Some("Version labels need full history. Check out with fetch-depth 0 or configure clone_url.".to_string())
      }
      BuildError::ModeMismatch { .. } => Some(
        "The project ignored the build mode flag. Check that [build] nightly_env matches what the build backend reads."
          .to_string(),
      ),
      _ => None,
    }
  }
}

impl fmt::Display for BuildError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BuildError::ToolchainUnavailable { spec, tried } => {
        write!(f, "No Python interpreter matching {} (tried: {})", spec, tried.join(", "))
      }
      BuildError::CommandFailed { command, status, stderr } => {
        match status {
          Some(code) => write!(f, "Command failed with exit code {}: {}", code, command)?,
          None => write!(f, "Command terminated by signal: {}", command)?,
        }
        if !stderr.trim().is_empty() {
          write!(f, "\n{}", stderr.trim_end())?;
        }
        Ok(())
      }
      BuildError::Spawn { command, reason } => write!(f, "Failed to start {}: {}", command, reason),
      BuildError::ShallowHistory { path } => {
        write!(f, "Repository at {} still has shallow history", path.display())
      }
      BuildError::MissingArtifact { staging } => {
        write!(f, "Build produced no source distribution in {}", staging.display())
      }
      BuildError::UnexpectedArtifacts { staging, found } => write!(
        f,
        "Expected exactly one source distribution in {}, found: {}",
        staging.display(),
        found.join(", ")
      ),
      BuildError::EmptyArtifact { path } => write!(f, "Artifact is empty: {}", path.display()),
      BuildError::MalformedArtifactName { file_name } => {
        write!(f, "Artifact name does not look like <name>-<version>.tar.gz: {}", file_name)
      }
      BuildError::ModeMismatch { version, nightly: true } => {
        write!(f, "Nightly build produced release version label {}", version)
      }
      BuildError::ModeMismatch { version, nightly: false } => {
        write!(f, "Release build produced nightly version label {}", version)
      }
    }
  }
}

/// Failures after a valid artifact was produced
#[derive(Debug)]
pub enum PublishError {
  /// Transport-level failure (DNS, TLS, timeout, connection reset)
  Network { endpoint: String, reason: String },

  /// Index refused the file because the version already exists
  Duplicate { file_name: String },

  /// Index refused the credential
  Unauthorized { status: u16 },

  /// Any other index rejection
  Rejected { status: u16, body: String },
}

impl PublishError {
  /// Whether a later attempt within the same run could succeed
  pub fn is_transient(&self) -> bool {
    matches!(self, PublishError::Network { .. })
  }

  fn help_message(&self) -> Option<String> {
    match self {
      PublishError::Duplicate { .. } => {
        Some("The next scheduled run produces a new version label; nothing to do.".to_string())
      }
      PublishError::Unauthorized { .. } => {
        Some("Rotate the publish token and check it is scoped to this project.".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for PublishError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PublishError::Network { endpoint, reason } => write!(f, "Upload to {} failed: {}", endpoint, reason),
      PublishError::Duplicate { file_name } => {
        write!(f, "Package index already has {}", file_name)
      }
      PublishError::Unauthorized { status } => {
        write!(f, "Package index rejected the credential (HTTP {})", status)
      }
      PublishError::Rejected { status, body } => {
        write!(f, "Package index rejected the upload (HTTP {})", status)?;
        if !body.trim().is_empty() {
          write!(f, ": {}", body.trim())?;
        }
        Ok(())
      }
    }
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// Git command failed
  CommandFailed { command: String, stderr: String },

  /// Repository not found
  RepoNotFound { path: PathBuf },

  /// No origin remote to derive identity from
  NoRemote { name: String },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::RepoNotFound { path } => Some(format!(
        "Check [repository] path or configure clone_url: {}",
        path.display()
      )),
      GitError::NoRemote { .. } => Some("Pass --repository <owner/name> or set GITHUB_REPOSITORY.".to_string()),
      _ => None,
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr)
      }
      GitError::RepoNotFound { path } => {
        write!(f, "Git repository not found at: {}", path.display())
      }
      GitError::NoRemote { name } => write!(f, "Remote '{}' is not configured", name),
    }
  }
}

/// Result type alias for nightly-rail
pub type NightlyResult<T> = Result<T, NightlyError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> NightlyResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> NightlyResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<NightlyError>,
{
  fn context(self, ctx: impl Into<String>) -> NightlyResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> NightlyResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &NightlyError) {
  eprintln!("\n❌ {}: {}\n", error.kind(), error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
