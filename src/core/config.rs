use crate::core::error::{ConfigError, NightlyError, NightlyResult, ResultExt};
use crate::pipeline::gate::RepositoryIdentity;
use crate::schedule::DailySchedule;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for nightly-rail
/// Searched in order: nightly.toml, .nightly.toml, .config/nightly.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NightlyConfig {
  pub repository: RepositoryConfig,
  #[serde(default)]
  pub toolchain: ToolchainConfig,
  #[serde(default)]
  pub install: InstallConfig,
  #[serde(default)]
  pub build: BuildConfig,
  #[serde(default)]
  pub publish: PublishConfig,
  #[serde(default)]
  pub schedule: ScheduleConfig,
  #[serde(default)]
  pub environment: EnvironmentConfig,

  /// Directory the config was loaded from; relative paths resolve against it
  #[serde(skip)]
  pub base_dir: PathBuf,
}

/// Which repository may publish, and where its sources come from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
  /// Canonical `owner/name`; the only identity allowed past the gate
  pub canonical: String,

  /// Local checkout used when no clone_url is set
  #[serde(default = "default_repository_path")]
  pub path: PathBuf,

  /// Clone this URL with full history into the run workspace instead of using `path`
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub clone_url: Option<String>,

  /// Remote used to derive the current identity when none is passed in
  #[serde(default = "default_remote")]
  pub remote: String,
}

fn default_repository_path() -> PathBuf {
  PathBuf::from(".")
}

fn default_remote() -> String {
  "origin".to_string()
}

/// Pinned interpreter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolchainConfig {
  /// Version specifier, e.g. "3.9"
  #[serde(default)]
  pub python: String,

  /// Explicit interpreter path, tried before PATH lookup
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub interpreter: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallConfig {
  /// Base packaging tool upgraded first
  #[serde(default = "default_packaging_tool")]
  pub packaging_tool: String,

  /// The one additional tool installed (requirement string, may carry a pin)
  #[serde(default = "default_builder")]
  pub builder: String,
}

fn default_packaging_tool() -> String {
  "pip".to_string()
}

fn default_builder() -> String {
  "build".to_string()
}

impl Default for InstallConfig {
  fn default() -> Self {
    Self {
      packaging_tool: default_packaging_tool(),
      builder: default_builder(),
    }
  }
}

/// Artifact builder settings
///
/// `nightly = true` sets `nightly_env=true` for the build tool, which makes the
/// version label carry a `.dev<date>` suffix. `nightly = false` sets it to
/// `false` and the standard release version is produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
  #[serde(default = "default_true")]
  pub nightly: bool,

  /// Environment variable the build backend reads
  #[serde(default = "default_nightly_env")]
  pub nightly_env: String,

  /// Project directory relative to the checkout root
  #[serde(default = "default_package_dir")]
  pub package_dir: PathBuf,
}

fn default_true() -> bool {
  true
}

fn default_nightly_env() -> String {
  "NIGHTLY_BUILD".to_string()
}

fn default_package_dir() -> PathBuf {
  PathBuf::from(".")
}

impl Default for BuildConfig {
  fn default() -> Self {
    Self {
      nightly: true,
      nightly_env: default_nightly_env(),
      package_dir: default_package_dir(),
    }
  }
}

/// Package index upload settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
  /// Legacy upload API endpoint
  #[serde(default = "default_repository_url")]
  pub repository_url: String,

  /// Credential identity
  #[serde(default = "default_username")]
  pub username: String,

  /// Environment variable holding the secret
  #[serde(default = "default_token_env")]
  pub token_env: String,

  /// Upload attempts per run (1 = no retry). Only transport errors are retried.
  #[serde(default = "default_max_attempts")]
  pub max_attempts: u32,

  #[serde(default = "default_retry_delay_secs")]
  pub retry_delay_secs: u64,

  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_repository_url() -> String {
  "https://upload.pypi.org/legacy/".to_string()
}

fn default_username() -> String {
  "__token__".to_string()
}

fn default_token_env() -> String {
  "PYPI_TOKEN".to_string()
}

fn default_max_attempts() -> u32 {
  1
}

fn default_retry_delay_secs() -> u64 {
  30
}

fn default_timeout_secs() -> u64 {
  300
}

impl Default for PublishConfig {
  fn default() -> Self {
    Self {
      repository_url: default_repository_url(),
      username: default_username(),
      token_env: default_token_env(),
      max_attempts: default_max_attempts(),
      retry_delay_secs: default_retry_delay_secs(),
      timeout_secs: default_timeout_secs(),
    }
  }
}

/// Daily trigger settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
  /// UTC time of day, "HH:MM"
  #[serde(default = "default_time")]
  pub time: String,

  /// Refuse to fire twice on the same UTC date
  #[serde(default)]
  pub duplicate_guard: bool,

  /// Stamp file for the duplicate guard
  #[serde(default = "default_guard_file")]
  pub guard_file: PathBuf,
}

fn default_time() -> String {
  "00:00".to_string()
}

fn default_guard_file() -> PathBuf {
  PathBuf::from(".nightly-rail/last-run")
}

impl Default for ScheduleConfig {
  fn default() -> Self {
    Self {
      time: default_time(),
      duplicate_guard: false,
      guard_file: default_guard_file(),
    }
  }
}

/// Variables forwarded from the parent environment into subprocesses
/// (PATH and HOME always are)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
  #[serde(default = "default_passthrough")]
  pub passthrough: Vec<String>,
}

fn default_passthrough() -> Vec<String> {
  [
    "http_proxy",
    "https_proxy",
    "no_proxy",
    "HTTP_PROXY",
    "HTTPS_PROXY",
    "NO_PROXY",
    "SSL_CERT_FILE",
    "PIP_INDEX_URL",
  ]
  .iter()
  .map(|s| s.to_string())
  .collect()
}

impl Default for EnvironmentConfig {
  fn default() -> Self {
    Self {
      passthrough: default_passthrough(),
    }
  }
}

impl NightlyConfig {
  /// Find config file in search order: nightly.toml, .nightly.toml, .config/nightly.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("nightly.toml"),
      path.join(".nightly.toml"),
      path.join(".config").join("nightly.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config by searching a directory
  pub fn load(path: &Path) -> NightlyResult<Self> {
    let config_path = Self::find_config_path(path).ok_or_else(|| {
      NightlyError::Config(ConfigError::NotFound {
        search_root: path.to_path_buf(),
      })
    })?;
    Self::load_file(&config_path)
  }

  /// Load config from an explicit file
  pub fn load_file(config_path: &Path) -> NightlyResult<Self> {
    if !config_path.exists() {
      return Err(NightlyError::Config(ConfigError::NotFound {
        search_root: config_path.parent().map(Path::to_path_buf).unwrap_or_default(),
      }));
    }

    let content = fs::read_to_string(config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let mut config = Self::parse(&content)?;

    // A file in .config/ still describes the directory above it
    let dir = config_path.parent().unwrap_or(Path::new("."));
    config.base_dir = if dir.file_name().is_some_and(|n| n == ".config") {
      dir.parent().unwrap_or(dir).to_path_buf()
    } else {
      dir.to_path_buf()
    };

    Ok(config)
  }

  /// Parse and validate TOML content
  pub fn parse(content: &str) -> NightlyResult<Self> {
    let config: NightlyConfig = toml_edit::de::from_str(content)?;
    config.validate()?;
    Ok(config)
  }

  /// Save config to nightly.toml (default location)
  pub fn save(&self, path: &Path) -> NightlyResult<PathBuf> {
    let config_path = path.join("nightly.toml");
    let content = toml_edit::ser::to_string_pretty(self).context("Failed to serialize config to TOML")?;
    fs::write(&config_path, content).with_context(|| format!("Failed to write config to {}", config_path.display()))?;
    Ok(config_path)
  }

  /// Create a new config with defaults for a canonical repository
  pub fn new(canonical: impl Into<String>, base_dir: PathBuf) -> Self {
    Self {
      repository: RepositoryConfig {
        canonical: canonical.into(),
        path: default_repository_path(),
        clone_url: None,
        remote: default_remote(),
      },
      toolchain: ToolchainConfig {
        python: "3.9".to_string(),
        interpreter: None,
      },
      install: InstallConfig::default(),
      build: BuildConfig::default(),
      publish: PublishConfig::default(),
      schedule: ScheduleConfig::default(),
      environment: EnvironmentConfig::default(),
      base_dir,
    }
  }

  /// Structural validation; toolchain presence is checked when a run needs it
  pub fn validate(&self) -> NightlyResult<()> {
    if self.repository.canonical.trim().is_empty() {
      return Err(NightlyError::Config(ConfigError::MissingField {
        field: "repository.canonical".to_string(),
      }));
    }
    RepositoryIdentity::parse(&self.repository.canonical)?;

    DailySchedule::parse(&self.schedule.time)?;

    if !is_env_name(&self.build.nightly_env) {
      return Err(invalid(format!(
        "build.nightly_env '{}' is not a valid environment variable name",
        self.build.nightly_env
      )));
    }

    if self.install.packaging_tool.trim().is_empty() || self.install.builder.trim().is_empty() {
      return Err(invalid("install.packaging_tool and install.builder must not be empty"));
    }

    if !(self.publish.repository_url.starts_with("https://") || self.publish.repository_url.starts_with("http://")) {
      return Err(invalid(format!(
        "publish.repository_url '{}' must be an http(s) URL",
        self.publish.repository_url
      )));
    }

    if self.publish.max_attempts == 0 {
      return Err(invalid("publish.max_attempts must be at least 1"));
    }

    if self.publish.timeout_secs == 0 {
      return Err(invalid("publish.timeout_secs must be at least 1"));
    }

    if !is_env_name(&self.publish.token_env) {
      return Err(invalid(format!(
        "publish.token_env '{}' is not a valid environment variable name",
        self.publish.token_env
      )));
    }

    // The secret never enters a subprocess environment
    if self.environment.passthrough.iter().any(|v| v == &self.publish.token_env) {
      return Err(invalid(format!(
        "environment.passthrough must not forward the publish secret ({})",
        self.publish.token_env
      )));
    }

    Ok(())
  }

  /// Resolve a config-relative path
  pub fn resolve(&self, path: &Path) -> PathBuf {
    if path.is_absolute() {
      path.to_path_buf()
    } else {
      self.base_dir.join(path)
    }
  }

  /// Local checkout path, resolved
  pub fn checkout_path(&self) -> PathBuf {
    self.resolve(&self.repository.path)
  }

  /// Duplicate-guard stamp file, resolved
  pub fn guard_path(&self) -> PathBuf {
    self.resolve(&self.schedule.guard_file)
  }
}

fn invalid(reason: impl Into<String>) -> NightlyError {
  NightlyError::Config(ConfigError::Invalid { reason: reason.into() })
}

fn is_env_name(name: &str) -> bool {
  !name.is_empty()
    && !name.starts_with(|c: char| c.is_ascii_digit())
    && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
