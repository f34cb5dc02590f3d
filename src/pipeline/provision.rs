//! Environment provisioning
//!
//! Produces a ready [`Environment`]: an interpreter matching the pinned
//! version, a checkout with complete history, and a fresh virtual
//! environment inside a temporary run workspace. The workspace (venv and
//! staged artifacts) is removed when the `Environment` is dropped.

use crate::core::config::NightlyConfig;
use crate::core::error::{BuildError, ConfigError, NightlyError, NightlyResult, ResultExt};
use crate::core::process::{Invocation, ProcessRunner};
use crate::core::vcs::{Describe, SystemGit};
use crate::utils::venv_python;
use std::fmt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Pinned interpreter version, matched by component prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainSpec {
  components: Vec<u32>,
}

impl ToolchainSpec {
  /// Parse "3.9" / "3.9.18"; empty is a configuration error
  pub fn parse(raw: &str) -> NightlyResult<Self> {
    let raw = raw.trim();
    if raw.is_empty() {
      return Err(NightlyError::Config(ConfigError::MissingToolchain));
    }
    let components = raw
      .split('.')
      .map(|c| c.parse::<u32>().ok())
      .collect::<Option<Vec<_>>>()
      .ok_or_else(|| {
        NightlyError::Config(ConfigError::Invalid {
          reason: format!("toolchain.python '{}' is not a version like 3.9", raw),
        })
      })?;
    Ok(Self { components })
  }

  /// Does `python --version` output satisfy this spec?
  pub fn matches(&self, reported: &str) -> bool {
    match parse_reported_version(reported) {
      Some(version) => version.len() >= self.components.len() && version[..self.components.len()] == self.components[..],
      None => false,
    }
  }
}

impl fmt::Display for ToolchainSpec {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let parts: Vec<String> = self.components.iter().map(u32::to_string).collect();
    write!(f, "{}", parts.join("."))
  }
}

/// "Python 3.9.18" -> [3, 9, 18]; tolerates suffixes like "3.13.0rc1"
fn parse_reported_version(reported: &str) -> Option<Vec<u32>> {
  let version = reported.trim().strip_prefix("Python ")?;
  let numeric: Vec<u32> = version
    .split('.')
    .map_while(|part| {
      let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
      digits.parse().ok()
    })
    .collect();
  (!numeric.is_empty()).then_some(numeric)
}

/// A provisioned, clean execution context for one run
pub struct Environment {
  _workspace: TempDir,
  /// Checkout root
  pub checkout: PathBuf,
  /// Project directory handed to the build frontend
  pub project_dir: PathBuf,
  /// Virtual environment interpreter
  pub python: PathBuf,
  /// Empty directory the builder writes into
  pub staging: PathBuf,
  /// Version reported by the base interpreter
  pub interpreter_version: String,
  pub commit: String,
  pub describe: Option<Describe>,
}

pub struct Provisioner<'a> {
  runner: &'a dyn ProcessRunner,
  config: &'a NightlyConfig,
}

impl<'a> Provisioner<'a> {
  pub fn new(runner: &'a dyn ProcessRunner, config: &'a NightlyConfig) -> Self {
    Self { runner, config }
  }

  /// What provisioning will do, for dry runs
  pub fn describe(&self, spec: &ToolchainSpec) -> String {
    let source = match &self.config.repository.clone_url {
      Some(url) => format!("clone {} (full history)", url),
      None => format!(
        "use checkout {} (unshallow if needed)",
        self.config.checkout_path().display()
      ),
    };
    format!("resolve Python {}, {}, create fresh venv", spec, source)
  }

  pub fn provision(&self, spec: &ToolchainSpec) -> NightlyResult<Environment> {
    let (interpreter, interpreter_version) = self.resolve_interpreter(spec)?;
    info!(interpreter = %interpreter.display(), version = %interpreter_version, "resolved toolchain");

    let workspace = tempfile::Builder::new()
      .prefix("nightly-rail-")
      .tempdir()
      .context("Failed to create run workspace")?;

    let repo = self.checkout(workspace.path())?;
    let commit = repo.head_commit()?;
    let describe = repo.describe()?;
    info!(commit = %commit, describe = ?describe, "checkout ready");

    let venv = workspace.path().join("venv");
    self.runner.run_checked(
      &Invocation::new(&interpreter)
        .args(["-m", "venv", "--clear"])
        .arg(venv.as_os_str()),
    )?;

    let staging = workspace.path().join("dist");
    std::fs::create_dir_all(&staging).context("Failed to create staging directory")?;

    let checkout = repo.work_tree().to_path_buf();
    Ok(Environment {
      project_dir: checkout.join(&self.config.build.package_dir),
      checkout,
      python: venv_python(&venv),
      staging,
      interpreter_version,
      commit,
      describe,
      _workspace: workspace,
    })
  }

  fn candidates(&self, spec: &ToolchainSpec) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(explicit) = &self.config.toolchain.interpreter {
      candidates.push(self.config.resolve(explicit));
    }
    candidates.push(PathBuf::from(format!("python{}", spec)));
    candidates.push(PathBuf::from("python3"));
    candidates.push(PathBuf::from("python"));
    candidates.dedup();
    candidates
  }

  /// First candidate whose `--version` matches, with the reported version
  pub fn resolve_interpreter(&self, spec: &ToolchainSpec) -> NightlyResult<(PathBuf, String)> {
    let mut tried = Vec::new();

    for candidate in self.candidates(spec) {
      tried.push(candidate.display().to_string());
      let output = match self.runner.run(&Invocation::new(&candidate).arg("--version")) {
        Ok(output) if output.success() => output,
        Ok(_) => continue,
        Err(err) => {
          debug!(candidate = %candidate.display(), error = %err, "interpreter candidate unavailable");
          continue;
        }
      };

      // Python 2 printed its version to stderr
      let reported = if output.stdout.trim().is_empty() {
        output.stderr.trim()
      } else {
        output.stdout.trim()
      };

      if spec.matches(reported) {
        let version = reported.trim_start_matches("Python ").to_string();
        return Ok((candidate, version));
      }
      debug!(candidate = %candidate.display(), reported, "interpreter version does not match");
    }

    Err(
      BuildError::ToolchainUnavailable {
        spec: spec.to_string(),
        tried,
      }
      .into(),
    )
  }

  fn checkout(&self, workspace: &Path) -> NightlyResult<SystemGit<'a>> {
    let repo = match &self.config.repository.clone_url {
      Some(url) => {
        info!(url = %url, "cloning with full history");
        SystemGit::clone_full(self.runner, url, &workspace.join("src"))?
      }
      None => {
        let repo = SystemGit::open(self.runner, &self.config.checkout_path())?;
        if repo.is_shallow()? {
          warn!(path = %repo.work_tree().display(), "shallow checkout, fetching full history");
          repo.unshallow(&self.config.repository.remote)?;
        }
        repo
      }
    };

    // Version labels are derived from commit distance; partial history would mislabel
    if repo.is_shallow()? {
      return Err(
        BuildError::ShallowHistory {
          path: repo.work_tree().to_path_buf(),
        }
        .into(),
      );
    }

    Ok(repo)
  }
}
