//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub const CANONICAL: &str = "pymc-devs/pytensor";

/// A git checkout with an origin remote and (optionally) a nightly.toml
pub struct TestWorkspace {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestWorkspace {
  /// Create a checkout whose origin points at `origin_slug` on GitHub
  pub fn new(origin_slug: &str) -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();

    git(&path, &["init", "--initial-branch=main"])?;
    git(&path, &["config", "user.name", "Test User"])?;
    git(&path, &["config", "user.email", "test@example.com"])?;
    git(
      &path,
      &["remote", "add", "origin", &format!("https://github.com/{}.git", origin_slug)],
    )?;

    std::fs::write(
      path.join("pyproject.toml"),
      r#"[build-system]
requires = ["setuptools"]
build-backend = "setuptools.build_meta"

[project]
name = "pytensor"
dynamic = ["version"]
"#,
    )?;

    git(&path, &["add", "."])?;
    git(&path, &["commit", "-m", "Initial project setup"])?;

    Ok(Self { _root: root, path })
  }

  /// Write nightly.toml with the given canonical identity and extra TOML
  pub fn write_config(&self, canonical: &str, extra: &str) -> Result<()> {
    let content = format!(
      r#"[repository]
canonical = "{}"

[toolchain]
python = "3.9"
{}"#,
      canonical, extra
    );
    std::fs::write(self.path.join("nightly.toml"), content)?;
    Ok(())
  }

  /// Check if a file exists
  pub fn file_exists(&self, path: &str) -> bool {
    self.path.join(path).exists()
  }

  /// Read a file
  pub fn read_file(&self, path: &str) -> Result<String> {
    Ok(std::fs::read_to_string(self.path.join(path))?)
  }
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Run the nightly-rail binary, returning its output whatever the exit status
///
/// The CI identity and the publish secret are removed so the host
/// environment cannot change the outcome.
pub fn run_nightly_rail(cwd: &Path, args: &[&str], envs: &[(&str, &str)]) -> Result<Output> {
  let bin = env!("CARGO_BIN_EXE_nightly-rail");

  let mut command = Command::new(bin);
  command
    .current_dir(cwd)
    .args(args)
    .env_remove("GITHUB_REPOSITORY")
    .env_remove("PYPI_TOKEN")
    .env_remove("NIGHTLY_RAIL_CONFIG")
    .env("RUST_LOG", "off");
  for (key, value) in envs {
    command.env(key, value);
  }

  command.output().context("Failed to run nightly-rail")
}

pub fn stdout(output: &Output) -> String {
  String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
  String::from_utf8_lossy(&output.stderr).to_string()
}

/// Parse stdout as a single JSON document
pub fn json(output: &Output) -> Result<serde_json::Value> {
  serde_json::from_slice(&output.stdout)
    .with_context(|| format!("stdout is not JSON:\n{}\nstderr:\n{}", stdout(output), stderr(output)))
}
