//! System git backend
//!
//! Uses git porcelain/plumbing through the [`ProcessRunner`], so every call
//! gets the same isolated environment as the rest of the pipeline.

use super::Describe;
use crate::core::error::{GitError, NightlyResult};
use crate::core::process::{Invocation, ProcessOutput, ProcessRunner};
use std::path::{Path, PathBuf};

/// Git repository handle backed by the system git binary
pub struct SystemGit<'a> {
  runner: &'a dyn ProcessRunner,

  /// Working tree root
  pub(crate) work_tree: PathBuf,
}

impl<'a> SystemGit<'a> {
  /// Open a git repository
  pub fn open(runner: &'a dyn ProcessRunner, path: &Path) -> NightlyResult<Self> {
    let output = runner.run(&base_invocation(path).args(["rev-parse", "--show-toplevel"]))?;

    if !output.success() {
      if output.stderr.contains("not a git repository") || output.stderr.contains("cannot change to") {
        return Err(GitError::RepoNotFound {
          path: path.to_path_buf(),
        }
        .into());
      }
      return Err(command_failed("git rev-parse --show-toplevel", &output));
    }

    Ok(Self {
      runner,
      work_tree: PathBuf::from(output.stdout.trim()),
    })
  }

  /// Clone `url` into `dest` with complete history (no depth limit)
  pub fn clone_full(runner: &'a dyn ProcessRunner, url: &str, dest: &Path) -> NightlyResult<Self> {
    let output = runner.run(
      &Invocation::new("git")
        .args(safe_config())
        .args(["clone", "--no-single-branch", "--tags", url])
        .arg(dest.as_os_str()),
    )?;

    if !output.success() {
      return Err(command_failed(&format!("git clone {}", url), &output));
    }

    Self::open(runner, dest)
  }

  /// Working tree root
  pub fn work_tree(&self) -> &Path {
    &self.work_tree
  }

  /// Whether the repository is a shallow clone
  pub fn is_shallow(&self) -> NightlyResult<bool> {
    let output = self.git(&["rev-parse", "--is-shallow-repository"])?;
    Ok(output.stdout.trim() == "true")
  }

  /// Fetch the missing history (and tags) of a shallow clone
  pub fn unshallow(&self, remote: &str) -> NightlyResult<()> {
    self.git(&["fetch", "--unshallow", "--tags", remote])?;
    Ok(())
  }

  /// Get HEAD commit SHA
  pub fn head_commit(&self) -> NightlyResult<String> {
    let output = self.git(&["rev-parse", "HEAD"])?;
    Ok(output.stdout.trim().to_string())
  }

  /// URL of a named remote
  pub fn remote_url(&self, name: &str) -> NightlyResult<String> {
    let output = self.runner.run(&self.git_invocation(&["remote", "get-url", name]))?;
    if !output.success() {
      return Err(GitError::NoRemote { name: name.to_string() }.into());
    }
    Ok(output.stdout.trim().to_string())
  }

  /// Nearest tag, or None when the history has no tags
  pub fn describe(&self) -> NightlyResult<Option<Describe>> {
    let output = self
      .runner
      .run(&self.git_invocation(&["describe", "--tags", "--long", "--always"]))?;
    if !output.success() {
      return Ok(None);
    }
    Ok(Describe::parse(&output.stdout))
  }

  fn git(&self, args: &[&str]) -> NightlyResult<ProcessOutput> {
    let output = self.runner.run(&self.git_invocation(args))?;
    if !output.success() {
      return Err(command_failed(&format!("git {}", args.join(" ")), &output));
    }
    Ok(output)
  }

  fn git_invocation(&self, args: &[&str]) -> Invocation {
    base_invocation(&self.work_tree).args(args.iter().copied())
  }
}

/// `git -C <path>` with safe configuration overrides
fn base_invocation(path: &Path) -> Invocation {
  Invocation::new("git").arg("-C").arg(path.as_os_str()).args(safe_config())
}

/// Force safe behavior (override user config)
fn safe_config() -> [&'static str; 6] {
  [
    "-c",
    "protocol.version=2",
    "-c",
    "advice.detachedHead=false",
    "-c",
    "core.quotePath=false",
  ]
}

fn command_failed(command: &str, output: &ProcessOutput) -> crate::core::error::NightlyError {
  GitError::CommandFailed {
    command: command.to_string(),
    stderr: output.stderr.trim().to_string(),
  }
  .into()
}
