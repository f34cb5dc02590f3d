//! Subprocess execution behind a trait
//!
//! Every external tool the pipeline touches (git, the interpreter, pip, the
//! build frontend) goes through [`ProcessRunner`]. The system implementation
//! starts each child with a cleared environment: only PATH, HOME, the
//! configured passthrough variables and the invocation's own variables are
//! visible. The publish secret is never among them.

use crate::core::error::{BuildError, NightlyResult};
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// One subprocess call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
  pub program: PathBuf,
  pub args: Vec<OsString>,
  pub cwd: Option<PathBuf>,
  pub env: Vec<(String, String)>,
}

impl Invocation {
  pub fn new(program: impl Into<PathBuf>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
      cwd: None,
      env: Vec::new(),
    }
  }

  pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.cwd = Some(dir.into());
    self
  }

  pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.push((key.into(), value.into()));
    self
  }

  /// Arguments as lossy strings, for matching and display
  #[cfg(test)]
  pub fn arg_strings(&self) -> Vec<String> {
    self.args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
  }

  /// Value following `flag` in the argument list
  #[cfg(test)]
  pub fn arg_after(&self, flag: &str) -> Option<PathBuf> {
    let args = self.arg_strings();
    args
      .iter()
      .position(|a| a == flag)
      .and_then(|i| args.get(i + 1))
      .map(PathBuf::from)
  }
}

impl fmt::Display for Invocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.program.display())?;
    for arg in &self.args {
      write!(f, " {}", arg.to_string_lossy())?;
    }
    Ok(())
  }
}

/// Captured result of a finished subprocess
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
  /// Exit code, None if killed by a signal
  pub status: Option<i32>,
  pub stdout: String,
  pub stderr: String,
}

impl ProcessOutput {
  pub fn success(&self) -> bool {
    self.status == Some(0)
  }

  /// Successful output with the given stdout
  #[cfg(test)]
  pub fn ok(stdout: impl Into<String>) -> Self {
    Self {
      status: Some(0),
      stdout: stdout.into(),
      stderr: String::new(),
    }
  }

  /// Failed output with the given stderr
  #[cfg(test)]
  pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
    Self {
      status: Some(code),
      stdout: String::new(),
      stderr: stderr.into(),
    }
  }
}

/// Runs subprocesses; faked in tests
pub trait ProcessRunner {
  /// Run to completion and capture output. Err only if the process could not start.
  fn run(&self, invocation: &Invocation) -> NightlyResult<ProcessOutput>;

  /// Run and turn a non-zero exit into a `BuildError::CommandFailed`
  fn run_checked(&self, invocation: &Invocation) -> NightlyResult<ProcessOutput> {
    let output = self.run(invocation)?;
    if !output.success() {
      return Err(
        BuildError::CommandFailed {
          command: invocation.to_string(),
          status: output.status,
          stderr: output.stderr,
        }
        .into(),
      );
    }
    Ok(output)
  }
}

/// Reads a variable from the parent environment
pub type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub fn parent_env() -> EnvLookup {
  Box::new(|key| std::env::var(key).ok())
}

/// Runs real processes with an isolated environment
pub struct SystemRunner {
  passthrough: Vec<String>,
  lookup: EnvLookup,
}

impl SystemRunner {
  /// Forward PATH, HOME and the named variables from the parent environment
  pub fn new(passthrough: &[String]) -> Self {
    Self {
      passthrough: passthrough.to_vec(),
      lookup: parent_env(),
    }
  }

  #[cfg(test)]
  pub fn with_lookup(mut self, lookup: EnvLookup) -> Self {
    self.lookup = lookup;
    self
  }

  fn command(&self, invocation: &Invocation) -> Command {
    let mut cmd = Command::new(&invocation.program);
    cmd.args(&invocation.args);
    if let Some(dir) = &invocation.cwd {
      cmd.current_dir(dir);
    }

    // Isolated environment (nothing ambient leaks into the build)
    cmd.env_clear();
    for key in ["PATH", "HOME"].iter().copied().chain(self.passthrough.iter().map(String::as_str)) {
      if let Some(value) = (self.lookup)(key) {
        cmd.env(key, value);
      }
    }
    #[cfg(windows)]
    for key in ["SYSTEMROOT", "TEMP", "TMP"] {
      if let Some(value) = (self.lookup)(key) {
        cmd.env(key, value);
      }
    }
    for (key, value) in &invocation.env {
      cmd.env(key, value);
    }

    cmd
  }
}

impl ProcessRunner for SystemRunner {
  fn run(&self, invocation: &Invocation) -> NightlyResult<ProcessOutput> {
    debug!(program = %invocation.program.display(), command = %invocation, "spawning");

    let output = self.command(invocation).output().map_err(|e| BuildError::Spawn {
      command: invocation.to_string(),
      reason: e.to_string(),
    })?;

    Ok(ProcessOutput {
      status: output.status.code(),
      stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
      stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
  }
}
