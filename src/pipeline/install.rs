//! Tool installation
//!
//! Upgrades the base packaging tool inside the fresh environment, then
//! installs exactly one additional tool: the sdist builder. Re-running on the
//! same environment leaves it in the same state.

use super::provision::Environment;
use crate::core::config::InstallConfig;
use crate::core::error::{BuildError, NightlyResult};
use crate::core::process::{Invocation, ProcessRunner};
use crate::utils::{normalize_dist_name, requirement_name};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Installed distribution as reported by the packaging tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolVersion {
  pub name: String,
  pub version: String,
}

/// Proof that the toolset is in place; required to build
#[derive(Debug, Clone, Serialize)]
pub struct InstalledTools {
  pub packaging_tool: ToolVersion,
  pub builder: ToolVersion,
}

pub struct Installer<'a> {
  runner: &'a dyn ProcessRunner,
  config: &'a InstallConfig,
}

impl<'a> Installer<'a> {
  pub fn new(runner: &'a dyn ProcessRunner, config: &'a InstallConfig) -> Self {
    Self { runner, config }
  }

  /// Upgrade the packaging tool, install the builder, report both versions
  pub fn install(&self, env: &Environment) -> NightlyResult<InstalledTools> {
    let python = env.python.as_path();

    self.pip(python, &["install", "--upgrade", &self.config.packaging_tool])?;
    self.pip(python, &["install", &self.config.builder])?;

    let tools = InstalledTools {
      packaging_tool: self.show(python, requirement_name(&self.config.packaging_tool))?,
      builder: self.show(python, requirement_name(&self.config.builder))?,
    };
    info!(
      packaging_tool = %format!("{} {}", tools.packaging_tool.name, tools.packaging_tool.version),
      builder = %format!("{} {}", tools.builder.name, tools.builder.version),
      "toolset installed"
    );
    Ok(tools)
  }

  fn pip(&self, python: &Path, args: &[&str]) -> NightlyResult<()> {
    self.runner.run_checked(
      &Invocation::new(python)
        .args(["-m", "pip", "--disable-pip-version-check", "--no-input"])
        .args(args.iter().copied()),
    )?;
    Ok(())
  }

  fn show(&self, python: &Path, name: &str) -> NightlyResult<ToolVersion> {
    let invocation = Invocation::new(python).args(["-m", "pip", "show", name]);
    let output = self.runner.run_checked(&invocation)?;
    parse_show(&output.stdout)
      .filter(|tool| normalize_dist_name(&tool.name) == normalize_dist_name(name))
      .ok_or_else(|| {
        BuildError::CommandFailed {
          command: invocation.to_string(),
          status: output.status,
          stderr: format!("{} is not installed in the build environment", name),
        }
        .into()
      })
  }
}

/// Name and Version from `pip show` output
fn parse_show(stdout: &str) -> Option<ToolVersion> {
  let mut name = None;
  let mut version = None;
  for line in stdout.lines() {
    if let Some(value) = line.strip_prefix("Name:") {
      name = Some(value.trim().to_string());
    } else if let Some(value) = line.strip_prefix("Version:") {
      version = Some(value.trim().to_string());
    }
  }
  Some(ToolVersion {
    name: name.filter(|n| !n.is_empty())?,
    version: version.filter(|v| !v.is_empty())?,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::error::{FailureKind, NightlyError};
  use crate::core::process::ProcessOutput;
  use crate::core::process::fake::FakeRunner;
  use crate::pipeline::provision::{Provisioner, ToolchainSpec};
  use std::cell::RefCell;
  use std::collections::BTreeMap;
  use std::rc::Rc;

  fn environment(runner: &FakeRunner) -> Environment {
    let config = crate::core::config::NightlyConfig::new("pymc-devs/pytensor", "/srv/repo".into());
    match Provisioner::new(runner, &config).provision(&ToolchainSpec::parse("3.9").unwrap()) {
      Ok(env) => env,
      Err(e) => panic!("provision failed: {e}"),
    }
  }

  fn provisioned_runner() -> FakeRunner {
    FakeRunner::new()
      .on("python3.9 --version", ProcessOutput::ok("Python 3.9.18\n"))
      .on("--show-toplevel", ProcessOutput::ok("/srv/repo\n"))
      .on("--is-shallow-repository", ProcessOutput::ok("false\n"))
  }

  /// Runner that models site-packages: install adds, show reads
  fn stateful_runner() -> (FakeRunner, Rc<RefCell<BTreeMap<String, String>>>) {
    let site = Rc::new(RefCell::new(BTreeMap::new()));
    site.borrow_mut().insert("pip".to_string(), "23.0.1".to_string());
    let install_site = site.clone();
    let show_site = site.clone();

    let runner = provisioned_runner()
      .on_with(move |inv| {
        let args = inv.arg_strings();
        let pos = args.iter().position(|a| a == "install")?;
        for req in args[pos + 1..].iter().filter(|a| !a.starts_with('-')) {
          let version = if req == "pip" { "24.2" } else { "1.2.2" };
          install_site
            .borrow_mut()
            .insert(requirement_name(req).to_string(), version.to_string());
        }
        Some(Ok(ProcessOutput::ok("")))
      })
      .on_with(move |inv| {
        let args = inv.arg_strings();
        if args.get(2).map(String::as_str) != Some("show") {
          return None;
        }
        let name = args.get(3)?;
        Some(Ok(match show_site.borrow().get(name) {
          Some(v) => ProcessOutput::ok(format!("Name: {}\nVersion: {}\nSummary: x\n", name, v)),
          None => ProcessOutput::failed(1, format!("WARNING: Package(s) not found: {}", name)),
        }))
      });
    (runner, site)
  }

  #[test]
  fn test_parse_show() {
    let tool = parse_show("Name: build\nVersion: 1.2.2\nSummary: A simple builder\n").unwrap();
    assert_eq!(tool.name, "build");
    assert_eq!(tool.version, "1.2.2");
    assert!(parse_show("Summary: nothing\n").is_none());
  }

  #[test]
  fn test_install_upgrades_then_installs_builder() {
    let (runner, site) = stateful_runner();
    let env = environment(&runner);
    let config = InstallConfig::default();

    let tools = Installer::new(&runner, &config).install(&env).unwrap();

    assert_eq!(tools.packaging_tool.version, "24.2");
    assert_eq!(tools.builder.name, "build");
    assert_eq!(site.borrow().len(), 2);

    let commands = runner.commands();
    let upgrade = commands.iter().position(|c| c.contains("install --upgrade pip")).unwrap();
    let builder = commands.iter().position(|c| c.ends_with("install build")).unwrap();
    assert!(upgrade < builder);
  }

  #[test]
  fn test_install_is_idempotent() {
    let (runner, site) = stateful_runner();
    let env = environment(&runner);
    let config = InstallConfig::default();
    let installer = Installer::new(&runner, &config);

    let first = installer.install(&env).unwrap();
    let after_first = site.borrow().clone();
    let second = installer.install(&env).unwrap();

    assert_eq!(first.builder, second.builder);
    assert_eq!(first.packaging_tool, second.packaging_tool);
    assert_eq!(*site.borrow(), after_first);
  }

  #[test]
  fn test_pinned_builder_reports_by_name() {
    let (runner, _site) = stateful_runner();
    let env = environment(&runner);
    let config = InstallConfig {
      builder: "build==1.2.2".to_string(),
      ..InstallConfig::default()
    };
    let tools = Installer::new(&runner, &config).install(&env).unwrap();
    assert_eq!(tools.builder.name, "build");
  }

  #[test]
  fn test_install_failure_is_build_failure() {
    let runner = provisioned_runner().on("install build", ProcessOutput::failed(1, "No matching distribution"));
    let env = environment(&runner);
    let config = InstallConfig::default();

    let err = Installer::new(&runner, &config).install(&env).unwrap_err();
    assert_eq!(err.kind(), FailureKind::Build);
    assert!(matches!(err, NightlyError::Build(BuildError::CommandFailed { .. })));
  }
}
