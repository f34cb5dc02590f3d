//! Nightly build-and-publish pipeline
//!
//! One [`Pipeline::execute`] call is one job run: the gate is evaluated
//! first, and only a pass lets the run reach the four side-effecting steps.
//! Each step hands the next one the value it needs (environment, toolset,
//! staged artifact), so they cannot be reordered or skipped.

pub mod build;
pub mod credential;
pub mod gate;
pub mod install;
pub mod provision;
pub mod publish;
pub mod run;
pub mod version;

use crate::core::config::NightlyConfig;
use crate::core::error::NightlyResult;
use crate::core::process::ProcessRunner;
use crate::ui::progress::StepProgress;
use build::Builder;
use chrono::{DateTime, Utc};
use credential::CredentialSource;
use gate::{Gate, GateDecision, RepositoryIdentity};
use install::Installer;
use provision::{Provisioner, ToolchainSpec};
use publish::{PackageIndex, Publisher, RetryPolicy};
use run::{JobRun, Stage};
use serde::Serialize;
use tracing::{error, info, info_span};

/// A step the run would take, for dry runs
#[derive(Debug, Clone, Serialize)]
pub struct PlannedStep {
  pub stage: Stage,
  pub action: String,
}

/// What a run would do, without doing any of it
#[derive(Debug, Clone, Serialize)]
pub struct RunPlan {
  pub repository: RepositoryIdentity,
  pub canonical: RepositoryIdentity,
  pub gate: GateDecision,
  pub nightly: bool,
  pub steps: Vec<PlannedStep>,
}

pub struct Pipeline<'a> {
  config: &'a NightlyConfig,
  runner: &'a dyn ProcessRunner,
  index: &'a dyn PackageIndex,
  credentials: &'a dyn CredentialSource,
  show_progress: bool,
}

impl<'a> Pipeline<'a> {
  pub fn new(
    config: &'a NightlyConfig,
    runner: &'a dyn ProcessRunner,
    index: &'a dyn PackageIndex,
    credentials: &'a dyn CredentialSource,
  ) -> Self {
    Self {
      config,
      runner,
      index,
      credentials,
      show_progress: false,
    }
  }

  /// Draw a step progress bar on stderr
  pub fn with_progress(mut self, show: bool) -> Self {
    self.show_progress = show;
    self
  }

  fn gate(&self) -> NightlyResult<Gate> {
    Ok(Gate::new(RepositoryIdentity::parse(&self.config.repository.canonical)?))
  }

  /// Execute one job run to a terminal outcome
  pub fn execute(&self, repository: RepositoryIdentity, trigger_time: DateTime<Utc>) -> JobRun {
    let mut run = JobRun::new(trigger_time, repository, self.config.build.nightly);
    let span = info_span!("run", run_id = %run.id);
    let _enter = span.enter();

    info!(repository = %run.repository, trigger = %run.trigger_time, "run scheduled");

    let result = self.drive(&mut run);
    if let Err(err) = result {
      error!(stage = %run.stage, kind = %err.kind(), error = %err, "run failed");
      if let Err(state_err) = run.fail(&err) {
        error!(error = %state_err, "could not record failure");
      }
    }

    info!(stage = %run.stage, stopped_at = %run.stopped_at(), "run finished");
    run
  }

  fn drive(&self, run: &mut JobRun) -> NightlyResult<()> {
    run.advance(Stage::Gating)?;
    match self.gate()?.evaluate(&run.repository) {
      GateDecision::Skip { reason } => {
        info!(stage = %Stage::Skipped, reason = %reason, "gate closed");
        run.skip(reason)
      }
      GateDecision::Pass => {
        info!(stage = %Stage::Gating, "gate passed");
        self.run_steps(run)
      }
    }
  }

  fn run_steps(&self, run: &mut JobRun) -> NightlyResult<()> {
    let mut progress = self
      .show_progress
      .then(|| StepProgress::new(Stage::STEPS.len(), "nightly"));
    let mut tick = || {
      if let Some(bar) = progress.as_mut() {
        bar.inc();
      }
    };

    enter(run, Stage::Provisioning)?;
    let spec = ToolchainSpec::parse(&self.config.toolchain.python)?;
    let env = Provisioner::new(self.runner, self.config).provision(&spec)?;
    run.note(format!(
      "Python {} at {} ({})",
      env.interpreter_version,
      env.commit.get(..12).unwrap_or(env.commit.as_str()),
      env.checkout.display()
    ));
    tick();

    enter(run, Stage::Installing)?;
    let tools = Installer::new(self.runner, &self.config.install).install(&env)?;
    run.note(format!(
      "{} {}, {} {}",
      tools.packaging_tool.name, tools.packaging_tool.version, tools.builder.name, tools.builder.version
    ));
    tick();

    enter(run, Stage::Building)?;
    let artifact = Builder::new(self.runner, &self.config.build).build(&env, &tools)?;
    run.note(artifact.file_name().to_string());
    run.record_artifact(artifact.summary());
    tick();

    enter(run, Stage::Publishing)?;
    let policy = RetryPolicy::from_config(&self.config.publish);
    let receipt = Publisher::new(self.index, self.credentials, policy).publish(artifact)?;
    run.note(format!(
      "{} accepted by {} (attempt {})",
      receipt.file_name, receipt.endpoint, receipt.attempts
    ));
    tick();

    // Workspace (venv, staging) goes away with the environment
    drop(env);
    run.publish()
  }

  /// Evaluate the gate and describe the steps, with no side effects
  pub fn plan(&self, repository: RepositoryIdentity) -> NightlyResult<RunPlan> {
    let gate = self.gate()?;
    let decision = gate.evaluate(&repository);

    let steps = if decision.is_pass() {
      let spec = ToolchainSpec::parse(&self.config.toolchain.python)?;
      let install = &self.config.install;
      let build = &self.config.build;
      let publish = &self.config.publish;
      let credential_state = if self.credentials.is_present() {
        "present"
      } else {
        "absent"
      };
      vec![
        PlannedStep {
          stage: Stage::Provisioning,
          action: Provisioner::new(self.runner, self.config).describe(&spec),
        },
        PlannedStep {
          stage: Stage::Installing,
          action: format!(
            "pip install --upgrade {}; pip install {}",
            install.packaging_tool, install.builder
          ),
        },
        PlannedStep {
          stage: Stage::Building,
          action: format!(
            "python -m build --sdist ({}={})",
            build.nightly_env,
            if build.nightly { "true" } else { "false" }
          ),
        },
        PlannedStep {
          stage: Stage::Publishing,
          action: format!(
            "upload to {} as {} with {} ({})",
            publish.repository_url,
            publish.username,
            self.credentials.describe(),
            credential_state
          ),
        },
      ]
    } else {
      Vec::new()
    };

    Ok(RunPlan {
      repository,
      canonical: gate.canonical().clone(),
      gate: decision,
      nightly: self.config.build.nightly,
      steps,
    })
  }
}

fn enter(run: &mut JobRun, stage: Stage) -> NightlyResult<()> {
  run.advance(stage)?;
  info!(stage = %stage, "step started");
  Ok(())
}
