//! Job run record and stage state machine
//!
//! ```text
//! Scheduled -> Gating -> Skipped
//!                     -> Provisioning -> Installing -> Building -> Publishing -> Published
//!              (any non-terminal stage) -> Failed
//! ```
//!
//! Transitions only move forward. Once a run reaches a terminal stage the
//! record rejects every further change.

use crate::core::error::{FailureKind, NightlyError, NightlyResult};
use crate::pipeline::gate::RepositoryIdentity;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
  Scheduled,
  Gating,
  Provisioning,
  Installing,
  Building,
  Publishing,
  Skipped,
  Published,
  Failed,
}

impl Stage {
  /// The four side-effecting steps, in order
  pub const STEPS: [Stage; 4] = [Stage::Provisioning, Stage::Installing, Stage::Building, Stage::Publishing];

  pub fn is_terminal(self) -> bool {
    matches!(self, Stage::Skipped | Stage::Published | Stage::Failed)
  }

  /// Whether `self -> next` is an arrow of the state machine
  pub fn can_transition_to(self, next: Stage) -> bool {
    use Stage::*;
    match (self, next) {
      (Scheduled, Gating) => true,
      (Gating, Skipped) | (Gating, Provisioning) => true,
      (Provisioning, Installing) | (Installing, Building) | (Building, Publishing) => true,
      (Publishing, Published) => true,
      (from, Failed) => !from.is_terminal(),
      _ => false,
    }
  }
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Stage::Scheduled => "scheduled",
      Stage::Gating => "gating",
      Stage::Provisioning => "provisioning",
      Stage::Installing => "installing",
      Stage::Building => "building",
      Stage::Publishing => "publishing",
      Stage::Skipped => "skipped",
      Stage::Published => "published",
      Stage::Failed => "failed",
    };
    write!(f, "{}", name)
  }
}

/// Terminal outcome of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
  Published,
  Skipped { reason: String },
  Failed {
    kind: FailureKind,
    stage: Stage,
    message: String,
  },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
  Running,
  Succeeded,
  Failed,
}

/// One entry in the step log
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
  pub stage: Stage,
  pub status: StepStatus,
  pub started_at: DateTime<Utc>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub finished_at: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub detail: Option<String>,
}

/// Summary of the artifact a run produced (no secrets, no contents)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactSummary {
  pub file_name: String,
  pub version: String,
  pub size: u64,
  pub sha256: String,
}

/// One execution of the pipeline
#[derive(Debug, Clone, Serialize)]
pub struct JobRun {
  pub id: String,
  pub trigger_time: DateTime<Utc>,
  pub repository: RepositoryIdentity,
  pub nightly: bool,
  pub stage: Stage,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub outcome: Option<Outcome>,
  pub steps: Vec<StepRecord>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub artifact: Option<ArtifactSummary>,
}

impl JobRun {
  /// Create a run in the Scheduled stage
  pub fn new(trigger_time: DateTime<Utc>, repository: RepositoryIdentity, nightly: bool) -> Self {
    Self {
      id: run_id(trigger_time, &repository),
      trigger_time,
      repository,
      nightly,
      stage: Stage::Scheduled,
      outcome: None,
      steps: Vec::new(),
      artifact: None,
    }
  }

  pub fn is_terminal(&self) -> bool {
    self.stage.is_terminal()
  }

  /// Move to `next`, opening a step record for side-effecting stages
  pub fn advance(&mut self, next: Stage) -> NightlyResult<()> {
    if !self.stage.can_transition_to(next) {
      return Err(NightlyError::message(format!(
        "Invalid run transition {} -> {}",
        self.stage, next
      )));
    }
    self.close_running(StepStatus::Succeeded, None);
    self.stage = next;
    if Stage::STEPS.contains(&next) {
      self.steps.push(StepRecord {
        stage: next,
        status: StepStatus::Running,
        started_at: Utc::now(),
        finished_at: None,
        detail: None,
      });
    }
    Ok(())
  }

  /// Attach a note to the currently running step
  pub fn note(&mut self, detail: impl Into<String>) {
    if let Some(step) = self.steps.last_mut()
      && step.status == StepStatus::Running
    {
      step.detail = Some(detail.into());
    }
  }

  pub fn record_artifact(&mut self, summary: ArtifactSummary) {
    if !self.is_terminal() {
      self.artifact = Some(summary);
    }
  }

  /// Terminal: gate mismatch
  pub fn skip(&mut self, reason: impl Into<String>) -> NightlyResult<()> {
    self.advance(Stage::Skipped)?;
    self.outcome = Some(Outcome::Skipped { reason: reason.into() });
    Ok(())
  }

  /// Terminal: upload accepted
  pub fn publish(&mut self) -> NightlyResult<()> {
    self.advance(Stage::Published)?;
    self.outcome = Some(Outcome::Published);
    Ok(())
  }

  /// Terminal: failure at the current stage
  pub fn fail(&mut self, error: &NightlyError) -> NightlyResult<()> {
    let stage = self.stage;
    if !stage.can_transition_to(Stage::Failed) {
      return Err(NightlyError::message(format!("Run already finished as {}", stage)));
    }
    self.close_running(StepStatus::Failed, Some(error.to_string()));
    self.stage = Stage::Failed;
    self.outcome = Some(Outcome::Failed {
      kind: error.kind(),
      stage,
      message: error.to_string(),
    });
    Ok(())
  }

  /// Stage at which the run stopped (the failing stage for failures)
  pub fn stopped_at(&self) -> Stage {
    match &self.outcome {
      Some(Outcome::Failed { stage, .. }) => *stage,
      _ => self.stage,
    }
  }

  fn close_running(&mut self, status: StepStatus, detail: Option<String>) {
    if let Some(step) = self.steps.last_mut()
      && step.status == StepStatus::Running
    {
      step.status = status;
      step.finished_at = Some(Utc::now());
      if detail.is_some() {
        step.detail = detail;
      }
    }
  }
}

/// Short run identifier (SHA-256 of trigger time and repository)
fn run_id(trigger_time: DateTime<Utc>, repository: &RepositoryIdentity) -> String {
  let mut hasher = Sha256::new();
  hasher.update(trigger_time.to_rfc3339().as_bytes());
  hasher.update(b"\0");
  hasher.update(repository.as_str().as_bytes());
  let digest = format!("{:x}", hasher.finalize());
  digest[..12].to_string()
}
