//! `nightly-rail run` - execute one job run now

use super::{load_config, resolve_identity};
use crate::core::config::NightlyConfig;
use crate::core::error::{NightlyResult, ResultExt};
use crate::core::process::SystemRunner;
use crate::pipeline::credential::EnvCredentialSource;
use crate::pipeline::publish::HttpIndex;
use crate::pipeline::run::{JobRun, Outcome, StepStatus};
use crate::pipeline::{Pipeline, RunPlan};
use chrono::{DateTime, Utc};
use std::path::Path;

/// Run the pipeline once (or only plan it with `dry_run`)
///
/// Published and Skipped return Ok; a failed run exits with the code of its
/// failure category after the record is printed.
pub fn run_once(config_path: Option<&Path>, repository: Option<String>, dry_run: bool, json: bool) -> NightlyResult<()> {
  let config = load_config(config_path)?;
  let runner = SystemRunner::new(&config.environment.passthrough);
  let identity = resolve_identity(repository.as_deref(), &config, &runner)?;

  let credentials = EnvCredentialSource::new(&config.publish.username, &config.publish.token_env);
  let index = HttpIndex::new(&config.publish)?;
  let pipeline = Pipeline::new(&config, &runner, &index, &credentials).with_progress(!json);

  if dry_run {
    let plan = pipeline.plan(identity)?;
    if json {
      println!("{}", serde_json::to_string_pretty(&plan).context("Failed to serialize plan")?);
    } else {
      print_plan(&plan, &config);
    }
    return Ok(());
  }

  let run = pipeline.execute(identity, Utc::now());
  finish(&run, json)
}

/// Print a finished run and exit non-zero if it failed
fn finish(run: &JobRun, json: bool) -> NightlyResult<()> {
  report(run, json)?;
  if let Some(Outcome::Failed { kind, .. }) = &run.outcome {
    std::process::exit(kind.exit_code().as_i32());
  }
  Ok(())
}

/// Print a finished run record
pub(crate) fn report(run: &JobRun, json: bool) -> NightlyResult<()> {
  if json {
    println!("{}", serde_json::to_string_pretty(run).context("Failed to serialize run record")?);
  } else {
    print_run(run);
  }
  Ok(())
}

fn print_plan(plan: &RunPlan, config: &NightlyConfig) {
  println!("🔍 DRY RUN for {} (canonical: {})\n", plan.repository, plan.canonical);

  if plan.steps.is_empty() {
    println!("⏭️  Gate would skip this run: nothing would be provisioned, built or published");
    return;
  }

  let mode = if plan.nightly { "nightly" } else { "release" };
  println!("✅ Gate passes, {} build from {}", mode, config.checkout_path().display());
  println!("📋 Planned steps:");
  for (i, step) in plan.steps.iter().enumerate() {
    println!("   {}. {}: {}", i + 1, step.stage, step.action);
  }
  println!("\n💡 Run without --dry-run to execute");
}

fn print_run(run: &JobRun) {
  println!();
  println!("🌙 Nightly run {} for {}", run.id, run.repository);
  println!("   Triggered: {}", format_time(run.trigger_time));

  for step in &run.steps {
    let icon = match step.status {
      StepStatus::Succeeded => "✅",
      StepStatus::Failed => "❌",
      StepStatus::Running => "⏳",
    };
    match &step.detail {
      Some(detail) => println!("   {} {}: {}", icon, step.stage, detail),
      None => println!("   {} {}", icon, step.stage),
    }
  }

  if let Some(artifact) = &run.artifact {
    println!(
      "📦 {} ({} bytes, sha256 {})",
      artifact.file_name,
      artifact.size,
      &artifact.sha256[..artifact.sha256.len().min(16)]
    );
  }

  println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
  match &run.outcome {
    Some(Outcome::Published) => println!("✨ Published"),
    Some(Outcome::Skipped { reason }) => println!("⏭️  Skipped: {}", reason),
    Some(Outcome::Failed { kind, stage, message }) => {
      println!("❌ Failed at {} ({})", stage, kind);
      println!("   {}", message.lines().next().unwrap_or_default());
    }
    None => println!("⚠️  Run did not finish ({})", run.stage),
  }
}

fn format_time(t: DateTime<Utc>) -> String {
  t.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
