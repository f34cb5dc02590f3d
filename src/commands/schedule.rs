//! `nightly-rail schedule` and `nightly-rail next`

use super::run::report;
use super::{load_config, resolve_identity};
use crate::core::error::{NightlyResult, ResultExt, print_error};
use crate::core::process::SystemRunner;
use crate::pipeline::Pipeline;
use crate::pipeline::credential::EnvCredentialSource;
use crate::pipeline::publish::HttpIndex;
use crate::schedule::{Clock, DailySchedule, DuplicateGuard, Scheduler, SystemClock};
use std::path::Path;
use tracing::{error, info};

/// Sleep until each scheduled instant and execute one run
///
/// A failed run is reported and the loop keeps going; only scheduler errors
/// (unreadable stamp file, etc.) end it.
pub fn run_schedule(
  config_path: Option<&Path>,
  repository: Option<String>,
  max_runs: Option<usize>,
  json: bool,
) -> NightlyResult<()> {
  let config = load_config(config_path)?;
  let schedule = DailySchedule::parse(&config.schedule.time)?;
  let runner = SystemRunner::new(&config.environment.passthrough);
  let credentials = EnvCredentialSource::new(&config.publish.username, &config.publish.token_env);
  let index = HttpIndex::new(&config.publish)?;
  let pipeline = Pipeline::new(&config, &runner, &index, &credentials);

  let guard = config
    .schedule
    .duplicate_guard
    .then(|| DuplicateGuard::new(config.guard_path()));
  let clock = SystemClock;
  let scheduler = Scheduler::new(schedule, &clock).with_guard(guard);

  if !json {
    println!(
      "⏰ Scheduled daily at {} UTC, next run {}",
      config.schedule.time,
      scheduler.next_fire().format("%Y-%m-%d %H:%M UTC")
    );
  }

  let fired = scheduler.run(max_runs, |fire_at| {
    info!(fire_at = %fire_at, "scheduled run firing");
    // Resolved per firing; the remote may change between days
    let identity = match resolve_identity(repository.as_deref(), &config, &runner) {
      Ok(identity) => identity,
      Err(err) => {
        error!(error = %err, "cannot determine repository identity");
        print_error(&err);
        return Ok(());
      }
    };

    let run = pipeline.execute(identity, fire_at);
    report(&run, json)
  })?;

  if !json {
    println!("✅ Scheduler stopped after {} run(s)", fired);
  }
  Ok(())
}

/// Print the next fire time
pub fn run_next(config_path: Option<&Path>, json: bool) -> NightlyResult<()> {
  let config = load_config(config_path)?;
  let schedule = DailySchedule::parse(&config.schedule.time)?;
  let now = SystemClock.now();
  let next = schedule.next_fire_after(now);
  let wait = next - now;

  if json {
    let value = serde_json::json!({
      "time": config.schedule.time,
      "next": next.to_rfc3339(),
      "seconds_until": wait.num_seconds(),
    });
    println!("{}", serde_json::to_string_pretty(&value).context("Failed to serialize")?);
  } else {
    println!(
      "⏰ Next run: {} (in {}h {:02}m)",
      next.format("%Y-%m-%d %H:%M UTC"),
      wait.num_hours(),
      wait.num_minutes() % 60
    );
  }
  Ok(())
}
