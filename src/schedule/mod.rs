//! Daily trigger
//!
//! [`DailySchedule`] fires once per day at a fixed UTC time. The
//! [`Scheduler`] sleeps on a [`Clock`] until the next fire time and hands
//! each firing to a callback. An optional [`DuplicateGuard`] refuses a
//! second firing on the same UTC date.

use crate::core::error::{ConfigError, NightlyError, NightlyResult, ResultExt};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Fixed time of day, in UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
  time: NaiveTime,
}

impl DailySchedule {
  /// Parse "HH:MM"
  pub fn parse(raw: &str) -> NightlyResult<Self> {
    let time = NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|_| {
      NightlyError::Config(ConfigError::Invalid {
        reason: format!("schedule.time '{}' is not a UTC time of day like 00:00", raw),
      })
    })?;
    Ok(Self { time })
  }

  /// First fire instant strictly after `now`
  pub fn next_fire_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive().and_time(self.time).and_utc();
    if today > now {
      return today;
    }
    let tomorrow = now
      .date_naive()
      .checked_add_days(Days::new(1))
      .unwrap_or(NaiveDate::MAX);
    tomorrow.and_time(self.time).and_utc()
  }
}

/// Source of wall-clock time; faked in tests
pub trait Clock {
  fn now(&self) -> DateTime<Utc>;

  /// Block until `deadline` (returns immediately if it has passed)
  fn sleep_until(&self, deadline: DateTime<Utc>);
}

pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }

  fn sleep_until(&self, deadline: DateTime<Utc>) {
    // Bounded slices; the wall clock can jump while we sleep
    loop {
      let remaining = deadline - Utc::now();
      let Ok(remaining) = remaining.to_std() else {
        return;
      };
      if remaining.is_zero() {
        return;
      }
      std::thread::sleep(remaining.min(Duration::from_secs(60)));
    }
  }
}

/// Stamp file holding the UTC date of the last firing
pub struct DuplicateGuard {
  path: PathBuf,
}

impl DuplicateGuard {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Date of the last recorded firing, if any
  pub fn last_fired(&self) -> NightlyResult<Option<NaiveDate>> {
    if !self.path.exists() {
      return Ok(None);
    }
    let content = fs::read_to_string(&self.path)
      .with_context(|| format!("Failed to read run stamp {}", self.path.display()))?;
    Ok(NaiveDate::parse_from_str(content.trim(), "%Y-%m-%d").ok())
  }

  pub fn already_fired(&self, date: NaiveDate) -> NightlyResult<bool> {
    Ok(self.last_fired()? == Some(date))
  }

  pub fn record(&self, date: NaiveDate) -> NightlyResult<()> {
    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(&self.path, format!("{}\n", date.format("%Y-%m-%d")))
      .with_context(|| format!("Failed to write run stamp {}", self.path.display()))?;
    Ok(())
  }
}

/// What happened at one scheduled instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
  Fired(DateTime<Utc>),
  /// Duplicate guard refused a second firing on this date
  Suppressed(DateTime<Utc>),
}

pub struct Scheduler<'a> {
  schedule: DailySchedule,
  clock: &'a dyn Clock,
  guard: Option<DuplicateGuard>,
}

impl<'a> Scheduler<'a> {
  pub fn new(schedule: DailySchedule, clock: &'a dyn Clock) -> Self {
    Self {
      schedule,
      clock,
      guard: None,
    }
  }

  pub fn with_guard(mut self, guard: Option<DuplicateGuard>) -> Self {
    self.guard = guard;
    self
  }

  pub fn next_fire(&self) -> DateTime<Utc> {
    self.schedule.next_fire_after(self.clock.now())
  }

  /// Wait for the next fire time and decide whether it fires
  pub fn wait(&self) -> NightlyResult<Tick> {
    let fire_at = self.next_fire();
    info!(next = %fire_at, "waiting for next scheduled run");
    self.clock.sleep_until(fire_at);

    if let Some(guard) = &self.guard {
      let date = fire_at.date_naive();
      if guard.already_fired(date)? {
        warn!(date = %date, stamp = %guard.path().display(), "run already fired today, skipping");
        return Ok(Tick::Suppressed(fire_at));
      }
      guard.record(date)?;
    }
    Ok(Tick::Fired(fire_at))
  }

  /// Fire `on_fire` at each scheduled instant; `max_runs` bounds the firings
  pub fn run<F>(&self, max_runs: Option<usize>, mut on_fire: F) -> NightlyResult<usize>
  where
    F: FnMut(DateTime<Utc>) -> NightlyResult<()>,
  {
    let mut fired = 0;
    while max_runs.is_none_or(|max| fired < max) {
      match self.wait()? {
        Tick::Fired(at) => {
          fired += 1;
          on_fire(at)?;
        }
        Tick::Suppressed(_) => {}
      }
    }
    Ok(fired)
  }
}
