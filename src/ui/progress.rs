//! Progress indicator for the run's side-effecting steps
//!
//! Uses `linya` for a single allocation-free bar drawn to stderr

use linya::{Bar, Progress};

/// One tick per completed pipeline step
pub struct StepProgress {
  progress: Progress,
  bar: Bar,
}

impl StepProgress {
  pub fn new(total: usize, label: impl Into<String>) -> Self {
    let mut progress = Progress::new();
    let bar = progress.bar(total, label.into());
    Self { progress, bar }
  }

  /// Mark one step done
  pub fn inc(&mut self) {
    self.progress.inc_and_draw(&self.bar, 1);
  }
}
