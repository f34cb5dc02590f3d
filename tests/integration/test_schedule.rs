//! Tests for the `next` command

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_next_reports_configured_time() -> Result<()> {
  let workspace = TestWorkspace::new(CANONICAL)?;
  workspace.write_config(CANONICAL, "\n[schedule]\ntime = \"03:30\"\n")?;

  let output = run_nightly_rail(&workspace.path, &["next", "--json"], &[])?;
  assert!(output.status.success(), "stderr: {}", stderr(&output));

  let next = json(&output)?;
  assert_eq!(next["time"], "03:30");
  assert!(next["next"].as_str().unwrap_or_default().contains("T03:30:00"));
  let seconds = next["seconds_until"].as_i64().unwrap_or(-1);
  assert!(seconds > 0 && seconds <= 24 * 60 * 60);
  Ok(())
}

#[test]
fn test_invalid_schedule_time_is_config_error() -> Result<()> {
  let workspace = TestWorkspace::new(CANONICAL)?;
  workspace.write_config(CANONICAL, "\n[schedule]\ntime = \"25:00\"\n")?;

  let output = run_nightly_rail(&workspace.path, &["next"], &[])?;
  assert_eq!(output.status.code(), Some(1));
  Ok(())
}
