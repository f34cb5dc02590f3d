//! Tests for the `run` command

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_fork_run_is_skipped() -> Result<()> {
  let workspace = TestWorkspace::new(CANONICAL)?;
  workspace.write_config(CANONICAL, "")?;

  let output = run_nightly_rail(&workspace.path, &["run", "--repository", "someone/pytensor", "--json"], &[])?;
  assert!(output.status.success(), "stderr: {}", stderr(&output));

  let record = json(&output)?;
  assert_eq!(record["stage"], "skipped");
  assert_eq!(record["outcome"]["status"], "skipped");
  assert_eq!(record["repository"], "someone/pytensor");
  assert!(record.get("artifact").is_none());

  let steps = record["steps"].as_array().cloned().unwrap_or_default();
  assert!(steps.iter().all(|s| s["stage"] != "publishing"));
  Ok(())
}

#[test]
fn test_identity_falls_back_to_origin_remote() -> Result<()> {
  let workspace = TestWorkspace::new("someone/pytensor")?;
  workspace.write_config(CANONICAL, "")?;

  let output = run_nightly_rail(&workspace.path, &["run", "--json"], &[])?;
  assert!(output.status.success(), "stderr: {}", stderr(&output));

  let record = json(&output)?;
  assert_eq!(record["outcome"]["status"], "skipped");
  assert_eq!(record["repository"], "someone/pytensor");
  Ok(())
}

#[test]
fn test_github_repository_env_sets_identity() -> Result<()> {
  let workspace = TestWorkspace::new(CANONICAL)?;
  workspace.write_config(CANONICAL, "")?;

  let output = run_nightly_rail(
    &workspace.path,
    &["run", "--json"],
    &[("GITHUB_REPOSITORY", "mirror/pytensor")],
  )?;
  assert!(output.status.success(), "stderr: {}", stderr(&output));
  assert_eq!(json(&output)?["repository"], "mirror/pytensor");
  Ok(())
}

#[test]
fn test_dry_run_for_canonical_lists_steps() -> Result<()> {
  let workspace = TestWorkspace::new(CANONICAL)?;
  workspace.write_config(CANONICAL, "")?;

  let output = run_nightly_rail(
    &workspace.path,
    &["run", "--repository", CANONICAL, "--dry-run", "--json"],
    &[],
  )?;
  assert!(output.status.success(), "stderr: {}", stderr(&output));

  let plan = json(&output)?;
  assert_eq!(plan["gate"]["decision"], "pass");
  assert_eq!(plan["nightly"], true);

  let stages: Vec<String> = plan["steps"]
    .as_array()
    .cloned()
    .unwrap_or_default()
    .iter()
    .filter_map(|s| s["stage"].as_str().map(String::from))
    .collect();
  assert_eq!(stages, ["provisioning", "installing", "building", "publishing"]);

  // Planning never builds anything
  assert!(!workspace.file_exists("dist"));
  Ok(())
}

#[test]
fn test_dry_run_for_fork_plans_nothing() -> Result<()> {
  let workspace = TestWorkspace::new(CANONICAL)?;
  workspace.write_config(CANONICAL, "")?;

  let output = run_nightly_rail(
    &workspace.path,
    &["run", "--repository", "someone/pytensor", "--dry-run"],
    &[],
  )?;
  assert!(output.status.success(), "stderr: {}", stderr(&output));
  assert!(stdout(&output).contains("skip"));
  Ok(())
}

#[test]
fn test_missing_config_exits_with_config_code() -> Result<()> {
  let workspace = TestWorkspace::new(CANONICAL)?;

  let output = run_nightly_rail(&workspace.path, &["run", "--repository", CANONICAL], &[])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("nightly.toml"));
  Ok(())
}

#[test]
fn test_invalid_canonical_is_rejected() -> Result<()> {
  let workspace = TestWorkspace::new(CANONICAL)?;
  workspace.write_config("not-a-slug", "")?;

  let output = run_nightly_rail(&workspace.path, &["run", "--repository", CANONICAL], &[])?;
  assert_eq!(output.status.code(), Some(1));
  Ok(())
}

#[test]
fn test_explicit_config_path() -> Result<()> {
  let workspace = TestWorkspace::new(CANONICAL)?;
  workspace.write_config(CANONICAL, "")?;
  let elsewhere = tempfile::TempDir::new()?;
  let config = workspace.path.join("nightly.toml");

  let output = run_nightly_rail(
    elsewhere.path(),
    &[
      "--config",
      config.to_str().unwrap_or_default(),
      "run",
      "--repository",
      "someone/pytensor",
      "--json",
    ],
    &[],
  )?;
  assert!(output.status.success(), "stderr: {}", stderr(&output));
  assert_eq!(json(&output)?["outcome"]["status"], "skipped");
  Ok(())
}

#[test]
fn test_unknown_identity_exits_with_config_code() -> Result<()> {
  let workspace = TestWorkspace::new(CANONICAL)?;
  workspace.write_config(CANONICAL, "")?;
  git(&workspace.path, &["remote", "remove", "origin"])?;

  let output = run_nightly_rail(&workspace.path, &["run"], &[])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(stderr(&output).contains("repository identity"));
  Ok(())
}
