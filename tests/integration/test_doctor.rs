//! Tests for the `doctor` command

use crate::helpers::*;
use anyhow::Result;

fn check<'a>(results: &'a serde_json::Value, name: &str) -> Option<&'a serde_json::Value> {
  results.as_array()?.iter().find(|r| r["check_name"] == name)
}

#[test]
fn test_doctor_reports_missing_credential() -> Result<()> {
  let workspace = TestWorkspace::new(CANONICAL)?;
  workspace.write_config(CANONICAL, "")?;

  let output = run_nightly_rail(&workspace.path, &["doctor", "--json"], &[])?;
  assert_eq!(output.status.code(), Some(1));

  let results = json(&output)?;
  let credential = check(&results, "credential").ok_or_else(|| anyhow::anyhow!("no credential check"))?;
  assert_eq!(credential["passed"], false);
  assert!(check(&results, "config").is_some_and(|r| r["passed"] == true));
  Ok(())
}

#[test]
fn test_doctor_credential_present_without_revealing_it() -> Result<()> {
  let workspace = TestWorkspace::new(CANONICAL)?;
  workspace.write_config(CANONICAL, "")?;

  let output = run_nightly_rail(
    &workspace.path,
    &["doctor", "--json"],
    &[("PYPI_TOKEN", "pypi-secret-value")],
  )?;

  let results = json(&output)?;
  assert!(check(&results, "credential").is_some_and(|r| r["passed"] == true));
  assert!(!stdout(&output).contains("pypi-secret-value"));
  assert!(!stderr(&output).contains("pypi-secret-value"));
  Ok(())
}

#[test]
fn test_doctor_without_config_fails_config_check() -> Result<()> {
  let workspace = TestWorkspace::new(CANONICAL)?;

  let output = run_nightly_rail(&workspace.path, &["doctor", "--json"], &[])?;
  assert_eq!(output.status.code(), Some(1));

  let results = json(&output)?;
  assert!(check(&results, "config").is_some_and(|r| r["passed"] == false));
  Ok(())
}

#[test]
fn test_doctor_skips_network_check_by_default() -> Result<()> {
  let workspace = TestWorkspace::new(CANONICAL)?;
  workspace.write_config(CANONICAL, "")?;

  let output = run_nightly_rail(&workspace.path, &["doctor", "--json"], &[])?;
  let results = json(&output)?;
  assert!(check(&results, "index-reachable").is_none());
  Ok(())
}
