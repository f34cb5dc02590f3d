//! Tests for the `init` command

use crate::helpers::*;
use anyhow::Result;

#[test]
fn test_init_creates_config_from_origin() -> Result<()> {
  let workspace = TestWorkspace::new(CANONICAL)?;

  let output = run_nightly_rail(&workspace.path, &["init"], &[])?;
  assert!(output.status.success(), "stderr: {}", stderr(&output));

  assert!(workspace.file_exists("nightly.toml"));
  let config = workspace.read_file("nightly.toml")?;
  assert!(config.contains("[repository]"));
  assert!(config.contains(CANONICAL));
  assert!(config.contains("[toolchain]"));
  Ok(())
}

#[test]
fn test_init_with_explicit_canonical() -> Result<()> {
  let workspace = TestWorkspace::new("someone/pytensor")?;

  let output = run_nightly_rail(&workspace.path, &["init", "--canonical", CANONICAL], &[])?;
  assert!(output.status.success(), "stderr: {}", stderr(&output));

  let config = workspace.read_file("nightly.toml")?;
  assert!(config.contains(CANONICAL));
  assert!(!config.contains("someone/pytensor"));
  Ok(())
}

#[test]
fn test_init_refuses_to_overwrite_without_force() -> Result<()> {
  let workspace = TestWorkspace::new(CANONICAL)?;
  workspace.write_config("original/owner", "")?;

  let output = run_nightly_rail(&workspace.path, &["init"], &[])?;
  assert!(!output.status.success());
  assert!(stderr(&output).contains("--force"));
  assert!(workspace.read_file("nightly.toml")?.contains("original/owner"));

  let output = run_nightly_rail(&workspace.path, &["init", "--force"], &[])?;
  assert!(output.status.success(), "stderr: {}", stderr(&output));
  assert!(workspace.read_file("nightly.toml")?.contains(CANONICAL));
  Ok(())
}

#[test]
fn test_init_written_config_loads() -> Result<()> {
  let workspace = TestWorkspace::new(CANONICAL)?;
  run_nightly_rail(&workspace.path, &["init"], &[])?;

  let output = run_nightly_rail(&workspace.path, &["next", "--json"], &[])?;
  assert!(output.status.success(), "stderr: {}", stderr(&output));
  Ok(())
}
