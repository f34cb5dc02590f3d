//! Source distribution build and artifact validation
//!
//! The builder runs the build frontend into an empty staging directory, then
//! validates what came out. A [`StagedArtifact`] can only be obtained through
//! that validation, so holding one means exactly one non-empty sdist exists
//! with a parseable name and a version label matching the build mode.

use super::install::InstalledTools;
use super::provision::Environment;
use super::run::ArtifactSummary;
use super::version::VersionLabel;
use crate::core::config::BuildConfig;
use crate::core::error::{BuildError, NightlyResult, ResultExt};
use crate::core::process::{Invocation, ProcessRunner};
use crate::core::vcs::Describe;
use chrono::{NaiveDate, Utc};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const SDIST_SUFFIX: &str = ".tar.gz";

/// A validated source distribution waiting in staging
#[derive(Debug)]
pub struct StagedArtifact {
  path: PathBuf,
  file_name: String,
  name: String,
  version: VersionLabel,
  size: u64,
  sha256: String,
}

impl StagedArtifact {
  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn file_name(&self) -> &str {
    &self.file_name
  }

  /// Distribution name as written in the file name
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn version(&self) -> &VersionLabel {
    &self.version
  }

  pub fn size(&self) -> u64 {
    self.size
  }

  /// Hex SHA-256 of the file contents
  pub fn sha256(&self) -> &str {
    &self.sha256
  }

  pub fn summary(&self) -> ArtifactSummary {
    ArtifactSummary {
      file_name: self.file_name.clone(),
      version: self.version.to_string(),
      size: self.size,
      sha256: self.sha256.clone(),
    }
  }
}

pub struct Builder<'a> {
  runner: &'a dyn ProcessRunner,
  config: &'a BuildConfig,
}

impl<'a> Builder<'a> {
  pub fn new(runner: &'a dyn ProcessRunner, config: &'a BuildConfig) -> Self {
    Self { runner, config }
  }

  /// Build mode flag as passed to the build backend
  pub fn mode_flag(&self) -> (&str, &'static str) {
    let value = if self.config.nightly { "true" } else { "false" };
    (self.config.nightly_env.as_str(), value)
  }

  /// Build one sdist; `_tools` is evidence the builder is installed
  pub fn build(&self, env: &Environment, _tools: &InstalledTools) -> NightlyResult<StagedArtifact> {
    clear_dir(&env.staging)?;

    let (flag, value) = self.mode_flag();
    self.runner.run_checked(
      &Invocation::new(&env.python)
        .args(["-m", "build", "--sdist", "--outdir"])
        .arg(env.staging.as_os_str())
        .arg(env.project_dir.as_os_str())
        .current_dir(&env.project_dir)
        .env(flag, value),
    )?;

    let artifact = collect_artifact(&env.staging, self.config.nightly)?;
    info!(
      file = %artifact.file_name(),
      version = %artifact.version(),
      size = artifact.size(),
      "sdist staged"
    );
    self.compare_with_tag(env, &artifact);
    Ok(artifact)
  }

  /// Warn when the built label does not follow from the last reachable tag
  fn compare_with_tag(&self, env: &Environment, artifact: &StagedArtifact) {
    let Some(describe) = env.describe.as_ref() else {
      return;
    };
    if let Some(reason) = tag_mismatch(describe, artifact.version(), self.config.nightly, Utc::now().date_naive()) {
      warn!(built = %artifact.version(), tag = %describe.tag, "{}", reason);
    }
  }
}

/// Why `version` does not follow from the tag in `describe`, if it doesn't
///
/// A nightly must sort after the last tag. A release build of a tagged commit
/// must carry that tag's version. Unparseable tags are not judged.
pub fn tag_mismatch(describe: &Describe, version: &VersionLabel, nightly: bool, today: NaiveDate) -> Option<String> {
  let base = VersionLabel::parse(describe.base_version())?;
  if nightly {
    (version <= &base).then(|| {
      format!(
        "nightly label does not sort after {} (expected something like {})",
        describe.tag,
        VersionLabel::nightly_after(&base, today)
      )
    })
  } else {
    let expected = VersionLabel::release_of(&base);
    (describe.distance == 0 && version != &expected)
      .then(|| format!("release build of {} should be version {}", describe.tag, expected))
  }
}

/// Remove everything inside `dir`, keeping the directory
fn clear_dir(dir: &Path) -> NightlyResult<()> {
  fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
  for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
    let path = entry?.path();
    if path.is_dir() {
      fs::remove_dir_all(&path)?;
    } else {
      fs::remove_file(&path)?;
    }
  }
  Ok(())
}

/// Validate the staging directory and produce the one staged artifact
pub fn collect_artifact(staging: &Path, nightly: bool) -> NightlyResult<StagedArtifact> {
  let mut entries: Vec<PathBuf> = fs::read_dir(staging)
    .with_context(|| format!("Failed to read staging directory {}", staging.display()))?
    .map(|entry| entry.map(|e| e.path()))
    .collect::<Result<_, _>>()?;
  entries.sort();

  let (sdists, others): (Vec<PathBuf>, Vec<PathBuf>) = entries
    .into_iter()
    .partition(|p| p.is_file() && file_name_of(p).ends_with(SDIST_SUFFIX));

  if sdists.len() > 1 || !others.is_empty() {
    let found = sdists.iter().chain(&others).map(|p| file_name_of(p)).collect();
    return Err(
      BuildError::UnexpectedArtifacts {
        staging: staging.to_path_buf(),
        found,
      }
      .into(),
    );
  }

  let path = sdists.into_iter().next().ok_or_else(|| BuildError::MissingArtifact {
    staging: staging.to_path_buf(),
  })?;
  let file_name = file_name_of(&path);

  let size = fs::metadata(&path)?.len();
  if size == 0 {
    return Err(BuildError::EmptyArtifact { path }.into());
  }

  let (name, version) = split_sdist_name(&file_name).ok_or_else(|| BuildError::MalformedArtifactName {
    file_name: file_name.clone(),
  })?;

  if version.is_nightly() != nightly {
    return Err(
      BuildError::ModeMismatch {
        version: version.to_string(),
        nightly,
      }
      .into(),
    );
  }

  let sha256 = sha256_file(&path)?;

  Ok(StagedArtifact {
    path,
    file_name,
    name,
    version,
    size,
    sha256,
  })
}

fn file_name_of(path: &Path) -> String {
  path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_default()
}

/// `pytensor-2.18.2.dev20261019.tar.gz` -> ("pytensor", 2.18.2.dev20261019)
pub fn split_sdist_name(file_name: &str) -> Option<(String, VersionLabel)> {
  let stem = file_name.strip_suffix(SDIST_SUFFIX)?;
  let (name, version) = stem.rsplit_once('-')?;
  if name.is_empty() {
    return None;
  }
  Some((name.to_string(), VersionLabel::parse(version)?))
}

fn sha256_file(path: &Path) -> NightlyResult<String> {
  let mut file = fs::File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
  let mut hasher = Sha256::new();
  std::io::copy(&mut file, &mut hasher)?;
  Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::error::{FailureKind, NightlyError};
  use tempfile::TempDir;

  fn stage(files: &[(&str, &[u8])]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, contents) in files {
      fs::write(dir.path().join(name), contents).unwrap();
    }
    dir
  }

  #[test]
  fn test_split_sdist_name() {
    let (name, version) = split_sdist_name("pytensor-2.18.2.dev20261019.tar.gz").unwrap();
    assert_eq!(name, "pytensor");
    assert!(version.is_nightly());

    let (name, _) = split_sdist_name("my-pkg-1.0.tar.gz").unwrap();
    assert_eq!(name, "my-pkg");

    assert!(split_sdist_name("pytensor.tar.gz").is_none());
    assert!(split_sdist_name("pytensor-1.0.zip").is_none());
    assert!(split_sdist_name("-1.0.tar.gz").is_none());
  }

  #[test]
  fn test_collect_single_nightly() {
    let dir = stage(&[("pytensor-2.18.2.dev20261019.tar.gz", b"sdist bytes")]);
    let artifact = collect_artifact(dir.path(), true).unwrap();
    assert_eq!(artifact.name(), "pytensor");
    assert_eq!(artifact.size(), 11);
    assert_eq!(artifact.sha256().len(), 64);
    assert_eq!(artifact.summary().version, "2.18.2.dev20261019");
  }

  #[test]
  fn test_collect_empty_staging() {
    let dir = stage(&[]);
    let err = collect_artifact(dir.path(), true).unwrap_err();
    assert!(matches!(err, NightlyError::Build(BuildError::MissingArtifact { .. })));
    assert_eq!(err.kind(), FailureKind::Build);
  }

  #[test]
  fn test_collect_rejects_multiple_or_stray_files() {
    let dir = stage(&[
      ("pytensor-2.18.2.dev20261019.tar.gz", b"a"),
      ("pytensor-2.18.2.dev20261020.tar.gz", b"b"),
    ]);
    assert!(matches!(
      collect_artifact(dir.path(), true),
      Err(NightlyError::Build(BuildError::UnexpectedArtifacts { .. }))
    ));

    let dir = stage(&[
      ("pytensor-2.18.2.dev20261019.tar.gz", b"a"),
      ("pytensor-2.18.2.dev20261019-py3-none-any.whl", b"w"),
    ]);
    assert!(matches!(
      collect_artifact(dir.path(), true),
      Err(NightlyError::Build(BuildError::UnexpectedArtifacts { .. }))
    ));

    let dir = stage(&[("notes.txt", b"x")]);
    assert!(matches!(
      collect_artifact(dir.path(), true),
      Err(NightlyError::Build(BuildError::UnexpectedArtifacts { .. }))
    ));
  }

  #[test]
  fn test_collect_rejects_empty_file() {
    let dir = stage(&[("pytensor-2.18.2.dev20261019.tar.gz", b"")]);
    assert!(matches!(
      collect_artifact(dir.path(), true),
      Err(NightlyError::Build(BuildError::EmptyArtifact { .. }))
    ));
  }

  #[test]
  fn test_collect_checks_build_mode() {
    let dir = stage(&[("pytensor-2.18.1.tar.gz", b"a")]);
    assert!(matches!(
      collect_artifact(dir.path(), true),
      Err(NightlyError::Build(BuildError::ModeMismatch { nightly: true, .. }))
    ));
    assert!(collect_artifact(dir.path(), false).is_ok());

    let dir = stage(&[("pytensor-2.18.2.dev20261019.tar.gz", b"a")]);
    assert!(collect_artifact(dir.path(), false).is_err());
  }

  #[test]
  fn test_collect_rejects_unparseable_name() {
    let dir = stage(&[("pytensor-latest.tar.gz", b"a")]);
    assert!(matches!(
      collect_artifact(dir.path(), true),
      Err(NightlyError::Build(BuildError::MalformedArtifactName { .. }))
    ));
  }

  #[test]
  fn test_clear_dir_removes_leftovers() {
    let dir = stage(&[("old-1.0.tar.gz", b"stale")]);
    fs::create_dir(dir.path().join("nested")).unwrap();
    clear_dir(dir.path()).unwrap();
    assert!(dir.path().is_dir());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
  }

  #[test]
  fn test_tag_mismatch_for_nightly() {
    let describe = Describe::parse("v2.18.1-3-g0123456").unwrap();
    let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
    let ahead = VersionLabel::parse("2.18.2.dev20261019").unwrap();
    let behind = VersionLabel::parse("2.18.1.dev20261019").unwrap();

    assert!(tag_mismatch(&describe, &ahead, true, today).is_none());
    let reason = tag_mismatch(&describe, &behind, true, today).unwrap();
    assert!(reason.contains("2.18.2.dev20261019"));
  }

  #[test]
  fn test_tag_mismatch_for_release_only_on_tagged_commit() {
    let tagged = Describe::parse("v2.18.1-0-g0123456").unwrap();
    let later = Describe::parse("v2.18.1-5-g89abcde").unwrap();
    let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
    let other = VersionLabel::parse("2.19.0").unwrap();

    assert!(tag_mismatch(&tagged, &VersionLabel::parse("2.18.1").unwrap(), false, today).is_none());
    assert!(tag_mismatch(&tagged, &other, false, today).is_some());
    assert!(tag_mismatch(&later, &other, false, today).is_none());
  }
}
