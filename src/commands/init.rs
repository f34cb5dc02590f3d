//! `nightly-rail init` - write a default nightly.toml

use crate::core::config::NightlyConfig;
use crate::core::error::{ConfigError, NightlyError, NightlyResult};
use crate::core::process::SystemRunner;
use crate::core::vcs::SystemGit;
use crate::pipeline::gate::RepositoryIdentity;
use std::env;
use std::path::Path;

/// Create nightly.toml in the current directory
///
/// The canonical identity comes from `--canonical`, or from the origin remote
/// of the current checkout.
pub fn run_init(canonical: Option<String>, force: bool) -> NightlyResult<()> {
  let current_dir = env::current_dir()?;

  if let Some(existing) = NightlyConfig::find_config_path(&current_dir)
    && !force
  {
    return Err(NightlyError::with_help(
      format!("Configuration already exists: {}", existing.display()),
      "Use --force to overwrite it",
    ));
  }

  let canonical = match canonical {
    Some(raw) => RepositoryIdentity::parse(raw.trim())?,
    None => {
      let identity = detect_canonical(&current_dir)?;
      println!("🔍 Detected canonical repository from origin: {}", identity);
      identity
    }
  };

  let config = NightlyConfig::new(canonical.as_str(), current_dir.clone());
  config.validate()?;
  let path = config.save(&current_dir)?;

  println!("✅ Wrote {}", path.display());
  println!("   canonical  = {}", config.repository.canonical);
  println!("   python     = {}", config.toolchain.python);
  println!("   schedule   = {} UTC", config.schedule.time);
  println!("   credential = ${}", config.publish.token_env);
  println!("\n💡 Next: review the file, then run `nightly-rail doctor`");
  Ok(())
}

fn detect_canonical(dir: &Path) -> NightlyResult<RepositoryIdentity> {
  let runner = SystemRunner::new(&[]);
  let url = SystemGit::open(&runner, dir)
    .and_then(|repo| repo.remote_url("origin"))
    .map_err(|_| {
      NightlyError::Config(ConfigError::MissingField {
        field: "repository.canonical (pass --canonical owner/name)".to_string(),
      })
    })?;
  RepositoryIdentity::from_remote_url(&url)
}
