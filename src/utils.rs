//! Utility functions for cross-platform path handling

use std::path::{Path, PathBuf};

/// Interpreter inside a virtual environment
///
/// `bin/python` on Unix, `Scripts\python.exe` on Windows.
pub fn venv_python(venv: &Path) -> PathBuf {
  #[cfg(target_os = "windows")]
  {
    venv.join("Scripts").join("python.exe")
  }
  #[cfg(not(target_os = "windows"))]
  {
    venv.join("bin").join("python")
  }
}

/// Name of a distribution from a requirement string (`build==1.2.1` -> `build`)
pub fn requirement_name(requirement: &str) -> &str {
  let end = requirement
    .find(|c: char| matches!(c, '=' | '<' | '>' | '!' | '~' | '[' | ';' | '@' | ' '))
    .unwrap_or(requirement.len());
  requirement[..end].trim()
}

/// Compare distribution names the way package indexes do (PEP 503)
pub fn normalize_dist_name(name: &str) -> String {
  let mut out = String::with_capacity(name.len());
  let mut last_sep = false;
  for c in name.chars() {
    if matches!(c, '-' | '_' | '.') {
      if !last_sep {
        out.push('-');
      }
      last_sep = true;
    } else {
      out.push(c.to_ascii_lowercase());
      last_sep = false;
    }
  }
  out
}
