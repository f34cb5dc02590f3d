pub mod system_git;

pub use system_git::SystemGit;

/// Nearest tag and distance from it, as reported by `git describe --tags --long`
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Describe {
  pub tag: String,
  pub distance: u32,
  pub short_sha: String,
}

impl Describe {
  /// Parse `<tag>-<distance>-g<sha>`; tags may themselves contain dashes
  pub fn parse(raw: &str) -> Option<Self> {
    let raw = raw.trim();
    let (rest, sha) = raw.rsplit_once('-')?;
    let short_sha = sha.strip_prefix('g')?;
    let (tag, distance) = rest.rsplit_once('-')?;
    if tag.is_empty() || short_sha.is_empty() {
      return None;
    }
    Some(Self {
      tag: tag.to_string(),
      distance: distance.parse().ok()?,
      short_sha: short_sha.to_string(),
    })
  }

  /// Tag with a leading `v` removed
  pub fn base_version(&self) -> &str {
    self.tag.strip_prefix('v').unwrap_or(&self.tag)
  }
}
