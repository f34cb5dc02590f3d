//! Version labels for source distributions
//!
//! Covers the normalized PEP 440 subset that build backends write into sdist
//! file names: `N(.N)*[{a|b|rc}N][.postN][.devN][+local]`. Nightly labels are
//! exactly the labels with a `.dev` segment. Release-mode labels never carry
//! one, so the two sets cannot collide, and index ordering ranks a nightly as
//! a pre-release below the release it leads up to.

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PreKind {
  Alpha,
  Beta,
  Rc,
}

impl PreKind {
  fn as_str(self) -> &'static str {
    match self {
      PreKind::Alpha => "a",
      PreKind::Beta => "b",
      PreKind::Rc => "rc",
    }
  }
}

#[derive(Debug, Clone)]
pub struct VersionLabel {
  release: Vec<u64>,
  pre: Option<(PreKind, u64)>,
  post: Option<u64>,
  dev: Option<u64>,
  local: Option<String>,
}

impl VersionLabel {
  /// Parse a normalized version string
  pub fn parse(raw: &str) -> Option<Self> {
    let raw = raw.trim();
    let (public, local) = match raw.split_once('+') {
      Some((p, l)) => {
        if l.is_empty() || !l.chars().all(|c| c.is_ascii_alphanumeric() || c == '.') {
          return None;
        }
        (p, Some(l.to_ascii_lowercase()))
      }
      None => (raw, None),
    };

    let mut rest = public;

    let release_end = rest
      .char_indices()
      .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
      .map(|(i, _)| i)
      .unwrap_or(rest.len());
    let mut release_str = &rest[..release_end];
    rest = &rest[release_end..];

    // `.post` / `.dev` begin with a dot that the release scan swallowed
    if let Some(stripped) = release_str.strip_suffix('.') {
      release_str = stripped;
      rest = &public[release_end - 1..];
    }

    let release: Vec<u64> = release_str
      .split('.')
      .map(|s| s.parse().ok())
      .collect::<Option<_>>()?;

    let pre = [("rc", PreKind::Rc), ("a", PreKind::Alpha), ("b", PreKind::Beta)]
      .iter()
      .find_map(|(tag, kind)| rest.strip_prefix(tag).map(|r| (*kind, r)))
      .map(|(kind, r)| {
        let (n, remaining) = take_number(r)?;
        rest = remaining;
        Some((kind, n))
      });
    let pre = match pre {
      Some(Some(p)) => Some(p),
      Some(None) => return None,
      None => None,
    };

    let post = match rest.strip_prefix(".post") {
      Some(r) => {
        let (n, remaining) = take_number(r)?;
        rest = remaining;
        Some(n)
      }
      None => None,
    };

    let dev = match rest.strip_prefix(".dev") {
      Some(r) => {
        let (n, remaining) = take_number(r)?;
        rest = remaining;
        Some(n)
      }
      None => None,
    };

    if !rest.is_empty() {
      return None;
    }

    Some(Self {
      release,
      pre,
      post,
      dev,
      local,
    })
  }

  /// Release-mode label for a base version (any dev/local parts dropped)
  pub fn release_of(base: &VersionLabel) -> Self {
    Self {
      release: base.release.clone(),
      pre: base.pre,
      post: base.post,
      dev: None,
      local: None,
    }
  }

  /// Nightly label following `base`: last release component bumped, `.devYYYYMMDD`
  pub fn nightly_after(base: &VersionLabel, date: NaiveDate) -> Self {
    let mut release = base.release.clone();
    if let Some(last) = release.last_mut() {
      *last = last.saturating_add(1);
    }
    Self {
      release,
      pre: None,
      post: None,
      dev: Some(date_stamp(date)),
      local: None,
    }
  }

  pub fn is_nightly(&self) -> bool {
    self.dev.is_some()
  }

  fn release_cmp(&self, other: &Self) -> Ordering {
    let len = self.release.len().max(other.release.len());
    (0..len)
      .map(|i| {
        let a = self.release.get(i).copied().unwrap_or(0);
        let b = other.release.get(i).copied().unwrap_or(0);
        a.cmp(&b)
      })
      .find(|o| o.is_ne())
      .unwrap_or(Ordering::Equal)
  }

  /// Sort key for everything after the release segment
  fn suffix_key(&self) -> (u8, Option<(PreKind, u64)>, u8, u64, u8, u64) {
    // A bare `.devN` sorts before any pre-release of the same release
    let pre_rank = match (self.pre, self.post, self.dev) {
      (None, None, Some(_)) => 0,
      (Some(_), _, _) => 1,
      _ => 2,
    };
    let (post_rank, post) = match self.post {
      Some(n) => (1, n),
      None => (0, 0),
    };
    let (dev_rank, dev) = match self.dev {
      Some(n) => (0, n),
      None => (1, 0),
    };
    (pre_rank, self.pre, post_rank, post, dev_rank, dev)
  }
}

fn take_number(s: &str) -> Option<(u64, &str)> {
  let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
  if end == 0 {
    return None;
  }
  Some((s[..end].parse().ok()?, &s[end..]))
}

fn date_stamp(date: NaiveDate) -> u64 {
  date.year() as u64 * 10_000 + date.month() as u64 * 100 + date.day() as u64
}

impl PartialEq for VersionLabel {
  fn eq(&self, other: &Self) -> bool {
    self.cmp(other) == Ordering::Equal
  }
}

impl Eq for VersionLabel {}

impl PartialOrd for VersionLabel {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for VersionLabel {
  fn cmp(&self, other: &Self) -> Ordering {
    self
      .release_cmp(other)
      .then_with(|| self.suffix_key().cmp(&other.suffix_key()))
      .then_with(|| self.local.cmp(&other.local))
  }
}

impl fmt::Display for VersionLabel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let release: Vec<String> = self.release.iter().map(u64::to_string).collect();
    write!(f, "{}", release.join("."))?;
    if let Some((kind, n)) = self.pre {
      write!(f, "{}{}", kind.as_str(), n)?;
    }
    if let Some(n) = self.post {
      write!(f, ".post{}", n)?;
    }
    if let Some(n) = self.dev {
      write!(f, ".dev{}", n)?;
    }
    if let Some(local) = &self.local {
      write!(f, "+{}", local)?;
    }
    Ok(())
  }
}

impl Serialize for VersionLabel {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn v(s: &str) -> VersionLabel {
    VersionLabel::parse(s).unwrap_or_else(|| panic!("failed to parse {}", s))
  }

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn test_parse_display() {
    for s in [
      "2.18.1",
      "2.18.1rc2",
      "1.0.post3",
      "2.18.2.dev20261019",
      "1.0a1.dev4",
      "2.8.11+5.gabc1234",
    ] {
      assert_eq!(v(s).to_string(), s);
    }
  }

  #[test]
  fn test_parse_rejects_garbage() {
    for s in ["", "abc", "1..2", "1.0-beta", "1.0.dev", "1.0+", "1.0rc"] {
      assert!(VersionLabel::parse(s).is_none(), "{:?} should not parse", s);
    }
  }

  #[test]
  fn test_pep440_ordering() {
    let ordered = [
      "1.0.dev1",
      "1.0a1.dev1",
      "1.0a1",
      "1.0b2",
      "1.0rc1",
      "1.0",
      "1.0.post1.dev1",
      "1.0.post1",
      "1.0.1",
    ];
    for pair in ordered.windows(2) {
      assert!(v(pair[0]) < v(pair[1]), "{} < {}", pair[0], pair[1]);
    }
    assert_eq!(v("1.0"), v("1.0.0"));
  }

  #[test]
  fn test_nightly_after_saturates_huge_component() {
    let base = v("1.18446744073709551615");
    let nightly = VersionLabel::nightly_after(&base, date(2026, 10, 19));
    assert_eq!(nightly.to_string(), "1.18446744073709551615.dev20261019");
    assert!(nightly.is_nightly());
  }

  #[test]
  fn test_nightly_label_shape() {
    let nightly = VersionLabel::nightly_after(&v("2.18.1"), date(2026, 10, 19));
    assert_eq!(nightly.to_string(), "2.18.2.dev20261019");
    assert!(nightly.is_nightly());
    assert!(nightly < v("2.18.2"));
  }

  #[test]
  fn test_nightly_never_collides_with_release_mode() {
    let bases = ["0.1", "1.0.0", "2.18.1", "2.18.1rc1", "2.18.1.post2", "3"];
    let dates = [date(2024, 1, 1), date(2026, 10, 19), date(2030, 12, 31)];

    let release_labels: Vec<VersionLabel> = bases
      .iter()
      .flat_map(|b| {
        let base = v(b);
        let bumped = VersionLabel::nightly_after(&base, dates[0]);
        [VersionLabel::release_of(&base), VersionLabel::release_of(&bumped)]
      })
      .collect();

    for base in bases {
      for d in dates {
        let nightly = VersionLabel::nightly_after(&v(base), d);
        assert!(nightly.is_nightly());
        for release in &release_labels {
          assert!(!release.is_nightly());
          assert_ne!(&nightly, release, "{} collides with {}", nightly, release);
        }
      }
    }
  }

  #[test]
  fn test_nightly_sorts_between_base_and_next_release() {
    let base = v("2.18.1");
    let nightly = VersionLabel::nightly_after(&base, date(2026, 10, 19));
    let next_release = VersionLabel::release_of(&nightly);
    assert!(base < nightly);
    assert!(nightly < next_release);
    assert_eq!(next_release.to_string(), "2.18.2");
  }

  #[test]
  fn test_later_nightlies_sort_later() {
    let base = v("2.18.1");
    let a = VersionLabel::nightly_after(&base, date(2026, 10, 19));
    let b = VersionLabel::nightly_after(&base, date(2026, 10, 20));
    assert!(a < b);
  }
}
