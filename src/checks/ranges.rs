//! Dependency-range hygiene checker
//!
//! Prerelease-scheme versions (non-empty semver prerelease component) must be
//! referenced with exact pins or workspace-relative ranges: a caret or tilde
//! range over a prerelease version resolves unpredictably once later
//! prereleases are published. This is a pure scan over combined
//! dependencies; no network or git access.

use crate::graph::repo_graph::Package;
use std::collections::BTreeMap;

/// Check every combined dependency of every package.
///
/// Returns package name → offending dependency names. Packages with no
/// violations do not appear in the map.
pub fn check_ranges(packages: &[&Package]) -> BTreeMap<String, Vec<String>> {
  let mut flagged: BTreeMap<String, Vec<String>> = BTreeMap::new();

  for package in packages {
    for dep in package.combined_dependencies() {
      if is_flagged_range(&dep.range) {
        flagged.entry(package.name.clone()).or_default().push(dep.name.clone());
      }
    }
  }

  flagged
}

/// A range is flagged when it is caret or tilde over a prerelease-scheme
/// version. Exact ranges and workspace-protocol ranges always pass.
pub fn is_flagged_range(range: &str) -> bool {
  let version_part = match range.strip_prefix('^').or_else(|| range.strip_prefix('~')) {
    Some(rest) => rest,
    None => return false,
  };

  match semver::Version::parse(version_part) {
    Ok(version) => !version.pre.is_empty(),
    Err(_) => false,
  }
}

/// Dependencies that still point at a prerelease-scheme version, regardless
/// of range operator. Releasing with one of these would publish an invalid
/// reference.
pub fn prerelease_dependencies(packages: &[&Package]) -> Vec<(String, String, String)> {
  let mut found = Vec::new();

  for package in packages {
    for dep in package.combined_dependencies() {
      let version_part = dep
        .range
        .strip_prefix('^')
        .or_else(|| dep.range.strip_prefix('~'))
        .or_else(|| dep.range.strip_prefix('='))
        .unwrap_or(&dep.range);

      if let Ok(version) = semver::Version::parse(version_part) {
        if !version.pre.is_empty() {
          found.push((package.name.clone(), dep.name.clone(), dep.range.clone()));
        }
      }
    }
  }

  found
}
