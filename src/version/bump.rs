//! Coordinated version bumps
//!
//! A release-group bump computes the target version once from the group's
//! shared version, then rewrites every member manifest (root included) and
//! every member-to-member dependency range, preserving the declared range
//! operator. Workspace-protocol ranges resolve by install location and are
//! never rewritten. Writes run in parallel and are best-effort: failures are
//! collected per package and reported together, with no rollback of the
//! manifests already written. Callers must reload the graph afterwards.

use crate::core::error::{RelError, RelResult, ValidationError, WriteFailure};
use crate::graph::repo_graph::{Package, RepoGraph};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Which version component to advance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpKind {
  Patch,
  Minor,
  Major,
}

impl BumpKind {
  /// Advance `version`, zeroing lower components and dropping any
  /// prerelease/build metadata.
  pub fn apply(self, version: &semver::Version) -> semver::Version {
    match self {
      BumpKind::Patch => semver::Version::new(version.major, version.minor, version.patch + 1),
      BumpKind::Minor => semver::Version::new(version.major, version.minor + 1, 0),
      BumpKind::Major => semver::Version::new(version.major + 1, 0, 0),
    }
  }
}

impl FromStr for BumpKind {
  type Err = RelError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "patch" => Ok(BumpKind::Patch),
      "minor" => Ok(BumpKind::Minor),
      "major" => Ok(BumpKind::Major),
      other => Err(RelError::message(format!(
        "unknown bump kind '{}' (expected patch, minor or major)",
        other
      ))),
    }
  }
}

impl fmt::Display for BumpKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BumpKind::Patch => write!(f, "patch"),
      BumpKind::Minor => write!(f, "minor"),
      BumpKind::Major => write!(f, "major"),
    }
  }
}

/// Either a relative bump or an explicit target version
#[derive(Debug, Clone)]
pub enum VersionTarget {
  Bump(BumpKind),
  Explicit(semver::Version),
}

impl VersionTarget {
  pub fn resolve(&self, current: &semver::Version) -> semver::Version {
    match self {
      VersionTarget::Bump(kind) => kind.apply(current),
      VersionTarget::Explicit(version) => version.clone(),
    }
  }
}

/// What a bump did
#[derive(Debug)]
pub struct BumpOutcome {
  pub release_group: Option<String>,
  pub previous: semver::Version,
  pub new_version: semver::Version,
  /// Packages whose manifests were rewritten
  pub packages: Vec<String>,
}

/// Bump every member of a release group to one shared version.
///
/// Errors carry the full list of per-package write failures; manifests
/// already written stay written.
pub fn bump_release_group(graph: &RepoGraph, group_name: &str, target: &VersionTarget) -> RelResult<BumpOutcome> {
  let group = graph.require_release_group(group_name)?;
  let previous = group.version.clone();
  let new_version = target.resolve(&previous);

  if new_version == previous {
    return Err(RelError::Validation(ValidationError::BadVersion {
      value: format!("target version {} equals the current version", new_version),
    }));
  }

  let member_names: HashSet<&str> = group.members.iter().map(String::as_str).collect();
  let members: Vec<&Package> = group.members.iter().filter_map(|m| graph.package(m)).collect();

  // Disjoint files; write in parallel and collect every failure
  let failures: Vec<WriteFailure> = members
    .par_iter()
    .filter_map(|package| {
      write_bumped(package, &new_version, &member_names)
        .err()
        .map(|err| WriteFailure {
          package: package.name.clone(),
          path: package.manifest_path.clone(),
          reason: err.to_string(),
        })
    })
    .collect();

  if !failures.is_empty() {
    return Err(RelError::Write { failures });
  }

  Ok(BumpOutcome {
    release_group: Some(group.name.clone()),
    previous,
    new_version,
    packages: members.iter().map(|p| p.name.clone()).collect(),
  })
}

/// Bump ungrouped packages independently; each resolves the target against
/// its own current version.
pub fn bump_packages(graph: &RepoGraph, names: &[String], target: &VersionTarget) -> RelResult<Vec<BumpOutcome>> {
  let mut outcomes = Vec::new();
  let empty = HashSet::new();

  for name in names {
    let package = graph
      .package(name)
      .ok_or_else(|| RelError::message(format!("unknown package '{}'", name)))?;
    if let Some(group) = &package.release_group {
      return Err(RelError::message(format!(
        "package '{}' belongs to release group '{}'; bump the group instead",
        name, group
      )));
    }

    let previous = package.version().clone();
    let new_version = target.resolve(&previous);
    write_bumped(package, &new_version, &empty).map_err(|err| RelError::Write {
      failures: vec![WriteFailure {
        package: package.name.clone(),
        path: package.manifest_path.clone(),
        reason: err.to_string(),
      }],
    })?;

    outcomes.push(BumpOutcome {
      release_group: None,
      previous,
      new_version,
      packages: vec![package.name.clone()],
    });
  }

  Ok(outcomes)
}

/// Rewrite the declared range of every dependency on `target_names` across
/// `dependents`, to an explicit range string.
///
/// Workspace-protocol ranges resolve by install location and are skipped.
/// Returns the names of the packages whose manifests were rewritten.
pub fn set_dependency_range(
  dependents: &[&Package],
  target_names: &HashSet<&str>,
  new_range: &str,
) -> RelResult<Vec<String>> {
  let mut rewritten = Vec::new();

  for package in dependents {
    let mut manifest = package.manifest.clone();
    let mut changed = false;

    for dep in package.combined_dependencies() {
      if !target_names.contains(dep.name.as_str()) || dep.range.starts_with("workspace:") {
        continue;
      }
      changed |= manifest.set_dependency_range(&dep.name, new_range);
    }

    if changed {
      manifest.write(&package.manifest_path)?;
      rewritten.push(package.name.clone());
    }
  }

  Ok(rewritten)
}

/// Rewrite one manifest: version, plus ranges pointing at other members
fn write_bumped(package: &Package, new_version: &semver::Version, members: &HashSet<&str>) -> RelResult<()> {
  let mut manifest = package.manifest.clone();
  manifest.set_version(new_version);

  for dep in package.combined_dependencies() {
    if !members.contains(dep.name.as_str()) {
      continue;
    }
    if let Some(new_range) = rewrite_range(&dep.range, new_version) {
      manifest.set_dependency_range(&dep.name, &new_range);
    }
  }

  manifest.write(&package.manifest_path)
}

/// Carry the declared operator over to the new version.
///
/// Workspace-protocol and complex range expressions are left untouched.
fn rewrite_range(old: &str, new_version: &semver::Version) -> Option<String> {
  if old.starts_with("workspace:") {
    return None;
  }
  if let Some(rest) = old.strip_prefix('^') {
    semver::Version::parse(rest).ok()?;
    return Some(format!("^{}", new_version));
  }
  if let Some(rest) = old.strip_prefix('~') {
    semver::Version::parse(rest).ok()?;
    return Some(format!("~{}", new_version));
  }
  if semver::Version::parse(old).is_ok() {
    return Some(new_version.to_string());
  }
  None
}
