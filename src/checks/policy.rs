//! Repository policy: named handlers over package manifests
//!
//! Each handler checks one rule and optionally knows how to fix it. Handlers
//! never mutate the in-memory graph; a fix re-reads the manifest from disk,
//! rewrites it, and leaves reloading to the caller. Runs report every failure
//! rather than stopping at the first.

use crate::core::error::RelResult;
use crate::graph::manifest::PackageManifest;
use crate::graph::repo_graph::Package;
use regex::Regex;
use std::path::PathBuf;

/// One policy rule
pub trait PolicyHandler {
  /// Stable identifier used for filtering and exclusion
  fn name(&self) -> &'static str;

  fn description(&self) -> &'static str;

  /// Returns a failure message, or None when the package passes
  fn check(&self, package: &Package) -> RelResult<Option<String>>;

  /// Attempt an automated fix; returns true when the manifest was rewritten.
  /// Default: not fixable.
  fn fix(&self, _package: &Package) -> RelResult<bool> {
    Ok(false)
  }
}

/// Public packages must declare an accepted license
pub struct ManifestLicense {
  pub expected: String,
}

impl Default for ManifestLicense {
  fn default() -> Self {
    Self { expected: "MIT".to_string() }
  }
}

impl PolicyHandler for ManifestLicense {
  fn name(&self) -> &'static str {
    "manifest-license"
  }

  fn description(&self) -> &'static str {
    "public packages must declare the expected license"
  }

  fn check(&self, package: &Package) -> RelResult<Option<String>> {
    if package.private() {
      return Ok(None);
    }
    match package.manifest.license() {
      Some(license) if license == self.expected => Ok(None),
      Some(license) => Ok(Some(format!(
        "license is '{}', expected '{}'",
        license, self.expected
      ))),
      None => Ok(Some(format!("missing license field (expected '{}')", self.expected))),
    }
  }
}

/// Dependency sections must be lexicographically sorted
pub struct SortedDependencies;

impl PolicyHandler for SortedDependencies {
  fn name(&self) -> &'static str {
    "sorted-dependencies"
  }

  fn description(&self) -> &'static str {
    "dependency sections must be sorted by name"
  }

  fn check(&self, package: &Package) -> RelResult<Option<String>> {
    if package.manifest.has_sorted_dependencies() {
      Ok(None)
    } else {
      Ok(Some("dependency sections are not sorted".to_string()))
    }
  }

  fn fix(&self, package: &Package) -> RelResult<bool> {
    let mut manifest = PackageManifest::read(&package.manifest_path)?;
    if manifest.has_sorted_dependencies() {
      return Ok(false);
    }
    manifest.sort_dependencies();
    manifest.write(&package.manifest_path)?;
    Ok(true)
  }
}

/// The built-in handler set
pub fn default_handlers() -> Vec<Box<dyn PolicyHandler>> {
  vec![Box::new(ManifestLicense::default()), Box::new(SortedDependencies)]
}

/// One recorded failure
#[derive(Debug)]
pub struct PolicyFailure {
  pub handler: String,
  pub package: String,
  pub path: PathBuf,
  pub message: String,
  pub fixed: bool,
}

#[derive(Debug, Default)]
pub struct PolicyReport {
  /// (package, handler) pairs evaluated
  pub checked: usize,
  pub failures: Vec<PolicyFailure>,
  pub fixed: usize,
}

impl PolicyReport {
  /// Failures that remain after any fixes
  pub fn remaining(&self) -> usize {
    self.failures.iter().filter(|f| !f.fixed).count()
  }
}

/// How a run is scoped
#[derive(Default)]
pub struct PolicyOptions {
  /// Rewrite manifests where a handler knows how
  pub fix: bool,
  /// Run only the named handler
  pub handler: Option<String>,
  /// Run only over packages whose manifest path matches
  pub path_filter: Option<Regex>,
  /// Handler names disabled by configuration
  pub exclude_handlers: Vec<String>,
}

/// Run handlers over packages. Failures accumulate; nothing short-circuits.
pub fn run_policy(
  packages: &[&Package],
  handlers: &[Box<dyn PolicyHandler>],
  options: &PolicyOptions,
) -> RelResult<PolicyReport> {
  let mut report = PolicyReport::default();

  for handler in handlers {
    if let Some(only) = &options.handler {
      if handler.name() != only {
        continue;
      }
    }
    if options.exclude_handlers.iter().any(|h| h == handler.name()) {
      continue;
    }

    for package in packages {
      if let Some(filter) = &options.path_filter {
        if !filter.is_match(&package.manifest_path.to_string_lossy()) {
          continue;
        }
      }

      report.checked += 1;
      let Some(message) = handler.check(package)? else {
        continue;
      };

      let fixed = if options.fix { handler.fix(package)? } else { false };
      if fixed {
        report.fixed += 1;
      }

      report.failures.push(PolicyFailure {
        handler: handler.name().to_string(),
        package: package.name.clone(),
        path: package.manifest_path.clone(),
        message,
        fixed,
      });
    }
  }

  Ok(report)
}
