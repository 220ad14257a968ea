//! Selection and filtering: turn ambiguous input into a precise package set
//!
//! The Selector walks the graph for each criterion and unions the results,
//! de-duplicated by package identity in insertion order. A directory
//! criterion is exclusive and overrides everything else. Filters are pure
//! attribute predicates and idempotent.

use crate::core::error::{RelError, RelResult, ValidationError};
use crate::core::vcs::SystemGit;
use crate::graph::changed;
use crate::graph::repo_graph::{Package, RepoGraph};
use crate::utils::scope_of;
use std::collections::HashSet;
use std::path::PathBuf;

/// "Changed since" specifier: a git ref, optionally scoped to a remote
#[derive(Debug, Clone)]
pub struct ChangedSince {
  pub reference: String,
  /// Partial URL matched against remote URLs
  pub remote: Option<String>,
}

/// Which packages the caller is talking about.
///
/// Name criteria combine with union semantics; `directory` is
/// exclusive-select-one. Empty criteria means the whole repository.
#[derive(Debug, Clone, Default)]
pub struct SelectionCriteria {
  pub release_groups: Vec<String>,
  pub release_group_roots: Vec<String>,
  pub workspaces: Vec<String>,
  pub workspace_roots: Vec<String>,
  pub directory: Option<PathBuf>,
  pub changed_since: Option<ChangedSince>,
}

impl SelectionCriteria {
  pub fn is_empty(&self) -> bool {
    self.release_groups.is_empty()
      && self.release_group_roots.is_empty()
      && self.workspaces.is_empty()
      && self.workspace_roots.is_empty()
      && self.directory.is_none()
      && self.changed_since.is_none()
  }
}

/// Graph walker producing candidate package sets
pub struct Selector<'a> {
  graph: &'a RepoGraph,
}

impl<'a> Selector<'a> {
  pub fn new(graph: &'a RepoGraph) -> Self {
    Self { graph }
  }

  /// Resolve criteria to packages.
  ///
  /// `git` is only consulted when `changed_since` is set.
  pub fn select(&self, criteria: &SelectionCriteria, git: Option<&SystemGit>) -> RelResult<Vec<&'a Package>> {
    // Directory is exclusive: the one package whose directory matches exactly
    if let Some(dir) = &criteria.directory {
      let absolute = if dir.is_absolute() {
        dir.clone()
      } else {
        self.graph.root().join(dir)
      };
      return Ok(
        self
          .graph
          .packages()
          .iter()
          .filter(|p| p.directory == absolute)
          .collect(),
      );
    }

    // Identity select-all
    if criteria.is_empty() {
      return Ok(self.graph.packages().iter().collect());
    }

    fn push<'g>(package: &'g Package, selected: &mut Vec<&'g Package>, seen: &mut HashSet<&'g str>) {
      if seen.insert(package.name.as_str()) {
        selected.push(package);
      }
    }

    let mut selected: Vec<&Package> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for name in &criteria.release_groups {
      let group = self.graph.require_release_group(name)?;
      for member in &group.members {
        if let Some(package) = self.graph.package(member) {
          push(package, &mut selected, &mut seen);
        }
      }
    }

    for name in &criteria.release_group_roots {
      let group = self.graph.require_release_group(name)?;
      let root = group.root_package.as_ref().ok_or_else(|| {
        RelError::message(format!("Release group '{}' has no root package", name))
      })?;
      if let Some(package) = self.graph.package(root) {
        push(package, &mut selected, &mut seen);
      }
    }

    for name in &criteria.workspaces {
      let workspace = self.graph.workspace(name).ok_or_else(|| {
        RelError::Validation(ValidationError::UnknownWorkspace { name: name.clone() })
      })?;
      for member in &workspace.packages {
        if let Some(package) = self.graph.package(member) {
          push(package, &mut selected, &mut seen);
        }
      }
    }

    for name in &criteria.workspace_roots {
      let workspace = self.graph.workspace(name).ok_or_else(|| {
        RelError::Validation(ValidationError::UnknownWorkspace { name: name.clone() })
      })?;
      for member in &workspace.packages {
        if let Some(package) = self.graph.package(member) {
          if package.is_release_group_root {
            push(package, &mut selected, &mut seen);
          }
        }
      }
    }

    if let Some(since) = &criteria.changed_since {
      let git = git.ok_or_else(|| RelError::message("Change detection requires a git repository"))?;
      let report = changed::changed_since(self.graph, git, &since.reference, since.remote.as_deref())?;
      for name in &report.packages {
        if let Some(package) = self.graph.package(name) {
          push(package, &mut selected, &mut seen);
        }
      }
    }

    Ok(selected)
  }
}

/// Attribute predicates applied after selection
#[derive(Debug, Clone, Default)]
pub struct PackageFilter {
  /// Keep only packages whose private flag matches, when set
  pub private: Option<bool>,
  /// Keep only packages whose registry scope is in the set, when set
  pub include_scopes: Option<Vec<String>>,
  /// Remove packages whose registry scope is in the set (after inclusion)
  pub exclude_scopes: Vec<String>,
}

/// Apply a filter. Pure, order-independent, idempotent.
pub fn filter_packages<'a>(packages: Vec<&'a Package>, filter: &PackageFilter) -> Vec<&'a Package> {
  packages
    .into_iter()
    .filter(|p| {
      if let Some(private) = filter.private {
        if p.private() != private {
          return false;
        }
      }

      let scope = scope_of(&p.name);
      if let Some(include) = &filter.include_scopes {
        match scope {
          Some(scope) if include.iter().any(|s| s == scope) => {}
          _ => return false,
        }
      }
      if let Some(scope) = scope {
        if filter.exclude_scopes.iter().any(|s| s == scope) {
          return false;
        }
      }

      true
    })
    .collect()
}
