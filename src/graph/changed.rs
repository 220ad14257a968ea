//! Change detection: map a git diff back onto the repository graph
//!
//! Asks the git collaborator for files changed relative to a ref (optionally
//! scoped to a remote matched by partial URL) and maps each file to its
//! containing directory, nearest-ancestor package, release group and
//! workspace. Every derived set is duplicate-free; files outside any known
//! package contribute only to `files`/`dirs`.

use crate::core::error::{GitError, RelError, RelResult};
use crate::core::vcs::SystemGit;
use crate::graph::repo_graph::RepoGraph;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Everything touched since a ref, at increasing levels of aggregation
#[derive(Debug, Clone, Serialize)]
pub struct ChangedReport {
  pub files: Vec<String>,
  pub dirs: Vec<PathBuf>,
  pub packages: Vec<String>,
  pub release_groups: Vec<String>,
  pub workspaces: Vec<String>,
}

/// Compute the change report for `reference`.
///
/// `remote_match` is a partial URL; when given, the diff runs against the
/// matching remote's ref and a missing match is a hard error, never an empty
/// report.
pub fn changed_since(
  graph: &RepoGraph,
  git: &SystemGit,
  reference: &str,
  remote_match: Option<&str>,
) -> RelResult<ChangedReport> {
  let remote = match remote_match {
    Some(partial) => Some(git.remote(partial)?.ok_or_else(|| {
      RelError::Git(GitError::RemoteNotFound {
        partial_url: partial.to_string(),
      })
    })?),
    None => None,
  };

  let files = git.changed_files(reference, remote.as_deref())?;

  let mut dirs: BTreeSet<PathBuf> = BTreeSet::new();
  let mut packages: BTreeSet<&str> = BTreeSet::new();
  let mut release_groups: BTreeSet<&str> = BTreeSet::new();
  let mut workspaces: BTreeSet<&str> = BTreeSet::new();

  for file in &files {
    // Files at the work-tree root have an empty parent; not a directory
    if let Some(dir) = Path::new(file).parent().filter(|d| !d.as_os_str().is_empty()) {
      dirs.insert(dir.to_path_buf());
    }

    // Diff paths are relative to the work tree, not necessarily the repo root
    let absolute = git.work_tree().join(file);
    let Some(package) = graph.package_for_path(&absolute) else {
      continue;
    };
    packages.insert(&package.name);
    if let Some(group) = &package.release_group {
      release_groups.insert(group);
    }
    workspaces.insert(&package.workspace);
  }

  Ok(ChangedReport {
    files,
    dirs: dirs.into_iter().collect(),
    packages: packages.into_iter().map(String::from).collect(),
    release_groups: release_groups.into_iter().map(String::from).collect(),
    workspaces: workspaces.into_iter().map(String::from).collect(),
  })
}
