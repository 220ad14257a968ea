//! `relman list` - resolve selection criteria to packages
//!
//! Exposes the selection and filter engine directly: name criteria union,
//! directory is exclusive, filters apply afterwards.

use crate::core::context::RepoContext;
use crate::core::error::RelResult;
use crate::core::pm::{NpmCli, PackageManager};
use crate::core::vcs::SystemGit;
use crate::graph::selection::{filter_packages, PackageFilter, SelectionCriteria, Selector};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct ListedPackage<'a> {
  name: &'a str,
  version: String,
  private: bool,
  workspace: &'a str,
  release_group: Option<&'a str>,
  directory: &'a std::path::Path,
}

pub fn run_list(ctx: &RepoContext, criteria: SelectionCriteria, filter: PackageFilter, json: bool) -> RelResult<()> {
  let git = if criteria.changed_since.is_some() {
    Some(SystemGit::open(&ctx.root)?)
  } else {
    None
  };

  let selector = Selector::new(&ctx.graph);
  let selected = selector.select(&criteria, git.as_ref())?;
  let packages = filter_packages(selected, &filter);

  if json {
    let listed: Vec<ListedPackage> = packages
      .iter()
      .map(|p| ListedPackage {
        name: &p.name,
        version: p.version().to_string(),
        private: p.private(),
        workspace: &p.workspace,
        release_group: p.release_group.as_deref(),
        directory: &p.directory,
      })
      .collect();
    println!("{}", serde_json::to_string_pretty(&listed)?);
    return Ok(());
  }

  for package in &packages {
    let group = package.release_group.as_deref().unwrap_or("-");
    let visibility = if package.private() { "private" } else { "public" };
    println!(
      "{} {} [{}] workspace={} group={}",
      package.name,
      package.version(),
      visibility,
      package.workspace,
      group
    );
  }
  println!("\n{} package(s)", packages.len());
  Ok(())
}

#[derive(Serialize)]
struct ListedGroup<'a> {
  name: &'a str,
  workspace: &'a str,
  version: String,
  root: Option<&'a str>,
  members: usize,
  depends_on: &'a [String],
}

/// List release groups per workspace, with their inter-group dependencies
pub fn run_list_groups(ctx: &RepoContext, json: bool) -> RelResult<()> {
  if json {
    let mut listed = Vec::new();
    for workspace in ctx.graph.workspaces() {
      for name in &workspace.release_groups {
        let group = ctx.graph.require_release_group(name)?;
        listed.push(ListedGroup {
          name: &group.name,
          workspace: &workspace.name,
          version: group.version.to_string(),
          root: group.root_package.as_deref(),
          members: group.members.len(),
          depends_on: &group.group_dependencies,
        });
      }
    }
    println!("{}", serde_json::to_string_pretty(&listed)?);
    return Ok(());
  }

  for workspace in ctx.graph.workspaces() {
    println!("{} ({})", workspace.name, workspace.directory.display());
    for name in &workspace.release_groups {
      let group = ctx.graph.require_release_group(name)?;
      let deps = if group.group_dependencies.is_empty() {
        "-".to_string()
      } else {
        group.group_dependencies.join(", ")
      };
      println!(
        "  {} v{} [{} packages] depends on: {}",
        group.name,
        group.version,
        group.members.len(),
        deps
      );
    }
  }
  Ok(())
}

/// List what the package manager actually has installed, per workspace
pub fn run_list_installed(ctx: &RepoContext, json: bool) -> RelResult<()> {
  let pm = NpmCli;
  let mut all = Vec::new();

  for workspace in ctx.graph.workspaces() {
    all.extend(pm.list_installed(&workspace.directory)?);
  }

  if json {
    println!("{}", serde_json::to_string_pretty(&all)?);
    return Ok(());
  }

  for package in &all {
    println!("{} {} ({})", package.name, package.version, package.path.display());
  }
  println!("\n{} installed package(s)", all.len());
  Ok(())
}

/// Helper shared with main: turn raw CLI values into criteria
#[allow(clippy::too_many_arguments)]
pub fn build_criteria(
  release_groups: Vec<String>,
  release_group_roots: Vec<String>,
  workspaces: Vec<String>,
  workspace_roots: Vec<String>,
  dir: Option<PathBuf>,
  since: Option<String>,
  remote: Option<String>,
) -> SelectionCriteria {
  SelectionCriteria {
    release_groups,
    release_group_roots,
    workspaces,
    workspace_roots,
    directory: dir,
    changed_since: since.map(|reference| crate::graph::selection::ChangedSince { reference, remote }),
  }
}
