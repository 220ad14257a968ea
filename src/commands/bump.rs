//! `relman bump` / `relman bump-deps` - version changes outside the release workflow
//!
//! The release command is the guarded path; these are the direct levers for
//! repair work and scripting. Both reload the graph after writing.

use crate::core::context::RepoContext;
use crate::core::error::{RelError, RelResult};
use crate::graph::repo_graph::Package;
use crate::version::{bump_packages, bump_release_group, set_dependency_range, BumpKind, VersionTarget};
use std::collections::HashSet;

fn parse_target(bump: Option<String>, to: Option<String>) -> RelResult<VersionTarget> {
  match (bump, to) {
    (Some(kind), None) => Ok(VersionTarget::Bump(kind.parse::<BumpKind>()?)),
    (None, Some(version)) => Ok(VersionTarget::Explicit(semver::Version::parse(&version)?)),
    _ => Err(RelError::with_help(
      "Specify exactly one of --bump or --to",
      "Use --bump patch|minor|major for a relative bump, or --to X.Y.Z for an explicit version.",
    )),
  }
}

pub fn run_bump(
  ctx: &mut RepoContext,
  group: Option<String>,
  packages: Vec<String>,
  bump: Option<String>,
  to: Option<String>,
) -> RelResult<()> {
  let target = parse_target(bump, to)?;

  if let Some(group) = group {
    let outcome = bump_release_group(&ctx.graph, &group, &target)?;
    println!(
      "📦 Bumped '{}' {} -> {} ({} manifests)",
      outcome.release_group.as_deref().unwrap_or(&group),
      outcome.previous,
      outcome.new_version,
      outcome.packages.len()
    );
  } else if !packages.is_empty() {
    for outcome in bump_packages(&ctx.graph, &packages, &target)? {
      println!(
        "📦 Bumped {} {} -> {}",
        outcome.packages[0], outcome.previous, outcome.new_version
      );
    }
  } else {
    return Err(RelError::with_help(
      "Nothing to bump",
      "Pass --group NAME for a release group, or --package NAME for ungrouped packages.",
    ));
  }

  ctx.graph.reload()?;
  Ok(())
}

/// Rewrite dependency ranges on a release group throughout the rest of the
/// repository (group members themselves move together and are skipped).
pub fn run_bump_deps(ctx: &mut RepoContext, group: String, range: String) -> RelResult<()> {
  let rewritten = {
    let target_group = ctx.graph.require_release_group(&group)?;
    let target_names: HashSet<&str> = target_group.members.iter().map(String::as_str).collect();
    let dependents: Vec<&Package> = ctx
      .graph
      .packages()
      .iter()
      .filter(|p| p.release_group.as_deref() != Some(group.as_str()))
      .collect();
    set_dependency_range(&dependents, &target_names, &range)?
  };

  for name in &rewritten {
    println!("✏️  {}", name);
  }
  println!("\nRewrote {} manifest(s) to '{}'", rewritten.len(), range);

  ctx.graph.reload()?;
  Ok(())
}
