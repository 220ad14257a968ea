//! `relman changed` - what changed since a ref, mapped onto the graph

use crate::core::context::RepoContext;
use crate::core::error::RelResult;
use crate::core::vcs::SystemGit;
use crate::graph::changed::changed_since;

pub fn run_changed(ctx: &RepoContext, since: String, remote: Option<String>, json: bool) -> RelResult<()> {
  let git = SystemGit::open(&ctx.root)?;
  let report = changed_since(&ctx.graph, &git, &since, remote.as_deref())?;

  if json {
    println!("{}", serde_json::to_string_pretty(&report)?);
    return Ok(());
  }

  println!("Changed since {}:", since);
  println!("  {} file(s)", report.files.len());
  if !report.packages.is_empty() {
    println!("  Packages:");
    for name in &report.packages {
      println!("    {}", name);
    }
  }
  if !report.release_groups.is_empty() {
    println!("  Release groups: {}", report.release_groups.join(", "));
  }
  if !report.workspaces.is_empty() {
    println!("  Workspaces: {}", report.workspaces.join(", "));
  }
  Ok(())
}
