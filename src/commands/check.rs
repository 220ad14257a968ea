//! `relman check` - policy, layers, dependency ranges
//!
//! Exit codes: policy and layer violations exit 1, dependency-range
//! violations exit 100. Every violation is printed; nothing stops at the
//! first finding.

use crate::checks::layers::LayerGraph;
use crate::checks::policy::{default_handlers, run_policy, PolicyOptions};
use crate::checks::ranges;
use crate::core::context::RepoContext;
use crate::core::error::{RelError, RelResult};
use crate::graph::repo_graph::Package;
use regex::Regex;
use std::fs;
use std::path::PathBuf;

fn all_packages(ctx: &RepoContext) -> Vec<&Package> {
  ctx.graph.packages().iter().collect()
}

/// Run the repo-policy handlers
pub fn run_check_policy(
  ctx: &RepoContext,
  fix: bool,
  handler: Option<String>,
  path: Option<String>,
  json: bool,
) -> RelResult<()> {
  let packages = all_packages(ctx);
  let handlers = default_handlers();

  if let Some(name) = &handler {
    if !handlers.iter().any(|h| h.name() == name) {
      let known = handlers
        .iter()
        .map(|h| format!("  {} - {}", h.name(), h.description()))
        .collect::<Vec<_>>()
        .join("\n");
      return Err(RelError::with_help(
        format!("Unknown policy handler '{}'", name),
        format!("Known handlers:\n{}", known),
      ));
    }
  }

  let options = PolicyOptions {
    fix,
    handler,
    path_filter: path.as_deref().map(Regex::new).transpose()?,
    exclude_handlers: ctx.graph.config().policy.exclude_handlers.clone(),
  };

  let report = run_policy(&packages, &handlers, &options)?;

  if json {
    let failures: Vec<serde_json::Value> = report
      .failures
      .iter()
      .map(|f| {
        serde_json::json!({
          "handler": f.handler,
          "package": f.package,
          "path": f.path,
          "message": f.message,
          "fixed": f.fixed,
        })
      })
      .collect();
    println!("{}", serde_json::to_string_pretty(&failures)?);
  } else {
    for failure in &report.failures {
      let marker = if failure.fixed { "🔧" } else { "❌" };
      println!("{} {} [{}]: {}", marker, failure.package, failure.handler, failure.message);
    }
    println!(
      "\nChecked {} package/handler pairs: {} failure(s), {} fixed",
      report.checked,
      report.failures.len(),
      report.fixed
    );
  }

  let remaining = report.remaining();
  if remaining > 0 {
    let summary = report
      .failures
      .iter()
      .filter(|f| !f.fixed)
      .map(|f| format!("  {} [{}]: {}", f.package, f.handler, f.message))
      .collect::<Vec<_>>()
      .join("\n");
    return Err(RelError::Policy {
      count: remaining,
      summary,
    });
  }

  if !json {
    println!("✅ Policy checks passed");
  }
  Ok(())
}

/// Verify architectural layering
pub fn run_check_layers(ctx: &RepoContext, report_file: Option<PathBuf>, dot_file: Option<PathBuf>) -> RelResult<()> {
  let layers = &ctx.graph.config().layers;
  if layers.is_empty() {
    return Err(RelError::with_help(
      "No layers configured",
      "Add [[layers]] sections to relman.toml before running `relman check layers`.",
    ));
  }

  let layer_graph = LayerGraph::build(&ctx.graph, layers);

  if let Some(path) = report_file {
    fs::write(&path, layer_graph.describe())?;
    println!("📄 Wrote layer report to {}", path.display());
  }
  if let Some(path) = dot_file {
    fs::write(&path, layer_graph.to_dot())?;
    println!("📄 Wrote DOT graph to {}", path.display());
  }

  let report = layer_graph.verify();

  for violation in &report.violations {
    println!("❌ {}", violation);
  }
  for package in &report.unassigned {
    println!("❌ {} is not assigned to any layer", package);
  }

  if !report.ok {
    let count = report.violations.len() + report.unassigned.len();
    let mut lines: Vec<String> = report.violations.iter().map(|v| format!("  {}", v)).collect();
    lines.extend(report.unassigned.iter().map(|p| format!("  {} unassigned", p)));
    return Err(RelError::Policy {
      count,
      summary: lines.join("\n"),
    });
  }

  println!("✅ Layer check passed");
  Ok(())
}

/// Check dependency-range hygiene
pub fn run_check_ranges(ctx: &RepoContext, json: bool) -> RelResult<()> {
  let packages = all_packages(ctx);
  let flagged = ranges::check_ranges(&packages);

  if json {
    println!("{}", serde_json::to_string_pretty(&flagged)?);
  } else {
    for (package, deps) in &flagged {
      println!("❌ {}: caret/tilde range on prerelease version: {}", package, deps.join(", "));
    }
  }

  if !flagged.is_empty() {
    let count: usize = flagged.values().map(Vec::len).sum();
    let summary = flagged
      .iter()
      .map(|(package, deps)| format!("  {}: {}", package, deps.join(", ")))
      .collect::<Vec<_>>()
      .join("\n");
    return Err(RelError::RangePolicy { count, summary });
  }

  if !json {
    println!("✅ Dependency ranges are clean");
  }
  Ok(())
}
