//! Integration tests for `relman check` (ranges, layers, policy)

use crate::helpers::{run_relman, run_relman_raw, TestRepo};
use anyhow::Result;

const LAYERED_CONFIG: &str = r#"[[workspaces]]
name = "client"
directory = "packages"

[[workspaces.release-groups]]
name = "core"
include = ["@app/*"]

[[layers]]
name = "base"
packages = ["@app/base-*"]

[[layers]]
name = "runtime"
packages = ["@app/runtime-*"]
may-depend-on = ["base"]
"#;

#[test]
fn test_ranges_clean_exits_zero() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_package("@app/base", "1.0.0", &[("lodash", "^4.17.0")])?;
  repo.add_package(
    "@app/runtime",
    "1.0.0",
    &[("@app/base", "workspace:~"), ("pinned", "2.0.0-internal.1.0.0")],
  )?;
  repo.commit("Clean ranges")?;

  run_relman(&repo.path, &["check", "ranges"])?;
  Ok(())
}

#[test]
fn test_ranges_violation_exits_100() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_package("@app/base", "1.0.0", &[("ext-lib", "^2.0.0-internal.1.0.0")])?;
  repo.commit("Caret on prerelease")?;

  let output = run_relman_raw(&repo.path, &["check", "ranges"])?;
  assert_eq!(output.status.code(), Some(100));
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("@app/base"), "stdout was: {}", stdout);
  assert!(stdout.contains("ext-lib"), "stdout was: {}", stdout);
  Ok(())
}

#[test]
fn test_layers_allowed_edge_passes() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_config(LAYERED_CONFIG)?;
  repo.add_package("@app/base-util", "1.0.0", &[])?;
  repo.add_package("@app/runtime-host", "1.0.0", &[("@app/base-util", "^1.0.0")])?;
  repo.commit("Runtime over base")?;

  run_relman(&repo.path, &["check", "layers"])?;
  Ok(())
}

#[test]
fn test_layers_upward_edge_is_violation() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_config(LAYERED_CONFIG)?;
  repo.add_package("@app/base-util", "1.0.0", &[("@app/runtime-host", "^1.0.0")])?;
  repo.add_package("@app/runtime-host", "1.0.0", &[])?;
  repo.commit("Base over runtime")?;

  let output = run_relman_raw(&repo.path, &["check", "layers"])?;
  assert_eq!(output.status.code(), Some(1));
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("may not depend on"), "stdout was: {}", stdout);
  Ok(())
}

#[test]
fn test_layers_unassigned_package_is_violation() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_config(LAYERED_CONFIG)?;
  repo.add_package("@app/base-util", "1.0.0", &[])?;
  repo.add_package("@app/orphan", "1.0.0", &[])?;
  repo.commit("Orphan package")?;

  let output = run_relman_raw(&repo.path, &["check", "layers"])?;
  assert_eq!(output.status.code(), Some(1));
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("not assigned to any layer"), "stdout was: {}", stdout);
  Ok(())
}

#[test]
fn test_layers_intra_cycle_requires_opt_in() -> Result<()> {
  let cycle_config = |allow: bool| {
    format!(
      r#"[[workspaces]]
name = "client"
directory = "packages"

[[workspaces.release-groups]]
name = "core"
include = ["@app/*"]

[[layers]]
name = "app"
packages = ["@app/*"]
allow-intra-cycles = {}
"#,
      allow
    )
  };

  let repo = TestRepo::new()?;
  repo.write_config(&cycle_config(false))?;
  repo.add_package("@app/a", "1.0.0", &[("@app/b", "^1.0.0")])?;
  repo.add_package("@app/b", "1.0.0", &[("@app/a", "^1.0.0")])?;
  repo.commit("Cycle")?;

  let output = run_relman_raw(&repo.path, &["check", "layers"])?;
  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stdout).contains("cycle"));

  repo.write_config(&cycle_config(true))?;
  run_relman(&repo.path, &["check", "layers"])?;
  Ok(())
}

#[test]
fn test_layers_dot_export() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_config(LAYERED_CONFIG)?;
  repo.add_package("@app/base-util", "1.0.0", &[])?;
  repo.add_package("@app/runtime-host", "1.0.0", &[("@app/base-util", "^1.0.0")])?;
  repo.commit("Layered")?;

  run_relman(&repo.path, &["check", "layers", "--dot", "layers.dot"])?;
  let dot = repo.read_file("layers.dot")?;
  assert!(dot.contains("digraph"));
  assert!(dot.contains("@app/base-util"));
  Ok(())
}

#[test]
fn test_policy_detects_unsorted_dependencies() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_package("@app/base", "1.0.0", &[("zebra", "^1.0.0"), ("alpha", "^1.0.0")])?;
  repo.commit("Unsorted deps")?;

  let output = run_relman_raw(&repo.path, &["check", "policy"])?;
  assert_eq!(output.status.code(), Some(1));
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("sorted-dependencies"), "stdout was: {}", stdout);
  Ok(())
}

#[test]
fn test_policy_fix_sorts_dependencies() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_package("@app/base", "1.0.0", &[("zebra", "^1.0.0"), ("alpha", "^1.0.0")])?;
  repo.commit("Unsorted deps")?;

  run_relman(&repo.path, &["check", "policy", "--fix"])?;

  let manifest = repo.read_file("packages/base/package.json")?;
  let alpha = manifest.find("alpha").expect("alpha present");
  let zebra = manifest.find("zebra").expect("zebra present");
  assert!(alpha < zebra, "dependencies should be sorted after --fix");

  // Clean after the fix
  run_relman(&repo.path, &["check", "policy"])?;
  Ok(())
}

#[test]
fn test_policy_missing_license_is_not_fixable() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_package("@app/base", "1.0.0", &[])?;
  repo.write_file(
    "packages/base/package.json",
    "{\n  \"name\": \"@app/base\",\n  \"version\": \"1.0.0\"\n}\n",
  )?;
  repo.commit("No license")?;

  let output = run_relman_raw(&repo.path, &["check", "policy", "--fix"])?;
  assert_eq!(output.status.code(), Some(1));
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("manifest-license"), "stdout was: {}", stdout);
  Ok(())
}

#[test]
fn test_policy_handler_filter() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_package("@app/base", "1.0.0", &[("zebra", "^1.0.0"), ("alpha", "^1.0.0")])?;
  repo.write_file(
    "packages/base/package.json",
    "{\n  \"name\": \"@app/base\",\n  \"version\": \"1.0.0\",\n  \"dependencies\": {\n    \"zebra\": \"^1.0.0\",\n    \"alpha\": \"^1.0.0\"\n  }\n}\n",
  )?;
  repo.commit("No license, unsorted")?;

  // Only the named handler runs; the license failure is not reported
  let output = run_relman_raw(&repo.path, &["check", "policy", "--handler", "sorted-dependencies"])?;
  assert_eq!(output.status.code(), Some(1));
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("sorted-dependencies"));
  assert!(!stdout.contains("manifest-license"), "stdout was: {}", stdout);
  Ok(())
}
