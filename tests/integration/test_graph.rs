//! Integration tests for graph loading, selection and filtering via `relman list`

use crate::helpers::{run_relman, run_relman_raw, TestRepo};
use anyhow::Result;

const ROOTED_CONFIG: &str = r#"[[workspaces]]
name = "client"
directory = "packages"

[[workspaces.release-groups]]
name = "core"
include = ["@app/*"]
root = "core-root"
"#;

#[test]
fn test_list_resolves_every_package() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_package("@app/base", "1.0.0", &[])?;
  repo.add_package("@app/runtime", "1.0.0", &[("@app/base", "^1.0.0")])?;
  repo.add_package("@app/loader", "1.0.0", &[])?;
  repo.commit("Initial packages")?;

  let output = run_relman(&repo.path, &["list", "--json"])?;
  let listed: serde_json::Value = serde_json::from_str(&String::from_utf8_lossy(&output.stdout))?;

  let packages = listed.as_array().expect("JSON array");
  assert_eq!(packages.len(), 3);
  for package in packages {
    assert_eq!(package["workspace"], "client");
    assert_eq!(package["release_group"], "core");
  }
  Ok(())
}

#[test]
fn test_group_version_mismatch_rejected() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_package("@app/base", "1.0.0", &[])?;
  repo.add_package("@app/runtime", "2.0.0", &[])?;
  repo.commit("Mismatched versions")?;

  let output = run_relman_raw(&repo.path, &["list"])?;
  assert_eq!(output.status.code(), Some(3));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("version mismatch"), "stderr was: {}", stderr);
  Ok(())
}

#[test]
fn test_release_group_selection() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_package("@app/base", "1.0.0", &[])?;
  repo.add_package("standalone", "3.0.0", &[])?;
  repo.commit("Grouped and ungrouped")?;

  let output = run_relman(&repo.path, &["list", "-g", "core", "--json"])?;
  let listed: serde_json::Value = serde_json::from_str(&String::from_utf8_lossy(&output.stdout))?;

  let packages = listed.as_array().expect("JSON array");
  assert_eq!(packages.len(), 1);
  assert_eq!(packages[0]["name"], "@app/base");
  Ok(())
}

#[test]
fn test_unknown_release_group_is_validation_error() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_package("@app/base", "1.0.0", &[])?;
  repo.commit("One package")?;

  let output = run_relman_raw(&repo.path, &["list", "-g", "nope"])?;
  assert_eq!(output.status.code(), Some(3));
  Ok(())
}

#[test]
fn test_scope_filter() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_package("@app/base", "1.0.0", &[])?;
  repo.add_package("@tools/cli", "2.0.0", &[])?;
  repo.commit("Two scopes")?;

  let output = run_relman(&repo.path, &["list", "--scope", "@tools", "--json"])?;
  let listed: serde_json::Value = serde_json::from_str(&String::from_utf8_lossy(&output.stdout))?;

  let packages = listed.as_array().expect("JSON array");
  assert_eq!(packages.len(), 1);
  assert_eq!(packages[0]["name"], "@tools/cli");
  Ok(())
}

#[test]
fn test_release_group_root_selection() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_config(ROOTED_CONFIG)?;
  repo.add_package("core-root", "1.0.0", &[])?;
  repo.add_package("@app/base", "1.0.0", &[])?;
  repo.commit("Rooted group")?;

  // The root is a member: the group selects it alongside the others
  let output = run_relman(&repo.path, &["list", "-g", "core", "--json"])?;
  let listed: serde_json::Value = serde_json::from_str(&String::from_utf8_lossy(&output.stdout))?;
  assert_eq!(listed.as_array().expect("JSON array").len(), 2);

  let output = run_relman(&repo.path, &["list", "--release-group-root", "core", "--json"])?;
  let listed: serde_json::Value = serde_json::from_str(&String::from_utf8_lossy(&output.stdout))?;
  let packages = listed.as_array().expect("JSON array");
  assert_eq!(packages.len(), 1);
  assert_eq!(packages[0]["name"], "core-root");

  let output = run_relman(&repo.path, &["list", "--workspace-root", "client", "--json"])?;
  let listed: serde_json::Value = serde_json::from_str(&String::from_utf8_lossy(&output.stdout))?;
  let packages = listed.as_array().expect("JSON array");
  assert_eq!(packages.len(), 1);
  assert_eq!(packages[0]["name"], "core-root");
  Ok(())
}

#[test]
fn test_missing_root_package_is_config_error() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_config(
    r#"[[workspaces]]
name = "client"
directory = "packages"

[[workspaces.release-groups]]
name = "core"
include = ["@app/*"]
root = "no-such-package"
"#,
  )?;
  repo.add_package("@app/base", "1.0.0", &[])?;
  repo.commit("Dangling root")?;

  let output = run_relman_raw(&repo.path, &["list"])?;
  assert_eq!(output.status.code(), Some(1));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("root package"), "stderr was: {}", stderr);
  Ok(())
}

#[test]
fn test_list_groups_reports_inter_group_dependencies() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_config(
    r#"
[[workspaces]]
name = "client"
directory = "packages"

[[workspaces.release-groups]]
name = "core"
include = ["@app/*"]

[[workspaces.release-groups]]
name = "tools"
include = ["@tools/*"]
"#,
  )?;
  repo.add_package("@app/base", "1.0.0", &[])?;
  repo.add_package("@tools/cli", "2.0.0", &[("@app/base", "^1.0.0")])?;
  repo.commit("Two groups")?;

  let output = run_relman(&repo.path, &["list", "--groups", "--json"])?;
  let listed: serde_json::Value = serde_json::from_str(&String::from_utf8_lossy(&output.stdout))?;

  let groups = listed.as_array().expect("JSON array");
  assert_eq!(groups.len(), 2);
  assert_eq!(groups[0]["name"], "core");
  assert_eq!(groups[0]["depends_on"].as_array().unwrap().len(), 0);
  assert_eq!(groups[1]["name"], "tools");
  assert_eq!(groups[1]["version"], "2.0.0");
  assert_eq!(groups[1]["depends_on"][0], "core");
  Ok(())
}

#[test]
fn test_directory_selection_is_exclusive() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_package("@app/base", "1.0.0", &[])?;
  repo.add_package("@app/runtime", "1.0.0", &[])?;
  repo.commit("Two packages")?;

  // A directory criterion wins even with other criteria present
  let output = run_relman(
    &repo.path,
    &["list", "-g", "core", "--dir", "packages/base", "--json"],
  )?;
  let listed: serde_json::Value = serde_json::from_str(&String::from_utf8_lossy(&output.stdout))?;

  let packages = listed.as_array().expect("JSON array");
  assert_eq!(packages.len(), 1);
  assert_eq!(packages[0]["name"], "@app/base");
  Ok(())
}
