//! Integration tests for the version engine, driven through the release workflow

use crate::helpers::{git, run_relman, TestRepo};
use anyhow::Result;

#[test]
fn test_minor_bump_rewrites_every_member() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_package("@app/base", "1.2.3", &[])?;
  repo.add_package("@app/runtime", "1.2.3", &[("@app/base", "^1.2.3")])?;
  repo.add_package("@app/loader", "1.2.3", &[("@app/base", "workspace:~")])?;
  repo.commit("Initial")?;

  run_relman(
    &repo.path,
    &["release", "-g", "core", "--bump", "minor", "--skip-checks", "--commit"],
  )?;

  let base = repo.read_file("packages/base/package.json")?;
  let runtime = repo.read_file("packages/runtime/package.json")?;
  let loader = repo.read_file("packages/loader/package.json")?;

  assert!(base.contains("\"version\": \"1.3.0\""));
  assert!(runtime.contains("\"version\": \"1.3.0\""));
  assert!(loader.contains("\"version\": \"1.3.0\""));

  // Interdependency ranges keep their operator; workspace ranges are untouched
  assert!(runtime.contains("\"@app/base\": \"^1.3.0\""), "runtime was: {}", runtime);
  assert!(loader.contains("\"@app/base\": \"workspace:~\""), "loader was: {}", loader);
  Ok(())
}

#[test]
fn test_bump_commit_lands_on_bump_branch() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_package("@app/base", "2.0.0", &[])?;
  repo.commit("Initial")?;

  run_relman(
    &repo.path,
    &["release", "-g", "core", "--bump", "major", "--skip-checks", "--commit"],
  )?;

  let head = git(&repo.path, &["rev-parse", "--abbrev-ref", "HEAD"])?;
  assert_eq!(String::from_utf8_lossy(&head.stdout).trim(), "bump/core-3.0.0");

  // The bump is committed: nothing left in the working tree
  let status = git(&repo.path, &["status", "--porcelain"])?;
  assert!(String::from_utf8_lossy(&status.stdout).trim().is_empty());

  let log = git(&repo.path, &["log", "-1", "--format=%s"])?;
  assert_eq!(String::from_utf8_lossy(&log.stdout).trim(), "Bump core to 3.0.0");
  Ok(())
}

#[test]
fn test_direct_bump_skips_release_workflow() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_package("@app/base", "1.0.0", &[])?;
  repo.add_package("@app/runtime", "1.0.0", &[("@app/base", "~1.0.0")])?;
  repo.commit("Initial")?;
  // No branch, remote or policy constraints apply here
  git(&repo.path, &["checkout", "-b", "feature/anything"])?;

  run_relman(&repo.path, &["bump", "-g", "core", "--bump", "patch"])?;

  let base = repo.read_file("packages/base/package.json")?;
  let runtime = repo.read_file("packages/runtime/package.json")?;
  assert!(base.contains("\"version\": \"1.0.1\""));
  assert!(runtime.contains("\"@app/base\": \"~1.0.1\""), "runtime was: {}", runtime);
  Ok(())
}

#[test]
fn test_direct_bump_to_explicit_version() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_package("@app/base", "1.0.0", &[])?;
  repo.commit("Initial")?;

  run_relman(&repo.path, &["bump", "-g", "core", "--to", "5.0.0"])?;
  let base = repo.read_file("packages/base/package.json")?;
  assert!(base.contains("\"version\": \"5.0.0\""));
  Ok(())
}

#[test]
fn test_bump_deps_rewrites_external_dependents_only() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_package("@app/base", "1.0.0", &[])?;
  repo.add_package("@app/runtime", "1.0.0", &[("@app/base", "^1.0.0")])?;
  repo.add_package("standalone", "3.0.0", &[("@app/base", "^1.0.0")])?;
  repo.commit("Initial")?;

  run_relman(&repo.path, &["bump-deps", "-g", "core", "--range", "^2.0.0"])?;

  let standalone = repo.read_file("packages/standalone/package.json")?;
  assert!(standalone.contains("\"@app/base\": \"^2.0.0\""), "standalone was: {}", standalone);

  // Group members move together; their interdependencies are untouched
  let runtime = repo.read_file("packages/runtime/package.json")?;
  assert!(runtime.contains("\"@app/base\": \"^1.0.0\""), "runtime was: {}", runtime);
  Ok(())
}

#[test]
fn test_group_bump_includes_root_package() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_config(
    r#"[[workspaces]]
name = "client"
directory = "packages"

[[workspaces.release-groups]]
name = "core"
include = ["@app/*"]
root = "core-root"
"#,
  )?;
  repo.add_package("core-root", "1.0.0", &[])?;
  repo.add_package("@app/base", "1.0.0", &[])?;
  repo.commit("Rooted group")?;

  run_relman(&repo.path, &["bump", "-g", "core", "--bump", "minor"])?;

  let root = repo.read_file("packages/core-root/package.json")?;
  let base = repo.read_file("packages/base/package.json")?;
  assert!(root.contains("\"version\": \"1.1.0\""), "root was: {}", root);
  assert!(base.contains("\"version\": \"1.1.0\""));
  Ok(())
}

#[test]
fn test_bump_preserves_tab_indentation() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_package("@app/base", "1.0.0", &[])?;
  repo.write_file(
    "packages/base/package.json",
    "{\n\t\"name\": \"@app/base\",\n\t\"version\": \"1.0.0\",\n\t\"license\": \"MIT\"\n}\n",
  )?;
  repo.commit("Tab-indented manifest")?;

  run_relman(
    &repo.path,
    &["release", "-g", "core", "--bump", "minor", "--skip-checks", "--commit"],
  )?;

  let manifest = repo.read_file("packages/base/package.json")?;
  assert!(manifest.contains("\n\t\"version\": \"1.1.0\""), "manifest was: {}", manifest);
  assert!(!manifest.contains("  \"version\""), "indentation changed: {}", manifest);
  Ok(())
}
