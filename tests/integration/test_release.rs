//! Integration tests for the release workflow state machine

use crate::helpers::{git, run_relman, run_relman_raw, TestRepo};
use anyhow::Result;

const UPSTREAM_CONFIG: &str = r#"[[workspaces]]
name = "client"
directory = "packages"

[[workspaces.release-groups]]
name = "core"
include = ["@app/*"]

[branches]
upstream-url = "upstream.git"
"#;

#[test]
fn test_release_happy_path_with_upstream() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write_config(UPSTREAM_CONFIG)?;
  repo.add_package("@app/base", "1.0.0", &[])?;
  repo.add_package("@app/runtime", "1.0.0", &[("@app/base", "^1.0.0")])?;
  repo.commit("Initial")?;
  repo.add_upstream()?;

  // Full run: policy checks, remote checks, bump, commit
  let output = run_relman(&repo.path, &["release", "-g", "core", "--bump", "minor", "--commit"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("Release bump complete"), "stdout was: {}", stdout);
  assert!(stdout.contains("1.0.0 -> 1.1.0"), "stdout was: {}", stdout);
  Ok(())
}

#[test]
fn test_patch_requires_release_branch() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_package("@app/base", "1.2.3", &[])?;
  repo.commit("Initial")?;

  // On main: patch is routed to the switch-branch prompt
  let output = run_relman_raw(
    &repo.path,
    &["release", "-g", "core", "--bump", "patch", "--skip-checks", "--commit"],
  )?;
  assert_eq!(output.status.code(), Some(1));
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("release branch"), "stdout was: {}", stdout);

  // Versions are untouched
  let manifest = repo.read_file("packages/base/package.json")?;
  assert!(manifest.contains("\"version\": \"1.2.3\""));

  // From a release branch the same run succeeds
  git(&repo.path, &["checkout", "-b", "release/1.2"])?;
  run_relman(
    &repo.path,
    &["release", "-g", "core", "--bump", "patch", "--skip-checks", "--commit"],
  )?;
  let manifest = repo.read_file("packages/base/package.json")?;
  assert!(manifest.contains("\"version\": \"1.2.4\""));
  Ok(())
}

#[test]
fn test_minor_requires_integration_branch() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_package("@app/base", "1.0.0", &[])?;
  repo.commit("Initial")?;
  git(&repo.path, &["checkout", "-b", "feature/stuff"])?;

  let output = run_relman_raw(
    &repo.path,
    &["release", "-g", "core", "--bump", "minor", "--skip-checks", "--commit"],
  )?;
  assert_eq!(output.status.code(), Some(1));
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("integration branch"), "stdout was: {}", stdout);
  Ok(())
}

#[test]
fn test_prerelease_dependency_blocks_release() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_package("@app/base", "1.0.0", &[("ext-lib", "2.0.0-internal.1.0.0")])?;
  repo.commit("Prerelease dependency")?;

  let output = run_relman_raw(
    &repo.path,
    &["release", "-g", "core", "--bump", "minor", "--skip-checks", "--commit"],
  )?;
  assert_eq!(output.status.code(), Some(1));
  let combined = format!(
    "{}{}",
    String::from_utf8_lossy(&output.stdout),
    String::from_utf8_lossy(&output.stderr)
  );
  assert!(combined.contains("prerelease"), "output was: {}", combined);
  assert!(combined.contains("ext-lib"), "output was: {}", combined);
  Ok(())
}

#[test]
fn test_unknown_group_ends_in_failed_state() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_package("@app/base", "1.0.0", &[])?;
  repo.commit("Initial")?;

  let output = run_relman_raw(&repo.path, &["release", "-g", "nope", "--bump", "minor", "--commit"])?;
  assert_eq!(output.status.code(), Some(1));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("Release failed") || stderr.contains("Release stopped"), "stderr was: {}", stderr);
  Ok(())
}

#[test]
fn test_policy_violation_fails_release_unless_skipped() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_package("@app/base", "1.0.0", &[("zebra", "^1.0.0"), ("alpha", "^1.0.0")])?;
  repo.commit("Unsorted deps")?;

  let output = run_relman_raw(&repo.path, &["release", "-g", "core", "--bump", "minor", "--commit"])?;
  assert_eq!(output.status.code(), Some(1));

  run_relman(
    &repo.path,
    &["release", "-g", "core", "--bump", "minor", "--skip-checks", "--commit"],
  )?;
  Ok(())
}

#[test]
fn test_policy_violation_outside_group_blocks_release() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_package("@app/base", "1.0.0", &[])?;
  // Not a member of 'core', but the policy gate covers the whole repository
  repo.add_package("standalone", "3.0.0", &[("zebra", "^1.0.0"), ("alpha", "^1.0.0")])?;
  repo.commit("Unsorted deps outside the group")?;

  let output = run_relman_raw(&repo.path, &["release", "-g", "core", "--bump", "minor", "--commit"])?;
  assert_eq!(output.status.code(), Some(1));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("standalone"), "stderr was: {}", stderr);

  run_relman(
    &repo.path,
    &["release", "-g", "core", "--bump", "minor", "--skip-checks", "--commit"],
  )?;
  Ok(())
}

#[test]
fn test_test_mode_dispatches_single_state() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_package("@app/base", "1.0.0", &[])?;
  repo.commit("Initial")?;

  let output = run_relman(
    &repo.path,
    &["release", "-g", "core", "--test-mode", "--state", "CheckValidReleaseGroup"],
  )?;
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(
    stdout.contains("State CheckValidReleaseGroup returned Success"),
    "stdout was: {}",
    stdout
  );

  // No bump happened
  let manifest = repo.read_file("packages/base/package.json")?;
  assert!(manifest.contains("\"version\": \"1.0.0\""));
  Ok(())
}

#[test]
fn test_test_mode_unknown_state_is_validation_error() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_package("@app/base", "1.0.0", &[])?;
  repo.commit("Initial")?;

  let output = run_relman_raw(&repo.path, &["release", "-g", "core", "--test-mode", "--state", "NotAState"])?;
  assert_eq!(output.status.code(), Some(3));
  Ok(())
}
