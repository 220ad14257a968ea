//! Integration tests for change detection

use crate::helpers::{run_relman, run_relman_raw, TestRepo};
use anyhow::Result;

#[test]
fn test_changed_maps_files_to_packages() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_package("@app/base", "1.0.0", &[])?;
  repo.add_package("@app/runtime", "1.0.0", &[])?;
  repo.commit("Initial")?;

  // One tracked modification, one untracked file
  repo.write_file("packages/base/index.js", "module.exports = 1;\n")?;
  repo.commit("Add source file")?;
  repo.write_file("packages/base/index.js", "module.exports = 2;\n")?;
  repo.write_file("packages/runtime/new-file.js", "// new\n")?;

  let output = run_relman(&repo.path, &["changed", "--since", "main", "--json"])?;
  let report: serde_json::Value = serde_json::from_str(&String::from_utf8_lossy(&output.stdout))?;

  let packages: Vec<&str> = report["packages"]
    .as_array()
    .expect("packages array")
    .iter()
    .filter_map(|v| v.as_str())
    .collect();
  assert_eq!(packages, vec!["@app/base", "@app/runtime"]);

  let groups = report["release_groups"].as_array().expect("groups array");
  assert_eq!(groups.len(), 1);
  assert_eq!(groups[0], "core");

  let workspaces = report["workspaces"].as_array().expect("workspaces array");
  assert_eq!(workspaces.len(), 1);
  assert_eq!(workspaces[0], "client");
  Ok(())
}

#[test]
fn test_changed_files_outside_packages_do_not_invent_packages() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_package("@app/base", "1.0.0", &[])?;
  repo.commit("Initial")?;

  repo.write_file("README.md", "# changed\n")?;

  let output = run_relman(&repo.path, &["changed", "--since", "main", "--json"])?;
  let report: serde_json::Value = serde_json::from_str(&String::from_utf8_lossy(&output.stdout))?;

  assert!(!report["files"].as_array().expect("files").is_empty());
  assert!(report["packages"].as_array().expect("packages").is_empty());

  // A root-level file has no containing directory to report
  let dirs = report["dirs"].as_array().expect("dirs");
  assert!(dirs.is_empty(), "dirs was: {:?}", dirs);
  Ok(())
}

#[test]
fn test_changed_unknown_ref_is_hard_error() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_package("@app/base", "1.0.0", &[])?;
  repo.commit("Initial")?;

  let output = run_relman_raw(&repo.path, &["changed", "--since", "no-such-ref"])?;
  assert_eq!(output.status.code(), Some(2));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("did not resolve"), "stderr was: {}", stderr);
  Ok(())
}

#[test]
fn test_changed_missing_remote_is_hard_error() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_package("@app/base", "1.0.0", &[])?;
  repo.commit("Initial")?;

  let output = run_relman_raw(&repo.path, &["changed", "--since", "main", "--remote", "nosuch"])?;
  assert_eq!(output.status.code(), Some(2));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("No git remote"), "stderr was: {}", stderr);
  Ok(())
}
