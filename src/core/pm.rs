//! Package-manager collaborator
//!
//! The release workflow only needs two operations from the package manager:
//! re-running the install after a bump (optionally allowing the lockfile to
//! change) and enumerating what is installed under a directory. Both live
//! behind a trait so tests can substitute a recorder.

use crate::core::error::{RelError, RelResult, ResultExt};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// One installed package as reported by the package manager
#[derive(Debug, Clone, Serialize)]
pub struct InstalledPackage {
  pub name: String,
  pub version: String,
  pub path: PathBuf,
  pub private: bool,
}

/// Package-manager operations consumed by the release workflow
pub trait PackageManager {
  /// Run an install at the workspace root.
  ///
  /// When `allow_lockfile_update` is false the install must fail rather than
  /// rewrite the lockfile.
  fn install(&self, workspace_root: &Path, allow_lockfile_update: bool) -> RelResult<()>;

  /// List installed packages under a directory
  fn list_installed(&self, dir: &Path) -> RelResult<Vec<InstalledPackage>>;
}

/// npm CLI implementation
pub struct NpmCli;

impl PackageManager for NpmCli {
  fn install(&self, workspace_root: &Path, allow_lockfile_update: bool) -> RelResult<()> {
    let mut cmd = Command::new("npm");
    cmd.current_dir(workspace_root);
    if allow_lockfile_update {
      cmd.arg("install");
    } else {
      cmd.arg("ci");
    }

    let output = cmd.output().context("Failed to execute npm")?;
    if !output.status.success() {
      return Err(RelError::message(format!(
        "npm install failed in {}:\n{}",
        workspace_root.display(),
        String::from_utf8_lossy(&output.stderr)
      )));
    }

    Ok(())
  }

  fn list_installed(&self, dir: &Path) -> RelResult<Vec<InstalledPackage>> {
    let node_modules = dir.join("node_modules");
    if !node_modules.is_dir() {
      return Ok(Vec::new());
    }

    let mut installed = Vec::new();
    for entry in fs::read_dir(&node_modules)? {
      let path = entry?.path();
      let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        continue;
      };
      if !path.is_dir() || file_name == ".bin" {
        continue;
      }

      if file_name.starts_with('@') {
        // Scoped packages nest one level deeper
        for scoped in fs::read_dir(&path)? {
          let scoped_path = scoped?.path();
          if scoped_path.is_dir() {
            if let Some(pkg) = read_installed(&scoped_path) {
              installed.push(pkg);
            }
          }
        }
      } else if let Some(pkg) = read_installed(&path) {
        installed.push(pkg);
      }
    }

    installed.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(installed)
  }
}

/// Read an installed package's manifest, skipping unreadable entries
fn read_installed(dir: &Path) -> Option<InstalledPackage> {
  let text = fs::read_to_string(dir.join("package.json")).ok()?;
  let value: serde_json::Value = serde_json::from_str(&text).ok()?;

  Some(InstalledPackage {
    name: value.get("name")?.as_str()?.to_string(),
    version: value.get("version")?.as_str()?.to_string(),
    path: dir.to_path_buf(),
    private: value.get("private").and_then(serde_json::Value::as_bool).unwrap_or(false),
  })
}
