//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Default configuration: one workspace under packages/, one release group
pub const DEFAULT_CONFIG: &str = r#"[[workspaces]]
name = "client"
directory = "packages"

[[workspaces.release-groups]]
name = "core"
include = ["@app/*"]
"#;

/// A temporary multi-package repository with git history
pub struct TestRepo {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestRepo {
  /// Create a repo: git on main, packages/ directory, default relman.toml
  pub fn new() -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();

    git(&path, &["init", "--initial-branch=main"])?;
    git(&path, &["config", "user.name", "Test User"])?;
    git(&path, &["config", "user.email", "test@example.com"])?;

    std::fs::create_dir_all(path.join("packages"))?;
    std::fs::write(path.join("relman.toml"), DEFAULT_CONFIG)?;

    Ok(Self { _root: root, path })
  }

  /// Replace relman.toml
  pub fn write_config(&self, content: &str) -> Result<()> {
    std::fs::write(self.path.join("relman.toml"), content)?;
    Ok(())
  }

  /// Add a package under packages/; the directory name is the unscoped part
  pub fn add_package(&self, name: &str, version: &str, deps: &[(&str, &str)]) -> Result<PathBuf> {
    let dir_name = name.rsplit('/').next().unwrap_or(name);
    let package_dir = self.path.join("packages").join(dir_name);
    std::fs::create_dir_all(&package_dir)?;

    let mut manifest = format!(
      "{{\n  \"name\": \"{}\",\n  \"version\": \"{}\",\n  \"license\": \"MIT\"",
      name, version
    );
    if !deps.is_empty() {
      manifest.push_str(",\n  \"dependencies\": {\n");
      let entries: Vec<String> = deps
        .iter()
        .map(|(dep, range)| format!("    \"{}\": \"{}\"", dep, range))
        .collect();
      manifest.push_str(&entries.join(",\n"));
      manifest.push_str("\n  }");
    }
    manifest.push_str("\n}\n");

    std::fs::write(package_dir.join("package.json"), manifest)?;
    Ok(package_dir)
  }

  /// Stage everything and commit; returns the commit SHA
  pub fn commit(&self, message: &str) -> Result<String> {
    git(&self.path, &["add", "."])?;
    git(&self.path, &["commit", "-m", message])?;
    let output = git(&self.path, &["rev-parse", "HEAD"])?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Create a bare upstream repo, add it as a remote, push main.
  ///
  /// The bare repo lives inside the work tree, so it is gitignored first.
  pub fn add_upstream(&self) -> Result<()> {
    std::fs::write(self.path.join(".gitignore"), "upstream.git/\n")?;
    self.commit("Ignore upstream")?;

    let upstream = self.path.join("upstream.git");
    git(&self.path, &["init", "--bare", "upstream.git"])?;
    git(&self.path, &["remote", "add", "upstream", upstream.to_str().unwrap()])?;
    git(&self.path, &["push", "upstream", "main"])?;
    Ok(())
  }

  pub fn read_file(&self, path: &str) -> Result<String> {
    Ok(std::fs::read_to_string(self.path.join(path))?)
  }

  pub fn write_file(&self, path: &str, content: &str) -> Result<()> {
    std::fs::write(self.path.join(path), content)?;
    Ok(())
  }
}

/// Run git in a directory, failing loudly
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Run relman, erroring if it exits non-zero
pub fn run_relman(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = run_relman_raw(cwd, args)?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "relman command failed: relman {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}

/// Run relman without asserting on the exit status
pub fn run_relman_raw(cwd: &Path, args: &[&str]) -> Result<Output> {
  let bin = env!("CARGO_BIN_EXE_relman");

  Command::new(bin)
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run relman")
}
