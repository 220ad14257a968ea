//! System git collaborator - subprocess-backed, zero git crates
//!
//! Every operation shells out to git plumbing with an isolated environment.
//! Failures surface as explicit error values; a real error is never reported
//! as a silent empty result.

use crate::core::error::{GitError, RelError, RelResult, ResultExt};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Git backend using system git
pub struct SystemGit {
  /// Repository working directory
  repo_path: PathBuf,

  /// Working tree root
  work_tree: PathBuf,
}

impl SystemGit {
  /// Open a git repository
  pub fn open(path: &Path) -> RelResult<Self> {
    let output = Command::new("git")
      .arg("-C")
      .arg(path)
      .args(["rev-parse", "--show-toplevel"])
      .output()
      .context("Failed to execute git rev-parse")?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("not a git repository") {
        return Err(RelError::Git(GitError::RepoNotFound {
          path: path.to_path_buf(),
        }));
      }
      return Err(RelError::message(format!("Failed to open git repository: {}", stderr)));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let work_tree = stdout.trim();

    Ok(Self {
      repo_path: path.to_path_buf(),
      work_tree: PathBuf::from(work_tree),
    })
  }

  pub fn work_tree(&self) -> &Path {
    &self.work_tree
  }

  /// Get current branch name ("HEAD" when detached)
  pub fn current_branch(&self) -> RelResult<String> {
    let output = self
      .git_cmd()
      .args(["rev-parse", "--abbrev-ref", "HEAD"])
      .output()
      .context("Failed to get current branch")?;

    if !output.status.success() {
      return Ok("HEAD".to_string());
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Find the remote whose URL contains the given fragment.
  ///
  /// Returns the remote name, or None when no remote matches.
  pub fn remote(&self, partial_url: &str) -> RelResult<Option<String>> {
    let output = self
      .git_cmd()
      .args(["remote", "-v"])
      .output()
      .context("Failed to list git remotes")?;

    if !output.status.success() {
      return Err(RelError::Git(GitError::CommandFailed {
        command: "git remote -v".to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      }));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    for line in stdout.lines() {
      let mut parts = line.split_whitespace();
      let (Some(name), Some(url)) = (parts.next(), parts.next()) else {
        continue;
      };
      if url.contains(partial_url) {
        return Ok(Some(name.to_string()));
      }
    }

    Ok(None)
  }

  /// SHA for a branch or ref, or None when it does not resolve
  pub fn sha_for_branch(&self, name: &str) -> RelResult<Option<String>> {
    let output = self
      .git_cmd()
      .args(["rev-parse", "--verify", "--quiet", name])
      .output()
      .context("Failed to resolve ref")?;

    if !output.status.success() {
      return Ok(None);
    }

    Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string()))
  }

  /// Whether the local branch is at the same commit as its remote counterpart.
  ///
  /// A branch that does not exist on the remote is considered up to date
  /// (there is nothing to be behind).
  pub fn is_branch_up_to_date(&self, branch: &str, remote: &str) -> RelResult<bool> {
    let local = self
      .sha_for_branch(branch)?
      .ok_or_else(|| RelError::Git(GitError::RefNotFound {
        reference: branch.to_string(),
      }))?;

    let remote_ref = format!("{}/{}", remote, branch);
    match self.sha_for_branch(&remote_ref)? {
      Some(remote_sha) => Ok(local == remote_sha),
      None => Ok(true),
    }
  }

  /// Files changed relative to a ref: committed + working tree + untracked.
  ///
  /// With a remote, the ref is resolved as `remote/ref`. An unresolvable ref
  /// is a hard error, never an empty list.
  pub fn changed_files(&self, reference: &str, remote: Option<&str>) -> RelResult<Vec<String>> {
    let full_ref = match remote {
      Some(remote) => format!("{}/{}", remote, reference),
      None => reference.to_string(),
    };

    if self.sha_for_branch(&full_ref)?.is_none() {
      return Err(RelError::Git(GitError::RefNotFound { reference: full_ref }));
    }

    let output = self
      .git_cmd()
      .args(["diff", "--name-only", &full_ref])
      .output()
      .context("Failed to diff against ref")?;

    if !output.status.success() {
      return Err(RelError::Git(GitError::CommandFailed {
        command: format!("git diff --name-only {}", full_ref),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      }));
    }

    let mut files: Vec<String> = String::from_utf8_lossy(&output.stdout)
      .lines()
      .filter(|l| !l.trim().is_empty())
      .map(String::from)
      .collect();

    // Untracked files are changes too
    let untracked = self
      .git_cmd()
      .args(["ls-files", "--others", "--exclude-standard"])
      .output()
      .context("Failed to list untracked files")?;

    if untracked.status.success() {
      for line in String::from_utf8_lossy(&untracked.stdout).lines() {
        if !line.trim().is_empty() && !files.iter().any(|f| f == line) {
          files.push(line.to_string());
        }
      }
    }

    Ok(files)
  }

  /// Create and switch to a new branch
  pub fn create_branch(&self, name: &str) -> RelResult<()> {
    let output = self
      .git_cmd()
      .args(["checkout", "-b", name])
      .output()
      .context("Failed to create branch")?;

    if !output.status.success() {
      return Err(RelError::Git(GitError::CommandFailed {
        command: format!("git checkout -b {}", name),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      }));
    }

    Ok(())
  }

  /// Stage all changes and commit
  pub fn commit(&self, message: &str) -> RelResult<()> {
    let add = self.git_cmd().args(["add", "-A"]).output().context("Failed to stage changes")?;
    if !add.status.success() {
      return Err(RelError::Git(GitError::CommandFailed {
        command: "git add -A".to_string(),
        stderr: String::from_utf8_lossy(&add.stderr).to_string(),
      }));
    }

    let output = self
      .git_cmd()
      .args(["commit", "-m", message])
      .output()
      .context("Failed to commit")?;

    if !output.status.success() {
      return Err(RelError::Git(GitError::CommandFailed {
        command: "git commit".to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
      }));
    }

    Ok(())
  }

  /// Create a safe git command with isolated environment
  fn git_cmd(&self) -> Command {
    let mut cmd = Command::new("git");

    cmd.arg("-C").arg(&self.repo_path);

    // Don't trust global config
    cmd.env_clear();
    if let Ok(path) = std::env::var("PATH") {
      cmd.env("PATH", path);
    }
    if let Ok(home) = std::env::var("HOME") {
      cmd.env("HOME", home);
    }

    cmd.arg("-c").arg("protocol.version=2");
    cmd.arg("-c").arg("advice.detachedHead=false");
    cmd.arg("-c").arg("core.quotePath=false");

    cmd
  }
}
