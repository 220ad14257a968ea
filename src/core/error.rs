//! Error types for relman with contextual messages and exit codes
//!
//! A unified error type that categorizes failures and maps each category to a
//! process exit code. Policy-style failures (aggregated violation lists) are
//! kept distinct from hard errors so commands can print every finding before
//! exiting non-zero.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for relman
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, policy/layer violations)
  User = 1,
  /// System error (git, I/O, subprocess)
  System = 2,
  /// Validation failure (bad names, non-semver versions, state machine misuse)
  Validation = 3,
  /// Dependency-range policy violation
  RangePolicy = 100,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for relman
#[derive(Debug)]
pub enum RelError {
  /// Repo layout / relman.toml errors
  Config(ConfigError),

  /// Git collaborator errors
  Git(GitError),

  /// Invalid input values (names, versions)
  Validation(ValidationError),

  /// Aggregate policy / layering violations (exit 1)
  Policy { count: usize, summary: String },

  /// Dependency-range violations (exit 100)
  RangePolicy { count: usize, summary: String },

  /// Manifest write failures, reported per package
  Write { failures: Vec<WriteFailure> },

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

/// A single failed manifest write
#[derive(Debug)]
pub struct WriteFailure {
  pub package: String,
  pub path: PathBuf,
  pub reason: String,
}

impl RelError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    RelError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    RelError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      RelError::Message { message, context, help } => RelError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      other => RelError::Message {
        message: other.to_string(),
        context: Some(ctx_str),
        help: other.help_message(),
      },
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      RelError::Config(_) => ExitCode::User,
      RelError::Git(_) => ExitCode::System,
      RelError::Validation(_) => ExitCode::Validation,
      RelError::Policy { .. } => ExitCode::User,
      RelError::RangePolicy { .. } => ExitCode::RangePolicy,
      RelError::Write { .. } => ExitCode::System,
      RelError::Io(_) => ExitCode::System,
      RelError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      RelError::Config(e) => e.help_message(),
      RelError::Git(e) => e.help_message(),
      RelError::Policy { .. } => Some("Fix the listed violations, or run `relman check policy --fix`.".to_string()),
      RelError::RangePolicy { .. } => {
        Some("Prerelease-scheme versions require exact or workspace: ranges.".to_string())
      }
      RelError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for RelError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RelError::Config(e) => write!(f, "{}", e),
      RelError::Git(e) => write!(f, "{}", e),
      RelError::Validation(e) => write!(f, "{}", e),
      RelError::Policy { count, summary } => {
        write!(f, "{} policy violation(s)\n{}", count, summary)
      }
      RelError::RangePolicy { count, summary } => {
        write!(f, "{} invalid dependency range(s)\n{}", count, summary)
      }
      RelError::Write { failures } => {
        writeln!(f, "{} manifest write(s) failed:", failures.len())?;
        for fail in failures {
          writeln!(f, "  {} ({}): {}", fail.package, fail.path.display(), fail.reason)?;
        }
        Ok(())
      }
      RelError::Io(e) => write!(f, "I/O error: {}", e),
      RelError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for RelError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      RelError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for RelError {
  fn from(err: io::Error) -> Self {
    RelError::Io(err)
  }
}

impl From<String> for RelError {
  fn from(msg: String) -> Self {
    RelError::message(msg)
  }
}

impl From<&str> for RelError {
  fn from(msg: &str) -> Self {
    RelError::message(msg)
  }
}

impl From<serde_json::Error> for RelError {
  fn from(err: serde_json::Error) -> Self {
    RelError::message(format!("JSON error: {}", err))
  }
}

impl From<toml_edit::TomlError> for RelError {
  fn from(err: toml_edit::TomlError) -> Self {
    RelError::message(format!("TOML parse error: {}", err))
  }
}

impl From<toml_edit::de::Error> for RelError {
  fn from(err: toml_edit::de::Error) -> Self {
    RelError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<semver::Error> for RelError {
  fn from(err: semver::Error) -> Self {
    RelError::Validation(ValidationError::BadVersion {
      value: err.to_string(),
    })
  }
}

impl From<regex::Error> for RelError {
  fn from(err: regex::Error) -> Self {
    RelError::message(format!("Invalid regex: {}", err))
  }
}

impl From<std::string::FromUtf8Error> for RelError {
  fn from(err: std::string::FromUtf8Error) -> Self {
    RelError::message(format!("UTF-8 conversion error: {}", err))
  }
}

impl From<std::path::StripPrefixError> for RelError {
  fn from(err: std::path::StripPrefixError) -> Self {
    RelError::message(format!("Path strip prefix error: {}", err))
  }
}

/// Repo layout / configuration errors. Fatal: graph construction aborts.
#[derive(Debug)]
pub enum ConfigError {
  /// relman.toml not found
  NotFound { repo_root: PathBuf },

  /// Workspace directory does not exist on disk
  WorkspaceDirMissing { workspace: String, directory: PathBuf },

  /// A release-group include glob matched no packages
  EmptyGlob { group: String, glob: String },

  /// Two release groups claim the same package
  GroupOverlap {
    package: String,
    first: String,
    second: String,
  },

  /// A release group's declared root package does not exist
  RootPackageMissing { group: String, root: String },

  /// Missing or inconsistent field
  Invalid { message: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::NotFound { .. } => {
        Some("Create a relman.toml at the repository root describing workspaces and release groups.".to_string())
      }
      ConfigError::GroupOverlap { .. } => {
        Some("Tighten the include globs so each package matches exactly one release group.".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::NotFound { repo_root } => {
        write!(f, "No relman configuration found under {}", repo_root.display())
      }
      ConfigError::WorkspaceDirMissing { workspace, directory } => {
        write!(
          f,
          "Workspace '{}' directory does not exist: {}",
          workspace,
          directory.display()
        )
      }
      ConfigError::EmptyGlob { group, glob } => {
        write!(f, "Release group '{}': include glob '{}' matched no packages", group, glob)
      }
      ConfigError::GroupOverlap { package, first, second } => {
        write!(
          f,
          "Package '{}' is claimed by release groups '{}' and '{}'",
          package, first, second
        )
      }
      ConfigError::RootPackageMissing { group, root } => {
        write!(f, "Release group '{}': root package '{}' not found", group, root)
      }
      ConfigError::Invalid { message } => write!(f, "Invalid configuration: {}", message),
    }
  }
}

/// Git collaborator errors
#[derive(Debug)]
pub enum GitError {
  /// Git command failed
  CommandFailed { command: String, stderr: String },

  /// Not inside a git repository
  RepoNotFound { path: PathBuf },

  /// A ref (branch, tag, SHA) did not resolve
  RefNotFound { reference: String },

  /// No remote matched the configured partial URL
  RemoteNotFound { partial_url: String },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::RefNotFound { reference } => Some(format!(
        "Fetch the ref first: `git fetch` (looked for '{}')",
        reference
      )),
      GitError::RemoteNotFound { partial_url } => Some(format!(
        "Add a remote whose URL contains '{}': `git remote add upstream <url>`",
        partial_url
      )),
      _ => None,
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr)
      }
      GitError::RepoNotFound { path } => {
        write!(f, "Git repository not found at: {}", path.display())
      }
      GitError::RefNotFound { reference } => {
        write!(f, "Git ref did not resolve: {}", reference)
      }
      GitError::RemoteNotFound { partial_url } => {
        write!(f, "No git remote matching '{}'", partial_url)
      }
    }
  }
}

/// Invalid input values. Fatal to the current command.
#[derive(Debug)]
pub enum ValidationError {
  /// Unknown release group name
  UnknownReleaseGroup { name: String },

  /// Unknown workspace name
  UnknownWorkspace { name: String },

  /// A version string did not parse as semver
  BadVersion { value: String },

  /// Release-group members disagree on the shared version
  GroupVersionMismatch {
    group: String,
    expected: String,
    package: String,
    found: String,
  },

  /// State machine misuse (undefined transition, unknown state name)
  State { message: String },
}

impl fmt::Display for ValidationError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ValidationError::UnknownReleaseGroup { name } => {
        write!(f, "Unknown release group: '{}'", name)
      }
      ValidationError::UnknownWorkspace { name } => {
        write!(f, "Unknown workspace: '{}'", name)
      }
      ValidationError::BadVersion { value } => {
        write!(f, "Not a valid semver version: '{}'", value)
      }
      ValidationError::GroupVersionMismatch {
        group,
        expected,
        package,
        found,
      } => {
        write!(
          f,
          "Release group '{}' version mismatch: expected {} but '{}' is at {}",
          group, expected, package, found
        )
      }
      ValidationError::State { message } => write!(f, "State machine error: {}", message),
    }
  }
}

/// Convenience result type used throughout the crate
pub type RelResult<T> = Result<T, RelError>;

/// Extension trait for adding context to results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> RelResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> RelResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<RelError>,
{
  fn context(self, ctx: impl Into<String>) -> RelResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> RelResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &RelError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
