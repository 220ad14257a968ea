//! Repo layout configuration (relman.toml) parsing and validation
//!
//! Describes how the repository is carved up: workspaces, release-group
//! membership globs, architectural layers, and branch policy for releases.
//! Searched in order: relman.toml, .relman.toml, .config/relman.toml

use crate::core::error::{ConfigError, RelError, RelResult, ResultExt};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoConfig {
  #[serde(default)]
  pub workspaces: Vec<WorkspaceConfig>,
  #[serde(default)]
  pub layers: Vec<LayerConfig>,
  #[serde(default)]
  pub branches: BranchPolicy,
  #[serde(default)]
  pub policy: PolicySettings,
}

/// One workspace: a directory subtree with a shared install root and lockfile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
  pub name: String,

  /// Directory relative to the repository root
  pub directory: PathBuf,

  #[serde(default, rename = "release-groups")]
  pub release_groups: Vec<ReleaseGroupConfig>,
}

/// A release group: packages versioned and released together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseGroupConfig {
  pub name: String,

  /// Name globs selecting member packages (e.g. "@scope/*")
  pub include: Vec<String>,

  /// Name of the group's root package (the synthetic shared root)
  #[serde(default)]
  pub root: Option<String>,
}

/// An architectural layer and what it may depend on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerConfig {
  pub name: String,

  /// Name globs assigning packages to this layer
  pub packages: Vec<String>,

  /// Layers this layer may depend on, in addition to itself
  #[serde(default, rename = "may-depend-on")]
  pub may_depend_on: Vec<String>,

  /// Whether dependency cycles among packages of this layer are tolerated
  #[serde(default, rename = "allow-intra-cycles")]
  pub allow_intra_cycles: bool,
}

/// Branch naming policy consulted by the release workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchPolicy {
  /// Patch releases must run from a branch with this prefix
  #[serde(default = "default_release_branch_prefix", rename = "release-prefix")]
  pub release_prefix: String,

  /// Minor/major releases must run from one of these branches
  #[serde(default = "default_integration_branches", rename = "integration-branches")]
  pub integration_branches: Vec<String>,

  /// Partial URL identifying the upstream remote (matched against remote URLs)
  #[serde(default, rename = "upstream-url")]
  pub upstream_url: String,
}

fn default_release_branch_prefix() -> String {
  "release/".to_string()
}

fn default_integration_branches() -> Vec<String> {
  vec!["main".to_string(), "next".to_string()]
}

impl Default for BranchPolicy {
  fn default() -> Self {
    Self {
      release_prefix: default_release_branch_prefix(),
      integration_branches: default_integration_branches(),
      upstream_url: String::new(),
    }
  }
}

/// Settings for the repo-policy check pass
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PolicySettings {
  /// Handler names to skip entirely
  #[serde(default, rename = "exclude-handlers")]
  pub exclude_handlers: Vec<String>,
}

impl RepoConfig {
  /// Find config file in search order: relman.toml, .relman.toml, .config/relman.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("relman.toml"),
      path.join(".relman.toml"),
      path.join(".config").join("relman.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config from relman.toml (searches multiple locations)
  pub fn load(path: &Path) -> RelResult<Self> {
    let config_path = Self::find_config_path(path).ok_or_else(|| {
      RelError::Config(ConfigError::NotFound {
        repo_root: path.to_path_buf(),
      })
    })?;

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config: RepoConfig = toml_edit::de::from_str(&content)
      .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

    config.validate()?;
    Ok(config)
  }

  /// Structural validation: unique names, resolvable layer references
  pub fn validate(&self) -> RelResult<()> {
    let mut ws_names = std::collections::HashSet::new();
    let mut group_names = std::collections::HashSet::new();

    for ws in &self.workspaces {
      if !ws_names.insert(ws.name.as_str()) {
        return Err(RelError::Config(ConfigError::Invalid {
          message: format!("duplicate workspace name '{}'", ws.name),
        }));
      }
      for group in &ws.release_groups {
        if !group_names.insert(group.name.as_str()) {
          return Err(RelError::Config(ConfigError::Invalid {
            message: format!("duplicate release group name '{}'", group.name),
          }));
        }
        if group.include.is_empty() {
          return Err(RelError::Config(ConfigError::Invalid {
            message: format!("release group '{}' has no include globs", group.name),
          }));
        }
      }
    }

    let layer_names: std::collections::HashSet<&str> = self.layers.iter().map(|l| l.name.as_str()).collect();
    if layer_names.len() != self.layers.len() {
      return Err(RelError::Config(ConfigError::Invalid {
        message: "duplicate layer names".to_string(),
      }));
    }
    for layer in &self.layers {
      for dep in &layer.may_depend_on {
        if !layer_names.contains(dep.as_str()) {
          return Err(RelError::Config(ConfigError::Invalid {
            message: format!("layer '{}' may-depend-on unknown layer '{}'", layer.name, dep),
          }));
        }
      }
    }

    Ok(())
  }
}
