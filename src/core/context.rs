//! Unified repo context - build once, pass everywhere
//!
//! RepoContext loads the configuration and the repository graph a single time
//! in main, then hands references (mutable for commands that reload after a
//! bump) to the command layer.

use crate::core::config::RepoConfig;
use crate::core::error::RelResult;
use crate::graph::repo_graph::RepoGraph;
use std::path::{Path, PathBuf};

/// Shared repo-level data for all commands
pub struct RepoContext {
  /// Repository root directory (absolute path)
  pub root: PathBuf,

  /// The loaded repository graph (config is owned by the graph)
  pub graph: RepoGraph,
}

impl RepoContext {
  /// Build a context from a repository root: load relman.toml, build graph
  pub fn build(repo_root: &Path) -> RelResult<Self> {
    let root = repo_root.to_path_buf();
    let config = RepoConfig::load(&root)?;
    let graph = RepoGraph::load(&root, config)?;

    Ok(Self { root, graph })
  }
}
