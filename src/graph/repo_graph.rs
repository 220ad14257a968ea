//! Repository graph: Workspace / ReleaseGroup / Package
//!
//! Composes the manifest reader with the repo-layout configuration into a
//! fully-linked in-memory graph. All derived values (combined dependencies,
//! release-group shared version, inter-group edges) are computed exactly once
//! per load and stored on the structs; `reload()` discards everything and
//! recomputes from disk. There is no implicit invalidation on write, so every
//! mutating operation must be followed by an explicit reload before the graph
//! is trusted again.

use crate::core::config::{ReleaseGroupConfig, RepoConfig};
use crate::core::error::{ConfigError, RelError, RelResult, ValidationError};
use crate::graph::manifest::{Dependency, PackageManifest};
use crate::utils::glob_match;
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// A package: one directory with a manifest, owned by exactly one workspace
/// and at most one release group.
#[derive(Debug, Clone)]
pub struct Package {
  pub name: String,
  /// Absolute directory containing the manifest
  pub directory: PathBuf,
  pub manifest_path: PathBuf,
  pub manifest: PackageManifest,
  pub workspace: String,
  pub release_group: Option<String>,
  /// Synthetic package representing a release group's shared root
  pub is_release_group_root: bool,
  /// Combined dependencies, memoized at load
  combined: Vec<Dependency>,
}

impl Package {
  pub fn version(&self) -> &semver::Version {
    &self.manifest.version
  }

  pub fn private(&self) -> bool {
    self.manifest.private
  }

  /// Union of runtime/dev/peer dependency declarations (computed at load)
  pub fn combined_dependencies(&self) -> &[Dependency] {
    &self.combined
  }

  /// Minimal in-memory package for filter and selection tests
  #[cfg(test)]
  pub fn fixture(name: &str, private: bool) -> Self {
    let manifest = PackageManifest::parse(&format!(
      r#"{{"name": "{}", "version": "1.0.0", "private": {}}}"#,
      name, private
    ))
    .unwrap();
    let combined = manifest.combined_dependencies();
    Package {
      name: name.to_string(),
      directory: PathBuf::from("packages").join(name),
      manifest_path: PathBuf::from("packages").join(name).join("package.json"),
      manifest,
      workspace: "client".to_string(),
      release_group: None,
      is_release_group_root: false,
      combined,
    }
  }
}

/// A named subset of one workspace's packages, versioned and released together
#[derive(Debug, Clone)]
pub struct ReleaseGroup {
  pub name: String,
  pub workspace: String,
  pub root_package: Option<String>,
  /// Member package names, in discovery order
  pub members: Vec<String>,
  /// The version shared by every non-root member (invariant-checked at load)
  pub version: semver::Version,
  /// Other release groups depended on by any member
  pub group_dependencies: Vec<String>,
}

/// A directory subtree whose packages share one install root and lockfile
#[derive(Debug, Clone)]
pub struct Workspace {
  pub name: String,
  pub directory: PathBuf,
  /// Member package names, in discovery order
  pub packages: Vec<String>,
  pub release_groups: Vec<String>,
}

/// The fully-linked repository graph
pub struct RepoGraph {
  root: PathBuf,
  config: RepoConfig,
  packages: Vec<Package>,
  by_name: HashMap<String, usize>,
  workspaces: Vec<Workspace>,
  ws_index: HashMap<String, usize>,
  groups: Vec<ReleaseGroup>,
  group_index: HashMap<String, usize>,
}

impl RepoGraph {
  /// Load the graph from disk
  pub fn load(root: &Path, config: RepoConfig) -> RelResult<Self> {
    let root = root.to_path_buf();
    let mut packages: Vec<Package> = Vec::new();
    let mut by_name: HashMap<String, usize> = HashMap::new();
    let mut workspaces: Vec<Workspace> = Vec::new();

    for ws_config in &config.workspaces {
      let ws_dir = root.join(&ws_config.directory);
      if !ws_dir.is_dir() {
        return Err(RelError::Config(ConfigError::WorkspaceDirMissing {
          workspace: ws_config.name.clone(),
          directory: ws_dir,
        }));
      }

      let manifest_paths = find_manifests(&ws_dir)?;

      // Manifests target disjoint files; read them in parallel
      let mut loaded: Vec<(PathBuf, PackageManifest)> = manifest_paths
        .into_par_iter()
        .map(|path| PackageManifest::read(&path).map(|m| (path, m)))
        .collect::<RelResult<Vec<_>>>()?;
      loaded.sort_by(|a, b| a.0.cmp(&b.0));

      let mut ws_packages = Vec::new();
      for (manifest_path, manifest) in loaded {
        let name = manifest.name.clone();
        if let Some(&existing) = by_name.get(&name) {
          return Err(RelError::Config(ConfigError::Invalid {
            message: format!(
              "package '{}' appears in both workspace '{}' and workspace '{}'",
              name, packages[existing].workspace, ws_config.name
            ),
          }));
        }

        let group = assign_group(&name, &ws_config.release_groups)?;
        let directory = manifest_path
          .parent()
          .map(Path::to_path_buf)
          .unwrap_or_else(|| ws_dir.clone());
        let combined = manifest.combined_dependencies();
        let is_root = group
          .and_then(|g| g.root.as_deref())
          .is_some_and(|root_name| root_name == name);

        let package = Package {
          name: name.clone(),
          directory,
          manifest_path,
          manifest,
          workspace: ws_config.name.clone(),
          release_group: group.map(|g| g.name.clone()),
          is_release_group_root: is_root,
          combined,
        };

        by_name.insert(name.clone(), packages.len());
        ws_packages.push(name);
        packages.push(package);
      }

      workspaces.push(Workspace {
        name: ws_config.name.clone(),
        directory: ws_dir,
        packages: ws_packages,
        release_groups: ws_config.release_groups.iter().map(|g| g.name.clone()).collect(),
      });
    }

    // Every include glob must have matched at least one package
    for ws_config in &config.workspaces {
      for group in &ws_config.release_groups {
        for glob in &group.include {
          let matched = packages
            .iter()
            .any(|p| p.workspace == ws_config.name && glob_match(glob, &p.name));
          if !matched {
            return Err(RelError::Config(ConfigError::EmptyGlob {
              group: group.name.clone(),
              glob: glob.clone(),
            }));
          }
        }
        if let Some(root_name) = &group.root {
          if !by_name.contains_key(root_name) {
            return Err(RelError::Config(ConfigError::RootPackageMissing {
              group: group.name.clone(),
              root: root_name.clone(),
            }));
          }
        }
      }
    }

    let groups = derive_groups(&config, &packages, &by_name)?;
    let group_index = groups.iter().enumerate().map(|(i, g)| (g.name.clone(), i)).collect();
    let ws_index = workspaces.iter().enumerate().map(|(i, w)| (w.name.clone(), i)).collect();

    Ok(Self {
      root,
      config,
      packages,
      by_name,
      workspaces,
      ws_index,
      groups,
      group_index,
    })
  }

  /// Discard every cached derived value and recompute the graph from disk.
  ///
  /// The only supported way to observe external mutation.
  pub fn reload(&mut self) -> RelResult<()> {
    *self = Self::load(&self.root.clone(), self.config.clone())?;
    Ok(())
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn config(&self) -> &RepoConfig {
    &self.config
  }

  pub fn packages(&self) -> &[Package] {
    &self.packages
  }

  pub fn package(&self, name: &str) -> Option<&Package> {
    self.by_name.get(name).map(|&i| &self.packages[i])
  }

  pub fn workspaces(&self) -> &[Workspace] {
    &self.workspaces
  }

  pub fn workspace(&self, name: &str) -> Option<&Workspace> {
    self.ws_index.get(name).map(|&i| &self.workspaces[i])
  }

  pub fn release_groups(&self) -> &[ReleaseGroup] {
    &self.groups
  }

  pub fn release_group(&self, name: &str) -> Option<&ReleaseGroup> {
    self.group_index.get(name).map(|&i| &self.groups[i])
  }

  /// Require a release group by name
  pub fn require_release_group(&self, name: &str) -> RelResult<&ReleaseGroup> {
    self.release_group(name).ok_or_else(|| {
      RelError::Validation(ValidationError::UnknownReleaseGroup {
        name: name.to_string(),
      })
    })
  }

  /// Map a path (absolute, or relative to the repo root) to the package whose
  /// directory is its nearest ancestor.
  pub fn package_for_path(&self, path: &Path) -> Option<&Package> {
    let absolute = if path.is_absolute() {
      path.to_path_buf()
    } else {
      self.root.join(path)
    };

    let mut best: Option<&Package> = None;
    for package in &self.packages {
      if absolute.starts_with(&package.directory) {
        match best {
          Some(b) if b.directory.components().count() >= package.directory.components().count() => {}
          _ => best = Some(package),
        }
      }
    }
    best
  }
}

/// Find the release group (if any) claiming this package name.
///
/// A package matching the globs of two different groups is a configuration
/// error; within one group, first matching glob wins.
fn assign_group<'a>(name: &str, groups: &'a [ReleaseGroupConfig]) -> RelResult<Option<&'a ReleaseGroupConfig>> {
  let mut found: Option<&ReleaseGroupConfig> = None;
  for group in groups {
    let claims = group.include.iter().any(|glob| glob_match(glob, name))
      || group.root.as_deref().is_some_and(|root| root == name);
    if claims {
      if let Some(first) = found {
        return Err(RelError::Config(ConfigError::GroupOverlap {
          package: name.to_string(),
          first: first.name.clone(),
          second: group.name.clone(),
        }));
      }
      found = Some(group);
    }
  }
  Ok(found)
}

/// Compute release groups with their derived fields
fn derive_groups(
  config: &RepoConfig,
  packages: &[Package],
  by_name: &HashMap<String, usize>,
) -> RelResult<Vec<ReleaseGroup>> {
  let mut groups = Vec::new();

  for ws_config in &config.workspaces {
    for group_config in &ws_config.release_groups {
      let members: Vec<&Package> = packages
        .iter()
        .filter(|p| p.release_group.as_deref() == Some(group_config.name.as_str()))
        .collect();

      // Shared-version invariant: every non-root member reports one version
      let mut version: Option<&semver::Version> = None;
      for member in &members {
        if member.is_release_group_root {
          continue;
        }
        match version {
          None => version = Some(member.version()),
          Some(expected) if expected != member.version() => {
            return Err(RelError::Validation(ValidationError::GroupVersionMismatch {
              group: group_config.name.clone(),
              expected: expected.to_string(),
              package: member.name.clone(),
              found: member.version().to_string(),
            }));
          }
          Some(_) => {}
        }
      }
      let version = version
        .or_else(|| members.first().map(|m| m.version()))
        .cloned()
        .unwrap_or_else(|| semver::Version::new(0, 0, 0));

      // Inter-group edges: combined dependencies landing in another group
      let mut group_deps: BTreeSet<String> = BTreeSet::new();
      for member in &members {
        for dep in member.combined_dependencies() {
          if let Some(&target_idx) = by_name.get(&dep.name) {
            if let Some(target_group) = &packages[target_idx].release_group {
              if target_group != &group_config.name {
                group_deps.insert(target_group.clone());
              }
            }
          }
        }
      }

      groups.push(ReleaseGroup {
        name: group_config.name.clone(),
        workspace: ws_config.name.clone(),
        root_package: group_config.root.clone(),
        members: members.iter().map(|m| m.name.clone()).collect(),
        version,
        group_dependencies: group_deps.into_iter().collect(),
      });
    }
  }

  Ok(groups)
}

/// Recursively collect package.json paths, skipping node_modules and dot-dirs
fn find_manifests(dir: &Path) -> RelResult<Vec<PathBuf>> {
  let mut found = Vec::new();
  let mut stack = vec![dir.to_path_buf()];

  while let Some(current) = stack.pop() {
    let manifest = current.join("package.json");
    if manifest.is_file() {
      found.push(manifest);
    }

    let entries = fs::read_dir(&current)?;
    for entry in entries {
      let entry = entry?;
      let path = entry.path();
      if !path.is_dir() {
        continue;
      }
      let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        continue;
      };
      if file_name == "node_modules" || file_name.starts_with('.') {
        continue;
      }
      stack.push(path);
    }
  }

  Ok(found)
}
