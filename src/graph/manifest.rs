//! Package manifest reader/writer (package.json)
//!
//! Pure parsing, no policy. Reads a package's identity, private flag, and raw
//! dependency declarations; writes preserve the file's original indentation
//! style (spaces vs tabs) because manifests are shared human-edited files and
//! must round-trip faithfully.

use crate::core::error::{RelError, RelResult, ResultExt, ValidationError};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;

/// Where a dependency declaration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
  Runtime,
  Dev,
  Peer,
}

impl DependencyKind {
  /// All kinds, in combined-dependency order
  pub const ALL: [DependencyKind; 3] = [DependencyKind::Runtime, DependencyKind::Dev, DependencyKind::Peer];

  /// The manifest key holding this kind of declaration
  pub fn manifest_key(self) -> &'static str {
    match self {
      DependencyKind::Runtime => "dependencies",
      DependencyKind::Dev => "devDependencies",
      DependencyKind::Peer => "peerDependencies",
    }
  }
}

impl fmt::Display for DependencyKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DependencyKind::Runtime => write!(f, "runtime"),
      DependencyKind::Dev => write!(f, "dev"),
      DependencyKind::Peer => write!(f, "peer"),
    }
  }
}

/// One declared dependency: name, declared range, source kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
  pub name: String,
  pub range: String,
  pub kind: DependencyKind,
}

/// Indentation style of a manifest file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentStyle {
  Spaces(usize),
  Tabs,
}

impl IndentStyle {
  /// Detect the indentation of the first indented line; two spaces if none
  pub fn detect(text: &str) -> Self {
    for line in text.lines() {
      if line.starts_with('\t') {
        return IndentStyle::Tabs;
      }
      let spaces = line.len() - line.trim_start_matches(' ').len();
      if spaces > 0 && line.len() > spaces {
        return IndentStyle::Spaces(spaces);
      }
    }
    IndentStyle::Spaces(2)
  }

  fn as_bytes(self) -> Vec<u8> {
    match self {
      IndentStyle::Tabs => b"\t".to_vec(),
      IndentStyle::Spaces(n) => vec![b' '; n],
    }
  }
}

/// A parsed package.json
#[derive(Debug, Clone)]
pub struct PackageManifest {
  pub name: String,
  pub version: semver::Version,
  pub private: bool,
  pub indent: IndentStyle,
  raw: Value,
}

impl PackageManifest {
  /// Read and parse a manifest file
  pub fn read(path: &Path) -> RelResult<Self> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Self::parse(&text).with_context(|| format!("Invalid manifest {}", path.display()))
  }

  /// Parse manifest text
  pub fn parse(text: &str) -> RelResult<Self> {
    let raw: Value = serde_json::from_str(text)?;

    let name = raw
      .get("name")
      .and_then(Value::as_str)
      .ok_or_else(|| RelError::message("manifest has no 'name' field"))?
      .to_string();

    let version_str = raw
      .get("version")
      .and_then(Value::as_str)
      .ok_or_else(|| RelError::message(format!("manifest '{}' has no 'version' field", name)))?;
    let version = semver::Version::parse(version_str).map_err(|_| {
      RelError::Validation(ValidationError::BadVersion {
        value: version_str.to_string(),
      })
    })?;

    let private = raw.get("private").and_then(Value::as_bool).unwrap_or(false);

    Ok(Self {
      name,
      version,
      private,
      indent: IndentStyle::detect(text),
      raw,
    })
  }

  /// Union of runtime, dev and peer dependency declarations
  pub fn combined_dependencies(&self) -> Vec<Dependency> {
    let mut deps = Vec::new();
    for kind in DependencyKind::ALL {
      if let Some(section) = self.raw.get(kind.manifest_key()).and_then(Value::as_object) {
        for (name, range) in section {
          if let Some(range) = range.as_str() {
            deps.push(Dependency {
              name: name.clone(),
              range: range.to_string(),
              kind,
            });
          }
        }
      }
    }
    deps
  }

  /// Declared license, if any
  pub fn license(&self) -> Option<&str> {
    self.raw.get("license").and_then(Value::as_str)
  }

  /// Set the package version (struct and raw document)
  pub fn set_version(&mut self, version: &semver::Version) {
    self.version = version.clone();
    if let Some(obj) = self.raw.as_object_mut() {
      obj.insert("version".to_string(), Value::String(version.to_string()));
    }
  }

  /// Rewrite the declared range of a dependency wherever it appears.
  ///
  /// Returns true if any section was modified.
  pub fn set_dependency_range(&mut self, dep_name: &str, new_range: &str) -> bool {
    let mut changed = false;
    for kind in DependencyKind::ALL {
      if let Some(section) = self.raw.get_mut(kind.manifest_key()).and_then(Value::as_object_mut) {
        if let Some(entry) = section.get_mut(dep_name) {
          *entry = Value::String(new_range.to_string());
          changed = true;
        }
      }
    }
    changed
  }

  /// Whether every dependency section is sorted by key
  pub fn has_sorted_dependencies(&self) -> bool {
    for kind in DependencyKind::ALL {
      if let Some(section) = self.raw.get(kind.manifest_key()).and_then(Value::as_object) {
        let keys: Vec<&String> = section.keys().collect();
        if keys.windows(2).any(|w| w[0] > w[1]) {
          return false;
        }
      }
    }
    true
  }

  /// Sort every dependency section by key. Returns true if anything moved.
  pub fn sort_dependencies(&mut self) -> bool {
    let mut changed = false;
    for kind in DependencyKind::ALL {
      if let Some(section) = self.raw.get_mut(kind.manifest_key()).and_then(Value::as_object_mut) {
        let needs_sort = {
          let keys: Vec<&String> = section.keys().collect();
          keys.windows(2).any(|w| w[0] > w[1])
        };
        if needs_sort {
          let mut entries: Vec<(String, Value)> = section.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
          entries.sort_by(|a, b| a.0.cmp(&b.0));
          section.clear();
          for (k, v) in entries {
            section.insert(k, v);
          }
          changed = true;
        }
      }
    }
    changed
  }

  /// Serialize with the detected indentation and a trailing newline
  pub fn to_text(&self) -> RelResult<String> {
    let indent = self.indent.as_bytes();
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    self.raw.serialize(&mut ser)?;
    out.push(b'\n');
    Ok(String::from_utf8(out)?)
  }

  /// Write the manifest back to disk
  pub fn write(&self, path: &Path) -> RelResult<()> {
    let text = self.to_text()?;
    fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
  }
}
