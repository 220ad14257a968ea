//! Layer verification: architectural dependency direction
//!
//! Each package is assigned to a named layer via configuration globs; a layer
//! may depend on itself and on its `may-depend-on` whitelist. The verifier
//! builds a fresh petgraph DiGraph per run from combined dependencies and
//! reports every violating edge, not just the first. Cycles among packages of
//! one layer pass only when that layer opts in; cross-layer cycles always
//! violate.

use crate::core::config::LayerConfig;
use crate::graph::repo_graph::{Package, RepoGraph};
use crate::utils::glob_match;
use petgraph::algo;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

/// One verification finding
#[derive(Debug, Clone)]
pub enum LayerViolation {
  /// A dependency edge into a layer the source layer may not use
  Edge {
    from_package: String,
    from_layer: String,
    to_package: String,
    to_layer: String,
  },
  /// A dependency cycle (cross-layer, or intra-layer without opt-in)
  Cycle { packages: Vec<String>, layers: Vec<String> },
}

impl fmt::Display for LayerViolation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      LayerViolation::Edge {
        from_package,
        from_layer,
        to_package,
        to_layer,
      } => write!(
        f,
        "{} (layer '{}') may not depend on {} (layer '{}')",
        from_package, from_layer, to_package, to_layer
      ),
      LayerViolation::Cycle { packages, layers } => write!(
        f,
        "dependency cycle among [{}] spanning layer(s) [{}]",
        packages.join(", "),
        layers.join(", ")
      ),
    }
  }
}

/// Result of one verification run
#[derive(Debug)]
pub struct LayerReport {
  pub ok: bool,
  pub violations: Vec<LayerViolation>,
  /// Packages no layer glob matched (strict: these fail verification)
  pub unassigned: Vec<String>,
}

/// Directed graph over packages with layer assignments. Built fresh per
/// verification run; not persisted.
pub struct LayerGraph<'a> {
  graph: DiGraph<&'a Package, ()>,
  layer_of: HashMap<&'a str, &'a str>,
  layers: &'a [LayerConfig],
}

impl<'a> LayerGraph<'a> {
  /// Build the layer graph from the repository graph and layer config
  pub fn build(repo: &'a RepoGraph, layers: &'a [LayerConfig]) -> Self {
    let mut graph = DiGraph::new();
    let mut node_of: HashMap<&str, NodeIndex> = HashMap::new();
    let mut layer_of: HashMap<&str, &str> = HashMap::new();

    for package in repo.packages() {
      let idx = graph.add_node(package);
      node_of.insert(package.name.as_str(), idx);

      // First matching layer wins
      for layer in layers {
        if layer.packages.iter().any(|glob| glob_match(glob, &package.name)) {
          layer_of.insert(package.name.as_str(), layer.name.as_str());
          break;
        }
      }
    }

    // One edge per (from, to) pair, regardless of how many declaration kinds repeat it
    let mut seen_edges: HashSet<(NodeIndex, NodeIndex)> = HashSet::new();
    for package in repo.packages() {
      let from = node_of[package.name.as_str()];
      for dep in package.combined_dependencies() {
        if let Some(&to) = node_of.get(dep.name.as_str()) {
          if from != to && seen_edges.insert((from, to)) {
            graph.add_edge(from, to, ());
          }
        }
      }
    }

    Self { graph, layer_of, layers }
  }

  fn layer_config(&self, name: &str) -> Option<&LayerConfig> {
    self.layers.iter().find(|l| l.name == name)
  }

  fn allowed(&self, from_layer: &str, to_layer: &str) -> bool {
    if from_layer == to_layer {
      return true;
    }
    self
      .layer_config(from_layer)
      .is_some_and(|layer| layer.may_depend_on.iter().any(|l| l == to_layer))
  }

  /// Verify every edge and every cycle
  pub fn verify(&self) -> LayerReport {
    let mut violations = Vec::new();

    let mut unassigned: Vec<String> = self
      .graph
      .node_indices()
      .filter_map(|idx| {
        let package = self.graph[idx];
        if self.layer_of.contains_key(package.name.as_str()) {
          None
        } else {
          Some(package.name.clone())
        }
      })
      .collect();
    unassigned.sort();

    for edge in self.graph.edge_indices() {
      let Some((from, to)) = self.graph.edge_endpoints(edge) else {
        continue;
      };
      let from_package = self.graph[from];
      let to_package = self.graph[to];
      let (Some(&from_layer), Some(&to_layer)) = (
        self.layer_of.get(from_package.name.as_str()),
        self.layer_of.get(to_package.name.as_str()),
      ) else {
        continue;
      };

      if !self.allowed(from_layer, to_layer) {
        violations.push(LayerViolation::Edge {
          from_package: from_package.name.clone(),
          from_layer: from_layer.to_string(),
          to_package: to_package.name.clone(),
          to_layer: to_layer.to_string(),
        });
      }
    }

    // Strongly connected components of size > 1 are cycles
    for component in algo::tarjan_scc(&self.graph) {
      if component.len() < 2 {
        continue;
      }

      let mut packages: Vec<String> = component.iter().map(|&idx| self.graph[idx].name.clone()).collect();
      packages.sort();
      let layer_set: BTreeSet<&str> = component
        .iter()
        .filter_map(|&idx| self.layer_of.get(self.graph[idx].name.as_str()).copied())
        .collect();
      let layers: Vec<String> = layer_set.iter().map(|s| s.to_string()).collect();

      let intra_allowed = layer_set.len() == 1
        && layer_set
          .first()
          .and_then(|name| self.layer_config(name))
          .is_some_and(|layer| layer.allow_intra_cycles);

      if !intra_allowed {
        violations.push(LayerViolation::Cycle { packages, layers });
      }
    }

    LayerReport {
      ok: violations.is_empty() && unassigned.is_empty(),
      violations,
      unassigned,
    }
  }

  /// Export to DOT format (Graphviz), packages labeled with their layer
  pub fn to_dot(&self) -> String {
    use petgraph::dot::{Config, Dot};

    let node_attr = |_: &_, (_idx, package): (_, &&Package)| {
      let layer = self.layer_of.get(package.name.as_str()).copied().unwrap_or("?");
      format!("label=\"{}\\n[{}]\" shape=box", package.name, layer)
    };
    let dot = Dot::with_attr_getters(
      &self.graph,
      &[Config::EdgeNoLabel, Config::NodeNoLabel],
      &|_, _| String::new(),
      &node_attr,
    );

    format!("{:?}", dot)
  }

  /// Human-readable report: packages grouped by layer
  pub fn describe(&self) -> String {
    let mut out = String::new();

    for layer in self.layers {
      let mut members: Vec<&str> = self
        .layer_of
        .iter()
        .filter(|(_, l)| **l == layer.name)
        .map(|(p, _)| *p)
        .collect();
      members.sort_unstable();

      out.push_str(&format!("Layer '{}' ({} packages)\n", layer.name, members.len()));
      if !layer.may_depend_on.is_empty() {
        out.push_str(&format!("  may depend on: {}\n", layer.may_depend_on.join(", ")));
      }
      for member in members {
        out.push_str(&format!("  - {}\n", member));
      }
      out.push('\n');
    }

    out
  }
}
