//! Repository graph model: manifests, workspaces, release groups, selection

pub mod changed;
pub mod manifest;
pub mod repo_graph;
pub mod selection;
