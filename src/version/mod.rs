//! Version engine: compute and apply coordinated version changes

pub mod bump;

pub use bump::{bump_packages, bump_release_group, set_dependency_range, BumpKind, BumpOutcome, VersionTarget};
