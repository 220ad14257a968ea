//! Core building blocks for relman
//!
//! - **config**: repo layout configuration (relman.toml) parsing and validation
//! - **context**: unified repo context shared across commands
//! - **error**: error taxonomy with contextual help and exit codes
//! - **pm**: package-manager collaborator (install, list-installed)
//! - **vcs**: git operations abstraction (SystemGit)

pub mod config;
pub mod context;
pub mod error;
pub mod pm;
pub mod vcs;
