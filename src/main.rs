mod checks;
mod commands;
mod core;
mod graph;
mod release;
mod utils;
mod version;

use clap::{Parser, Subcommand};
use crate::core::context::RepoContext;
use crate::core::error::{print_error, RelError};
use graph::selection::PackageFilter;
use std::path::PathBuf;

/// Release automation for multi-package repositories
#[derive(Parser)]
#[command(name = "relman")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct RelmanCli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Static checks: policy, layers, dependency ranges
  #[command(subcommand)]
  Check(CheckCommands),

  /// List packages resolved by selection criteria and filters
  List {
    /// Select all members of a release group (repeatable)
    #[arg(short = 'g', long = "release-group")]
    release_groups: Vec<String>,
    /// Select a release group's root package (repeatable)
    #[arg(long = "release-group-root")]
    release_group_roots: Vec<String>,
    /// Select all packages of a workspace (repeatable)
    #[arg(short = 'w', long = "workspace")]
    workspaces: Vec<String>,
    /// Select the release-group roots within a workspace (repeatable)
    #[arg(long = "workspace-root")]
    workspace_roots: Vec<String>,
    /// Select the single package at this directory (overrides other criteria)
    #[arg(long)]
    dir: Option<PathBuf>,
    /// Select packages changed since a git ref
    #[arg(long)]
    since: Option<String>,
    /// Partial remote URL the ref is resolved against (with --since)
    #[arg(long, requires = "since")]
    remote: Option<String>,
    /// Keep only private packages
    #[arg(long, conflicts_with = "public")]
    private: bool,
    /// Keep only public packages
    #[arg(long)]
    public: bool,
    /// Keep only packages in this registry scope (repeatable)
    #[arg(long = "scope")]
    scopes: Vec<String>,
    /// Remove packages in this registry scope (repeatable)
    #[arg(long = "exclude-scope")]
    exclude_scopes: Vec<String>,
    /// List what the package manager has installed instead of the graph
    #[arg(long, conflicts_with_all = ["release_groups", "workspaces", "dir", "since"])]
    installed: bool,
    /// List release groups per workspace instead of packages
    #[arg(long, conflicts_with_all = ["release_groups", "workspaces", "dir", "since", "installed"])]
    groups: bool,
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Show files, packages and release groups changed since a git ref
  Changed {
    /// Git ref to compare against
    #[arg(long, default_value = "main")]
    since: String,
    /// Partial remote URL the ref is resolved against
    #[arg(long)]
    remote: Option<String>,
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Bump versions directly, outside the release workflow
  Bump {
    /// Release group to bump as one unit
    #[arg(short, long, conflicts_with = "packages")]
    group: Option<String>,
    /// Ungrouped package to bump independently (repeatable)
    #[arg(short = 'p', long = "package")]
    packages: Vec<String>,
    /// Release type: patch, minor or major
    #[arg(long, conflicts_with = "to")]
    bump: Option<String>,
    /// Explicit target version
    #[arg(long)]
    to: Option<String>,
  },

  /// Rewrite dependency ranges on a release group across the repository
  BumpDeps {
    /// Release group whose members are the dependency targets
    #[arg(short, long)]
    group: String,
    /// New range to write (e.g. "^2.0.0")
    #[arg(long)]
    range: String,
  },

  /// Run the release workflow for a release group
  Release {
    /// Name of the release group to release
    #[arg(short, long)]
    group: String,
    /// Release type: patch, minor or major (prompted when omitted)
    #[arg(long)]
    bump: Option<String>,
    /// Skip policy and branch-freshness checks
    #[arg(long)]
    skip_checks: bool,
    /// Commit the bump without prompting
    #[arg(long)]
    commit: bool,
    /// Re-run the package-manager install after the bump
    #[arg(long)]
    install: bool,
    /// Dispatch a single state in isolation (requires --state)
    #[arg(long)]
    test_mode: bool,
    /// State name for --test-mode
    #[arg(long, requires = "test_mode")]
    state: Option<String>,
  },
}

#[derive(Subcommand)]
enum CheckCommands {
  /// Run repo-policy handlers over every manifest
  Policy {
    /// Rewrite manifests where a handler knows how
    #[arg(long)]
    fix: bool,
    /// Run only the named handler
    #[arg(long)]
    handler: Option<String>,
    /// Run only over manifest paths matching this regex
    #[arg(long)]
    path: Option<String>,
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Verify architectural layering of package dependencies
  Layers {
    /// Write a human-readable layer report to this file
    #[arg(long)]
    report: Option<PathBuf>,
    /// Write the dependency graph in DOT format to this file
    #[arg(long)]
    dot: Option<PathBuf>,
  },

  /// Check dependency-range hygiene (exit 100 on violation)
  Ranges {
    /// Output results in JSON format
    #[arg(long)]
    json: bool,
  },
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn main() {
  let cli = RelmanCli::parse();

  let repo_root = match std::env::current_dir() {
    Ok(dir) => dir,
    Err(e) => {
      eprintln!("Error: Failed to get current directory: {}", e);
      std::process::exit(1);
    }
  };

  // Build the repo context once: config + graph, shared by every command
  let mut ctx = match RepoContext::build(&repo_root) {
    Ok(ctx) => ctx,
    Err(e) => handle_error(e),
  };

  let result = match cli.command {
    Commands::Check(check) => match check {
      CheckCommands::Policy {
        fix,
        handler,
        path,
        json,
      } => commands::run_check_policy(&ctx, fix, handler, path, json),
      CheckCommands::Layers { report, dot } => commands::run_check_layers(&ctx, report, dot),
      CheckCommands::Ranges { json } => commands::run_check_ranges(&ctx, json),
    },

    Commands::List {
      release_groups,
      release_group_roots,
      workspaces,
      workspace_roots,
      dir,
      since,
      remote,
      private,
      public,
      scopes,
      exclude_scopes,
      installed,
      groups,
      json,
    } => {
      if groups {
        commands::run_list_groups(&ctx, json)
      } else if installed {
        commands::run_list_installed(&ctx, json)
      } else {
        let criteria = commands::build_criteria(
          release_groups,
          release_group_roots,
          workspaces,
          workspace_roots,
          dir,
          since,
          remote,
        );
        let filter = PackageFilter {
          private: if private {
            Some(true)
          } else if public {
            Some(false)
          } else {
            None
          },
          include_scopes: if scopes.is_empty() { None } else { Some(scopes) },
          exclude_scopes,
        };
        commands::run_list(&ctx, criteria, filter, json)
      }
    }

    Commands::Changed { since, remote, json } => commands::run_changed(&ctx, since, remote, json),

    Commands::Bump {
      group,
      packages,
      bump,
      to,
    } => commands::run_bump(&mut ctx, group, packages, bump, to),

    Commands::BumpDeps { group, range } => commands::run_bump_deps(&mut ctx, group, range),

    Commands::Release {
      group,
      bump,
      skip_checks,
      commit,
      install,
      test_mode,
      state,
    } => commands::run_release(&mut ctx, group, bump, skip_checks, commit, install, test_mode, state),
  };

  if let Err(e) = result {
    handle_error(e);
  }
}

fn handle_error(error: RelError) -> ! {
  print_error(&error);
  std::process::exit(error.exit_code().as_i32());
}
