//! Release orchestrator: dispatch handlers until a terminal state
//!
//! The loop is strictly sequential: current state, run its handler, feed the
//! returned action back into the machine. Handlers return exactly one Action.
//! Failed preflight checks route to remediation prompt states through the
//! transition table rather than aborting the loop; only an undefined
//! transition or an internal error breaks out early.

use crate::checks::policy::{default_handlers, run_policy, PolicyOptions};
use crate::checks::ranges;
use crate::core::error::{print_error, RelError, RelResult, ValidationError};
use crate::core::pm::PackageManager;
use crate::core::vcs::SystemGit;
use crate::graph::repo_graph::{Package, RepoGraph};
use crate::release::machine::{Action, MachineState, StateMachine, TransitionTable};
use crate::release::prompt::Prompter;
use crate::version::{bump_release_group, BumpKind, VersionTarget};
use std::collections::HashSet;

/// Mutable bag threaded through one release run
pub struct HandlerContext {
  pub release_group: String,
  /// Chosen at AskReleaseType unless preset by --bump
  pub bump: Option<BumpKind>,
  /// Set by DoReleaseGroupBump
  pub new_version: Option<semver::Version>,
  pub skip_checks: bool,
  pub auto_commit: bool,
  pub install: bool,
}

impl HandlerContext {
  pub fn new(release_group: impl Into<String>) -> Self {
    Self {
      release_group: release_group.into(),
      bump: None,
      new_version: None,
      skip_checks: false,
      auto_commit: false,
      install: false,
    }
  }
}

pub struct Orchestrator<'a> {
  graph: &'a mut RepoGraph,
  git: &'a SystemGit,
  pm: &'a dyn PackageManager,
  prompter: &'a mut dyn Prompter,
  machine: StateMachine,
  ctx: HandlerContext,
}

/// States the dispatcher knows how to run
fn handled_states() -> HashSet<MachineState> {
  MachineState::ALL.into_iter().filter(|s| !s.is_terminal()).collect()
}

impl<'a> Orchestrator<'a> {
  /// Build an orchestrator over the release workflow table.
  ///
  /// The table is validated against the dispatcher before anything runs.
  pub fn new(
    graph: &'a mut RepoGraph,
    git: &'a SystemGit,
    pm: &'a dyn PackageManager,
    prompter: &'a mut dyn Prompter,
    ctx: HandlerContext,
  ) -> RelResult<Self> {
    let table = TransitionTable::release_workflow();
    table.validate(&handled_states())?;

    Ok(Self {
      graph,
      git,
      pm,
      prompter,
      machine: StateMachine::new(table),
      ctx,
    })
  }

  /// Run to a terminal state and report it
  pub fn run(&mut self) -> RelResult<MachineState> {
    loop {
      let state = self.machine.current();
      if state.is_terminal() {
        self.announce(state);
        return Ok(state);
      }

      let action = self.dispatch(state)?;
      self.machine.apply(action)?;
    }
  }

  /// Test mode: force one state and dispatch it in isolation
  pub fn run_single(&mut self, state: MachineState) -> RelResult<Action> {
    if state.is_terminal() {
      self.announce(state);
      return Ok(Action::Success);
    }
    self.machine.force_state(state);
    let action = self.dispatch(state)?;
    println!("State {} returned {}", state, action);
    Ok(action)
  }

  fn dispatch(&mut self, state: MachineState) -> RelResult<Action> {
    match state {
      MachineState::Init => self.handle_init(),
      MachineState::CheckValidReleaseGroup => self.handle_check_valid_release_group(),
      MachineState::CheckPolicy => self.handle_check_policy(),
      MachineState::CheckHasRemote => self.handle_check_has_remote(),
      MachineState::CheckBranchUpToDate => self.handle_check_branch_up_to_date(),
      MachineState::AskReleaseType => self.handle_ask_release_type(),
      MachineState::CheckOnReleaseBranch => self.handle_check_on_release_branch(),
      MachineState::CheckOnIntegrationBranch => self.handle_check_on_integration_branch(),
      MachineState::CheckNoPrereleaseDependencies => self.handle_check_no_prerelease_dependencies(),
      MachineState::DoReleaseGroupBump => self.handle_do_release_group_bump(),
      MachineState::CheckShouldCommitBump => self.handle_check_should_commit_bump(),
      MachineState::DoBumpCommit => self.handle_do_bump_commit(),
      terminal => Err(RelError::Validation(ValidationError::State {
        message: format!("no handler for terminal state '{}'", terminal),
      })),
    }
  }

  fn members(&self) -> RelResult<Vec<&Package>> {
    let group = self.graph.require_release_group(&self.ctx.release_group)?;
    Ok(group.members.iter().filter_map(|m| self.graph.package(m)).collect())
  }

  fn handle_init(&mut self) -> RelResult<Action> {
    println!("🚀 Releasing group '{}'", self.ctx.release_group);
    Ok(Action::Success)
  }

  fn handle_check_valid_release_group(&mut self) -> RelResult<Action> {
    match self.graph.release_group(&self.ctx.release_group) {
      Some(group) => {
        println!(
          "   {} packages at version {}",
          group.members.len(),
          group.version
        );
        Ok(Action::Success)
      }
      None => {
        eprintln!("❌ Unknown release group '{}'", self.ctx.release_group);
        Ok(Action::Failure)
      }
    }
  }

  fn handle_check_policy(&mut self) -> RelResult<Action> {
    if self.ctx.skip_checks {
      println!("⏭️  Skipping policy checks");
      return Ok(Action::Success);
    }

    // Repository-wide: a violation anywhere blocks the release
    let packages: Vec<&Package> = self.graph.packages().iter().collect();

    let flagged = ranges::check_ranges(&packages);
    for (package, deps) in &flagged {
      eprintln!("❌ {}: caret/tilde range on prerelease version: {}", package, deps.join(", "));
    }

    let handlers = default_handlers();
    let options = PolicyOptions {
      exclude_handlers: self.graph.config().policy.exclude_handlers.clone(),
      ..Default::default()
    };
    let report = run_policy(&packages, &handlers, &options)?;
    for failure in &report.failures {
      eprintln!("❌ {} [{}]: {}", failure.package, failure.handler, failure.message);
    }

    if flagged.is_empty() && report.remaining() == 0 {
      println!("✅ Policy checks passed");
      Ok(Action::Success)
    } else {
      Ok(Action::Failure)
    }
  }

  fn handle_check_has_remote(&mut self) -> RelResult<Action> {
    let upstream = self.graph.config().branches.upstream_url.clone();
    if upstream.is_empty() {
      return Ok(Action::Success);
    }
    match self.git.remote(&upstream)? {
      Some(remote) => {
        println!("   Upstream remote: {}", remote);
        Ok(Action::Success)
      }
      None => {
        eprintln!("❌ No git remote matching '{}'", upstream);
        Ok(Action::Failure)
      }
    }
  }

  fn handle_check_branch_up_to_date(&mut self) -> RelResult<Action> {
    if self.ctx.skip_checks {
      return Ok(Action::Success);
    }
    let upstream = self.graph.config().branches.upstream_url.clone();
    if upstream.is_empty() {
      return Ok(Action::Success);
    }
    let Some(remote) = self.git.remote(&upstream)? else {
      return Ok(Action::Failure);
    };

    let branch = self.git.current_branch()?;
    if self.git.is_branch_up_to_date(&branch, &remote)? {
      Ok(Action::Success)
    } else {
      eprintln!("❌ Branch '{}' is behind '{}/{}'", branch, remote, branch);
      Ok(Action::Failure)
    }
  }

  fn handle_ask_release_type(&mut self) -> RelResult<Action> {
    let bump = match self.ctx.bump {
      Some(bump) => bump,
      None => self.prompter.choose_bump()?,
    };
    self.ctx.bump = Some(bump);

    Ok(match bump {
      BumpKind::Patch => Action::Patch,
      BumpKind::Minor => Action::Minor,
      BumpKind::Major => Action::Major,
    })
  }

  fn handle_check_on_release_branch(&mut self) -> RelResult<Action> {
    let prefix = self.graph.config().branches.release_prefix.clone();
    let branch = self.git.current_branch()?;
    if branch.starts_with(&prefix) {
      Ok(Action::Success)
    } else {
      eprintln!("❌ Patch releases run from a '{}*' branch (currently on '{}')", prefix, branch);
      Ok(Action::Failure)
    }
  }

  fn handle_check_on_integration_branch(&mut self) -> RelResult<Action> {
    let branches = self.graph.config().branches.integration_branches.clone();
    let branch = self.git.current_branch()?;
    if branches.iter().any(|b| b == &branch) {
      Ok(Action::Success)
    } else {
      eprintln!(
        "❌ Minor/major releases run from one of [{}] (currently on '{}')",
        branches.join(", "),
        branch
      );
      Ok(Action::Failure)
    }
  }

  fn handle_check_no_prerelease_dependencies(&mut self) -> RelResult<Action> {
    let group = self.graph.require_release_group(&self.ctx.release_group)?;
    let member_set: HashSet<&str> = group.members.iter().map(String::as_str).collect();
    let members = self.members()?;

    // Intra-group dependencies are bumped together and do not block
    let offenders: Vec<(String, String, String)> = ranges::prerelease_dependencies(&members)
      .into_iter()
      .filter(|(_, dep, _)| !member_set.contains(dep.as_str()))
      .collect();

    if offenders.is_empty() {
      return Ok(Action::Success);
    }

    for (package, dep, range) in &offenders {
      eprintln!("❌ {} depends on prerelease {} ({})", package, dep, range);
    }
    Ok(Action::Failure)
  }

  fn handle_do_release_group_bump(&mut self) -> RelResult<Action> {
    let Some(bump) = self.ctx.bump else {
      return Err(RelError::Validation(ValidationError::State {
        message: "DoReleaseGroupBump entered before a release type was chosen".to_string(),
      }));
    };

    let workspace_dir = {
      let group = self.graph.require_release_group(&self.ctx.release_group)?;
      self.graph.workspace(&group.workspace).map(|w| w.directory.clone())
    };

    let outcome = match bump_release_group(self.graph, &self.ctx.release_group, &VersionTarget::Bump(bump)) {
      Ok(outcome) => outcome,
      Err(err) => {
        print_error(&err);
        return Ok(Action::Failure);
      }
    };

    println!(
      "📦 Bumped '{}' {} -> {} ({} manifests)",
      self.ctx.release_group,
      outcome.previous,
      outcome.new_version,
      outcome.packages.len()
    );

    if self.ctx.install {
      if let Some(dir) = workspace_dir {
        if let Err(err) = self.pm.install(&dir, true) {
          print_error(&err);
          return Ok(Action::Failure);
        }
      }
    }

    // Manifests changed on disk; the graph must be rebuilt before anything
    // else reads it
    self.graph.reload()?;
    self.ctx.new_version = Some(outcome.new_version);
    Ok(Action::Success)
  }

  fn handle_check_should_commit_bump(&mut self) -> RelResult<Action> {
    if self.ctx.auto_commit {
      return Ok(Action::Success);
    }
    if self.prompter.confirm("Commit the version bump?")? {
      Ok(Action::Success)
    } else {
      Ok(Action::Failure)
    }
  }

  fn handle_do_bump_commit(&mut self) -> RelResult<Action> {
    let Some(version) = self.ctx.new_version.clone() else {
      return Err(RelError::Validation(ValidationError::State {
        message: "DoBumpCommit entered before the bump ran".to_string(),
      }));
    };

    let branch = format!("bump/{}-{}", self.ctx.release_group, version);
    if let Err(err) = self
      .git
      .create_branch(&branch)
      .and_then(|_| self.git.commit(&format!("Bump {} to {}", self.ctx.release_group, version)))
    {
      print_error(&err);
      return Ok(Action::Failure);
    }

    println!("✅ Committed bump on branch '{}'", branch);
    Ok(Action::Success)
  }

  fn announce(&self, state: MachineState) {
    let branches = &self.graph.config().branches;
    match state {
      MachineState::PromptToPRBump => {
        println!("\n✅ Release bump complete.");
        if let Some(version) = &self.ctx.new_version {
          println!(
            "💡 Push the branch and open a PR for the {} {} bump.",
            self.ctx.release_group, version
          );
        }
      }
      MachineState::PromptToPullBranch => {
        println!("\n💡 Your branch is behind its upstream. Pull first:");
        println!("   git pull");
      }
      MachineState::PromptToSwitchToReleaseBranch => {
        println!(
          "\n💡 Patch releases run from a release branch. Switch to a '{}*' branch and re-run.",
          branches.release_prefix
        );
      }
      MachineState::PromptToSwitchToIntegrationBranch => {
        println!(
          "\n💡 Minor/major releases run from an integration branch. Switch to one of [{}] and re-run.",
          branches.integration_branches.join(", ")
        );
      }
      MachineState::PromptToReleaseDeps => {
        println!("\n💡 Release the prerelease dependencies listed above first, then re-run.");
      }
      MachineState::PromptToCommitBump => {
        println!("\n💡 Bump not committed. Manifests are modified in the working tree; commit them yourself:");
        println!("   git add -A && git commit -m \"Bump {}\"", self.ctx.release_group);
      }
      MachineState::Failed => {
        eprintln!("\n❌ Release failed.");
      }
      _ => {}
    }
  }
}
