//! Release workflow state machine
//!
//! States are data. The transition table is an immutable adjacency map from
//! `(state, action)` to the next state; an undefined pair is an error and
//! leaves the machine where it was. The table is validated against the
//! handler dispatch before a run starts, so a state without a handler or a
//! handler without table entries is caught up front rather than mid-release.

use crate::core::error::{RelError, RelResult, ValidationError};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Every state of the release workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MachineState {
  Init,
  CheckValidReleaseGroup,
  CheckPolicy,
  CheckHasRemote,
  CheckBranchUpToDate,
  AskReleaseType,
  CheckOnReleaseBranch,
  CheckOnIntegrationBranch,
  CheckNoPrereleaseDependencies,
  DoReleaseGroupBump,
  CheckShouldCommitBump,
  DoBumpCommit,
  /// Terminal success: bump is committed, operator opens the PR
  PromptToPRBump,
  /// Terminal: local branch is behind its remote
  PromptToPullBranch,
  /// Terminal: patch releases run from a release branch
  PromptToSwitchToReleaseBranch,
  /// Terminal: minor/major releases run from an integration branch
  PromptToSwitchToIntegrationBranch,
  /// Terminal: prerelease dependencies must be released first
  PromptToReleaseDeps,
  /// Terminal: operator declined the commit; manifests are left modified
  PromptToCommitBump,
  /// Terminal failure
  Failed,
}

impl MachineState {
  pub const ALL: [MachineState; 19] = [
    MachineState::Init,
    MachineState::CheckValidReleaseGroup,
    MachineState::CheckPolicy,
    MachineState::CheckHasRemote,
    MachineState::CheckBranchUpToDate,
    MachineState::AskReleaseType,
    MachineState::CheckOnReleaseBranch,
    MachineState::CheckOnIntegrationBranch,
    MachineState::CheckNoPrereleaseDependencies,
    MachineState::DoReleaseGroupBump,
    MachineState::CheckShouldCommitBump,
    MachineState::DoBumpCommit,
    MachineState::PromptToPRBump,
    MachineState::PromptToPullBranch,
    MachineState::PromptToSwitchToReleaseBranch,
    MachineState::PromptToSwitchToIntegrationBranch,
    MachineState::PromptToReleaseDeps,
    MachineState::PromptToCommitBump,
    MachineState::Failed,
  ];

  pub fn name(self) -> &'static str {
    match self {
      MachineState::Init => "Init",
      MachineState::CheckValidReleaseGroup => "CheckValidReleaseGroup",
      MachineState::CheckPolicy => "CheckPolicy",
      MachineState::CheckHasRemote => "CheckHasRemote",
      MachineState::CheckBranchUpToDate => "CheckBranchUpToDate",
      MachineState::AskReleaseType => "AskReleaseType",
      MachineState::CheckOnReleaseBranch => "CheckOnReleaseBranch",
      MachineState::CheckOnIntegrationBranch => "CheckOnIntegrationBranch",
      MachineState::CheckNoPrereleaseDependencies => "CheckNoPrereleaseDependencies",
      MachineState::DoReleaseGroupBump => "DoReleaseGroupBump",
      MachineState::CheckShouldCommitBump => "CheckShouldCommitBump",
      MachineState::DoBumpCommit => "DoBumpCommit",
      MachineState::PromptToPRBump => "PromptToPRBump",
      MachineState::PromptToPullBranch => "PromptToPullBranch",
      MachineState::PromptToSwitchToReleaseBranch => "PromptToSwitchToReleaseBranch",
      MachineState::PromptToSwitchToIntegrationBranch => "PromptToSwitchToIntegrationBranch",
      MachineState::PromptToReleaseDeps => "PromptToReleaseDeps",
      MachineState::PromptToCommitBump => "PromptToCommitBump",
      MachineState::Failed => "Failed",
    }
  }

  pub fn from_name(name: &str) -> RelResult<Self> {
    Self::ALL
      .into_iter()
      .find(|state| state.name() == name)
      .ok_or_else(|| {
        RelError::Validation(ValidationError::State {
          message: format!("unknown state '{}'", name),
        })
      })
  }

  /// Terminal states end the run; prompt states print operator instructions
  pub fn is_terminal(self) -> bool {
    matches!(
      self,
      MachineState::PromptToPRBump
        | MachineState::PromptToPullBranch
        | MachineState::PromptToSwitchToReleaseBranch
        | MachineState::PromptToSwitchToIntegrationBranch
        | MachineState::PromptToReleaseDeps
        | MachineState::PromptToCommitBump
        | MachineState::Failed
    )
  }

  pub fn is_success(self) -> bool {
    self == MachineState::PromptToPRBump
  }
}

impl fmt::Display for MachineState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.name())
  }
}

/// What a handler reports back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
  Success,
  Failure,
  Patch,
  Minor,
  Major,
}

impl fmt::Display for Action {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Action::Success => "Success",
      Action::Failure => "Failure",
      Action::Patch => "Patch",
      Action::Minor => "Minor",
      Action::Major => "Major",
    };
    write!(f, "{}", name)
  }
}

/// Immutable `(state, action) -> state` adjacency map
pub struct TransitionTable {
  initial: MachineState,
  map: HashMap<(MachineState, Action), MachineState>,
}

impl TransitionTable {
  pub fn new(initial: MachineState) -> Self {
    Self {
      initial,
      map: HashMap::new(),
    }
  }

  pub fn add(mut self, from: MachineState, action: Action, to: MachineState) -> Self {
    self.map.insert((from, action), to);
    self
  }

  pub fn initial(&self) -> MachineState {
    self.initial
  }

  pub fn next(&self, state: MachineState, action: Action) -> Option<MachineState> {
    self.map.get(&(state, action)).copied()
  }

  /// Check the table against the set of states the dispatcher handles:
  /// every handled state must have at least one outgoing transition, and
  /// every non-terminal source state must be handled.
  pub fn validate(&self, handled: &HashSet<MachineState>) -> RelResult<()> {
    for state in handled {
      if !self.map.keys().any(|(from, _)| from == state) {
        return Err(RelError::Validation(ValidationError::State {
          message: format!("state '{}' has a handler but no transitions", state),
        }));
      }
    }

    for (from, _) in self.map.keys() {
      if !from.is_terminal() && !handled.contains(from) {
        return Err(RelError::Validation(ValidationError::State {
          message: format!("state '{}' appears in the table but has no handler", from),
        }));
      }
    }

    if self.initial.is_terminal() {
      return Err(RelError::Validation(ValidationError::State {
        message: format!("initial state '{}' is terminal", self.initial),
      }));
    }

    Ok(())
  }

  /// The release workflow
  pub fn release_workflow() -> Self {
    use Action::{Failure, Major, Minor, Patch, Success};
    use MachineState::*;

    TransitionTable::new(Init)
      .add(Init, Success, CheckValidReleaseGroup)
      .add(Init, Failure, Failed)
      .add(CheckValidReleaseGroup, Success, CheckPolicy)
      .add(CheckValidReleaseGroup, Failure, Failed)
      .add(CheckPolicy, Success, CheckHasRemote)
      .add(CheckPolicy, Failure, Failed)
      .add(CheckHasRemote, Success, CheckBranchUpToDate)
      .add(CheckHasRemote, Failure, Failed)
      .add(CheckBranchUpToDate, Success, AskReleaseType)
      .add(CheckBranchUpToDate, Failure, PromptToPullBranch)
      .add(AskReleaseType, Patch, CheckOnReleaseBranch)
      .add(AskReleaseType, Minor, CheckOnIntegrationBranch)
      .add(AskReleaseType, Major, CheckOnIntegrationBranch)
      .add(AskReleaseType, Failure, Failed)
      .add(CheckOnReleaseBranch, Success, CheckNoPrereleaseDependencies)
      .add(CheckOnReleaseBranch, Failure, PromptToSwitchToReleaseBranch)
      .add(CheckOnIntegrationBranch, Success, CheckNoPrereleaseDependencies)
      .add(CheckOnIntegrationBranch, Failure, PromptToSwitchToIntegrationBranch)
      .add(CheckNoPrereleaseDependencies, Success, DoReleaseGroupBump)
      .add(CheckNoPrereleaseDependencies, Failure, PromptToReleaseDeps)
      .add(DoReleaseGroupBump, Success, CheckShouldCommitBump)
      .add(DoReleaseGroupBump, Failure, Failed)
      .add(CheckShouldCommitBump, Success, DoBumpCommit)
      .add(CheckShouldCommitBump, Failure, PromptToCommitBump)
      .add(DoBumpCommit, Success, PromptToPRBump)
      .add(DoBumpCommit, Failure, Failed)
  }
}

/// The running machine: current state plus the table
pub struct StateMachine {
  table: TransitionTable,
  current: MachineState,
}

impl StateMachine {
  pub fn new(table: TransitionTable) -> Self {
    let current = table.initial();
    Self { table, current }
  }

  pub fn current(&self) -> MachineState {
    self.current
  }

  /// Force the machine into a state (test mode)
  pub fn force_state(&mut self, state: MachineState) {
    self.current = state;
  }

  /// Apply an action. An undefined transition is an error; the current state
  /// does not change.
  pub fn apply(&mut self, action: Action) -> RelResult<MachineState> {
    match self.table.next(self.current, action) {
      Some(next) => {
        self.current = next;
        Ok(next)
      }
      None => Err(RelError::Validation(ValidationError::State {
        message: format!("no transition from '{}' on action '{}'", self.current, action),
      })),
    }
  }
}
