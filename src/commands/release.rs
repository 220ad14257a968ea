//! `relman release` - drive the release state machine
//!
//! Interactive by default; `--bump` and `--commit` answer the two prompts up
//! front, which is how CI runs it. `--test-mode --state NAME` dispatches one
//! state in isolation and reports the action it returned.

use crate::core::context::RepoContext;
use crate::core::error::{RelError, RelResult};
use crate::core::pm::NpmCli;
use crate::core::vcs::SystemGit;
use crate::release::machine::MachineState;
use crate::release::{ConsolePrompter, HandlerContext, Orchestrator};
use crate::version::BumpKind;

#[allow(clippy::too_many_arguments)]
pub fn run_release(
  ctx: &mut RepoContext,
  group: String,
  bump: Option<String>,
  skip_checks: bool,
  commit: bool,
  install: bool,
  test_mode: bool,
  state: Option<String>,
) -> RelResult<()> {
  let git = SystemGit::open(&ctx.root)?;
  let pm = NpmCli;
  let mut prompter = ConsolePrompter;

  let mut handler_ctx = HandlerContext::new(group);
  handler_ctx.bump = bump.as_deref().map(str::parse::<BumpKind>).transpose()?;
  handler_ctx.skip_checks = skip_checks;
  handler_ctx.auto_commit = commit;
  handler_ctx.install = install;

  let mut orchestrator = Orchestrator::new(&mut ctx.graph, &git, &pm, &mut prompter, handler_ctx)?;

  if test_mode {
    let name = state.ok_or_else(|| RelError::with_help("--test-mode requires --state", "Pass --state NAME, e.g. --state CheckPolicy."))?;
    let target = MachineState::from_name(&name)?;
    orchestrator.run_single(target)?;
    return Ok(());
  }

  let final_state = orchestrator.run()?;
  if final_state.is_success() {
    Ok(())
  } else {
    Err(RelError::message(format!("Release stopped at {}", final_state)))
  }
}
