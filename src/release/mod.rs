//! Release workflow: state machine, handlers, prompting

pub mod handlers;
pub mod machine;
pub mod prompt;

pub use handlers::{HandlerContext, Orchestrator};
pub use machine::{Action, MachineState, StateMachine, TransitionTable};
pub use prompt::{ConsolePrompter, Prompter, ScriptedPrompter};
