//! Operator prompting
//!
//! Handlers ask questions through the `Prompter` capability so the
//! orchestrator stays testable: the console implementation reads stdin, the
//! scripted one replays canned answers.

use crate::core::error::{RelError, RelResult};
use crate::version::BumpKind;
use std::collections::VecDeque;
use std::io::{self, Write};

pub trait Prompter {
  /// Yes/no question; default answer is no
  fn confirm(&mut self, question: &str) -> RelResult<bool>;

  /// Pick the release type
  fn choose_bump(&mut self) -> RelResult<BumpKind>;
}

/// Reads answers from stdin
pub struct ConsolePrompter;

impl ConsolePrompter {
  fn read_line(prompt: &str) -> RelResult<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(answer.trim().to_string())
  }
}

impl Prompter for ConsolePrompter {
  fn confirm(&mut self, question: &str) -> RelResult<bool> {
    let answer = Self::read_line(&format!("{} [y/N]: ", question))?;
    Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
  }

  fn choose_bump(&mut self) -> RelResult<BumpKind> {
    let answer = Self::read_line("Release type (patch/minor/major): ")?;
    answer.parse()
  }
}

/// Replays a fixed script; running out of answers is an error
#[derive(Default)]
pub struct ScriptedPrompter {
  confirms: VecDeque<bool>,
  bumps: VecDeque<BumpKind>,
}

impl ScriptedPrompter {
  pub fn new(confirms: Vec<bool>, bumps: Vec<BumpKind>) -> Self {
    Self {
      confirms: confirms.into(),
      bumps: bumps.into(),
    }
  }
}

impl Prompter for ScriptedPrompter {
  fn confirm(&mut self, question: &str) -> RelResult<bool> {
    self
      .confirms
      .pop_front()
      .ok_or_else(|| RelError::message(format!("scripted prompter has no answer for: {}", question)))
  }

  fn choose_bump(&mut self) -> RelResult<BumpKind> {
    self
      .bumps
      .pop_front()
      .ok_or_else(|| RelError::message("scripted prompter has no release type queued"))
  }
}
