//! The seam between graph scheduling and actual process invocation.
//!
//! The engine resolves every template before a unit runs; a
//! [`WorkUnitRunner`] only ever sees a fully resolved command. Production
//! uses [`ProcessRunner`]; tests substitute doubles that record invocations
//! or inject failures.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use crate::error::EngineError;

/// A fully resolved command line for one work unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
  pub program: String,
  pub args: Vec<String>,
}

impl ResolvedCommand {
  pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
    Self {
      program: program.into(),
      args,
    }
  }

  /// The command joined into a single shell-style string.
  ///
  /// This is the literal string reported back for each unit; stage C's
  /// in-process result is exactly this value.
  pub fn command_line(&self) -> String {
    let mut line = self.program.clone();
    for arg in &self.args {
      line.push(' ');
      line.push_str(arg);
    }
    line
  }
}

/// Executes one work unit's resolved command.
#[async_trait]
pub trait WorkUnitRunner: Send + Sync {
  /// Run the command to completion. A nonzero exit status is an error.
  async fn run(&self, unit: &str, command: &ResolvedCommand) -> Result<(), EngineError>;
}

/// Spawns the command as a child OS process and waits for it to exit.
///
/// Stdio is inherited, so the external tools write their own console
/// output directly.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

#[async_trait]
impl WorkUnitRunner for ProcessRunner {
  async fn run(&self, unit: &str, command: &ResolvedCommand) -> Result<(), EngineError> {
    info!(unit, command = %command.command_line(), "spawning work unit");

    let status = Command::new(&command.program)
      .args(&command.args)
      .status()
      .await
      .map_err(|source| EngineError::Spawn {
        unit: unit.to_string(),
        program: command.program.clone(),
        source,
      })?;

    if !status.success() {
      return Err(EngineError::UnitFailed {
        unit: unit.to_string(),
        status: status.to_string(),
      });
    }

    Ok(())
  }
}
