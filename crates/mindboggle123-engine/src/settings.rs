//! Engine selection and plugin options.
//!
//! Settings form an explicit value passed into the run call; the engine
//! never reads scheduling configuration from ambient process state.
//! Plugin options arrive as JSON text on the command line and are
//! deserialized against a strict schema - configuration is data, never code.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// The pluggable scheduler used to run work units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Plugin {
  /// One work unit at a time, in dependency order.
  #[default]
  Serial,
  /// Independent work units run as concurrent OS processes.
  MultiProc,
}

impl FromStr for Plugin {
  type Err = EngineError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      // "linear" is the historical name for the serial scheduler
      "serial" | "linear" => Ok(Plugin::Serial),
      "multiproc" => Ok(Plugin::MultiProc),
      other => Err(EngineError::UnknownPlugin(other.to_string())),
    }
  }
}

/// How rerun-cache keys are derived from a unit's input files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashMethod {
  /// Stat-based: modification time plus length.
  #[default]
  Timestamp,
  /// Digest of the file contents.
  Content,
}

/// Engine-specific options, supplied as strict JSON via `--plugin_args`.
///
/// Unknown fields are rejected so a typo fails at startup instead of being
/// silently ignored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PluginOptions {
  /// Concurrency cap for the multiproc plugin. Unset means "as many as
  /// are ready".
  pub n_procs: Option<usize>,
  /// Cache-key derivation for rerun detection.
  pub hash_method: HashMethod,
  /// Debug-only strict mode: abort instead of re-running a stale unit.
  pub stop_on_first_rerun: bool,
}

impl PluginOptions {
  /// Deserialize options from the `--plugin_args` text.
  ///
  /// Malformed text is fatal at startup, before any unit is scheduled.
  pub fn from_json(text: &str) -> Result<Self, EngineError> {
    serde_json::from_str(text).map_err(|e| EngineError::InvalidPluginOptions {
      message: e.to_string(),
    })
  }
}

/// Everything the engine needs to know about how to schedule a run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineSettings {
  pub plugin: Plugin,
  pub options: PluginOptions,
}
