//! Engine errors.

use mindboggle123_workflow::WorkflowError;

/// Errors that can occur while configuring or running the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
  /// Unrecognized `--plugin` value.
  #[error("unknown execution plugin '{0}', expected 'serial' or 'multiproc'")]
  UnknownPlugin(String),

  /// `--plugin_args` text did not match the options schema.
  #[error("invalid plugin options: {message}")]
  InvalidPluginOptions { message: String },

  /// The workflow failed structural validation.
  #[error("invalid workflow: {0}")]
  InvalidWorkflow(#[from] WorkflowError),

  /// A template binding could not be resolved.
  #[error("failed to resolve {field} for unit '{unit}': {message}")]
  Binding {
    unit: String,
    field: String,
    message: String,
  },

  /// The unit's executable could not be spawned.
  #[error("failed to spawn '{program}' for unit '{unit}'")]
  Spawn {
    unit: String,
    program: String,
    #[source]
    source: std::io::Error,
  },

  /// The unit's process exited with a nonzero status.
  #[error("unit '{unit}' exited with {status}")]
  UnitFailed { unit: String, status: String },

  /// Rerun-cache bookkeeping failed.
  #[error("cache bookkeeping failed for unit '{unit}'")]
  Cache {
    unit: String,
    #[source]
    source: std::io::Error,
  },

  /// A unit would rerun while `stop_on_first_rerun` is set.
  #[error("unit '{unit}' needs a rerun but stop_on_first_rerun is set")]
  RerunRequired { unit: String },

  /// Execution was cancelled.
  #[error("execution cancelled")]
  Cancelled,
}
