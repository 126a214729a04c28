//! Execution events and notifiers for observability.
//!
//! Events are emitted during a pipeline run so consumers can observe
//! progress - persist it, stream it, or assert on ordering in tests.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted during pipeline execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExecutionEvent {
  /// The pipeline run has started.
  PipelineStarted {
    execution_id: String,
    workflow: String,
  },

  /// A work unit's process is about to be spawned.
  UnitStarted {
    execution_id: String,
    unit: String,
    command: String,
  },

  /// A work unit completed successfully (possibly served from the
  /// rerun cache without spawning).
  UnitCompleted {
    execution_id: String,
    unit: String,
    command: String,
    cached: bool,
  },

  /// A work unit failed.
  UnitFailed {
    execution_id: String,
    unit: String,
    error: String,
  },

  /// A work unit was never started because an upstream unit failed.
  UnitBlocked {
    execution_id: String,
    unit: String,
    upstream: String,
  },

  /// Every work unit reached a successful terminal state.
  PipelineCompleted { execution_id: String },

  /// At least one work unit failed.
  PipelineFailed {
    execution_id: String,
    failed: Vec<String>,
  },
}

/// Trait for receiving execution events.
///
/// The engine calls `notify` for each event - implementations decide
/// what to do with them (persist, broadcast, log, ignore, etc.).
pub trait ExecutionNotifier: Send + Sync {
  /// Called when an execution event occurs.
  fn notify(&self, event: ExecutionEvent);
}

/// A no-op notifier that discards all events.
///
/// Useful when event observation is not needed.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {
    // Intentionally empty
  }
}

/// A notifier that sends events to an unbounded channel.
///
/// Use this when events need to be consumed asynchronously. The volume is
/// low (a handful per unit), so unbounded buffering is not a concern.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  /// Create a new channel notifier.
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Ignore send errors - receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
