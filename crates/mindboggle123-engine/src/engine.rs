//! Pipeline execution.
//!
//! The `Engine` walks the dependency graph and runs every work unit whose
//! upstream units have all succeeded. Batches of ready units share a FIFO
//! semaphore: one permit for the serial plugin, `n_procs` (or the whole
//! batch) for multiproc. A failed unit blocks its transitive downstream
//! units; independent units still run to completion.

use std::collections::HashMap;
use std::path::PathBuf;

use mindboggle123_workflow::{Graph, WorkUnit, Workflow};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::cache::RerunCache;
use crate::error::EngineError;
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};
use crate::resolve::{resolve_argv, resolve_inputs, resolve_outputs};
use crate::runner::{ProcessRunner, ResolvedCommand, WorkUnitRunner};
use crate::settings::{EngineSettings, Plugin};

/// Result of one successfully completed work unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitResult {
  pub unit: String,
  /// The literal command-line string that was (or would have been) spawned.
  pub command: String,
  /// Declared outputs, fully resolved.
  pub outputs: HashMap<String, String>,
  /// True when the unit was served from the rerun cache without spawning.
  pub cached: bool,
}

/// Terminal state of a work unit after a run.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitStatus {
  Succeeded(UnitResult),
  /// The unit ran (or failed to assemble) and did not succeed. The command
  /// string is kept when the failure happened after resolution, so the
  /// invocation stays observable regardless of exit status.
  Failed {
    command: Option<String>,
    error: String,
  },
  /// Never started because an upstream unit did not succeed.
  Blocked { upstream: String },
}

/// Terminal report for a whole pipeline run.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
  pub execution_id: String,
  pub units: HashMap<String, UnitStatus>,
}

impl ExecutionReport {
  /// True when every unit succeeded.
  pub fn is_success(&self) -> bool {
    self
      .units
      .values()
      .all(|status| matches!(status, UnitStatus::Succeeded(_)))
  }

  /// Names of failed units, sorted.
  pub fn failed_units(&self) -> Vec<&str> {
    let mut failed: Vec<&str> = self
      .units
      .iter()
      .filter(|(_, status)| matches!(status, UnitStatus::Failed { .. }))
      .map(|(name, _)| name.as_str())
      .collect();
    failed.sort_unstable();
    failed
  }

  /// The result of a successfully completed unit.
  pub fn result(&self, unit: &str) -> Option<&UnitResult> {
    match self.units.get(unit) {
      Some(UnitStatus::Succeeded(result)) => Some(result),
      _ => None,
    }
  }
}

/// The pipeline execution engine.
///
/// Generic over the runner (swap in a double for tests) and the notifier
/// (observe events without touching the engine). `Engine::new` gives the
/// production pair: process spawning, no-op notifications.
pub struct Engine<R: WorkUnitRunner = ProcessRunner, N: ExecutionNotifier = NoopNotifier> {
  settings: EngineSettings,
  working_dir: PathBuf,
  runner: R,
  notifier: N,
}

impl Engine<ProcessRunner, NoopNotifier> {
  /// Create an engine that spawns real OS processes.
  pub fn new(settings: EngineSettings, working_dir: impl Into<PathBuf>) -> Self {
    Self::with_runner_and_notifier(settings, working_dir, ProcessRunner, NoopNotifier)
  }
}

impl<R: WorkUnitRunner> Engine<R, NoopNotifier> {
  /// Create an engine with a custom runner and no-op notifications.
  pub fn with_runner(settings: EngineSettings, working_dir: impl Into<PathBuf>, runner: R) -> Self {
    Self::with_runner_and_notifier(settings, working_dir, runner, NoopNotifier)
  }
}

impl<R: WorkUnitRunner, N: ExecutionNotifier> Engine<R, N> {
  /// Create an engine with a custom runner and notifier.
  pub fn with_runner_and_notifier(
    settings: EngineSettings,
    working_dir: impl Into<PathBuf>,
    runner: R,
    notifier: N,
  ) -> Self {
    Self {
      settings,
      working_dir: working_dir.into(),
      runner,
      notifier,
    }
  }

  /// Run the workflow to a terminal state.
  ///
  /// Blocks until every unit has succeeded, failed, or been blocked by an
  /// upstream failure. Returns `Err` only for run-level problems (invalid
  /// graph, cancellation, `stop_on_first_rerun`); per-unit failures are
  /// reported through the [`ExecutionReport`].
  pub async fn execute(
    &self,
    workflow: &Workflow,
    cancel: CancellationToken,
  ) -> Result<ExecutionReport, EngineError> {
    workflow.validate()?;

    let execution_id = uuid::Uuid::new_v4().to_string();
    let graph = workflow.graph();
    let cache = RerunCache::new(&self.working_dir, self.settings.options.hash_method);
    let mut statuses: HashMap<String, UnitStatus> = HashMap::new();

    info!(
      execution_id = %execution_id,
      workflow = %workflow.name,
      plugin = ?self.settings.plugin,
      "pipeline_started"
    );
    self.notifier.notify(ExecutionEvent::PipelineStarted {
      execution_id: execution_id.clone(),
      workflow: workflow.name.clone(),
    });

    loop {
      if cancel.is_cancelled() {
        warn!(execution_id = %execution_id, "pipeline cancelled");
        return Err(EngineError::Cancelled);
      }

      let ready = find_ready(workflow, &graph, &statuses);
      if ready.is_empty() {
        break;
      }

      info!(
        execution_id = %execution_id,
        ready_units = ?ready,
        "executing batch of ready units"
      );

      let mut batch = Vec::with_capacity(ready.len());
      for name in ready {
        let unit = workflow
          .get_unit(&name)
          .expect("ready unit is part of the workflow");
        match self.prepare_unit(unit, &graph, &statuses, &cache) {
          Ok(Prepared::Cached(result)) => {
            info!(execution_id = %execution_id, unit = %name, "unit served from rerun cache");
            self.notifier.notify(ExecutionEvent::UnitCompleted {
              execution_id: execution_id.clone(),
              unit: name.clone(),
              command: result.command.clone(),
              cached: true,
            });
            statuses.insert(name, UnitStatus::Succeeded(result));
          }
          Ok(Prepared::Run(prepared)) => batch.push(prepared),
          Err(fatal @ EngineError::RerunRequired { .. }) => return Err(fatal),
          Err(e) => {
            error!(execution_id = %execution_id, unit = %name, error = %e, "unit_failed");
            self.notifier.notify(ExecutionEvent::UnitFailed {
              execution_id: execution_id.clone(),
              unit: name.clone(),
              error: e.to_string(),
            });
            statuses.insert(
              name,
              UnitStatus::Failed {
                command: None,
                error: e.to_string(),
              },
            );
          }
        }
      }

      if batch.is_empty() {
        continue;
      }

      // One permit serializes the batch; multiproc gets n_procs (or the
      // whole batch). The semaphore is FIFO, so serial order is the sorted
      // ready order.
      let permits = match self.settings.plugin {
        Plugin::Serial => 1,
        Plugin::MultiProc => self
          .settings
          .options
          .n_procs
          .unwrap_or(batch.len())
          .max(1),
      };
      let semaphore = Semaphore::new(permits);

      let unit_runs = batch.into_iter().map(|prepared| {
        let semaphore = &semaphore;
        let cache = &cache;
        let execution_id = execution_id.clone();
        async move {
          let _permit = semaphore
            .acquire()
            .await
            .expect("batch semaphore is never closed");

          let command_line = prepared.command.command_line();
          info!(
            execution_id = %execution_id,
            unit = %prepared.name,
            command = %command_line,
            "unit_started"
          );
          self.notifier.notify(ExecutionEvent::UnitStarted {
            execution_id: execution_id.clone(),
            unit: prepared.name.clone(),
            command: command_line,
          });

          cache.invalidate(&prepared.name);
          let outcome = self.runner.run(&prepared.name, &prepared.command).await;
          (prepared, outcome)
        }
      });

      let results = tokio::select! {
        results = futures::future::join_all(unit_runs) => results,
        _ = cancel.cancelled() => {
          warn!(execution_id = %execution_id, "pipeline cancelled during unit execution");
          return Err(EngineError::Cancelled);
        }
      };

      for (prepared, outcome) in results {
        let command_line = prepared.command.command_line();
        match outcome {
          Ok(()) => {
            if let Err(e) = cache.record(&prepared.name, &prepared.key) {
              warn!(unit = %prepared.name, error = %e, "failed to record rerun-cache entry");
            }
            info!(
              execution_id = %execution_id,
              unit = %prepared.name,
              command = %command_line,
              "unit_completed"
            );
            self.notifier.notify(ExecutionEvent::UnitCompleted {
              execution_id: execution_id.clone(),
              unit: prepared.name.clone(),
              command: command_line.clone(),
              cached: false,
            });
            statuses.insert(
              prepared.name.clone(),
              UnitStatus::Succeeded(UnitResult {
                unit: prepared.name,
                command: command_line,
                outputs: prepared.outputs,
                cached: false,
              }),
            );
          }
          Err(e) => {
            error!(
              execution_id = %execution_id,
              unit = %prepared.name,
              error = %e,
              "unit_failed"
            );
            self.notifier.notify(ExecutionEvent::UnitFailed {
              execution_id: execution_id.clone(),
              unit: prepared.name.clone(),
              error: e.to_string(),
            });
            statuses.insert(
              prepared.name,
              UnitStatus::Failed {
                command: Some(command_line),
                error: e.to_string(),
              },
            );
          }
        }
      }
    }

    // Whatever never reached a terminal state is downstream of a failure.
    for name in graph.topological_order()? {
      if statuses.contains_key(&name) {
        continue;
      }
      let upstream = graph
        .upstream(&name)
        .iter()
        .find(|u| {
          matches!(
            statuses.get(*u),
            Some(UnitStatus::Failed { .. }) | Some(UnitStatus::Blocked { .. })
          )
        })
        .cloned()
        .unwrap_or_default();
      warn!(
        execution_id = %execution_id,
        unit = %name,
        upstream = %upstream,
        "unit_blocked"
      );
      self.notifier.notify(ExecutionEvent::UnitBlocked {
        execution_id: execution_id.clone(),
        unit: name.clone(),
        upstream: upstream.clone(),
      });
      statuses.insert(name, UnitStatus::Blocked { upstream });
    }

    let report = ExecutionReport {
      execution_id: execution_id.clone(),
      units: statuses,
    };
    let failed: Vec<String> = report
      .failed_units()
      .into_iter()
      .map(str::to_string)
      .collect();
    if failed.is_empty() {
      info!(execution_id = %execution_id, "pipeline_completed");
      self
        .notifier
        .notify(ExecutionEvent::PipelineCompleted { execution_id });
    } else {
      error!(execution_id = %execution_id, failed = ?failed, "pipeline_failed");
      self.notifier.notify(ExecutionEvent::PipelineFailed {
        execution_id,
        failed,
      });
    }

    Ok(report)
  }

  /// Resolve a unit's bindings and decide whether it actually has to run.
  fn prepare_unit(
    &self,
    unit: &WorkUnit,
    graph: &Graph,
    statuses: &HashMap<String, UnitStatus>,
    cache: &RerunCache,
  ) -> Result<Prepared, EngineError> {
    let upstream_outputs: HashMap<String, HashMap<String, String>> = graph
      .upstream(&unit.name)
      .iter()
      .filter_map(|u| match statuses.get(u) {
        Some(UnitStatus::Succeeded(result)) => Some((u.clone(), result.outputs.clone())),
        _ => None,
      })
      .collect();

    let inputs = resolve_inputs(unit, &upstream_outputs)?;
    let argv = resolve_argv(unit, &inputs)?;
    let outputs = resolve_outputs(unit, &inputs)?;
    let command = ResolvedCommand::new(unit.program.clone(), argv);

    let key = cache.key_for(&unit.name, &command)?;
    if cache.is_fresh(&unit.name, &key) {
      return Ok(Prepared::Cached(UnitResult {
        unit: unit.name.clone(),
        command: command.command_line(),
        outputs,
        cached: true,
      }));
    }
    if self.settings.options.stop_on_first_rerun {
      return Err(EngineError::RerunRequired {
        unit: unit.name.clone(),
      });
    }

    Ok(Prepared::Run(PreparedRun {
      name: unit.name.clone(),
      command,
      outputs,
      key,
    }))
  }
}

enum Prepared {
  Cached(UnitResult),
  Run(PreparedRun),
}

/// Everything needed to run one unit, resolved ahead of the spawn.
struct PreparedRun {
  name: String,
  command: ResolvedCommand,
  outputs: HashMap<String, String>,
  key: String,
}

/// Units whose upstream units have all succeeded, in sorted order.
fn find_ready(
  workflow: &Workflow,
  graph: &Graph,
  statuses: &HashMap<String, UnitStatus>,
) -> Vec<String> {
  let mut ready: Vec<String> = workflow
    .units
    .keys()
    .filter(|name| !statuses.contains_key(*name))
    .filter(|name| {
      graph
        .upstream(name)
        .iter()
        .all(|u| matches!(statuses.get(u), Some(UnitStatus::Succeeded(_))))
    })
    .cloned()
    .collect();
  ready.sort_unstable();
  ready
}
