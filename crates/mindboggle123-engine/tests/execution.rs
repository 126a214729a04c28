//! Engine integration tests using a recording runner double.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mindboggle123_engine::{
  ChannelNotifier, Engine, EngineError, EngineSettings, ExecutionEvent, Plugin, PluginOptions,
  ResolvedCommand, UnitStatus, WorkUnitRunner,
};
use mindboggle123_workflow::{WorkUnit, Workflow};
use tokio_util::sync::CancellationToken;

/// Records completed invocations in order; can delay or fail named units.
#[derive(Default, Clone)]
struct RecordingRunner {
  log: Arc<Mutex<Vec<(String, String)>>>,
  fail: HashSet<String>,
  delay: HashMap<String, u64>,
}

impl RecordingRunner {
  fn failing(units: &[&str]) -> Self {
    Self {
      fail: units.iter().map(|u| u.to_string()).collect(),
      ..Self::default()
    }
  }

  fn with_delay(mut self, unit: &str, millis: u64) -> Self {
    self.delay.insert(unit.to_string(), millis);
    self
  }

  fn completed(&self) -> Vec<String> {
    self
      .log
      .lock()
      .unwrap()
      .iter()
      .map(|(unit, _)| unit.clone())
      .collect()
  }

  fn command_for(&self, unit: &str) -> Option<String> {
    self
      .log
      .lock()
      .unwrap()
      .iter()
      .find(|(u, _)| u == unit)
      .map(|(_, command)| command.clone())
  }
}

#[async_trait]
impl WorkUnitRunner for RecordingRunner {
  async fn run(&self, unit: &str, command: &ResolvedCommand) -> Result<(), EngineError> {
    if let Some(millis) = self.delay.get(unit) {
      tokio::time::sleep(Duration::from_millis(*millis)).await;
    }
    self
      .log
      .lock()
      .unwrap()
      .push((unit.to_string(), command.command_line()));
    if self.fail.contains(unit) {
      return Err(EngineError::UnitFailed {
        unit: unit.to_string(),
        status: "exit status: 1".to_string(),
      });
    }
    Ok(())
  }
}

/// Two independent units feeding a third, mirroring the pipeline shape.
fn fan_in_workflow() -> Workflow {
  Workflow::new("test-fan-in")
    .unit(
      WorkUnit::new("alpha", "alpha-tool")
        .input("subject", "arno")
        .args(["-s", "{{ inputs.subject }}"])
        .output("subject_id", "{{ inputs.subject }}"),
    )
    .unit(
      WorkUnit::new("beta", "beta-tool")
        .input("out_prefix", "/out/beta/arno/ants")
        .args(["-o", "{{ inputs.out_prefix }}"])
        .output("artifact", "{{ inputs.out_prefix }}Segmentation.nii.gz"),
    )
    .unit(
      WorkUnit::new("gamma", "gamma-tool")
        .input("subject_id", "{{ alpha.subject_id }}")
        .input("artifact", "{{ beta.artifact }}")
        .args(["{{ inputs.subject_id }}", "--ants", "{{ inputs.artifact }}"]),
    )
    .edge("alpha", "gamma")
    .edge("beta", "gamma")
}

fn settings(plugin: Plugin) -> EngineSettings {
  EngineSettings {
    plugin,
    options: PluginOptions::default(),
  }
}

#[tokio::test]
async fn test_serial_runs_in_dependency_order() {
  let tmp = tempfile::tempdir().unwrap();
  let runner = RecordingRunner::default();
  let engine = Engine::with_runner(settings(Plugin::Serial), tmp.path(), runner.clone());

  let report = engine
    .execute(&fan_in_workflow(), CancellationToken::new())
    .await
    .unwrap();

  assert!(report.is_success());
  assert_eq!(runner.completed(), vec!["alpha", "beta", "gamma"]);
}

#[tokio::test]
async fn test_multiproc_still_joins_before_downstream() {
  let tmp = tempfile::tempdir().unwrap();
  // Delay alpha so beta finishes first; gamma must still come last.
  let runner = RecordingRunner::default().with_delay("alpha", 50);
  let engine = Engine::with_runner(settings(Plugin::MultiProc), tmp.path(), runner.clone());

  let report = engine
    .execute(&fan_in_workflow(), CancellationToken::new())
    .await
    .unwrap();

  assert!(report.is_success());
  let completed = runner.completed();
  assert_eq!(completed.len(), 3);
  assert_eq!(completed[0], "beta");
  assert_eq!(completed[2], "gamma");
}

#[tokio::test]
async fn test_downstream_sees_resolved_upstream_outputs() {
  let tmp = tempfile::tempdir().unwrap();
  let runner = RecordingRunner::default();
  let engine = Engine::with_runner(settings(Plugin::Serial), tmp.path(), runner.clone());

  engine
    .execute(&fan_in_workflow(), CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(
    runner.command_for("gamma").unwrap(),
    "gamma-tool arno --ants /out/beta/arno/antsSegmentation.nii.gz"
  );
}

#[tokio::test]
async fn test_upstream_failure_blocks_downstream_only() {
  let tmp = tempfile::tempdir().unwrap();
  let runner = RecordingRunner::failing(&["alpha"]);
  let engine = Engine::with_runner(settings(Plugin::MultiProc), tmp.path(), runner.clone());

  let report = engine
    .execute(&fan_in_workflow(), CancellationToken::new())
    .await
    .unwrap();

  // gamma was never invoked; the independent beta still completed.
  let completed = runner.completed();
  assert!(!completed.contains(&"gamma".to_string()));
  assert!(completed.contains(&"beta".to_string()));

  assert!(!report.is_success());
  assert_eq!(report.failed_units(), vec!["alpha"]);
  assert!(matches!(
    report.units["gamma"],
    UnitStatus::Blocked { ref upstream } if upstream == "alpha"
  ));
  assert!(report.result("beta").is_some());
}

#[tokio::test]
async fn test_blocking_propagates_along_chains() {
  let tmp = tempfile::tempdir().unwrap();
  let workflow = Workflow::new("test-chain")
    .unit(WorkUnit::new("first", "first-tool"))
    .unit(WorkUnit::new("second", "second-tool"))
    .unit(WorkUnit::new("third", "third-tool"))
    .edge("first", "second")
    .edge("second", "third");
  let runner = RecordingRunner::failing(&["first"]);
  let engine = Engine::with_runner(settings(Plugin::Serial), tmp.path(), runner.clone());

  let report = engine.execute(&workflow, CancellationToken::new()).await.unwrap();

  assert_eq!(runner.completed(), vec!["first"]);
  assert!(matches!(
    report.units["second"],
    UnitStatus::Blocked { ref upstream } if upstream == "first"
  ));
  assert!(matches!(
    report.units["third"],
    UnitStatus::Blocked { ref upstream } if upstream == "second"
  ));
}

#[tokio::test]
async fn test_failed_unit_keeps_its_command_string() {
  let tmp = tempfile::tempdir().unwrap();
  let runner = RecordingRunner::failing(&["beta"]);
  let engine = Engine::with_runner(settings(Plugin::Serial), tmp.path(), runner.clone());

  let report = engine
    .execute(&fan_in_workflow(), CancellationToken::new())
    .await
    .unwrap();

  match &report.units["beta"] {
    UnitStatus::Failed { command, .. } => {
      assert_eq!(command.as_deref(), Some("beta-tool -o /out/beta/arno/ants"));
    }
    other => panic!("expected beta to fail, got {:?}", other),
  }
}

#[tokio::test]
async fn test_second_run_is_served_from_cache() {
  let tmp = tempfile::tempdir().unwrap();
  let workflow = fan_in_workflow();

  let first = RecordingRunner::default();
  Engine::with_runner(settings(Plugin::Serial), tmp.path(), first.clone())
    .execute(&workflow, CancellationToken::new())
    .await
    .unwrap();
  assert_eq!(first.completed().len(), 3);

  let second = RecordingRunner::default();
  let report = Engine::with_runner(settings(Plugin::Serial), tmp.path(), second.clone())
    .execute(&workflow, CancellationToken::new())
    .await
    .unwrap();

  assert!(second.completed().is_empty());
  assert!(report.is_success());
  assert!(report.result("gamma").unwrap().cached);
}

#[tokio::test]
async fn test_stop_on_first_rerun_aborts_stale_run() {
  let tmp = tempfile::tempdir().unwrap();
  let settings = EngineSettings {
    plugin: Plugin::Serial,
    options: PluginOptions {
      stop_on_first_rerun: true,
      ..PluginOptions::default()
    },
  };
  let engine = Engine::with_runner(settings, tmp.path(), RecordingRunner::default());

  // Nothing has ever run in this working directory, so the first unit
  // already counts as a rerun.
  let err = engine
    .execute(&fan_in_workflow(), CancellationToken::new())
    .await
    .unwrap_err();
  assert!(matches!(err, EngineError::RerunRequired { .. }));
}

#[tokio::test]
async fn test_event_ordering() {
  let tmp = tempfile::tempdir().unwrap();
  let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();
  let engine = Engine::with_runner_and_notifier(
    settings(Plugin::MultiProc),
    tmp.path(),
    RecordingRunner::default().with_delay("beta", 20),
    ChannelNotifier::new(sender),
  );

  engine
    .execute(&fan_in_workflow(), CancellationToken::new())
    .await
    .unwrap();

  let mut events = Vec::new();
  while let Ok(event) = receiver.try_recv() {
    events.push(event);
  }

  let position = |pred: &dyn Fn(&ExecutionEvent) -> bool| events.iter().position(pred).unwrap();
  let alpha_done = position(&|e| {
    matches!(e, ExecutionEvent::UnitCompleted { unit, .. } if unit == "alpha")
  });
  let beta_done =
    position(&|e| matches!(e, ExecutionEvent::UnitCompleted { unit, .. } if unit == "beta"));
  let gamma_started =
    position(&|e| matches!(e, ExecutionEvent::UnitStarted { unit, .. } if unit == "gamma"));

  assert!(alpha_done < gamma_started);
  assert!(beta_done < gamma_started);
  assert!(matches!(
    events.first(),
    Some(ExecutionEvent::PipelineStarted { .. })
  ));
  assert!(matches!(
    events.last(),
    Some(ExecutionEvent::PipelineCompleted { .. })
  ));
}

#[tokio::test]
async fn test_cancelled_before_start() {
  let tmp = tempfile::tempdir().unwrap();
  let engine = Engine::with_runner(
    settings(Plugin::Serial),
    tmp.path(),
    RecordingRunner::default(),
  );

  let cancel = CancellationToken::new();
  cancel.cancel();
  let err = engine
    .execute(&fan_in_workflow(), cancel)
    .await
    .unwrap_err();
  assert!(matches!(err, EngineError::Cancelled));
}
