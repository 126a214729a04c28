use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;
use crate::graph::Graph;
use crate::unit::WorkUnit;

/// A complete pipeline: work units plus directed data-dependency edges.
///
/// Built once at startup and consumed by the execution engine. An edge
/// `(from, to)` means `to` consumes outputs of `from` and must not start
/// before `from` has completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
  pub name: String,
  pub units: HashMap<String, WorkUnit>,
  pub edges: Vec<(String, String)>,
}

impl Workflow {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      units: HashMap::new(),
      edges: Vec::new(),
    }
  }

  /// Add a work unit.
  pub fn unit(mut self, unit: WorkUnit) -> Self {
    self.units.insert(unit.name.clone(), unit);
    self
  }

  /// Add a "consumes output of" edge.
  pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
    self.edges.push((from.into(), to.into()));
    self
  }

  /// Build the graph structure for traversal.
  pub fn graph(&self) -> Graph {
    Graph::new(&self.units, &self.edges)
  }

  /// Get a unit by name.
  pub fn get_unit(&self, name: &str) -> Option<&WorkUnit> {
    self.units.get(name)
  }

  /// Check structural invariants: edges reference known units and the
  /// graph is acyclic.
  pub fn validate(&self) -> Result<(), WorkflowError> {
    for (from, to) in &self.edges {
      if !self.units.contains_key(from) || !self.units.contains_key(to) {
        return Err(WorkflowError::InvalidEdge {
          from: from.clone(),
          to: to.clone(),
        });
      }
    }
    self.graph().topological_order()?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn three_stage() -> Workflow {
    Workflow::new("mindboggle123")
      .unit(WorkUnit::new("recon", "recon-all"))
      .unit(WorkUnit::new("ants", "antsCorticalThickness.sh"))
      .unit(WorkUnit::new("mindboggle", "mindboggle"))
      .edge("recon", "mindboggle")
      .edge("ants", "mindboggle")
  }

  #[test]
  fn test_valid_workflow_passes() {
    three_stage().validate().unwrap();
  }

  #[test]
  fn test_edge_to_unknown_unit_fails() {
    let workflow = three_stage().edge("mindboggle", "missing");
    assert!(matches!(
      workflow.validate(),
      Err(WorkflowError::InvalidEdge { .. })
    ));
  }

  #[test]
  fn test_cycle_fails_validation() {
    let workflow = three_stage().edge("mindboggle", "recon");
    assert!(matches!(
      workflow.validate(),
      Err(WorkflowError::CycleDetected(_))
    ));
  }

  #[test]
  fn test_get_unit() {
    let workflow = three_stage();
    assert!(workflow.get_unit("ants").is_some());
    assert!(workflow.get_unit("nope").is_none());
  }

  #[test]
  fn test_deserializes_from_json() {
    let json = r#"{
      "name": "mindboggle123",
      "units": {
        "recon": {
          "name": "recon",
          "program": "recon-all",
          "argv": ["-all", "-i", "{{ inputs.image }}"],
          "inputs": { "image": "/x/T1.nii.gz" }
        },
        "mindboggle": { "name": "mindboggle", "program": "mindboggle" }
      },
      "edges": [["recon", "mindboggle"]]
    }"#;

    let workflow: Workflow = serde_json::from_str(json).unwrap();
    workflow.validate().unwrap();
    assert_eq!(workflow.get_unit("recon").unwrap().argv.len(), 3);
    assert!(workflow.get_unit("mindboggle").unwrap().inputs.is_empty());
  }
}
