use std::collections::{HashMap, HashSet, VecDeque};

use crate::WorkUnit;
use crate::error::WorkflowError;

/// Dependency-graph structure for traversal and analysis.
#[derive(Debug, Clone)]
pub struct Graph {
  /// Adjacency list: unit name -> downstream unit names.
  adjacency: HashMap<String, Vec<String>>,
  /// Reverse adjacency: unit name -> upstream unit names.
  reverse_adjacency: HashMap<String, Vec<String>>,
  /// Units with no incoming edges.
  entry_points: Vec<String>,
  /// Units with multiple incoming edges (join points).
  join_points: HashSet<String>,
}

impl Graph {
  /// Build a graph from units and "consumes output of" edges.
  pub fn new(units: &HashMap<String, WorkUnit>, edges: &[(String, String)]) -> Self {
    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    let mut reverse_adjacency: HashMap<String, Vec<String>> = HashMap::new();

    for name in units.keys() {
      adjacency.entry(name.clone()).or_default();
      reverse_adjacency.entry(name.clone()).or_default();
    }

    for (from, to) in edges {
      adjacency.entry(from.clone()).or_default().push(to.clone());
      reverse_adjacency
        .entry(to.clone())
        .or_default()
        .push(from.clone());
    }

    let entry_points: Vec<String> = units
      .keys()
      .filter(|name| reverse_adjacency.get(*name).is_none_or(|v| v.is_empty()))
      .cloned()
      .collect();

    let join_points: HashSet<String> = reverse_adjacency
      .iter()
      .filter(|(_, incoming)| incoming.len() > 1)
      .map(|(name, _)| name.clone())
      .collect();

    Self {
      adjacency,
      reverse_adjacency,
      entry_points,
      join_points,
    }
  }

  /// Units with no incoming edges.
  pub fn entry_points(&self) -> &[String] {
    &self.entry_points
  }

  /// Downstream units for a given unit.
  pub fn downstream(&self, unit: &str) -> &[String] {
    self
      .adjacency
      .get(unit)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Upstream units for a given unit.
  pub fn upstream(&self, unit: &str) -> &[String] {
    self
      .reverse_adjacency
      .get(unit)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Whether a unit has multiple incoming edges.
  pub fn is_join_point(&self, unit: &str) -> bool {
    self.join_points.contains(unit)
  }

  /// A topological ordering of all units (Kahn's algorithm).
  ///
  /// Deterministic: units of equal rank are visited in lexicographic order.
  /// Fails if the graph contains a cycle.
  pub fn topological_order(&self) -> Result<Vec<String>, WorkflowError> {
    let mut in_degree: HashMap<&str, usize> = self
      .adjacency
      .keys()
      .map(|name| (name.as_str(), self.upstream(name).len()))
      .collect();

    let mut queue: VecDeque<&str> = {
      let mut roots: Vec<&str> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(name, _)| *name)
        .collect();
      roots.sort_unstable();
      roots.into()
    };

    let mut order = Vec::with_capacity(self.adjacency.len());
    while let Some(unit) = queue.pop_front() {
      order.push(unit.to_string());
      let mut unblocked = Vec::new();
      for next in self.downstream(unit) {
        if let Some(degree) = in_degree.get_mut(next.as_str()) {
          *degree -= 1;
          if *degree == 0 {
            unblocked.push(next.as_str());
          }
        }
      }
      unblocked.sort_unstable();
      queue.extend(unblocked);
    }

    if order.len() != self.adjacency.len() {
      let stuck = in_degree
        .iter()
        .find(|(_, degree)| **degree > 0)
        .map(|(name, _)| name.to_string())
        .unwrap_or_default();
      return Err(WorkflowError::CycleDetected(stuck));
    }

    Ok(order)
  }
}
