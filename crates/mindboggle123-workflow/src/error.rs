use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
  #[error("edge references unknown unit: from={from}, to={to}")]
  InvalidEdge { from: String, to: String },

  #[error("dependency cycle involving unit '{0}'")]
  CycleDetected(String),
}
