//! Mindboggle123 Workflow
//!
//! This crate provides the workflow representation for mindboggle123: a set
//! of [`WorkUnit`]s (one external-tool invocation each) connected by directed
//! "consumes output of" edges.
//!
//! A [`Workflow`] is constructed once at startup and validated before
//! execution:
//! - every edge references known units
//! - the graph is acyclic
//!
//! Inputs and declared outputs are template strings resolved by the engine at
//! schedule time; an input like `{{ recon.subject_id }}` binds a unit to a
//! value that only exists after the `recon` unit has completed, which is what
//! makes the dependency a data dependency rather than a manual ordering flag.

mod error;
mod graph;
mod unit;
mod workflow;

pub use error::WorkflowError;
pub use graph::Graph;
pub use unit::{BindingValue, WorkUnit};
pub use workflow::Workflow;
