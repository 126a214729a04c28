//! Mindboggle123 Engine
//!
//! This crate runs a validated [`mindboggle123_workflow::Workflow`] by
//! spawning one OS process per work unit, in dependency order.
//!
//! # Architecture
//!
//! ```text
//! Engine
//! ├── new(settings, working_dir) - process runner, no-op notifier
//! ├── with_runner(..) - swap in a runner double for tests
//! └── execute(workflow, cancel) -> ExecutionReport
//!
//! execute()
//! └── ready-unit loop: a unit is ready once every upstream unit
//!     succeeded; each ready batch runs under a FIFO semaphore
//!     (1 permit = serial plugin, n = multiproc)
//!
//! per unit
//! ├── binding resolution via minijinja (inputs -> argv -> outputs)
//! ├── rerun cache check (sha2 key over the resolved command)
//! └── WorkUnitRunner::run - tokio::process spawn, wait for exit
//! ```
//!
//! Failure semantics: a unit that exits nonzero is terminal for itself and
//! blocks every unit downstream of it; independent units still complete.
//! There are no retries and no timeouts.

mod cache;
mod engine;
mod error;
mod events;
mod resolve;
mod runner;
mod settings;

pub use cache::RerunCache;
pub use engine::{Engine, ExecutionReport, UnitResult, UnitStatus};
pub use error::EngineError;
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use runner::{ProcessRunner, ResolvedCommand, WorkUnitRunner};
pub use settings::{EngineSettings, HashMethod, Plugin, PluginOptions};
