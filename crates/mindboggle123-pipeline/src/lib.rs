//! Mindboggle123 Pipeline
//!
//! The concrete three-stage workflow:
//!
//! ```text
//! recon (recon-all)          ants (antsCorticalThickness.sh)
//!        \                        /
//!         v                      v
//!          mindboggle (morphology analysis)
//! ```
//!
//! `recon` and `ants` are mutually independent; `mindboggle` consumes
//! declared outputs of both, so it carries a data dependency on each and is
//! only schedulable once they have completed.

mod shim;
mod stages;
mod templates;

pub use shim::{
  ANTS_OUTPUT_FILE_PREFIX, DEFAULT_EXTRA_ARGS, MindboggleInvocation, SEGMENTATION_FILE,
  ants_output_prefix, segmentation_path,
};
pub use stages::{
  ANTS_PROGRAM, ANTS_UNIT, MINDBOGGLE_PROGRAM, MINDBOGGLE_UNIT, RECON_ALL_PROGRAM, RECON_UNIT,
  ants_unit, mindboggle_unit, pipeline, recon_unit,
};
pub use templates::{DEFAULT_TEMPLATE_ROOT, TemplateBundle};
