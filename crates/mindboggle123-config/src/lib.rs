//! Mindboggle123 Config
//!
//! This crate contains the pipeline configuration for mindboggle123: the
//! input image, the optional subject identifier, and the output/working
//! directory layout shared by all three stages.
//!
//! The configuration is an immutable value constructed once through
//! [`PipelineConfigBuilder`] and passed to every component that needs it.
//! Nothing in the pipeline reads configuration from ambient process state.

mod config;
mod error;

pub use config::{
  ANTS_SUBJECTS_DIR, DEFAULT_OUTPUT_ROOT, DEFAULT_SUBJECT, FREESURFER_SUBJECTS_DIR,
  MINDBOGGLED_DIR, PipelineConfig, PipelineConfigBuilder, WORKING_DIR,
};
pub use error::ConfigError;
