use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Output root used when `--out` is not supplied.
pub const DEFAULT_OUTPUT_ROOT: &str = "/home/jovyan/work/mindboggle123_output";

/// Subdirectory receiving surface-reconstruction (stage A) outputs.
pub const FREESURFER_SUBJECTS_DIR: &str = "freesurfer_subjects";

/// Subdirectory receiving segmentation (stage B) outputs.
pub const ANTS_SUBJECTS_DIR: &str = "ants_subjects";

/// Subdirectory receiving morphology-analysis (stage C) outputs.
pub const MINDBOGGLED_DIR: &str = "mindboggled";

/// Scratch directory name, placed under the output root by default.
pub const WORKING_DIR: &str = "working";

/// Subject name `recon-all` assigns when no identifier is supplied.
pub const DEFAULT_SUBJECT: &str = "recon_all";

/// Resolved pipeline configuration.
///
/// Built once via [`PipelineConfig::builder`] and immutable afterwards.
/// The derived directory fields are guaranteed to exist on disk after
/// [`PipelineConfig::prepare`] has run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
  /// Path to the input anatomical image.
  pub image: PathBuf,
  /// Subject identifier, if one was supplied on the command line.
  pub subject_id: Option<String>,
  /// Root directory for all pipeline outputs.
  pub output_root: PathBuf,
  /// Scratch directory for engine bookkeeping.
  pub working_root: PathBuf,
  /// Stage A output directory: `<output_root>/freesurfer_subjects`.
  pub freesurfer_subjects: PathBuf,
  /// Stage B output directory: `<output_root>/ants_subjects`.
  pub ants_subjects: PathBuf,
  /// Stage C output directory: `<output_root>/mindboggled`.
  pub mindboggled: PathBuf,
}

impl PipelineConfig {
  /// Start building a configuration for the given input image.
  pub fn builder(image: impl Into<PathBuf>) -> PipelineConfigBuilder {
    PipelineConfigBuilder {
      image: image.into(),
      subject_id: None,
      output_root: None,
      working_root: None,
    }
  }

  /// The effective subject identifier.
  ///
  /// Falls back to the name `recon-all` assigns on its own when `--id`
  /// was omitted, so path construction downstream never depends on an
  /// unset value.
  pub fn subject(&self) -> &str {
    self.subject_id.as_deref().unwrap_or(DEFAULT_SUBJECT)
  }

  /// Create every output directory that does not already exist.
  ///
  /// Prints a notice to stdout for each directory it creates. Safe to call
  /// against an already-populated output root; pre-existing directories are
  /// left untouched.
  pub fn prepare(&self) -> Result<(), ConfigError> {
    for dir in [
      &self.freesurfer_subjects,
      &self.ants_subjects,
      &self.mindboggled,
      &self.working_root,
    ] {
      ensure_dir(dir)?;
    }
    Ok(())
  }
}

fn ensure_dir(path: &Path) -> Result<(), ConfigError> {
  if !path.is_dir() {
    println!("creating missing directory: {}", path.display());
    fs::create_dir_all(path).map_err(|source| ConfigError::CreateDir {
      path: path.to_path_buf(),
      source,
    })?;
  }
  Ok(())
}

/// Builder for [`PipelineConfig`].
///
/// Unset optional values take their documented defaults at `build` time.
#[derive(Debug, Clone)]
pub struct PipelineConfigBuilder {
  image: PathBuf,
  subject_id: Option<String>,
  output_root: Option<PathBuf>,
  working_root: Option<PathBuf>,
}

impl PipelineConfigBuilder {
  /// Set the subject identifier.
  pub fn subject_id(mut self, id: impl Into<String>) -> Self {
    self.subject_id = Some(id.into());
    self
  }

  /// Set the output root directory.
  pub fn output_root(mut self, root: impl Into<PathBuf>) -> Self {
    self.output_root = Some(root.into());
    self
  }

  /// Set the working/scratch directory.
  pub fn working_root(mut self, root: impl Into<PathBuf>) -> Self {
    self.working_root = Some(root.into());
    self
  }

  /// Resolve defaults and derive the per-stage output directories.
  ///
  /// Pure path construction; no filesystem access happens until
  /// [`PipelineConfig::prepare`].
  pub fn build(self) -> PipelineConfig {
    let output_root = self
      .output_root
      .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_ROOT));
    let working_root = self
      .working_root
      .unwrap_or_else(|| output_root.join(WORKING_DIR));

    PipelineConfig {
      image: self.image,
      subject_id: self.subject_id,
      freesurfer_subjects: output_root.join(FREESURFER_SUBJECTS_DIR),
      ants_subjects: output_root.join(ANTS_SUBJECTS_DIR),
      mindboggled: output_root.join(MINDBOGGLED_DIR),
      output_root,
      working_root,
    }
  }
}
