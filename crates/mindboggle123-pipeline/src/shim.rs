//! Construction of the stage C (`mindboggle`) invocation.
//!
//! The morphology-analysis command depends on values produced by both
//! upstream stages: the FreeSurfer subject directory from `recon` and the
//! segmentation file from `ants`. This module owns the path and
//! command-line construction; spawning and exit-status handling follow the
//! engine's process-runner convention, and the resolved command string is
//! reported back verbatim whatever the process exits with.

use std::path::Path;

use crate::stages::MINDBOGGLE_PROGRAM;

/// Segmentation file the thickness stage writes under its output prefix.
pub const SEGMENTATION_FILE: &str = "antsBrainSegmentation.nii.gz";

/// File prefix passed to the segmentation tool via `-o`.
pub const ANTS_OUTPUT_FILE_PREFIX: &str = "ants";

/// Extra arguments always appended to the mindboggle command.
pub const DEFAULT_EXTRA_ARGS: &str = "--roygbiv --graph hier";

/// Output prefix for the segmentation stage:
/// `<ants_root>/<subject>/ants`.
pub fn ants_output_prefix(ants_root: &Path, subject: &str) -> String {
  format!("{}/{}/{}", ants_root.display(), subject, ANTS_OUTPUT_FILE_PREFIX)
}

/// The dependent segmentation path consumed by stage C:
/// `<ants_root>/<subject>/antsBrainSegmentation.nii.gz`.
pub fn segmentation_path(ants_root: &Path, subject: &str) -> String {
  format!("{}/{}/{}", ants_root.display(), subject, SEGMENTATION_FILE)
}

/// A fully described mindboggle invocation.
///
/// Field values may be literals or binding templates; the struct only joins
/// them into argv order. [`Self::command_line`] is the literal string a run
/// reports as stage C's result.
#[derive(Debug, Clone, PartialEq)]
pub struct MindboggleInvocation {
  /// FreeSurfer subjects directory (stage A output root).
  pub subjects_dir: String,
  /// Subject identifier propagated from stage A.
  pub subject_id: String,
  /// Segmentation file path propagated from stage B.
  pub segmentation: String,
  /// Destination directory for morphology output.
  pub output_dir: String,
  /// Extra arguments, whitespace separated.
  pub extra_args: String,
}

impl MindboggleInvocation {
  /// Build an invocation from the stage output roots, joining the
  /// dependent segmentation path from its components.
  pub fn from_roots(
    subjects_dir: &Path,
    ants_root: &Path,
    subject_id: &str,
    output_dir: &Path,
    extra_args: &str,
  ) -> Self {
    Self {
      subjects_dir: subjects_dir.display().to_string(),
      subject_id: subject_id.to_string(),
      segmentation: segmentation_path(ants_root, subject_id),
      output_dir: output_dir.display().to_string(),
      extra_args: extra_args.to_string(),
    }
  }

  /// The positional argument: `<subjects_dir>/<subject_id>`.
  pub fn subject_path(&self) -> String {
    format!("{}/{}", self.subjects_dir, self.subject_id)
  }

  /// Arguments in invocation order (without the program name).
  pub fn argv(&self) -> Vec<String> {
    let mut argv = vec![
      self.subject_path(),
      "--out".to_string(),
      self.output_dir.clone(),
      "--ants".to_string(),
      self.segmentation.clone(),
    ];
    argv.extend(self.extra_args.split_whitespace().map(str::to_string));
    argv
  }

  /// The full command joined into a single string.
  pub fn command_line(&self) -> String {
    let mut line = MINDBOGGLE_PROGRAM.to_string();
    for arg in self.argv() {
      line.push(' ');
      line.push_str(&arg);
    }
    line
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_segmentation_path_join() {
    assert_eq!(
      segmentation_path(Path::new("/out/ants_subjects"), "arno"),
      "/out/ants_subjects/arno/antsBrainSegmentation.nii.gz"
    );
  }

  #[test]
  fn test_ants_output_prefix_join() {
    assert_eq!(
      ants_output_prefix(Path::new("/out/ants_subjects"), "arno"),
      "/out/ants_subjects/arno/ants"
    );
  }

  #[test]
  fn test_exact_command_line() {
    let invocation = MindboggleInvocation::from_roots(
      Path::new("/out/freesurfer_subjects"),
      Path::new("/out/ants_subjects"),
      "arno",
      Path::new("/out/mindboggled"),
      DEFAULT_EXTRA_ARGS,
    );
    assert_eq!(
      invocation.command_line(),
      "mindboggle /out/freesurfer_subjects/arno --out /out/mindboggled \
       --ants /out/ants_subjects/arno/antsBrainSegmentation.nii.gz --roygbiv --graph hier"
    );
  }
}
