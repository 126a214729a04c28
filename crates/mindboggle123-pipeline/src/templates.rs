use std::path::PathBuf;

/// Where the OASIS-30 Atropos template bundle lives by default.
pub const DEFAULT_TEMPLATE_ROOT: &str = "/opt/data/OASIS-30_Atropos_template";

/// The fixed template/prior/mask bundle consumed by the segmentation stage.
///
/// The bundle is opaque data shipped alongside the external tools; this type
/// only knows the file layout under its root.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateBundle {
  root: PathBuf,
}

impl TemplateBundle {
  /// Use a bundle rooted at the given directory.
  pub fn at(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn brain_template(&self) -> String {
    self.file("T_template0.nii.gz")
  }

  pub fn brain_probability_mask(&self) -> String {
    self.file("T_template0_BrainCerebellumProbabilityMask.nii.gz")
  }

  pub fn extraction_registration_mask(&self) -> String {
    self.file("T_template0_BrainCerebellumExtractionMask.nii.gz")
  }

  pub fn t1_registration_template(&self) -> String {
    self.file("T_template0_BrainCerebellum.nii.gz")
  }

  /// Prior specification in the `%d`-substitution form the segmentation
  /// tool expects.
  pub fn segmentation_priors(&self) -> String {
    self.file("Priors2/priors%d.nii.gz")
  }

  fn file(&self, name: &str) -> String {
    self.root.join(name).display().to_string()
  }
}

impl Default for TemplateBundle {
  fn default() -> Self {
    Self::at(DEFAULT_TEMPLATE_ROOT)
  }
}
