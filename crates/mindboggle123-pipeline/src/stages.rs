//! Stage definitions and the pipeline graph builder.
//!
//! Units `recon` and `ants` bind only literals, so they are entry points and
//! may run concurrently. Unit `mindboggle` binds `{{ recon.* }}` and
//! `{{ ants.* }}` references - values that only exist once those units have
//! completed - and the matching edges make that data dependency explicit to
//! the engine.

use mindboggle123_config::PipelineConfig;
use mindboggle123_workflow::{WorkUnit, Workflow};

use crate::shim::{DEFAULT_EXTRA_ARGS, MindboggleInvocation, ants_output_prefix};
use crate::templates::TemplateBundle;

pub const RECON_UNIT: &str = "recon";
pub const ANTS_UNIT: &str = "ants";
pub const MINDBOGGLE_UNIT: &str = "mindboggle";

pub const RECON_ALL_PROGRAM: &str = "recon-all";
pub const ANTS_PROGRAM: &str = "antsCorticalThickness.sh";
pub const MINDBOGGLE_PROGRAM: &str = "mindboggle";

/// Stage A: surface reconstruction over the whole image.
///
/// Declares the subject identifier and subjects directory as outputs so
/// downstream path construction consumes propagated values instead of
/// assuming a side channel.
pub fn recon_unit(config: &PipelineConfig) -> WorkUnit {
  WorkUnit::new(RECON_UNIT, RECON_ALL_PROGRAM)
    .input("image", config.image.display().to_string())
    .input("subject_id", config.subject())
    .input(
      "subjects_dir",
      config.freesurfer_subjects.display().to_string(),
    )
    .args([
      "-all",
      "-i",
      "{{ inputs.image }}",
      "-s",
      "{{ inputs.subject_id }}",
      "-sd",
      "{{ inputs.subjects_dir }}",
    ])
    .output("subject_id", "{{ inputs.subject_id }}")
    .output("subjects_dir", "{{ inputs.subjects_dir }}")
}

/// Stage B: cortical-thickness segmentation against the fixed template
/// bundle.
pub fn ants_unit(config: &PipelineConfig, templates: &TemplateBundle) -> WorkUnit {
  WorkUnit::new(ANTS_UNIT, ANTS_PROGRAM)
    .input("image", config.image.display().to_string())
    .input("brain_template", templates.brain_template())
    .input("brain_probability_mask", templates.brain_probability_mask())
    .input(
      "extraction_registration_mask",
      templates.extraction_registration_mask(),
    )
    .input(
      "t1_registration_template",
      templates.t1_registration_template(),
    )
    .input("segmentation_priors", templates.segmentation_priors())
    .input(
      "out_prefix",
      ants_output_prefix(&config.ants_subjects, config.subject()),
    )
    .args([
      "-d",
      "3",
      "-a",
      "{{ inputs.image }}",
      "-e",
      "{{ inputs.brain_template }}",
      "-m",
      "{{ inputs.brain_probability_mask }}",
      "-f",
      "{{ inputs.extraction_registration_mask }}",
      "-p",
      "{{ inputs.segmentation_priors }}",
      "-t",
      "{{ inputs.t1_registration_template }}",
      "-o",
      "{{ inputs.out_prefix }}",
    ])
    .output(
      "segmentation",
      "{{ inputs.out_prefix }}BrainSegmentation.nii.gz",
    )
}

/// Stage C: morphology analysis over the outputs of both upstream stages.
pub fn mindboggle_unit(config: &PipelineConfig) -> WorkUnit {
  let invocation = MindboggleInvocation {
    subjects_dir: "{{ inputs.subjects_dir }}".to_string(),
    subject_id: "{{ inputs.subject_id }}".to_string(),
    segmentation: "{{ inputs.segmentation }}".to_string(),
    output_dir: config.mindboggled.display().to_string(),
    extra_args: DEFAULT_EXTRA_ARGS.to_string(),
  };

  WorkUnit::new(MINDBOGGLE_UNIT, MINDBOGGLE_PROGRAM)
    .input("subjects_dir", "{{ recon.subjects_dir }}")
    .input("subject_id", "{{ recon.subject_id }}")
    .input("segmentation", "{{ ants.segmentation }}")
    .args(invocation.argv())
}

/// The complete three-stage workflow.
pub fn pipeline(config: &PipelineConfig, templates: &TemplateBundle) -> Workflow {
  Workflow::new("mindboggle123")
    .unit(recon_unit(config))
    .unit(ants_unit(config, templates))
    .unit(mindboggle_unit(config))
    .edge(RECON_UNIT, MINDBOGGLE_UNIT)
    .edge(ANTS_UNIT, MINDBOGGLE_UNIT)
}
