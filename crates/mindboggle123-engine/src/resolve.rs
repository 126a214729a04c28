//! Template resolution for input bindings, argv, and declared outputs.
//!
//! Input bindings render against the declared outputs of completed upstream
//! units (`{{ recon.subject_id }}`); argv and output templates render against
//! the unit's own resolved inputs (`{{ inputs.image }}`). Rendering is
//! strict: an undefined reference is an error, never an empty string, so a
//! unit can only be assembled once the values it names actually exist.

use std::collections::HashMap;

use minijinja::{Environment, UndefinedBehavior, context};
use mindboggle123_workflow::WorkUnit;

use crate::error::EngineError;

fn environment() -> Environment<'static> {
  let mut env = Environment::new();
  env.set_undefined_behavior(UndefinedBehavior::Strict);
  env
}

fn render(
  unit: &str,
  field: &str,
  template: &str,
  ctx: &minijinja::Value,
) -> Result<String, EngineError> {
  environment()
    .render_str(template, ctx)
    .map_err(|e| EngineError::Binding {
      unit: unit.to_string(),
      field: field.to_string(),
      message: e.to_string(),
    })
}

/// Resolve a unit's input bindings against upstream declared outputs.
pub(crate) fn resolve_inputs(
  unit: &WorkUnit,
  upstream: &HashMap<String, HashMap<String, String>>,
) -> Result<HashMap<String, String>, EngineError> {
  let ctx = minijinja::Value::from_serialize(upstream);
  let mut resolved = HashMap::with_capacity(unit.inputs.len());
  for (name, template) in &unit.inputs {
    let field = format!("input '{name}'");
    resolved.insert(name.clone(), render(&unit.name, &field, template, &ctx)?);
  }
  Ok(resolved)
}

/// Resolve a unit's argv templates against its resolved inputs.
pub(crate) fn resolve_argv(
  unit: &WorkUnit,
  inputs: &HashMap<String, String>,
) -> Result<Vec<String>, EngineError> {
  let ctx = context! { inputs => inputs };
  unit
    .argv
    .iter()
    .enumerate()
    .map(|(i, template)| {
      let field = format!("argv[{i}]");
      render(&unit.name, &field, template, &ctx)
    })
    .collect()
}

/// Resolve a unit's declared outputs against its resolved inputs.
pub(crate) fn resolve_outputs(
  unit: &WorkUnit,
  inputs: &HashMap<String, String>,
) -> Result<HashMap<String, String>, EngineError> {
  let ctx = context! { inputs => inputs };
  let mut resolved = HashMap::with_capacity(unit.outputs.len());
  for (name, template) in &unit.outputs {
    let field = format!("output '{name}'");
    resolved.insert(name.clone(), render(&unit.name, &field, template, &ctx)?);
  }
  Ok(resolved)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_inputs_resolve_against_upstream() {
    let unit = WorkUnit::new("mindboggle", "mindboggle")
      .input("subject_id", "{{ recon.subject_id }}")
      .input("segmentation", "{{ ants.segmentation }}");

    let mut upstream = HashMap::new();
    upstream.insert(
      "recon".to_string(),
      HashMap::from([("subject_id".to_string(), "arno".to_string())]),
    );
    upstream.insert(
      "ants".to_string(),
      HashMap::from([(
        "segmentation".to_string(),
        "/out/ants_subjects/arno/antsBrainSegmentation.nii.gz".to_string(),
      )]),
    );

    let inputs = resolve_inputs(&unit, &upstream).unwrap();
    assert_eq!(inputs["subject_id"], "arno");
    assert_eq!(
      inputs["segmentation"],
      "/out/ants_subjects/arno/antsBrainSegmentation.nii.gz"
    );
  }

  #[test]
  fn test_undefined_reference_is_an_error() {
    let unit = WorkUnit::new("mindboggle", "mindboggle").input("id", "{{ recon.subject_id }}");

    let err = resolve_inputs(&unit, &HashMap::new()).unwrap_err();
    assert!(matches!(err, EngineError::Binding { .. }));
  }

  #[test]
  fn test_argv_renders_inputs_and_literals() {
    let unit = WorkUnit::new("recon", "recon-all")
      .input("image", "/x/T1.nii.gz")
      .args(["-all", "-i", "{{ inputs.image }}"]);

    let inputs = resolve_inputs(&unit, &HashMap::new()).unwrap();
    let argv = resolve_argv(&unit, &inputs).unwrap();
    assert_eq!(argv, vec!["-all", "-i", "/x/T1.nii.gz"]);
  }

  #[test]
  fn test_output_template_concatenation() {
    let unit = WorkUnit::new("ants", "antsCorticalThickness.sh")
      .input("out_prefix", "/out/ants_subjects/arno/ants")
      .output("segmentation", "{{ inputs.out_prefix }}BrainSegmentation.nii.gz");

    let inputs = resolve_inputs(&unit, &HashMap::new()).unwrap();
    let outputs = resolve_outputs(&unit, &inputs).unwrap();
    assert_eq!(
      outputs["segmentation"],
      "/out/ants_subjects/arno/antsBrainSegmentation.nii.gz"
    );
  }
}
