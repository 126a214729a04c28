use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// An input binding is a template string resolved at schedule time.
///
/// Literal values pass through unchanged; `{{ unit.output }}` references
/// resolve against the declared outputs of completed upstream units.
pub type BindingValue = String;

/// One external-tool invocation with declared inputs and outputs.
///
/// Constructed once at startup and immutable thereafter. The argv and the
/// declared outputs are templates over `{{ inputs.* }}`, evaluated against
/// the unit's resolved input bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkUnit {
  /// Unit name, unique within a workflow.
  pub name: String,
  /// Executable invoked for this unit.
  pub program: String,
  /// Named input bindings: parameter name to template string.
  #[serde(default)]
  pub inputs: HashMap<String, BindingValue>,
  /// Argument templates over `{{ inputs.* }}`, in invocation order.
  #[serde(default)]
  pub argv: Vec<String>,
  /// Declared outputs: output name to template over `{{ inputs.* }}`.
  #[serde(default)]
  pub outputs: HashMap<String, String>,
}

impl WorkUnit {
  pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      program: program.into(),
      inputs: HashMap::new(),
      argv: Vec::new(),
      outputs: HashMap::new(),
    }
  }

  /// Add an input binding.
  pub fn input(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.inputs.insert(name.into(), value.into());
    self
  }

  /// Append one argument template.
  pub fn arg(mut self, template: impl Into<String>) -> Self {
    self.argv.push(template.into());
    self
  }

  /// Append several argument templates.
  pub fn args<I, S>(mut self, templates: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.argv.extend(templates.into_iter().map(Into::into));
    self
  }

  /// Declare an output.
  pub fn output(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
    self.outputs.insert(name.into(), template.into());
    self
  }
}
