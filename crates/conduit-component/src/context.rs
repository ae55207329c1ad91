//! Process-wide context shared with component constructors.

use std::collections::HashMap;

/// Credential values a component can substitute into a setup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InjectedSecrets(HashMap<String, String>);

impl InjectedSecrets {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
    self.0.insert(field.into(), value.into());
    self
  }

  /// The injected value for a credential field, ignoring empty values.
  pub fn get(&self, field: &str) -> Option<&str> {
    self
      .0
      .get(field)
      .map(String::as_str)
      .filter(|v| !v.is_empty())
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl From<HashMap<String, String>> for InjectedSecrets {
  fn from(values: HashMap<String, String>) -> Self {
    Self(values)
  }
}

/// Shared context handed to every component when it is constructed.
#[derive(Debug, Clone, Default)]
pub struct ComponentContext {
  secrets: HashMap<String, InjectedSecrets>,
}

impl ComponentContext {
  pub fn new() -> Self {
    Self::default()
  }

  /// Inject credentials for the component with the given definition id.
  pub fn with_secrets(mut self, definition_id: impl Into<String>, secrets: InjectedSecrets) -> Self {
    self.secrets.insert(definition_id.into(), secrets);
    self
  }

  /// The injected credentials for a component. Empty if none were configured.
  pub fn secrets_for(&self, definition_id: &str) -> InjectedSecrets {
    self.secrets.get(definition_id).cloned().unwrap_or_default()
  }
}
