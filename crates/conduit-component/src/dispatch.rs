//! Task dispatch tables.

use std::collections::BTreeMap;

use conduit_definition::{Definition, DefinitionError};

use crate::error::ComponentError;

/// Maps task names to the behavior that implements them.
///
/// Built once per component and checked against the definition, so a
/// component can't declare a task it doesn't implement (or the reverse).
#[derive(Debug, Clone)]
pub struct TaskTable<H> {
  handlers: BTreeMap<String, H>,
}

impl<H: Clone> TaskTable<H> {
  pub fn new() -> Self {
    Self {
      handlers: BTreeMap::new(),
    }
  }

  pub fn bind(mut self, task: impl Into<String>, handler: H) -> Self {
    self.handlers.insert(task.into(), handler);
    self
  }

  /// Check the table against the definition's task list.
  pub fn validate(self, definition: &Definition) -> Result<Self, DefinitionError> {
    for task in &definition.available_tasks {
      if !self.handlers.contains_key(task) {
        return Err(DefinitionError::UnboundTask {
          id: definition.id.clone(),
          task: task.clone(),
        });
      }
    }

    for task in self.handlers.keys() {
      if !definition.has_task(task) {
        return Err(DefinitionError::UndeclaredTask {
          id: definition.id.clone(),
          task: task.clone(),
        });
      }
    }

    Ok(self)
  }

  /// The handler for a task, or an error naming the unknown task.
  pub fn select(&self, task: &str) -> Result<H, ComponentError> {
    self
      .handlers
      .get(task)
      .cloned()
      .ok_or_else(|| ComponentError::UnsupportedTask {
        task: task.to_string(),
      })
  }

  pub fn tasks(&self) -> impl Iterator<Item = &str> {
    self.handlers.keys().map(String::as_str)
  }
}

impl<H: Clone> Default for TaskTable<H> {
  fn default() -> Self {
    Self::new()
  }
}
