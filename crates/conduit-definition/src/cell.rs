//! One-shot definition loading.

use std::sync::{Arc, OnceLock};

use crate::definition::{Definition, DefinitionDocuments};
use crate::error::DefinitionError;

/// Holds the result of loading a definition exactly once.
///
/// The first caller of [`DefinitionCell::get_or_load`] parses and validates
/// the documents; every later caller gets the same shared definition (or the
/// same error) without reparsing.
pub struct DefinitionCell {
  cell: OnceLock<Result<Arc<Definition>, DefinitionError>>,
}

impl DefinitionCell {
  pub const fn new() -> Self {
    Self {
      cell: OnceLock::new(),
    }
  }

  /// Load the definition on first use and return the shared copy.
  pub fn get_or_load(
    &self,
    documents: DefinitionDocuments<'_>,
  ) -> Result<Arc<Definition>, DefinitionError> {
    self
      .cell
      .get_or_init(|| Definition::load(documents).map(Arc::new))
      .clone()
  }
}

impl Default for DefinitionCell {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const DEFINITION: &str = r#"{
    "id": "cell-test",
    "uid": "0f7c2a59-3e4b-4f61-8d2a-6b9e1c0d5a47",
    "title": "Cell",
    "version": "0.1.0",
    "type": "operator",
    "release-stage": "alpha",
    "available-tasks": ["TASK_NOOP"]
  }"#;
  const SETUP: &str = r#"{"type": "object"}"#;
  const TASKS: &str = r#"{
    "TASK_NOOP": {"title": "Noop", "input": {"type": "object"}, "output": {"type": "object"}}
  }"#;

  #[test]
  fn test_loads_once_and_shares() {
    let cell = DefinitionCell::new();
    let documents = DefinitionDocuments {
      definition: DEFINITION,
      setup: SETUP,
      tasks: TASKS,
    };

    let first = cell.get_or_load(documents).unwrap();
    // Later callers get the cached value even with different documents.
    let second = cell
      .get_or_load(DefinitionDocuments {
        definition: "{",
        ..documents
      })
      .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
  }

  #[test]
  fn test_error_is_sticky() {
    let cell = DefinitionCell::new();
    let broken = DefinitionDocuments {
      definition: DEFINITION,
      setup: "[]",
      tasks: TASKS,
    };

    let first = cell.get_or_load(broken).unwrap_err();
    let second = cell
      .get_or_load(DefinitionDocuments {
        setup: SETUP,
        ..broken
      })
      .unwrap_err();

    assert_eq!(first, second);
  }
}
