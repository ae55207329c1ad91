//! Definition loading errors.

/// Errors raised while loading or validating a component definition.
///
/// All of these are fatal: a component whose definition fails to load can't
/// be imported into a store.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DefinitionError {
  /// One of the embedded documents is not valid JSON or has the wrong shape.
  #[error("failed to parse {document}: {message}")]
  Parse {
    document: &'static str,
    message: String,
  },

  /// The definition id is empty or not kebab-case.
  #[error("invalid definition id '{id}'")]
  InvalidId { id: String },

  /// The definition declares no available tasks.
  #[error("definition '{id}' declares no tasks")]
  NoTasks { id: String },

  /// A task is listed in `available-tasks` but has no entry in the task document.
  #[error("definition '{id}': task '{task}' is available but not defined")]
  UndefinedTask { id: String, task: String },

  /// A task is defined in the task document but not listed as available.
  #[error("definition '{id}': task '{task}' is defined but not listed as available")]
  UnlistedTask { id: String, task: String },

  /// A schema is malformed or internally inconsistent.
  #[error("definition '{id}': invalid schema at {location}: {message}")]
  InvalidSchema {
    id: String,
    location: String,
    message: String,
  },

  /// An available task has no implementation bound to it.
  #[error("definition '{id}': task '{task}' has no implementation")]
  UnboundTask { id: String, task: String },

  /// An implementation is bound to a task the definition doesn't declare.
  #[error("definition '{id}': implementation bound to undeclared task '{task}'")]
  UndeclaredTask { id: String, task: String },
}
