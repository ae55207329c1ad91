//! Store errors.

use conduit_component::ComponentError;
use uuid::Uuid;

/// Errors returned by the store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  /// No component is registered under the definition id.
  #[error("component definition not found: '{id}'")]
  DefinitionNotFound { id: String },

  /// No component is registered under the definition uid.
  #[error("component definition not found: uid {uid}")]
  DefinitionUidNotFound { uid: Uuid },

  /// Two components share an id or a uid.
  #[error("duplicate component registration: {key}")]
  DuplicateComponent { key: String },

  /// The component refused to create an execution.
  #[error("creating component execution: {source}")]
  CreateExecution {
    #[source]
    source: ComponentError,
  },

  /// The whole batch failed before any job ran.
  #[error("executing component: {source}")]
  Execute {
    #[source]
    source: ComponentError,
  },

  /// A connectivity probe or webhook verification failed.
  #[error("component '{id}': {source}")]
  Component {
    id: String,
    #[source]
    source: ComponentError,
  },
}
