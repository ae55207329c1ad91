//! Component and job errors.

use conduit_definition::DefinitionError;

/// Errors raised while constructing or running an execution as a whole.
///
/// Everything here blocks the batch: construction errors are returned before
/// any job runs and batch setup errors abort the batch before any job is
/// attempted. Failures of a single job are [`JobError`]s instead.
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
  /// The requested task isn't declared by the component.
  #[error("unsupported task '{task}'")]
  UnsupportedTask { task: String },

  /// A credential field is empty or deferred to an injected value the
  /// component doesn't hold.
  #[error("unresolved credential '{field}': no value supplied and no injected secret available")]
  UnresolvedCredential { field: String },

  /// The setup doesn't conform to the component's setup schema.
  #[error("invalid setup: {message}")]
  InvalidSetup { message: String },

  /// A resource shared by the whole batch couldn't be built.
  #[error("failed to prepare batch: {message}")]
  BatchSetup { message: String },

  /// The component doesn't implement an optional capability.
  #[error("operation '{operation}' is not supported by this component")]
  Unsupported { operation: &'static str },

  /// A connectivity probe or verification call to the external system failed.
  #[error("connection failed: {message}")]
  Connection { message: String },

  /// The component's definition failed to load.
  #[error(transparent)]
  Definition(#[from] DefinitionError),
}

impl ComponentError {
  pub fn invalid_setup(message: impl Into<String>) -> Self {
    Self::InvalidSetup {
      message: message.into(),
    }
  }

  pub fn batch_setup(message: impl Into<String>) -> Self {
    Self::BatchSetup {
      message: message.into(),
    }
  }

  pub fn connection(message: impl Into<String>) -> Self {
    Self::Connection {
      message: message.into(),
    }
  }
}

/// A failure of one job. Reported through that job's error channel only.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum JobError {
  /// The batch was cancelled before the job finished.
  #[error("job cancelled")]
  Cancelled,

  /// The job's input couldn't be read.
  #[error("failed to read input: {message}")]
  ReadInput { message: String },

  /// The job's input doesn't match what the task expects.
  #[error("invalid input: {message}")]
  InvalidInput { message: String },

  /// The task produced output that doesn't match its output schema.
  #[error("invalid output: {message}")]
  InvalidOutput { message: String },

  /// The job's output has already been written.
  #[error("output already written")]
  OutputAlreadyWritten,

  /// The task itself failed.
  #[error("task failed: {message}")]
  Task { message: String },

  /// The task panicked.
  #[error("task panicked: {message}")]
  Panicked { message: String },
}

impl JobError {
  pub fn invalid_input(message: impl Into<String>) -> Self {
    Self::InvalidInput {
      message: message.into(),
    }
  }

  pub fn invalid_output(message: impl Into<String>) -> Self {
    Self::InvalidOutput {
      message: message.into(),
    }
  }

  pub fn task(message: impl Into<String>) -> Self {
    Self::Task {
      message: message.into(),
    }
  }
}
