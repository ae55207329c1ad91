//! Jobs: the unit of work handed to an execution.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::JobError;

/// Produces a job's input.
#[async_trait]
pub trait InputReader: Send {
  async fn read(&mut self) -> Result<Value, JobError>;
}

/// Accepts a job's output. Writing more than once fails.
#[async_trait]
pub trait OutputWriter: Send {
  async fn write(&mut self, output: Value) -> Result<(), JobError>;
}

/// Accepts a failure for one job.
pub trait ErrorReporter: Send {
  fn report(&mut self, error: JobError);
}

/// One unit of work in a batch.
///
/// The three sides are independent so input production and output
/// consumption can be backed by anything: memory, a message bus, a stream.
pub struct Job {
  pub input: Box<dyn InputReader>,
  pub output: Box<dyn OutputWriter>,
  pub error: Box<dyn ErrorReporter>,
}

impl Job {
  pub fn new(
    input: impl InputReader + 'static,
    output: impl OutputWriter + 'static,
    error: impl ErrorReporter + 'static,
  ) -> Self {
    Self {
      input: Box::new(input),
      output: Box::new(output),
      error: Box::new(error),
    }
  }
}

/// An input produced on first read and cached afterwards.
pub struct LazyInput {
  producer: Option<BoxFuture<'static, Result<Value, JobError>>>,
  value: Option<Result<Value, JobError>>,
}

impl LazyInput {
  /// Defer input production to `producer`, which runs on the first read.
  pub fn new<F>(producer: F) -> Self
  where
    F: Future<Output = Result<Value, JobError>> + Send + 'static,
  {
    Self {
      producer: Some(Box::pin(producer)),
      value: None,
    }
  }

  /// An input that is already available.
  pub fn ready(value: Value) -> Self {
    Self {
      producer: None,
      value: Some(Ok(value)),
    }
  }
}

#[async_trait]
impl InputReader for LazyInput {
  async fn read(&mut self) -> Result<Value, JobError> {
    if let Some(producer) = self.producer.take() {
      self.value = Some(producer.await);
    }
    self.value.clone().unwrap_or_else(|| {
      Err(JobError::ReadInput {
        message: "input producer was dropped".to_string(),
      })
    })
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;
  use std::sync::atomic::{AtomicUsize, Ordering};

  use serde_json::json;

  use super::*;

  #[tokio::test]
  async fn test_lazy_input_runs_producer_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let mut input = LazyInput::new(async move {
      counter.fetch_add(1, Ordering::SeqCst);
      Ok(json!({"n": 1}))
    });

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(input.read().await.unwrap(), json!({"n": 1}));
    assert_eq!(input.read().await.unwrap(), json!({"n": 1}));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_lazy_input_caches_errors() {
    let mut input = LazyInput::new(async { Err(JobError::task("bus unavailable")) });

    assert_eq!(input.read().await, Err(JobError::task("bus unavailable")));
    assert_eq!(input.read().await, Err(JobError::task("bus unavailable")));
  }
}
