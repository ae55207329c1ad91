//! Execution handles returned to callers of the store.

use async_trait::async_trait;
use conduit_component::definition::Schema;
use conduit_component::{Execution, InputReader, Job, JobError, OutputWriter};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::error::StoreError;

/// An execution created by the store.
///
/// Jobs passed to [`ExecutionHandle::execute`] have their input checked
/// against the task's input schema when read, and their output checked
/// against the output schema when written. Mismatches fail that job only.
pub struct ExecutionHandle {
  definition_id: String,
  execution: Box<dyn Execution>,
}

impl ExecutionHandle {
  pub(crate) fn new(definition_id: String, execution: Box<dyn Execution>) -> Self {
    Self {
      definition_id,
      execution,
    }
  }

  pub fn task(&self) -> &str {
    self.execution.task()
  }

  /// Whether the setup took a credential from the component's injected secrets.
  pub fn uses_injected_credentials(&self) -> bool {
    self.execution.uses_injected_credentials()
  }

  /// Run a batch of jobs.
  ///
  /// An error means the batch couldn't run at all. Per-job failures are
  /// reported through each job's error reporter.
  #[instrument(
    name = "execute",
    skip(self, cancel, jobs),
    fields(
      definition_id = %self.definition_id,
      task = %self.execution.task(),
      jobs = jobs.len(),
    )
  )]
  pub async fn execute(&self, cancel: CancellationToken, jobs: Vec<Job>) -> Result<(), StoreError> {
    let definition = &self.execution.base().definition;
    let task = self.execution.task();

    let jobs = match (definition.input_schema(task), definition.output_schema(task)) {
      (Some(input_schema), Some(output_schema)) => jobs
        .into_iter()
        .map(|job| checked(job, input_schema, output_schema))
        .collect(),
      _ => jobs,
    };

    info!("batch started");

    let result = self.execution.execute(cancel, jobs).await;

    match &result {
      Ok(()) => info!("batch completed"),
      Err(e) => error!(error = %e, "batch failed"),
    }

    result.map_err(|source| StoreError::Execute { source })
  }
}

fn checked(job: Job, input_schema: &Schema, output_schema: &Schema) -> Job {
  Job {
    input: Box::new(CheckedInput {
      inner: job.input,
      schema: input_schema.clone(),
    }),
    output: Box::new(CheckedOutput {
      inner: job.output,
      schema: output_schema.clone(),
    }),
    error: job.error,
  }
}

struct CheckedInput {
  inner: Box<dyn InputReader>,
  schema: Schema,
}

#[async_trait]
impl InputReader for CheckedInput {
  async fn read(&mut self) -> Result<Value, JobError> {
    let value = self.inner.read().await?;
    self
      .schema
      .validate(&value)
      .map_err(|v| JobError::invalid_input(v.join("; ")))?;
    Ok(value)
  }
}

struct CheckedOutput {
  inner: Box<dyn OutputWriter>,
  schema: Schema,
}

#[async_trait]
impl OutputWriter for CheckedOutput {
  async fn write(&mut self, output: Value) -> Result<(), JobError> {
    self
      .schema
      .validate(&output)
      .map_err(|v| JobError::invalid_output(v.join("; ")))?;
    self.inner.write(output).await
  }
}
