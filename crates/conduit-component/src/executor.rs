//! Batch executor strategies.
//!
//! A strategy turns a task function, which maps one input to one output,
//! into processing of a whole batch of jobs. Every job ends with exactly one
//! of: its output written, or an error reported. A failing job never stops
//! its siblings.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::JobError;
use crate::job::{InputReader, Job};

/// Future returned by a [`TaskFn`].
pub type TaskFuture = BoxFuture<'static, Result<Value, JobError>>;

/// A task bound to its per-batch resources: one input in, one output out.
///
/// The token is cancelled when the batch is; long-running calls should
/// select on it.
pub type TaskFn = Arc<dyn Fn(Value, CancellationToken) -> TaskFuture + Send + Sync>;

/// How the jobs of a batch are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
  /// One job at a time, in batch order. Side effects happen in batch order.
  Sequential,
  /// One concurrent unit per job, joined before returning. No ordering.
  Concurrent,
}

impl Strategy {
  /// Process every job of the batch with `task`.
  ///
  /// Returns once every job has an outcome. On cancellation, jobs that
  /// hadn't finished report [`JobError::Cancelled`].
  pub async fn run(self, cancel: &CancellationToken, jobs: Vec<Job>, task: TaskFn) {
    debug!(strategy = ?self, jobs = jobs.len(), "running batch");

    match self {
      Self::Sequential => {
        for (index, job) in jobs.into_iter().enumerate() {
          run_job(index, job, &task, cancel).await;
        }
      }
      Self::Concurrent => {
        let handles: Vec<_> = jobs
          .into_iter()
          .enumerate()
          .map(|(index, job)| {
            let task = task.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { run_job(index, job, &task, &cancel).await })
          })
          .collect();

        for result in join_all(handles).await {
          if let Err(e) = result {
            error!(error = %e, "job unit failed to complete");
          }
        }
      }
    }
  }
}

/// Read, invoke, then write or report. Exactly one of the last two happens.
async fn run_job(index: usize, job: Job, task: &TaskFn, cancel: &CancellationToken) {
  let Job {
    mut input,
    mut output,
    mut error,
  } = job;

  let result = if cancel.is_cancelled() {
    Err(JobError::Cancelled)
  } else {
    let work = AssertUnwindSafe(produce(&mut input, task, cancel)).catch_unwind();
    tokio::select! {
      biased;
      _ = cancel.cancelled() => Err(JobError::Cancelled),
      result = work => result.unwrap_or_else(|panic| Err(panicked(panic))),
    }
  };

  let result = match result {
    Ok(value) => AssertUnwindSafe(output.write(value))
      .catch_unwind()
      .await
      .unwrap_or_else(|panic| Err(panicked(panic))),
    Err(e) => Err(e),
  };

  match result {
    Ok(()) => debug!(job_index = index, "job completed"),
    Err(e) => {
      warn!(job_index = index, error = %e, "job failed");
      if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(|| error.report(e))) {
        error!(job_index = index, error = %panicked(panic), "error reporter panicked");
      }
    }
  }
}

async fn produce(
  input: &mut Box<dyn InputReader>,
  task: &TaskFn,
  cancel: &CancellationToken,
) -> Result<Value, JobError> {
  let value = input.read().await?;
  task(value, cancel.clone()).await
}

fn panicked(panic: Box<dyn Any + Send>) -> JobError {
  let message = if let Some(s) = panic.downcast_ref::<&str>() {
    s.to_string()
  } else if let Some(s) = panic.downcast_ref::<String>() {
    s.clone()
  } else {
    "unknown panic".to_string()
  };
  JobError::Panicked { message }
}
