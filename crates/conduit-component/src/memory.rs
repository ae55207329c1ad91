//! In-memory jobs.
//!
//! [`MemoryBatch`] builds a batch of jobs from values held in memory and
//! records everything the execution does with them. The CLI uses it to run
//! batches from files; tests use it to check outcomes and ordering.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::JobError;
use crate::job::{ErrorReporter, Job, LazyInput, OutputWriter};

/// Something an execution did with a job, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
  Output { index: usize, value: Value },
  Error { index: usize, error: JobError },
}

impl JobEvent {
  pub fn index(&self) -> usize {
    match self {
      Self::Output { index, .. } | Self::Error { index, .. } => *index,
    }
  }
}

/// What happened to one job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
  /// Neither an output nor an error was recorded.
  Pending,
  Output(Value),
  Error(JobError),
  /// Both were recorded, or one of them more than once.
  Conflict { outputs: usize, errors: usize },
}

/// Shared record of a batch's events.
#[derive(Debug, Clone)]
pub struct BatchRecorder {
  len: usize,
  events: Arc<Mutex<Vec<JobEvent>>>,
}

impl BatchRecorder {
  fn lock(&self) -> MutexGuard<'_, Vec<JobEvent>> {
    self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  fn push(&self, event: JobEvent) {
    self.lock().push(event);
  }

  /// Every event, in the order it was recorded.
  pub fn events(&self) -> Vec<JobEvent> {
    self.lock().clone()
  }

  /// The outcome of every job, in batch order.
  pub fn outcomes(&self) -> Vec<JobOutcome> {
    let events = self.lock();
    (0..self.len)
      .map(|index| {
        let mut outputs = Vec::new();
        let mut errors = Vec::new();
        for event in events.iter().filter(|e| e.index() == index) {
          match event {
            JobEvent::Output { value, .. } => outputs.push(value),
            JobEvent::Error { error, .. } => errors.push(error),
          }
        }
        match (outputs.as_slice(), errors.as_slice()) {
          ([], []) => JobOutcome::Pending,
          ([value], []) => JobOutcome::Output((*value).clone()),
          ([], [error]) => JobOutcome::Error((*error).clone()),
          _ => JobOutcome::Conflict {
            outputs: outputs.len(),
            errors: errors.len(),
          },
        }
      })
      .collect()
  }
}

/// Builds in-memory jobs.
pub struct MemoryBatch;

impl MemoryBatch {
  /// Jobs whose inputs are the given values.
  pub fn new(inputs: Vec<Value>) -> (Vec<Job>, BatchRecorder) {
    Self::lazy(inputs.into_iter().map(LazyInput::ready).collect())
  }

  /// Jobs whose inputs are produced on first read.
  pub fn lazy(inputs: Vec<LazyInput>) -> (Vec<Job>, BatchRecorder) {
    let recorder = BatchRecorder {
      len: inputs.len(),
      events: Arc::new(Mutex::new(Vec::new())),
    };

    let jobs = inputs
      .into_iter()
      .enumerate()
      .map(|(index, input)| {
        Job::new(
          input,
          MemoryOutput {
            index,
            written: false,
            recorder: recorder.clone(),
          },
          MemoryErrors {
            index,
            recorder: recorder.clone(),
          },
        )
      })
      .collect();

    (jobs, recorder)
  }
}

struct MemoryOutput {
  index: usize,
  written: bool,
  recorder: BatchRecorder,
}

#[async_trait]
impl OutputWriter for MemoryOutput {
  async fn write(&mut self, output: Value) -> Result<(), JobError> {
    if self.written {
      return Err(JobError::OutputAlreadyWritten);
    }
    self.written = true;
    self.recorder.push(JobEvent::Output {
      index: self.index,
      value: output,
    });
    Ok(())
  }
}

struct MemoryErrors {
  index: usize,
  recorder: BatchRecorder,
}

impl ErrorReporter for MemoryErrors {
  fn report(&mut self, error: JobError) {
    self.recorder.push(JobEvent::Error {
      index: self.index,
      error,
    });
  }
}
