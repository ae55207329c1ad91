//! Conduit Component
//!
//! The contract every connector implements, and the machinery shared by all
//! of them:
//!
//! - [`Component`] and [`Execution`]: the factory and per-trigger instance
//! - [`Job`]: one unit of work with separate input, output and error sides
//! - [`Strategy`]: sequential or concurrent dispatch of a batch of jobs
//! - [`resolve_setup`]: explicit or injected credential values
//! - [`TaskTable`]: task name to implementation, checked against the definition

mod component;
mod context;
mod credentials;
mod dispatch;
mod error;
mod executor;
mod job;
mod memory;
mod params;
mod setup;
mod task;

pub use component::{Component, ComponentBase, Execution, ExecutionBase, VerificationOutcome};
pub use context::{ComponentContext, InjectedSecrets};
pub use credentials::{ResolvedSetup, USE_INJECTED_SECRET, resolve_setup};
pub use dispatch::TaskTable;
pub use error::{ComponentError, JobError};
pub use executor::{Strategy, TaskFn, TaskFuture};
pub use job::{ErrorReporter, InputReader, Job, LazyInput, OutputWriter};
pub use memory::{BatchRecorder, JobEvent, JobOutcome, MemoryBatch};
pub use params::{ExecutionParams, SystemVariables};
pub use setup::Setup;
pub use task::task_fn;

pub use conduit_definition as definition;
