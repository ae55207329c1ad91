//! Conduit Store
//!
//! The single registry the orchestration layer talks to. Components are
//! imported once at startup through a [`StoreBuilder`]; the built [`Store`]
//! creates executions, answers definition lookups and delegates
//! connectivity probes and webhook verification to the right component.

mod error;
mod handle;
mod store;

pub use error::StoreError;
pub use handle::ExecutionHandle;
pub use store::{Store, StoreBuilder};
