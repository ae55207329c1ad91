//! Conduit Definition
//!
//! Static descriptions of components: metadata, the setup schema, and the
//! input/output schemas of every task a component supports. Definitions are
//! parsed from documents embedded in each connector and validated once; a
//! definition that fails to load can never be registered.

mod cell;
mod definition;
mod error;
pub mod schema;

pub use cell::DefinitionCell;
pub use definition::{
  ComponentType, Definition, DefinitionDocuments, ReleaseStage, TaskDefinition,
};
pub use error::DefinitionError;
pub use schema::Schema;
