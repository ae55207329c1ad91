//! Conduit Connectors
//!
//! Built-in components. Each one embeds its definition documents, loads
//! them once, and implements the component contract:
//!
//! - [`http`]: requests against any HTTP endpoint, run concurrently
//! - [`text`]: pure text transforms, run sequentially
//! - [`llm`]: OpenAI-compatible text generation with an injectable API key

use conduit_component::ComponentContext;
use conduit_component::definition::DefinitionError;
use conduit_store::{Store, StoreError};

pub mod http;
pub mod llm;
pub mod text;
mod verification;

/// Errors raised while assembling the built-in store.
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
  #[error("failed to load component definition: {0}")]
  Definition(#[from] DefinitionError),

  #[error("failed to register component: {0}")]
  Store(#[from] StoreError),
}

/// A store holding every built-in component.
pub fn builtin_store(ctx: &ComponentContext) -> Result<Store, ConnectorError> {
  let store = Store::builder()
    .import(http::init(ctx)?)?
    .import(text::init(ctx)?)?
    .import(llm::init(ctx)?)?
    .build();

  Ok(store)
}
