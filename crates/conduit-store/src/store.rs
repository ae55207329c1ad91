//! The component registry.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use conduit_component::definition::Definition;
use conduit_component::{
  Component, ExecutionParams, Setup, SystemVariables, VerificationOutcome,
};
use serde_json::Value;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::handle::ExecutionHandle;

/// Collects components during startup.
///
/// Registration only happens here; [`StoreBuilder::build`] freezes the
/// registry into a [`Store`] that can't be changed afterwards.
#[derive(Default)]
pub struct StoreBuilder {
  components: Vec<Arc<dyn Component>>,
  by_id: HashMap<String, usize>,
  by_uid: HashMap<Uuid, usize>,
}

impl StoreBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a component under its definition id and uid.
  ///
  /// A second component with the same id or uid is rejected; callers treat
  /// this as fatal at startup.
  pub fn import(mut self, component: Arc<dyn Component>) -> Result<Self, StoreError> {
    let definition = component.definition();
    let (id, uid) = (definition.id.clone(), definition.uid);

    if self.by_id.contains_key(&id) {
      return Err(StoreError::DuplicateComponent {
        key: format!("id '{}'", id),
      });
    }
    if self.by_uid.contains_key(&uid) {
      return Err(StoreError::DuplicateComponent {
        key: format!("uid {}", uid),
      });
    }

    let index = self.components.len();
    self.by_id.insert(id.clone(), index);
    self.by_uid.insert(uid, index);
    self.components.push(component);

    info!(definition_id = %id, definition_uid = %uid, "component imported");

    Ok(self)
  }

  pub fn build(self) -> Store {
    Store {
      components: self.components,
      by_id: self.by_id,
      by_uid: self.by_uid,
    }
  }
}

/// The process-wide, read-only map from definition id/uid to component.
///
/// Lookups take no locks: the maps are never modified after startup.
pub struct Store {
  components: Vec<Arc<dyn Component>>,
  by_id: HashMap<String, usize>,
  by_uid: HashMap<Uuid, usize>,
}

impl Store {
  pub fn builder() -> StoreBuilder {
    StoreBuilder::new()
  }

  fn component(&self, id: &str) -> Result<&Arc<dyn Component>, StoreError> {
    self
      .by_id
      .get(id)
      .map(|&i| &self.components[i])
      .ok_or_else(|| StoreError::DefinitionNotFound { id: id.to_string() })
  }

  /// Create an execution for one trigger.
  #[instrument(
    name = "create_execution",
    skip(self, params),
    fields(
      definition_id = %params.definition_id,
      component_id = %params.component_id,
      task = %params.task,
    )
  )]
  pub fn create_execution(&self, params: ExecutionParams) -> Result<ExecutionHandle, StoreError> {
    let component = self.component(&params.definition_id)?;
    let definition_id = params.definition_id.clone();

    let execution = component.create_execution(params).map_err(|source| {
      warn!(error = %source, "failed to create execution");
      StoreError::CreateExecution { source }
    })?;

    Ok(ExecutionHandle::new(definition_id, execution))
  }

  /// A copy of a definition, projected for the caller.
  pub fn get_definition_by_id(
    &self,
    id: &str,
    vars: &SystemVariables,
  ) -> Result<Definition, StoreError> {
    Ok(self.component(id)?.definition_for(vars))
  }

  /// A copy of a definition, projected for the caller.
  pub fn get_definition_by_uid(
    &self,
    uid: Uuid,
    vars: &SystemVariables,
  ) -> Result<Definition, StoreError> {
    self
      .by_uid
      .get(&uid)
      .map(|&i| self.components[i].definition_for(vars))
      .ok_or(StoreError::DefinitionUidNotFound { uid })
  }

  /// Copies of every definition, in registration order.
  pub fn list_definitions(&self, vars: &SystemVariables, include_tombstoned: bool) -> Vec<Definition> {
    self
      .components
      .iter()
      .filter(|c| include_tombstoned || !c.definition().tombstone)
      .map(|c| c.definition_for(vars))
      .collect()
  }

  /// Whether a setup field of a definition should be masked.
  pub fn is_secret_field(&self, definition_id: &str, path: &str) -> Result<bool, StoreError> {
    Ok(self.component(definition_id)?.definition().is_secret_field(path))
  }

  /// Probe a setup against the component's external system.
  #[instrument(name = "test_connection", skip(self, vars, setup))]
  pub async fn test_connection(
    &self,
    definition_id: &str,
    vars: &SystemVariables,
    setup: Option<Setup>,
  ) -> Result<(), StoreError> {
    self
      .component(definition_id)?
      .test(vars, setup)
      .await
      .map_err(|source| StoreError::Component {
        id: definition_id.to_string(),
        source,
      })
  }

  /// Offer an inbound webhook request to the component for verification.
  pub async fn handle_verification_event(
    &self,
    definition_id: &str,
    headers: &BTreeMap<String, String>,
    body: &Value,
    setup: Option<Setup>,
  ) -> Result<VerificationOutcome, StoreError> {
    self
      .component(definition_id)?
      .handle_verification_event(headers, body, setup)
      .await
      .map_err(|source| StoreError::Component {
        id: definition_id.to_string(),
        source,
      })
  }
}
