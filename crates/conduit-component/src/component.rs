//! The component and execution contracts.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use conduit_definition::Definition;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::context::InjectedSecrets;
use crate::credentials::{ResolvedSetup, resolve_setup};
use crate::error::ComponentError;
use crate::job::Job;
use crate::params::{ExecutionParams, SystemVariables};
use crate::setup::Setup;

/// Result of offering an inbound webhook request to a component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationOutcome {
  /// Whether the request was a verification handshake rather than an event.
  pub is_verification: bool,
  /// The body to answer the handshake with.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub response: Option<Value>,
}

/// A connector: a stateless factory of executions bound to one definition.
///
/// One instance lives for the whole process and is shared by every trigger.
#[async_trait]
pub trait Component: Send + Sync {
  fn base(&self) -> &ComponentBase;

  fn definition(&self) -> &Definition {
    self.base().definition()
  }

  /// The definition as presented to a particular caller.
  fn definition_for(&self, vars: &SystemVariables) -> Definition {
    self.base().definition_for(vars)
  }

  /// Create an execution for one trigger.
  ///
  /// Fails without creating anything if the task is unknown, a credential
  /// can't be resolved, or the setup is invalid.
  fn create_execution(&self, params: ExecutionParams) -> Result<Box<dyn Execution>, ComponentError>;

  /// Check a setup against the external system without running a task.
  async fn test(&self, _vars: &SystemVariables, _setup: Option<Setup>) -> Result<(), ComponentError> {
    Err(ComponentError::Unsupported { operation: "test" })
  }

  /// Answer a webhook verification handshake, if the request is one.
  async fn handle_verification_event(
    &self,
    _headers: &BTreeMap<String, String>,
    _body: &Value,
    _setup: Option<Setup>,
  ) -> Result<VerificationOutcome, ComponentError> {
    Err(ComponentError::Unsupported {
      operation: "handle_verification_event",
    })
  }
}

/// A per-trigger instance of a component, bound to one task and one setup.
#[async_trait]
pub trait Execution: Send + Sync {
  fn base(&self) -> &ExecutionBase;

  /// Process a batch of jobs.
  ///
  /// Returns an error only if the batch as a whole can't run. Failures of
  /// individual jobs go to their error reporters.
  async fn execute(&self, cancel: CancellationToken, jobs: Vec<Job>) -> Result<(), ComponentError>;

  fn task(&self) -> &str {
    &self.base().task
  }

  fn uses_injected_credentials(&self) -> bool {
    self.base().uses_injected_credentials
  }
}

/// State every execution carries.
#[derive(Debug, Clone)]
pub struct ExecutionBase {
  pub component_id: String,
  pub definition: Arc<Definition>,
  pub task: String,
  /// The resolved, validated setup. Owned by this execution alone.
  pub setup: Setup,
  pub system_variables: SystemVariables,
  pub uses_injected_credentials: bool,
}

/// Shared plumbing for components: the definition and injected credentials.
#[derive(Debug, Clone)]
pub struct ComponentBase {
  definition: Arc<Definition>,
  secrets: InjectedSecrets,
  credential_fields: Vec<String>,
}

impl ComponentBase {
  pub fn new(definition: Arc<Definition>, secrets: InjectedSecrets) -> Self {
    let credential_fields = definition.credential_fields();
    Self {
      definition,
      secrets,
      credential_fields,
    }
  }

  pub fn definition(&self) -> &Definition {
    &self.definition
  }

  pub fn secrets(&self) -> &InjectedSecrets {
    &self.secrets
  }

  /// Resolve credential fields, then check the setup against its schema.
  pub fn resolve_setup(&self, setup: Option<Setup>) -> Result<ResolvedSetup, ComponentError> {
    let resolved = resolve_setup(setup, &self.credential_fields, &self.secrets)?;

    self
      .definition
      .setup_schema()
      .validate(&resolved.setup.to_value())
      .map_err(|violations| ComponentError::invalid_setup(violations.join("; ")))?;

    Ok(resolved)
  }

  /// Check the task and resolve the setup for a new execution.
  pub fn prepare(&self, params: ExecutionParams) -> Result<ExecutionBase, ComponentError> {
    if !self.definition.has_task(&params.task) {
      return Err(ComponentError::UnsupportedTask { task: params.task });
    }

    let resolved = self.resolve_setup(params.setup)?;

    debug!(
      definition_id = %self.definition.id,
      component_id = %params.component_id,
      task = %params.task,
      uses_injected_credentials = resolved.uses_injected_credentials,
      "execution prepared"
    );

    Ok(ExecutionBase {
      component_id: params.component_id,
      definition: self.definition.clone(),
      task: params.task,
      setup: resolved.setup,
      system_variables: params.system_variables,
      uses_injected_credentials: resolved.uses_injected_credentials,
    })
  }

  /// The definition with injectable credential fields no longer required.
  pub fn definition_for(&self, _vars: &SystemVariables) -> Definition {
    let mut definition = (*self.definition).clone();
    for field in &self.credential_fields {
      if self.secrets.get(field).is_some() {
        definition.make_setup_field_optional(field);
      }
    }
    definition
  }
}
