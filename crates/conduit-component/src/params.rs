//! Execution parameters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::setup::Setup;

/// Per-trigger context supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SystemVariables {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pipeline_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub trigger_id: Option<String>,
  /// Who triggered the pipeline.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub requester_uid: Option<String>,
  /// Who owns the pipeline.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub owner_uid: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub request_id: Option<String>,
  /// Anything else the caller wants to pass through.
  #[serde(flatten)]
  pub extra: BTreeMap<String, Value>,
}

/// Everything needed to create an execution.
#[derive(Debug, Clone, Default)]
pub struct ExecutionParams {
  /// The component's id within the calling pipeline.
  pub component_id: String,
  /// The id of the component definition to execute.
  pub definition_id: String,
  pub system_variables: SystemVariables,
  /// The caller's setup. `None` is treated as an empty setup.
  pub setup: Option<Setup>,
  pub task: String,
}
