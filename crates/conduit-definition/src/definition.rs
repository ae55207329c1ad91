//! Component definition model and loading.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::error::DefinitionError;
use crate::schema::{Schema, check_schema};

/// Broad category of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
  Ai,
  Data,
  Application,
  Operator,
  Generic,
}

/// Maturity of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStage {
  Alpha,
  Beta,
  Ga,
}

/// A task a component can run, with its input and output schemas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
  pub title: String,
  #[serde(default)]
  pub description: String,
  pub input: Value,
  pub output: Value,
}

/// The embedded documents a definition is built from.
#[derive(Debug, Clone, Copy)]
pub struct DefinitionDocuments<'a> {
  /// Metadata: id, uid, title, vendor, available tasks, ...
  pub definition: &'a str,
  /// JSON Schema of the setup object.
  pub setup: &'a str,
  /// Task name to task definition.
  pub tasks: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
struct Metadata {
  id: String,
  uid: Uuid,
  title: String,
  #[serde(default)]
  description: String,
  #[serde(default)]
  vendor: String,
  version: String,
  #[serde(rename = "type")]
  component_type: ComponentType,
  release_stage: ReleaseStage,
  #[serde(default)]
  tombstone: bool,
  #[serde(default = "default_public")]
  public: bool,
  #[serde(default)]
  documentation_url: Option<String>,
  available_tasks: Vec<String>,
}

fn default_public() -> bool {
  true
}

/// Static description of a component.
///
/// Built once from embedded documents and shared read-only afterwards.
/// Callers receive clones, so mutating a returned definition never affects
/// the registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Definition {
  pub id: String,
  pub uid: Uuid,
  pub title: String,
  pub description: String,
  pub vendor: String,
  pub version: String,
  #[serde(rename = "type")]
  pub component_type: ComponentType,
  pub release_stage: ReleaseStage,
  pub tombstone: bool,
  pub public: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub documentation_url: Option<String>,
  pub available_tasks: Vec<String>,
  pub setup: Value,
  pub tasks: BTreeMap<String, TaskDefinition>,
  #[serde(skip)]
  compiled: CompiledSchemas,
}

/// Schemas compiled at load time, shared by every clone of a definition.
#[derive(Debug, Clone, PartialEq)]
struct CompiledSchemas {
  setup: Schema,
  inputs: BTreeMap<String, Schema>,
  outputs: BTreeMap<String, Schema>,
}

impl Definition {
  /// Parse and validate a definition from its documents.
  pub fn load(documents: DefinitionDocuments<'_>) -> Result<Self, DefinitionError> {
    let metadata: Metadata = parse("definition.json", documents.definition)?;
    let setup: Value = parse("setup.json", documents.setup)?;
    let tasks: BTreeMap<String, TaskDefinition> = parse("tasks.json", documents.tasks)?;

    check_structure(&metadata, &tasks)?;

    let id = metadata.id.clone();
    let compile = |schema: &Value, location: String| -> Result<Schema, DefinitionError> {
      check_object_schema(&id, schema, &location)?;
      Schema::compile(schema).map_err(|message| DefinitionError::InvalidSchema {
        id: id.clone(),
        location,
        message,
      })
    };

    let setup_schema = compile(&setup, "setup".to_string())?;
    let mut inputs = BTreeMap::new();
    let mut outputs = BTreeMap::new();
    for (name, task) in &tasks {
      inputs.insert(name.clone(), compile(&task.input, format!("{}.input", name))?);
      outputs.insert(name.clone(), compile(&task.output, format!("{}.output", name))?);
    }
    let compiled = CompiledSchemas {
      setup: setup_schema,
      inputs,
      outputs,
    };

    let definition = Self {
      id: metadata.id,
      uid: metadata.uid,
      title: metadata.title,
      description: metadata.description,
      vendor: metadata.vendor,
      version: metadata.version,
      component_type: metadata.component_type,
      release_stage: metadata.release_stage,
      tombstone: metadata.tombstone,
      public: metadata.public,
      documentation_url: metadata.documentation_url,
      available_tasks: metadata.available_tasks,
      setup,
      tasks,
      compiled,
    };

    debug!(
      definition_id = %definition.id,
      definition_uid = %definition.uid,
      tasks = ?definition.available_tasks,
      "definition loaded"
    );

    Ok(definition)
  }

  /// The compiled setup schema.
  ///
  /// Always the schema as declared, even on a projected copy.
  pub fn setup_schema(&self) -> &Schema {
    &self.compiled.setup
  }

  /// The compiled input schema of a task.
  pub fn input_schema(&self, task: &str) -> Option<&Schema> {
    self.compiled.inputs.get(task)
  }

  /// The compiled output schema of a task.
  pub fn output_schema(&self, task: &str) -> Option<&Schema> {
    self.compiled.outputs.get(task)
  }

  /// Look up a task definition by name.
  pub fn task(&self, name: &str) -> Option<&TaskDefinition> {
    self.tasks.get(name)
  }

  /// Whether the definition declares the given task.
  pub fn has_task(&self, name: &str) -> bool {
    self.available_tasks.iter().any(|t| t == name)
  }

  /// Whether a setup field is credential-like and should be masked.
  ///
  /// `path` is a dotted path into the setup, optionally prefixed with
  /// `setup.`, e.g. `setup.auth.api-key` or `api-key`.
  pub fn is_secret_field(&self, path: &str) -> bool {
    let path = path.strip_prefix("setup.").unwrap_or(path);
    self
      .setup_property(path)
      .is_some_and(|p| flag(p, "secret") || flag(p, "credential"))
  }

  /// Dotted paths of every setup field that accepts an injected credential.
  pub fn credential_fields(&self) -> Vec<String> {
    let mut fields = Vec::new();
    collect_credentials(&self.setup, "", &mut fields);
    fields
  }

  /// Drop a setup field from its parent's `required` list.
  ///
  /// Used to project a definition for callers that don't need to supply
  /// a field themselves.
  pub fn make_setup_field_optional(&mut self, path: &str) {
    let (parent, field) = match path.rsplit_once('.') {
      Some((parent, field)) => (Some(parent), field),
      None => (None, path),
    };

    let schema = match parent {
      Some(parent) => self.setup_property_mut(parent),
      None => Some(&mut self.setup),
    };

    if let Some(required) = schema
      .and_then(|s| s.get_mut("required"))
      .and_then(Value::as_array_mut)
    {
      required.retain(|name| name.as_str() != Some(field));
    }
  }

  fn setup_property(&self, path: &str) -> Option<&Value> {
    path.split('.').try_fold(&self.setup, |schema, segment| {
      schema.get("properties")?.get(segment)
    })
  }

  fn setup_property_mut(&mut self, path: &str) -> Option<&mut Value> {
    path.split('.').try_fold(&mut self.setup, |schema, segment| {
      schema.get_mut("properties")?.get_mut(segment)
    })
  }
}

fn check_structure(
  metadata: &Metadata,
  tasks: &BTreeMap<String, TaskDefinition>,
) -> Result<(), DefinitionError> {
  let id = &metadata.id;

  if !is_kebab_case(id) {
    return Err(DefinitionError::InvalidId { id: id.clone() });
  }

  if metadata.available_tasks.is_empty() {
    return Err(DefinitionError::NoTasks { id: id.clone() });
  }

  for task in &metadata.available_tasks {
    if !tasks.contains_key(task) {
      return Err(DefinitionError::UndefinedTask {
        id: id.clone(),
        task: task.clone(),
      });
    }
  }

  for task in tasks.keys() {
    if !metadata.available_tasks.contains(task) {
      return Err(DefinitionError::UnlistedTask {
        id: id.clone(),
        task: task.clone(),
      });
    }
  }

  Ok(())
}

fn check_object_schema(id: &str, schema: &Value, location: &str) -> Result<(), DefinitionError> {
  let invalid = |location: String, message: String| DefinitionError::InvalidSchema {
    id: id.to_string(),
    location,
    message,
  };

  check_schema(schema, location).map_err(|(location, message)| invalid(location, message))?;

  if schema.get("type").and_then(Value::as_str) != Some("object") {
    return Err(invalid(
      location.to_string(),
      "top-level schema must have type 'object'".to_string(),
    ));
  }

  Ok(())
}

fn parse<T: serde::de::DeserializeOwned>(
  document: &'static str,
  contents: &str,
) -> Result<T, DefinitionError> {
  serde_json::from_str(contents).map_err(|e| DefinitionError::Parse {
    document,
    message: e.to_string(),
  })
}

fn flag(schema: &Value, name: &str) -> bool {
  schema.get(name).and_then(Value::as_bool).unwrap_or(false)
}

fn collect_credentials(schema: &Value, prefix: &str, fields: &mut Vec<String>) {
  let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
    return;
  };

  for (name, property) in properties {
    let path = if prefix.is_empty() {
      name.clone()
    } else {
      format!("{}.{}", prefix, name)
    };
    if flag(property, "credential") {
      fields.push(path.clone());
    }
    collect_credentials(property, &path, fields);
  }
}

fn is_kebab_case(id: &str) -> bool {
  !id.is_empty()
    && !id.starts_with('-')
    && !id.ends_with('-')
    && !id.contains("--")
    && id
      .chars()
      .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
