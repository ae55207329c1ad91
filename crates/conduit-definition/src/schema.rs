//! JSON Schema checks for definitions.
//!
//! Setup, task input and task output are described with JSON Schema
//! documents. Documents are checked against the meta-schema when a definition
//! loads and compiled once; values are validated against the compiled form.
//!
//! Setup properties may also carry `secret` and `credential` annotations,
//! which only make sense on string fields.

use std::fmt;
use std::sync::Arc;

use jsonschema::Validator;
use serde_json::Value;

/// A compiled JSON Schema document.
#[derive(Clone)]
pub struct Schema {
  source: Arc<Value>,
  validator: Arc<Validator>,
}

impl Schema {
  /// Compile a schema document.
  pub fn compile(schema: &Value) -> Result<Self, String> {
    let validator = jsonschema::validator_for(schema).map_err(|e| e.to_string())?;
    Ok(Self {
      source: Arc::new(schema.clone()),
      validator: Arc::new(validator),
    })
  }

  /// The document this schema was compiled from.
  pub fn source(&self) -> &Value {
    &self.source
  }

  /// Validate a value, collecting every violation.
  ///
  /// Each violation is prefixed with the JSON pointer of the offending value.
  pub fn validate(&self, value: &Value) -> Result<(), Vec<String>> {
    let violations: Vec<String> = self
      .validator
      .iter_errors(value)
      .map(|e| {
        let path = e.instance_path.to_string();
        let path = if path.is_empty() { "/".to_string() } else { path };
        format!("{}: {}", path, e)
      })
      .collect();

    if violations.is_empty() {
      Ok(())
    } else {
      Err(violations)
    }
  }
}

impl fmt::Debug for Schema {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("Schema").field(&self.source).finish()
  }
}

impl PartialEq for Schema {
  fn eq(&self, other: &Self) -> bool {
    self.source == other.source
  }
}

/// Check that a schema document is well-formed.
///
/// `location` is used as the prefix of the returned error location.
pub fn check_schema(schema: &Value, location: &str) -> Result<(), (String, String)> {
  if let Err(e) = jsonschema::meta::validate(schema) {
    let path = e.instance_path.to_string();
    return Err((format!("{}{}", location, path), e.to_string()));
  }

  check_annotations(schema, location)
}

fn check_annotations(schema: &Value, location: &str) -> Result<(), (String, String)> {
  let Some(object) = schema.as_object() else {
    return Ok(());
  };

  for flag in ["secret", "credential"] {
    match object.get(flag) {
      None | Some(Value::Bool(false)) => {}
      Some(Value::Bool(true)) => {
        if object.get("type").and_then(Value::as_str) != Some("string") {
          return Err((location.to_string(), format!("'{}' fields must be strings", flag)));
        }
      }
      Some(_) => {
        return Err((location.to_string(), format!("'{}' must be a boolean", flag)));
      }
    }
  }

  if let Some(properties) = object.get("properties").and_then(Value::as_object) {
    for (name, property) in properties {
      check_annotations(property, &format!("{}.{}", location, name))?;
    }
  }

  if let Some(items) = object.get("items") {
    check_annotations(items, &format!("{}[]", location))?;
  }

  Ok(())
}
