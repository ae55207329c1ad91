//! Per-execution configuration.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ComponentError;

/// A setup object: the configuration one execution runs with.
///
/// Fields are addressed by dotted paths (`auth.api-key`) so nested
/// credential fields can be resolved the same way as top-level ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Setup(Map<String, Value>);

impl Setup {
  pub fn new() -> Self {
    Self::default()
  }

  /// Build a setup from a JSON value. `null` becomes an empty setup.
  pub fn from_value(value: Value) -> Result<Self, ComponentError> {
    match value {
      Value::Null => Ok(Self::new()),
      Value::Object(map) => Ok(Self(map)),
      other => Err(ComponentError::invalid_setup(format!(
        "setup must be an object, got {}",
        other
      ))),
    }
  }

  pub fn get(&self, path: &str) -> Option<&Value> {
    let mut segments = path.split('.');
    let first = self.0.get(segments.next()?)?;
    segments.try_fold(first, |value, segment| value.get(segment))
  }

  /// String value of a field, if it is a string.
  pub fn get_str(&self, path: &str) -> Option<&str> {
    self.get(path).and_then(Value::as_str)
  }

  /// Set a field, creating missing or null intermediate objects.
  ///
  /// Fails if a value on the way is neither an object nor null; the setup is
  /// left unchanged in that case.
  pub fn set(&mut self, path: &str, value: Value) -> Result<(), ComponentError> {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(last) = segments.pop() else {
      return Ok(());
    };

    let mut map = &mut self.0;
    let mut walked = Vec::with_capacity(segments.len());
    for segment in segments {
      walked.push(segment);
      let entry = map.entry(segment.to_string()).or_insert(Value::Null);
      if entry.is_null() {
        *entry = Value::Object(Map::new());
      }
      let Value::Object(next) = entry else {
        return Err(ComponentError::invalid_setup(format!(
          "cannot set '{}': '{}' is not an object",
          path,
          walked.join(".")
        )));
      };
      map = next;
    }
    map.insert(last.to_string(), value);
    Ok(())
  }

  /// Decode the setup into a typed structure.
  pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ComponentError> {
    serde_json::from_value(self.to_value()).map_err(|e| ComponentError::invalid_setup(e.to_string()))
  }

  pub fn to_value(&self) -> Value {
    Value::Object(self.0.clone())
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl From<Map<String, Value>> for Setup {
  fn from(map: Map<String, Value>) -> Self {
    Self(map)
  }
}
