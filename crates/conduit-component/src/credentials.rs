//! Credential resolution.
//!
//! A credential field in a setup either carries its own value or holds the
//! [`USE_INJECTED_SECRET`] sentinel, deferring to a value injected into the
//! component at startup. Resolution produces a new setup; the caller's value
//! is consumed and never shared with another execution.

use serde_json::Value;
use tracing::debug;

use crate::context::InjectedSecrets;
use crate::error::ComponentError;
use crate::setup::Setup;

/// Sentinel value telling a component to use its injected credential.
pub const USE_INJECTED_SECRET: &str = "__USE_SECRET__";

/// A setup with every credential field resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSetup {
  pub setup: Setup,
  /// Whether any credential came from the injected secrets.
  pub uses_injected_credentials: bool,
}

/// Resolve the credential `fields` of a setup against injected `secrets`.
///
/// For each field: a real value (present, non-empty, not the sentinel) is
/// kept as-is. Otherwise the injected value is written in, or resolution
/// fails with [`ComponentError::UnresolvedCredential`] if there is none.
pub fn resolve_setup(
  setup: Option<Setup>,
  fields: &[String],
  secrets: &InjectedSecrets,
) -> Result<ResolvedSetup, ComponentError> {
  let mut setup = setup.unwrap_or_default();
  let mut uses_injected_credentials = false;

  for field in fields {
    if has_real_value(setup.get(field)) {
      continue;
    }

    let Some(injected) = secrets.get(field) else {
      return Err(ComponentError::UnresolvedCredential {
        field: field.clone(),
      });
    };

    debug!(field = %field, "using injected credential");
    setup.set(field, Value::String(injected.to_string()))?;
    uses_injected_credentials = true;
  }

  Ok(ResolvedSetup {
    setup,
    uses_injected_credentials,
  })
}

fn has_real_value(value: Option<&Value>) -> bool {
  match value {
    None | Some(Value::Null) => false,
    Some(Value::String(s)) => !s.is_empty() && s != USE_INJECTED_SECRET,
    Some(_) => true,
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn setup(value: Value) -> Option<Setup> {
    Some(Setup::from_value(value).unwrap())
  }

  fn fields() -> Vec<String> {
    vec!["api-key".to_string()]
  }

  #[test]
  fn test_sentinel_uses_injected_value() {
    let secrets = InjectedSecrets::new().with("api-key", "sk-real");

    let resolved = resolve_setup(setup(json!({"api-key": "__USE_SECRET__"})), &fields(), &secrets).unwrap();

    assert_eq!(resolved.setup.get_str("api-key"), Some("sk-real"));
    assert!(resolved.uses_injected_credentials);
  }

  #[test]
  fn test_sentinel_without_injected_value_fails() {
    let err = resolve_setup(
      setup(json!({"api-key": "__USE_SECRET__"})),
      &fields(),
      &InjectedSecrets::new(),
    )
    .unwrap_err();

    assert!(matches!(
      err,
      ComponentError::UnresolvedCredential { field } if field == "api-key"
    ));
  }

  #[test]
  fn test_explicit_value_is_kept() {
    let secrets = InjectedSecrets::new().with("api-key", "sk-real");

    let resolved = resolve_setup(setup(json!({"api-key": "sk-mine"})), &fields(), &secrets).unwrap();

    assert_eq!(resolved.setup.get_str("api-key"), Some("sk-mine"));
    assert!(!resolved.uses_injected_credentials);
  }

  #[test]
  fn test_missing_or_empty_field_defers_to_injected_value() {
    let secrets = InjectedSecrets::new().with("api-key", "sk-real");

    for raw in [None, setup(json!({})), setup(json!({"api-key": ""})), setup(json!({"api-key": null}))] {
      let resolved = resolve_setup(raw, &fields(), &secrets).unwrap();
      assert_eq!(resolved.setup.get_str("api-key"), Some("sk-real"));
      assert!(resolved.uses_injected_credentials);
    }
  }

  #[test]
  fn test_empty_field_without_injected_value_fails() {
    let err = resolve_setup(setup(json!({"api-key": ""})), &fields(), &InjectedSecrets::new()).unwrap_err();
    assert!(matches!(err, ComponentError::UnresolvedCredential { .. }));

    let empty_injected = InjectedSecrets::new().with("api-key", "");
    let err = resolve_setup(None, &fields(), &empty_injected).unwrap_err();
    assert!(matches!(err, ComponentError::UnresolvedCredential { .. }));
  }

  #[test]
  fn test_nested_credential_field() {
    let secrets = InjectedSecrets::new().with("auth.token", "tok");
    let fields = vec!["auth.token".to_string()];

    let resolved = resolve_setup(
      setup(json!({"auth": {"token": "__USE_SECRET__", "user": "ada"}})),
      &fields,
      &secrets,
    )
    .unwrap();

    assert_eq!(
      resolved.setup.to_value(),
      json!({"auth": {"token": "tok", "user": "ada"}})
    );
  }

  #[test]
  fn test_nested_credential_under_scalar_is_invalid_setup() {
    let secrets = InjectedSecrets::new().with("auth.token", "tok");
    let fields = vec!["auth.token".to_string()];

    let err = resolve_setup(setup(json!({"auth": "basic"})), &fields, &secrets).unwrap_err();

    assert!(matches!(err, ComponentError::InvalidSetup { .. }));
  }

  #[test]
  fn test_resolution_is_idempotent() {
    let secrets = InjectedSecrets::new().with("api-key", "sk-real");
    let raw = setup(json!({"api-key": "__USE_SECRET__", "model": "m"}));

    let first = resolve_setup(raw.clone(), &fields(), &secrets).unwrap();
    let second = resolve_setup(raw.clone(), &fields(), &secrets).unwrap();
    let again = resolve_setup(Some(first.setup.clone()), &fields(), &secrets).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.setup, again.setup);
    // The caller's copy is untouched.
    assert_eq!(raw.unwrap().get_str("api-key"), Some(USE_INJECTED_SECRET));
  }

  #[test]
  fn test_no_credential_fields() {
    let resolved = resolve_setup(None, &[], &InjectedSecrets::new()).unwrap();

    assert!(resolved.setup.is_empty());
    assert!(!resolved.uses_injected_credentials);
  }
}
