//! Webhook verification handshakes.

use conduit_component::{ComponentError, VerificationOutcome};
use serde_json::{Value, json};

/// Answer a `{"type": "url_verification", "challenge": ...}` handshake.
///
/// Any other body is not a verification request.
pub(crate) fn url_verification(body: &Value) -> Result<VerificationOutcome, ComponentError> {
  if body.get("type").and_then(Value::as_str) != Some("url_verification") {
    return Ok(VerificationOutcome::default());
  }

  let challenge = body
    .get("challenge")
    .and_then(Value::as_str)
    .ok_or_else(|| ComponentError::connection("verification request has no challenge"))?;

  Ok(VerificationOutcome {
    is_verification: true,
    response: Some(json!({ "challenge": challenge })),
  })
}
