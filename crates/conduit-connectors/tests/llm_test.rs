//! OpenAI-compatible component tests against a local axum mock.

use std::collections::BTreeMap;

use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use conduit_component::{
  ComponentContext, ComponentError, ExecutionParams, InjectedSecrets, JobError, JobOutcome,
  MemoryBatch, Setup, SystemVariables,
};
use conduit_connectors::builtin_store;
use conduit_connectors::llm::TASK_TEXT_GENERATION;
use conduit_store::StoreError;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

const GOOD_KEY: &str = "sk-global";

fn authorized(headers: &HeaderMap) -> bool {
  headers
    .get("authorization")
    .and_then(|v| v.to_str().ok())
    .is_some_and(|v| v == format!("Bearer {}", GOOD_KEY))
}

async fn chat(headers: HeaderMap, Json(body): Json<Value>) -> Response {
  if !authorized(&headers) {
    return (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad key"}))).into_response();
  }
  if body["model"] == "broken" {
    return (StatusCode::INTERNAL_SERVER_ERROR, "model unavailable").into_response();
  }

  let prompt = body["messages"]
    .as_array()
    .and_then(|m| m.last())
    .and_then(|m| m["content"].as_str())
    .unwrap_or_default()
    .to_string();

  Json(json!({
    "choices": [{"message": {"role": "assistant", "content": format!("echo: {}", prompt)}}],
    "usage": {"prompt_tokens": 3, "completion_tokens": 2}
  }))
  .into_response()
}

async fn models(headers: HeaderMap) -> Response {
  if !authorized(&headers) {
    return StatusCode::UNAUTHORIZED.into_response();
  }
  Json(json!({"data": [{"id": "m"}]})).into_response()
}

async fn spawn_server() -> String {
  let app = Router::new()
    .route("/v1/chat/completions", post(chat))
    .route("/v1/models", get(models));

  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, app).await.unwrap();
  });

  format!("http://{}/v1", addr)
}

fn injected() -> ComponentContext {
  ComponentContext::new().with_secrets(
    "openai-compatible",
    InjectedSecrets::new().with("api-key", GOOD_KEY),
  )
}

fn setup(api_key: &str, base_url: &str) -> Setup {
  Setup::from_value(json!({"api-key": api_key, "base-url": base_url})).unwrap()
}

fn params(setup: Setup) -> ExecutionParams {
  ExecutionParams {
    component_id: "llm-0".to_string(),
    definition_id: "openai-compatible".to_string(),
    system_variables: SystemVariables::default(),
    setup: Some(setup),
    task: TASK_TEXT_GENERATION.to_string(),
  }
}

#[tokio::test]
async fn test_generation_with_injected_key() {
  let base = spawn_server().await;
  let store = builtin_store(&injected()).unwrap();

  let execution = store
    .create_execution(params(setup("__USE_SECRET__", &base)))
    .unwrap();
  assert!(execution.uses_injected_credentials());

  let (jobs, recorder) = MemoryBatch::new(vec![
    json!({"prompt": "hi", "model": "m", "system-message": "be brief"}),
    json!({"prompt": "hi", "model": "broken"}),
  ]);
  execution.execute(CancellationToken::new(), jobs).await.unwrap();

  let outcomes = recorder.outcomes();
  assert_eq!(
    outcomes[0],
    JobOutcome::Output(json!({
      "text": "echo: hi",
      "usage": {"input-tokens": 3, "output-tokens": 2}
    }))
  );
  assert!(matches!(
    &outcomes[1],
    JobOutcome::Error(JobError::Task { message }) if message.contains("500")
  ));
}

#[tokio::test]
async fn test_explicit_wrong_key_fails_jobs_not_batch() {
  let base = spawn_server().await;
  let store = builtin_store(&injected()).unwrap();

  let execution = store.create_execution(params(setup("sk-wrong", &base))).unwrap();
  assert!(!execution.uses_injected_credentials());

  let (jobs, recorder) = MemoryBatch::new(vec![json!({"prompt": "hi", "model": "m"})]);
  execution.execute(CancellationToken::new(), jobs).await.unwrap();

  assert!(matches!(
    recorder.outcomes().as_slice(),
    [JobOutcome::Error(JobError::Task { message })] if message.contains("401")
  ));
}

#[test]
fn test_sentinel_without_injected_key() {
  let store = builtin_store(&ComponentContext::new()).unwrap();

  let err = store
    .create_execution(params(setup("__USE_SECRET__", "http://127.0.0.1:1/v1")))
    .err()
    .unwrap();

  assert!(matches!(
    err,
    StoreError::CreateExecution {
      source: ComponentError::UnresolvedCredential { field }
    } if field == "api-key"
  ));
}

#[tokio::test]
async fn test_connection_probe() {
  let base = spawn_server().await;
  let store = builtin_store(&injected()).unwrap();
  let vars = SystemVariables::default();

  store
    .test_connection("openai-compatible", &vars, Some(setup("__USE_SECRET__", &base)))
    .await
    .unwrap();

  let err = store
    .test_connection("openai-compatible", &vars, Some(setup("sk-wrong", &base)))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    StoreError::Component {
      source: ComponentError::Connection { .. },
      ..
    }
  ));
}

#[tokio::test]
async fn test_verification_handshake_through_store() {
  let store = builtin_store(&ComponentContext::new()).unwrap();
  let headers = BTreeMap::new();

  let outcome = store
    .handle_verification_event(
      "openai-compatible",
      &headers,
      &json!({"type": "url_verification", "challenge": "c-1"}),
      None,
    )
    .await
    .unwrap();
  assert!(outcome.is_verification);
  assert_eq!(outcome.response, Some(json!({"challenge": "c-1"})));

  let outcome = store
    .handle_verification_event(
      "openai-compatible",
      &headers,
      &json!({"type": "event_callback"}),
      None,
    )
    .await
    .unwrap();
  assert!(!outcome.is_verification);
}
