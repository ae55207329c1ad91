//! HTTP component tests against a local axum server.

use std::collections::BTreeMap;

use axum::Router;
use axum::extract::Path;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::routing::any;
use axum::Json;
use conduit_component::{
  ComponentContext, ComponentError, ExecutionParams, JobError, JobOutcome, MemoryBatch, Setup,
  SystemVariables,
};
use conduit_connectors::builtin_store;
use conduit_connectors::http::{TASK_GET, TASK_POST};
use conduit_store::StoreError;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

async fn echo(method: Method, headers: HeaderMap, body: String) -> Json<Value> {
  let headers: BTreeMap<String, String> = headers
    .iter()
    .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
    .collect();
  let body: Value = serde_json::from_str(&body).unwrap_or(Value::Null);

  Json(json!({
    "method": method.as_str(),
    "headers": headers,
    "body": body,
  }))
}

async fn status(Path(code): Path<u16>) -> (StatusCode, &'static str) {
  (StatusCode::from_u16(code).unwrap(), "plain text")
}

async fn spawn_server() -> String {
  let app = Router::new()
    .route("/echo", any(echo))
    .route("/status/{code}", any(status));

  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move {
    axum::serve(listener, app).await.unwrap();
  });

  format!("http://{}", addr)
}

fn params(task: &str, setup: Value) -> ExecutionParams {
  ExecutionParams {
    component_id: "http-0".to_string(),
    definition_id: "http".to_string(),
    system_variables: SystemVariables::default(),
    setup: Some(Setup::from_value(setup).unwrap()),
    task: task.to_string(),
  }
}

#[tokio::test]
async fn test_post_batch_with_per_job_failure() {
  let base = spawn_server().await;
  let store = builtin_store(&ComponentContext::new()).unwrap();

  let execution = store
    .create_execution(params(
      TASK_POST,
      json!({"headers": {"x-team": "conduit"}, "authorization": "Bearer token"}),
    ))
    .unwrap();

  let (jobs, recorder) = MemoryBatch::new(vec![
    json!({"endpoint-url": format!("{}/echo", base), "body": {"a": 1}}),
    json!({"endpoint-url": "not a url"}),
    json!({"endpoint-url": format!("{}/status/404", base)}),
  ]);

  execution.execute(CancellationToken::new(), jobs).await.unwrap();

  let outcomes = recorder.outcomes();

  let JobOutcome::Output(first) = &outcomes[0] else {
    panic!("expected output, got {:?}", outcomes[0]);
  };
  assert_eq!(first["status-code"], 200);
  assert_eq!(first["body"]["method"], "POST");
  assert_eq!(first["body"]["body"], json!({"a": 1}));
  assert_eq!(first["body"]["headers"]["x-team"], "conduit");
  assert_eq!(first["body"]["headers"]["authorization"], "Bearer token");

  assert!(matches!(&outcomes[1], JobOutcome::Error(JobError::InvalidInput { .. })));

  let JobOutcome::Output(third) = &outcomes[2] else {
    panic!("expected output, got {:?}", outcomes[2]);
  };
  assert_eq!(third["status-code"], 404);
  assert_eq!(third["body"], "plain text");
}

#[tokio::test]
async fn test_get_with_job_headers() {
  let base = spawn_server().await;
  let store = builtin_store(&ComponentContext::new()).unwrap();

  let execution = store.create_execution(params(TASK_GET, json!({}))).unwrap();

  let inputs = (0..5)
    .map(|n| {
      json!({
        "endpoint-url": format!("{}/echo", base),
        "headers": {"x-job": n.to_string()},
      })
    })
    .collect();
  let (jobs, recorder) = MemoryBatch::new(inputs);

  execution.execute(CancellationToken::new(), jobs).await.unwrap();

  for (n, outcome) in recorder.outcomes().iter().enumerate() {
    let JobOutcome::Output(output) = outcome else {
      panic!("job {} failed: {:?}", n, outcome);
    };
    assert_eq!(output["body"]["method"], "GET");
    assert_eq!(output["body"]["headers"]["x-job"], n.to_string());
  }
}

#[tokio::test]
async fn test_invalid_setup_header_fails_whole_batch() {
  let store = builtin_store(&ComponentContext::new()).unwrap();

  let execution = store
    .create_execution(params(TASK_GET, json!({"headers": {"bad header": "x"}})))
    .unwrap();

  let (jobs, recorder) = MemoryBatch::new(vec![json!({"endpoint-url": "http://127.0.0.1:1/"})]);
  let err = execution
    .execute(CancellationToken::new(), jobs)
    .await
    .unwrap_err();

  assert!(matches!(
    err,
    StoreError::Execute {
      source: ComponentError::BatchSetup { .. }
    }
  ));
  assert!(recorder.events().is_empty());
}

#[tokio::test]
async fn test_unknown_setup_field_is_rejected() {
  let store = builtin_store(&ComponentContext::new()).unwrap();

  let err = store
    .create_execution(params(TASK_GET, json!({"proxy": "socks5://x"})))
    .err()
    .unwrap();

  assert!(matches!(
    err,
    StoreError::CreateExecution {
      source: ComponentError::InvalidSetup { .. }
    }
  ));
}

#[tokio::test]
async fn test_input_schema_rejects_unknown_fields() {
  let store = builtin_store(&ComponentContext::new()).unwrap();
  let execution = store.create_execution(params(TASK_GET, json!({}))).unwrap();

  let (jobs, recorder) = MemoryBatch::new(vec![json!({"url": "http://example.com"})]);
  execution.execute(CancellationToken::new(), jobs).await.unwrap();

  assert!(matches!(
    recorder.outcomes().as_slice(),
    [JobOutcome::Error(JobError::InvalidInput { .. })]
  ));
}
