//! Tests of the assembled built-in store.

use conduit_component::{
  ComponentContext, ExecutionParams, JobError, JobEvent, JobOutcome, MemoryBatch, SystemVariables,
};
use conduit_connectors::builtin_store;
use conduit_connectors::text::{TASK_CHUNK_TEXT, TASK_COUNT_WORDS};
use serde_json::json;
use tokio_util::sync::CancellationToken;

#[test]
fn test_lists_builtin_definitions() {
  let store = builtin_store(&ComponentContext::new()).unwrap();

  let ids: Vec<_> = store
    .list_definitions(&SystemVariables::default(), false)
    .into_iter()
    .map(|d| d.id)
    .collect();

  assert_eq!(ids, vec!["http", "text", "openai-compatible"]);
}

#[test]
fn test_builtin_store_can_be_built_twice() {
  // Definitions are loaded once and shared between stores.
  let first = builtin_store(&ComponentContext::new()).unwrap();
  let second = builtin_store(&ComponentContext::new()).unwrap();

  let vars = SystemVariables::default();
  assert_eq!(
    first.get_definition_by_id("text", &vars).unwrap(),
    second.get_definition_by_id("text", &vars).unwrap()
  );
}

#[test]
fn test_lookup_by_uid() {
  let store = builtin_store(&ComponentContext::new()).unwrap();

  let definition = store
    .get_definition_by_uid(
      "9b3f1c56-6a3b-4c8e-8d4e-7a2f0e1b5c33".parse().unwrap(),
      &SystemVariables::default(),
    )
    .unwrap();

  assert_eq!(definition.id, "openai-compatible");
}

#[tokio::test]
async fn test_text_chunking_runs_in_order() {
  let store = builtin_store(&ComponentContext::new()).unwrap();

  let execution = store
    .create_execution(ExecutionParams {
      component_id: "chunker".to_string(),
      definition_id: "text".to_string(),
      task: TASK_CHUNK_TEXT.to_string(),
      ..Default::default()
    })
    .unwrap();

  let (jobs, recorder) = MemoryBatch::new(vec![
    json!({"text": "abcdef", "chunk-size": 4, "chunk-overlap": 1}),
    json!({"text": "abc", "chunk-size": 2, "chunk-overlap": 5}),
    json!({"text": "xy", "chunk-size": 10}),
  ]);
  execution.execute(CancellationToken::new(), jobs).await.unwrap();

  let order: Vec<_> = recorder.events().iter().map(JobEvent::index).collect();
  assert_eq!(order, vec![0, 1, 2]);

  let outcomes = recorder.outcomes();
  assert_eq!(
    outcomes[0],
    JobOutcome::Output(json!({
      "chunk-num": 2,
      "chunks": [
        {"text": "abcd", "start-position": 0, "end-position": 4},
        {"text": "def", "start-position": 3, "end-position": 6}
      ]
    }))
  );
  assert!(matches!(&outcomes[1], JobOutcome::Error(JobError::InvalidInput { .. })));
  assert_eq!(
    outcomes[2],
    JobOutcome::Output(json!({
      "chunk-num": 1,
      "chunks": [{"text": "xy", "start-position": 0, "end-position": 2}]
    }))
  );
}

#[tokio::test]
async fn test_count_words() {
  let store = builtin_store(&ComponentContext::new()).unwrap();

  let execution = store
    .create_execution(ExecutionParams {
      definition_id: "text".to_string(),
      task: TASK_COUNT_WORDS.to_string(),
      ..Default::default()
    })
    .unwrap();

  let (jobs, recorder) = MemoryBatch::new(vec![json!({"text": "  one two\tthree\n"})]);
  execution.execute(CancellationToken::new(), jobs).await.unwrap();

  assert_eq!(recorder.outcomes(), vec![JobOutcome::Output(json!({"count": 3}))]);
}
