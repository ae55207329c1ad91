//! Typed task functions.

use std::sync::Arc;

use futures::FutureExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::JobError;
use crate::executor::TaskFn;

/// Adapt a typed async function into a [`TaskFn`].
///
/// The job input is decoded into `I` before the call and the returned `O`
/// is encoded afterwards. A decoding failure is reported as
/// [`JobError::InvalidInput`] without calling `f`.
pub fn task_fn<I, O, F, Fut>(f: F) -> TaskFn
where
  I: DeserializeOwned + Send + 'static,
  O: Serialize + Send + 'static,
  F: Fn(I, CancellationToken) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<O, JobError>> + Send + 'static,
{
  Arc::new(move |value: Value, cancel: CancellationToken| {
    let input = match serde_json::from_value::<I>(value) {
      Ok(input) => input,
      Err(e) => {
        let err = JobError::invalid_input(e.to_string());
        return async move { Err(err) }.boxed();
      }
    };

    let call = f(input, cancel);
    async move {
      let output = call.await?;
      serde_json::to_value(output).map_err(|e| JobError::invalid_output(e.to_string()))
    }
    .boxed()
  })
}

#[cfg(test)]
mod tests {
  use serde::Deserialize;
  use serde_json::json;

  use super::*;

  #[derive(Deserialize)]
  struct Greet {
    name: String,
  }

  #[derive(Serialize)]
  struct Greeting {
    message: String,
  }

  #[tokio::test]
  async fn test_typed_round_trip() {
    let task = task_fn(|input: Greet, _| async move {
      Ok(Greeting {
        message: format!("hello {}", input.name),
      })
    });

    let output = task(json!({"name": "ada"}), CancellationToken::new())
      .await
      .unwrap();
    assert_eq!(output, json!({"message": "hello ada"}));
  }

  #[tokio::test]
  async fn test_decode_failure_skips_call() {
    let task = task_fn(|_: Greet, _| async move {
      Err::<Value, _>(JobError::task("called with bad input"))
    });

    let err = task(json!({"nom": "ada"}), CancellationToken::new())
      .await
      .unwrap_err();
    assert!(matches!(err, JobError::InvalidInput { .. }));
  }
}
