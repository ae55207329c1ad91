//! Generic HTTP component.
//!
//! One task per HTTP method. Every job sends one request; jobs run
//! concurrently and share one client built from the setup.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use conduit_component::definition::{DefinitionCell, DefinitionDocuments, DefinitionError};
use conduit_component::{
  Component, ComponentBase, ComponentContext, ComponentError, Execution, ExecutionBase,
  ExecutionParams, Job, JobError, Setup, Strategy, TaskTable, VerificationOutcome,
  task_fn,
};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Url};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::verification::url_verification;

pub const TASK_GET: &str = "TASK_GET";
pub const TASK_POST: &str = "TASK_POST";
pub const TASK_PUT: &str = "TASK_PUT";
pub const TASK_PATCH: &str = "TASK_PATCH";
pub const TASK_DELETE: &str = "TASK_DELETE";
pub const TASK_HEAD: &str = "TASK_HEAD";
pub const TASK_OPTIONS: &str = "TASK_OPTIONS";

const DOCUMENTS: DefinitionDocuments<'static> = DefinitionDocuments {
  definition: include_str!("config/definition.json"),
  setup: include_str!("config/setup.json"),
  tasks: include_str!("config/tasks.json"),
};

static DEFINITION: DefinitionCell = DefinitionCell::new();

/// Build the HTTP component.
pub fn init(ctx: &ComponentContext) -> Result<Arc<HttpComponent>, DefinitionError> {
  let definition = DEFINITION.get_or_load(DOCUMENTS)?;

  let tasks = TaskTable::new()
    .bind(TASK_GET, Method::GET)
    .bind(TASK_POST, Method::POST)
    .bind(TASK_PUT, Method::PUT)
    .bind(TASK_PATCH, Method::PATCH)
    .bind(TASK_DELETE, Method::DELETE)
    .bind(TASK_HEAD, Method::HEAD)
    .bind(TASK_OPTIONS, Method::OPTIONS)
    .validate(&definition)?;

  let secrets = ctx.secrets_for(&definition.id);

  Ok(Arc::new(HttpComponent {
    base: ComponentBase::new(definition, secrets),
    tasks,
  }))
}

pub struct HttpComponent {
  base: ComponentBase,
  tasks: TaskTable<Method>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct HttpSetup {
  #[serde(default)]
  headers: HashMap<String, String>,
  authorization: Option<String>,
  timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct HttpInput {
  endpoint_url: String,
  #[serde(default)]
  headers: HashMap<String, String>,
  #[serde(default)]
  body: Option<Value>,
}

#[async_trait]
impl Component for HttpComponent {
  fn base(&self) -> &ComponentBase {
    &self.base
  }

  fn create_execution(&self, params: ExecutionParams) -> Result<Box<dyn Execution>, ComponentError> {
    let method = self.tasks.select(&params.task)?;
    let base = self.base.prepare(params)?;
    let setup: HttpSetup = base.setup.decode()?;

    Ok(Box::new(HttpExecution {
      base,
      method,
      setup,
    }))
  }

  /// Answers `url_verification` handshakes by echoing the challenge.
  async fn handle_verification_event(
    &self,
    _headers: &BTreeMap<String, String>,
    body: &Value,
    _setup: Option<Setup>,
  ) -> Result<VerificationOutcome, ComponentError> {
    url_verification(body)
  }
}

struct HttpExecution {
  base: ExecutionBase,
  method: Method,
  setup: HttpSetup,
}

#[async_trait]
impl Execution for HttpExecution {
  fn base(&self) -> &ExecutionBase {
    &self.base
  }

  async fn execute(&self, cancel: CancellationToken, jobs: Vec<Job>) -> Result<(), ComponentError> {
    // Every job needs the client, so failing to build it fails the batch.
    let client = build_client(&self.setup)?;
    let method = self.method.clone();

    let task = task_fn(move |input: HttpInput, _| {
      let client = client.clone();
      let method = method.clone();
      async move { send(&client, method, input).await }
    });

    Strategy::Concurrent.run(&cancel, jobs, task).await;
    Ok(())
  }
}

fn build_client(setup: &HttpSetup) -> Result<Client, ComponentError> {
  let mut headers = header_map(&setup.headers).map_err(ComponentError::batch_setup)?;

  if let Some(authorization) = &setup.authorization {
    let mut value = HeaderValue::from_str(authorization)
      .map_err(|e| ComponentError::batch_setup(format!("invalid authorization header: {}", e)))?;
    value.set_sensitive(true);
    headers.insert(AUTHORIZATION, value);
  }

  let mut builder = Client::builder().default_headers(headers);
  if let Some(ms) = setup.timeout_ms {
    builder = builder.timeout(Duration::from_millis(ms));
  }

  builder
    .build()
    .map_err(|e| ComponentError::batch_setup(format!("failed to build HTTP client: {}", e)))
}

fn header_map(headers: &HashMap<String, String>) -> Result<HeaderMap, String> {
  let mut map = HeaderMap::new();
  for (name, value) in headers {
    let name = HeaderName::from_bytes(name.as_bytes())
      .map_err(|e| format!("invalid header name '{}': {}", name, e))?;
    let value = HeaderValue::from_str(value)
      .map_err(|e| format!("invalid value for header '{}': {}", name, e))?;
    map.insert(name, value);
  }
  Ok(map)
}

async fn send(client: &Client, method: Method, input: HttpInput) -> Result<Value, JobError> {
  let url = Url::parse(&input.endpoint_url)
    .map_err(|e| JobError::invalid_input(format!("invalid endpoint URL '{}': {}", input.endpoint_url, e)))?;
  let headers = header_map(&input.headers).map_err(JobError::invalid_input)?;

  debug!(method = %method, url = %url, "sending request");

  let mut request = client.request(method, url).headers(headers);
  if let Some(body) = &input.body {
    request = request.json(body);
  }

  let response = request
    .send()
    .await
    .map_err(|e| JobError::task(format!("request failed: {}", e)))?;

  let status = response.status().as_u16();
  let headers: BTreeMap<String, String> = response
    .headers()
    .iter()
    .filter_map(|(k, v)| v.to_str().ok().map(|val| (k.as_str().to_string(), val.to_string())))
    .collect();

  let body = response
    .text()
    .await
    .map_err(|e| JobError::task(format!("failed to read response body: {}", e)))?;

  // Try to parse body as JSON, fall back to string
  let body = serde_json::from_str(&body).unwrap_or(Value::String(body));

  Ok(json!({
    "status-code": status,
    "headers": headers,
    "body": body,
  }))
}
