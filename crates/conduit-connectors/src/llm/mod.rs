//! OpenAI-compatible text generation.
//!
//! The `api-key` setup field is a credential: a setup may defer to a key
//! injected at startup with the `__USE_SECRET__` sentinel.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use conduit_component::definition::{DefinitionCell, DefinitionDocuments, DefinitionError};
use conduit_component::{
  Component, ComponentBase, ComponentContext, ComponentError, Execution, ExecutionBase,
  ExecutionParams, Job, JobError, Setup, Strategy, SystemVariables, TaskTable, VerificationOutcome,
  task_fn,
};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::verification::url_verification;

pub const TASK_TEXT_GENERATION: &str = "TASK_TEXT_GENERATION";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const DOCUMENTS: DefinitionDocuments<'static> = DefinitionDocuments {
  definition: include_str!("config/definition.json"),
  setup: include_str!("config/setup.json"),
  tasks: include_str!("config/tasks.json"),
};

static DEFINITION: DefinitionCell = DefinitionCell::new();

pub fn init(ctx: &ComponentContext) -> Result<Arc<LlmComponent>, DefinitionError> {
  let definition = DEFINITION.get_or_load(DOCUMENTS)?;

  let tasks = TaskTable::new()
    .bind(TASK_TEXT_GENERATION, ())
    .validate(&definition)?;

  let secrets = ctx.secrets_for(&definition.id);

  Ok(Arc::new(LlmComponent {
    base: ComponentBase::new(definition, secrets),
    tasks,
  }))
}

pub struct LlmComponent {
  base: ComponentBase,
  tasks: TaskTable<()>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct LlmSetup {
  api_key: String,
  base_url: Option<String>,
  organization: Option<String>,
}

impl LlmSetup {
  fn endpoint(&self, path: &str) -> String {
    let base = self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
    format!("{}/{}", base.trim_end_matches('/'), path)
  }

  fn client(&self) -> Result<Client, String> {
    let mut headers = HeaderMap::new();

    let mut auth = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
      .map_err(|e| format!("invalid api key: {}", e))?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);

    if let Some(organization) = &self.organization {
      let value = HeaderValue::from_str(organization)
        .map_err(|e| format!("invalid organization: {}", e))?;
      headers.insert(HeaderName::from_static("openai-organization"), value);
    }

    Client::builder()
      .default_headers(headers)
      .build()
      .map_err(|e| format!("failed to build HTTP client: {}", e))
  }
}

#[async_trait]
impl Component for LlmComponent {
  fn base(&self) -> &ComponentBase {
    &self.base
  }

  fn create_execution(&self, params: ExecutionParams) -> Result<Box<dyn Execution>, ComponentError> {
    self.tasks.select(&params.task)?;
    let base = self.base.prepare(params)?;
    let setup: LlmSetup = base.setup.decode()?;

    Ok(Box::new(LlmExecution { base, setup }))
  }

  /// Lists the models visible to the key.
  async fn test(&self, _vars: &SystemVariables, setup: Option<Setup>) -> Result<(), ComponentError> {
    let resolved = self.base.resolve_setup(setup)?;
    let setup: LlmSetup = resolved.setup.decode()?;
    let client = setup.client().map_err(ComponentError::connection)?;

    let response = client
      .get(setup.endpoint("models"))
      .send()
      .await
      .map_err(|e| ComponentError::connection(e.to_string()))?;

    check_status(response)
      .await
      .map_err(ComponentError::connection)?;

    info!(definition_id = %self.base.definition().id, "connection test succeeded");
    Ok(())
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

struct LlmExecution {
  base: ExecutionBase,
  setup: LlmSetup,
}

#[async_trait]
impl Execution for LlmExecution {
  fn base(&self) -> &ExecutionBase {
    &self.base
  }

  async fn execute(&self, cancel: CancellationToken, jobs: Vec<Job>) -> Result<(), ComponentError> {
    let client = self.setup.client().map_err(ComponentError::batch_setup)?;
    let url = self.setup.endpoint("chat/completions");

    let task = task_fn(move |input: GenerationInput, _| {
      let client = client.clone();
      let url = url.clone();
      async move { generate(&client, &url, input).await }
    });

    Strategy::Concurrent.run(&cancel, jobs, task).await;
    Ok(())
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct GenerationInput {
  prompt: String,
  system_message: Option<String>,
  model: String,
  temperature: Option<f64>,
  max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct GenerationOutput {
  text: String,
  usage: Usage,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct Usage {
  input_tokens: u64,
  output_tokens: u64,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
  model: &'a str,
  messages: Vec<ChatMessage<'a>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  temperature: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
  role: &'static str,
  content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)]
  usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
  message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
  #[serde(default)]
  content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
  prompt_tokens: u64,
  completion_tokens: u64,
}

async fn generate(client: &Client, url: &str, input: GenerationInput) -> Result<GenerationOutput, JobError> {
  let mut messages = Vec::new();
  if let Some(system) = &input.system_message {
    messages.push(ChatMessage {
      role: "system",
      content: system,
    });
  }
  messages.push(ChatMessage {
    role: "user",
    content: &input.prompt,
  });

  let request = ChatRequest {
    model: &input.model,
    messages,
    temperature: input.temperature,
    max_tokens: input.max_tokens,
  };

  debug!(model = %input.model, "requesting completion");

  let response = client
    .post(url)
    .json(&request)
    .send()
    .await
    .map_err(|e| JobError::task(format!("request failed: {}", e)))?;

  let response = check_status(response).await.map_err(JobError::task)?;

  let reply: ChatResponse = response
    .json()
    .await
    .map_err(|e| JobError::task(format!("invalid completion response: {}", e)))?;

  let text = reply
    .choices
    .into_iter()
    .next()
    .and_then(|c| c.message.content)
    .ok_or_else(|| JobError::task("completion response has no content"))?;

  let usage = reply.usage.map_or(
    Usage {
      input_tokens: 0,
      output_tokens: 0,
    },
    |u| Usage {
      input_tokens: u.prompt_tokens,
      output_tokens: u.completion_tokens,
    },
  );

  Ok(GenerationOutput { text, usage })
}

/// Turn a non-success response into an error carrying its status and body.
async fn check_status(response: Response) -> Result<Response, String> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }
  let body = response.text().await.unwrap_or_default();
  Err(format!("server returned {}: {}", status, body))
}
