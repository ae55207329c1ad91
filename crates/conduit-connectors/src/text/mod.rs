//! Text operators. Pure transforms, run sequentially.

use std::sync::Arc;

use async_trait::async_trait;
use conduit_component::definition::{DefinitionCell, DefinitionDocuments, DefinitionError};
use conduit_component::{
  Component, ComponentBase, ComponentContext, ComponentError, Execution, ExecutionBase,
  ExecutionParams, Job, JobError, Strategy, TaskFn, TaskTable, task_fn,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

pub const TASK_CHUNK_TEXT: &str = "TASK_CHUNK_TEXT";
pub const TASK_COUNT_WORDS: &str = "TASK_COUNT_WORDS";

const DOCUMENTS: DefinitionDocuments<'static> = DefinitionDocuments {
  definition: include_str!("config/definition.json"),
  setup: include_str!("config/setup.json"),
  tasks: include_str!("config/tasks.json"),
};

static DEFINITION: DefinitionCell = DefinitionCell::new();

#[derive(Debug, Clone, Copy)]
enum Task {
  ChunkText,
  CountWords,
}

pub fn init(ctx: &ComponentContext) -> Result<Arc<TextComponent>, DefinitionError> {
  let definition = DEFINITION.get_or_load(DOCUMENTS)?;

  let tasks = TaskTable::new()
    .bind(TASK_CHUNK_TEXT, Task::ChunkText)
    .bind(TASK_COUNT_WORDS, Task::CountWords)
    .validate(&definition)?;

  let secrets = ctx.secrets_for(&definition.id);

  Ok(Arc::new(TextComponent {
    base: ComponentBase::new(definition, secrets),
    tasks,
  }))
}

pub struct TextComponent {
  base: ComponentBase,
  tasks: TaskTable<Task>,
}

#[async_trait]
impl Component for TextComponent {
  fn base(&self) -> &ComponentBase {
    &self.base
  }

  fn create_execution(&self, params: ExecutionParams) -> Result<Box<dyn Execution>, ComponentError> {
    let task = self.tasks.select(&params.task)?;
    Ok(Box::new(TextExecution {
      base: self.base.prepare(params)?,
      task,
    }))
  }
}

struct TextExecution {
  base: ExecutionBase,
  task: Task,
}

#[async_trait]
impl Execution for TextExecution {
  fn base(&self) -> &ExecutionBase {
    &self.base
  }

  async fn execute(&self, cancel: CancellationToken, jobs: Vec<Job>) -> Result<(), ComponentError> {
    let task: TaskFn = match self.task {
      Task::ChunkText => task_fn(|input: ChunkInput, _| async move { chunk_text(input) }),
      Task::CountWords => task_fn(|input: CountInput, _| async move {
        Ok(CountOutput {
          count: input.text.split_whitespace().count(),
        })
      }),
    };

    Strategy::Sequential.run(&cancel, jobs, task).await;
    Ok(())
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ChunkInput {
  text: String,
  chunk_size: usize,
  #[serde(default)]
  chunk_overlap: usize,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
struct Chunk {
  text: String,
  start_position: usize,
  end_position: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct ChunkOutput {
  chunk_num: usize,
  chunks: Vec<Chunk>,
}

#[derive(Debug, Deserialize)]
struct CountInput {
  text: String,
}

#[derive(Debug, Serialize)]
struct CountOutput {
  count: usize,
}

/// Split text into windows of `chunk_size` characters, each starting
/// `chunk_size - chunk_overlap` characters after the previous one.
///
/// Positions are character offsets; `end_position` is exclusive.
fn chunk_text(input: ChunkInput) -> Result<ChunkOutput, JobError> {
  if input.chunk_size == 0 {
    return Err(JobError::invalid_input("chunk-size must be positive"));
  }
  if input.chunk_overlap >= input.chunk_size {
    return Err(JobError::invalid_input(format!(
      "chunk-overlap ({}) must be smaller than chunk-size ({})",
      input.chunk_overlap, input.chunk_size
    )));
  }

  let chars: Vec<char> = input.text.chars().collect();
  let step = input.chunk_size - input.chunk_overlap;
  let mut chunks = Vec::new();
  let mut start = 0;

  while start < chars.len() {
    let end = (start + input.chunk_size).min(chars.len());
    chunks.push(Chunk {
      text: chars[start..end].iter().collect(),
      start_position: start,
      end_position: end,
    });
    if end == chars.len() {
      break;
    }
    start += step;
  }

  Ok(ChunkOutput {
    chunk_num: chunks.len(),
    chunks,
  })
}
