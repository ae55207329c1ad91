use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use conduit_component::{ExecutionParams, JobOutcome, MemoryBatch, Setup, SystemVariables};
use conduit_config::{ConduitConfig, default_data_dir};
use conduit_connectors::builtin_store;
use conduit_store::Store;

/// Conduit - run connector tasks over batches of jobs
#[derive(Parser)]
#[command(name = "conduit")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.conduit)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Path to the config file (default: $CONDUIT_CONFIG, then <data-dir>/config.json)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Inspect component definitions
  Definitions {
    #[command(subcommand)]
    action: DefinitionsAction,
  },

  /// Run a task over a batch of inputs
  Run {
    /// Definition id of the component, e.g. "http"
    definition_id: String,

    /// Task name, e.g. "TASK_GET"
    task: String,

    /// JSON file with the setup object
    #[arg(long)]
    setup: Option<PathBuf>,

    /// JSON file with an array of inputs (default: read from stdin)
    #[arg(long)]
    inputs: Option<PathBuf>,

    /// Id of the component within the calling pipeline
    #[arg(long, default_value = "cli")]
    component_id: String,
  },

  /// Check a setup against the component's external system
  Test {
    /// Definition id of the component
    definition_id: String,

    /// JSON file with the setup object
    #[arg(long)]
    setup: Option<PathBuf>,
  },
}

#[derive(Subcommand)]
enum DefinitionsAction {
  /// List definitions
  List {
    /// Include tombstoned definitions
    #[arg(long)]
    include_tombstoned: bool,
  },

  /// Show one definition
  Show {
    /// Definition id
    id: String,
  },

  /// Report whether a setup field is secret
  IsSecret {
    /// Definition id
    id: String,

    /// Field path, e.g. "setup.api-key"
    path: String,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => default_data_dir()?,
  };

  let config =
    ConduitConfig::load(cli.config.as_deref(), &data_dir).context("failed to load configuration")?;

  init_tracing(&config);

  let store = builtin_store(&config.component_context()).context("failed to load components")?;

  match cli.command {
    Some(Commands::Definitions { action }) => definitions(&store, action)?,
    Some(Commands::Run {
      definition_id,
      task,
      setup,
      inputs,
      component_id,
    }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run(&store, definition_id, task, setup, inputs, component_id))?;
    }
    Some(Commands::Test {
      definition_id,
      setup,
    }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(test_connection(&store, &definition_id, setup))?;
    }
    None => {
      println!("conduit - use --help to see available commands");
    }
  }

  Ok(())
}

fn init_tracing(config: &ConduitConfig) {
  let filter = EnvFilter::try_from_default_env()
    .or_else(|_| match &config.log_filter {
      Some(directive) => EnvFilter::try_new(directive),
      None => EnvFilter::try_new("conduit=info"),
    })
    .unwrap_or_else(|_| EnvFilter::new("conduit=info"));

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(io::stderr))
    .init();
}

fn definitions(store: &Store, action: DefinitionsAction) -> Result<()> {
  let vars = SystemVariables::default();

  let output = match action {
    DefinitionsAction::List { include_tombstoned } => {
      let summaries: Vec<Value> = store
        .list_definitions(&vars, include_tombstoned)
        .into_iter()
        .map(|d| {
          json!({
            "id": d.id,
            "uid": d.uid,
            "title": d.title,
            "type": d.component_type,
            "release-stage": d.release_stage,
            "tombstone": d.tombstone,
            "tasks": d.available_tasks,
          })
        })
        .collect();
      serde_json::to_value(summaries)?
    }
    DefinitionsAction::Show { id } => serde_json::to_value(store.get_definition_by_id(&id, &vars)?)?,
    DefinitionsAction::IsSecret { id, path } => {
      json!({ "secret": store.is_secret_field(&id, &path)? })
    }
  };

  println!("{}", serde_json::to_string_pretty(&output)?);
  Ok(())
}

async fn run(
  store: &Store,
  definition_id: String,
  task: String,
  setup: Option<PathBuf>,
  inputs: Option<PathBuf>,
  component_id: String,
) -> Result<()> {
  let setup = read_setup(setup.as_deref())?;

  let inputs = match inputs {
    Some(path) => read_json(&path)?,
    None => read_stdin()?,
  };
  let Value::Array(inputs) = inputs else {
    bail!("inputs must be a JSON array");
  };

  let execution = store.create_execution(ExecutionParams {
    component_id,
    definition_id,
    system_variables: SystemVariables::default(),
    setup,
    task,
  })?;

  let (jobs, recorder) = MemoryBatch::new(inputs);

  let cancel = CancellationToken::new();
  let on_interrupt = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      warn!("interrupted, cancelling batch");
      on_interrupt.cancel();
    }
  });

  execution.execute(cancel, jobs).await?;

  let results: Vec<Value> = recorder
    .outcomes()
    .into_iter()
    .enumerate()
    .map(|(index, outcome)| match outcome {
      JobOutcome::Output(output) => json!({ "index": index, "output": output }),
      JobOutcome::Error(e) => json!({ "index": index, "error": e.to_string() }),
      other => json!({ "index": index, "error": format!("{:?}", other) }),
    })
    .collect();

  println!("{}", serde_json::to_string_pretty(&results)?);
  Ok(())
}

async fn test_connection(store: &Store, definition_id: &str, setup: Option<PathBuf>) -> Result<()> {
  let setup = read_setup(setup.as_deref())?;

  store
    .test_connection(definition_id, &SystemVariables::default(), setup)
    .await?;

  info!(definition_id, "connection ok");
  println!("ok");
  Ok(())
}

fn read_setup(path: Option<&Path>) -> Result<Option<Setup>> {
  path
    .map(|path| {
      let value = read_json(path)?;
      Setup::from_value(value).with_context(|| format!("invalid setup in {}", path.display()))
    })
    .transpose()
}

fn read_json(path: &Path) -> Result<Value> {
  let contents = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read {}", path.display()))?;
  serde_json::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
}

fn read_stdin() -> Result<Value> {
  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read inputs from stdin")?;

  if input.trim().is_empty() {
    return Ok(Value::Array(Vec::new()));
  }

  serde_json::from_str(&input).context("failed to parse inputs from stdin as JSON")
}
