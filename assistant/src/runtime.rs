//! Component wiring
//!
//! Builds every shared component once from [`AppConfig`] and hands them out
//! as `Arc`s. Nothing here is global: the CLI and the web server each call
//! [`build`] and own what it returns.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::checkpoint::{CheckpointStore, InMemoryCheckpointStore, SqliteCheckpointStore};
use crate::config::{AppConfig, CheckpointBackend};
use crate::llm::{ChatModel, OllamaChatModel};
use crate::orchestrator::TurnOrchestrator;
use crate::prompts::system_prompt;
use crate::skills::SkillRepository;
use crate::tools::{
    ExecuteQueryTool, LoadSkillTool, QueryRunner, ToolRegistry, EXECUTE_QUERY_TOOL,
};
use crate::workflow::{EngineConfig, WorkflowEngine};

/// Everything a front end needs
pub struct Runtime {
    pub orchestrator: Arc<TurnOrchestrator>,
    pub model_name: String,
    pub llm_url: String,
}

/// Open the checkpoint store selected in `[checkpoint]`
pub fn open_store(config: &AppConfig) -> Result<Arc<dyn CheckpointStore>> {
    match config.checkpoint.backend {
        CheckpointBackend::Memory => {
            tracing::info!("Using in-memory checkpoint store");
            Ok(Arc::new(InMemoryCheckpointStore::new()))
        }
        CheckpointBackend::Sqlite => {
            let path = match &config.checkpoint.path {
                Some(path) => path.clone(),
                None => SqliteCheckpointStore::default_path()
                    .context("Could not determine home directory for checkpoints")?,
            };
            let store = SqliteCheckpointStore::open_at(&path)
                .with_context(|| format!("Failed to open checkpoint store at {:?}", path))?;
            tracing::info!("Checkpoint store opened at {:?}", path);
            Ok(Arc::new(store))
        }
    }
}

/// Build the orchestrator with the configured Ollama model
pub fn build(config: &AppConfig) -> Result<Runtime> {
    let model = OllamaChatModel::new(&config.llm.url, &config.llm.model)?;
    let runtime = Runtime {
        model_name: config.llm.model.clone(),
        llm_url: model.base_url().to_string(),
        orchestrator: Arc::new(build_with_model(config, Arc::new(model))?),
    };
    Ok(runtime)
}

/// Build the orchestrator around any chat model
pub fn build_with_model(config: &AppConfig, model: Arc<dyn ChatModel>) -> Result<TurnOrchestrator> {
    let store = open_store(config)?;

    if !config.database.path.exists() {
        tracing::warn!(
            "Database {:?} does not exist yet; run `sql-assistant seed` to create sample data",
            config.database.path
        );
    }
    let runner = Arc::new(QueryRunner::open(
        &config.database.path,
        config.database.allow_writes,
        config.database.timeout(),
    )?);

    let skills = Arc::new(SkillRepository::new(&config.skills.dir));
    let installed = skills
        .list_skills()
        .with_context(|| format!("Failed to read skills from {:?}", skills.dir()))?;
    tracing::info!("Loaded {} skill(s) from {:?}", installed.len(), skills.dir());

    let tools = ToolRegistry::new(config.engine.tool_timeout())
        .with_tool(Arc::new(ExecuteQueryTool::new(
            runner.clone(),
            config.database.max_tool_rows,
        )))
        .with_tool(Arc::new(LoadSkillTool::new(skills)));

    let engine = WorkflowEngine::new(
        store,
        model,
        Arc::new(tools),
        EngineConfig {
            system_prompt: system_prompt(&installed),
            execute_tool: EXECUTE_QUERY_TOOL.to_string(),
            max_agent_steps: config.engine.max_agent_steps,
            model_timeout: config.llm.timeout(),
            busy_policy: config.engine.busy_policy,
        },
    );

    Ok(TurnOrchestrator::new(Arc::new(engine), runner))
}
