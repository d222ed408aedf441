//! Skill content loader tool

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;

use super::{clean_schema, Tool};
use crate::skills::SkillRepository;

pub const LOAD_SKILL_TOOL: &str = "load_skill";

/// Arguments for the skill loader
#[derive(Debug, Deserialize, JsonSchema)]
pub struct LoadSkillArgs {
    /// Name of the skill to load
    pub skill_name: String,
}

/// Returns the full content (schema, rules) of a skill
pub struct LoadSkillTool {
    repo: Arc<SkillRepository>,
}

impl LoadSkillTool {
    pub fn new(repo: Arc<SkillRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Tool for LoadSkillTool {
    fn name(&self) -> &str {
        LOAD_SKILL_TOOL
    }

    fn description(&self) -> &str {
        "Load the full content (schema, rules) of a specific skill."
    }

    fn parameters(&self) -> serde_json::Value {
        let schema = schemars::schema_for!(LoadSkillArgs);
        clean_schema(&serde_json::to_value(schema).unwrap_or_default())
    }

    async fn call(&self, arguments: serde_json::Value) -> Result<String> {
        let args: LoadSkillArgs =
            serde_json::from_value(arguments).context("Invalid arguments for load_skill")?;
        tracing::info!("Loading skill: {}", args.skill_name);

        let skill = self
            .repo
            .get_skill(&args.skill_name)
            .with_context(|| format!("Error loading skill {}", args.skill_name))?;

        match skill {
            Some(skill) if !skill.content.is_empty() => Ok(skill.content),
            _ => {
                tracing::warn!("Skill not found or empty: {}", args.skill_name);
                let available = self.repo.skill_names().unwrap_or_default();
                Ok(format!(
                    "Skill '{}' not found. Available skills: {}",
                    args.skill_name, available
                ))
            }
        }
    }
}
