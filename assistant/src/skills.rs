//! Skill repository
//!
//! A skill is a directory holding `description.txt` (one line, always shown
//! to the model) and `content.md` (schema and rules, loaded on demand via the
//! `load_skill` tool).

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// A skill the agent can load progressively
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skill {
    pub name: String,
    pub description: String,
    /// Empty in listings; filled by [`SkillRepository::get_skill`]
    pub content: String,
}

/// Skills discovered from subdirectories of one directory
#[derive(Debug, Clone)]
pub struct SkillRepository {
    dir: PathBuf,
}

impl SkillRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All skills with a description, sorted by name. Content is not loaded.
    pub fn list_skills(&self) -> io::Result<Vec<Skill>> {
        if !self.dir.is_dir() {
            tracing::warn!("Skills directory {:?} not found", self.dir);
            return Ok(Vec::new());
        }

        let mut skills = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !path.is_dir() || name.starts_with("__") || name.starts_with('.') {
                continue;
            }

            let description_path = path.join("description.txt");
            if description_path.exists() {
                skills.push(Skill {
                    name: name.to_string(),
                    description: std::fs::read_to_string(&description_path)?.trim().to_string(),
                    content: String::new(),
                });
            }
        }

        skills.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(skills)
    }

    /// Full skill by name, or `None` if it doesn't exist
    pub fn get_skill(&self, name: &str) -> io::Result<Option<Skill>> {
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Ok(None);
        }

        let skill_dir = self.dir.join(name);
        let description_path = skill_dir.join("description.txt");
        let content_path = skill_dir.join("content.md");
        if !description_path.exists() || !content_path.exists() {
            return Ok(None);
        }

        Ok(Some(Skill {
            name: name.to_string(),
            description: std::fs::read_to_string(description_path)?.trim().to_string(),
            content: std::fs::read_to_string(content_path)?.trim().to_string(),
        }))
    }

    /// Comma-separated skill names
    pub fn skill_names(&self) -> io::Result<String> {
        Ok(self
            .list_skills()?
            .into_iter()
            .map(|s| s.name)
            .collect::<Vec<_>>()
            .join(", "))
    }
}
