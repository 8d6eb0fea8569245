//! Instruction templates for the text-generation service
//!
//! Defaults are embedded in the binary at build time. A templates directory can
//! override any of them file by file. Slots are written `{name}`; braces that do
//! not name a supplied slot (CSS, JavaScript) are left untouched.

use crate::error::ApiError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    /// Role instructions for authoring a page
    GenerateSystem,
    /// First request; slot `prompt`
    GenerateUser,
    /// Follow-up request after a failed attempt; slots `prompt`, `error`
    RetryUser,
    /// Role instructions for the two-line verdict
    ReviewSystem,
    /// Slots `prompt`, `page`
    ReviewUser,
    /// Role instructions for the repair pass; slots `prompt`, `issues`
    RepairSystem,
}

impl Template {
    pub const ALL: [Template; 6] = [
        Template::GenerateSystem,
        Template::GenerateUser,
        Template::RetryUser,
        Template::ReviewSystem,
        Template::ReviewUser,
        Template::RepairSystem,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            Template::GenerateSystem => "generate-system.md",
            Template::GenerateUser => "generate-user.md",
            Template::RetryUser => "retry-user.md",
            Template::ReviewSystem => "review-system.md",
            Template::ReviewUser => "review-user.md",
            Template::RepairSystem => "repair-system.md",
        }
    }

    fn embedded(self) -> &'static str {
        match self {
            Template::GenerateSystem => include_str!("../prompts/generate-system.md"),
            Template::GenerateUser => include_str!("../prompts/generate-user.md"),
            Template::RetryUser => include_str!("../prompts/retry-user.md"),
            Template::ReviewSystem => include_str!("../prompts/review-system.md"),
            Template::ReviewUser => include_str!("../prompts/review-user.md"),
            Template::RepairSystem => include_str!("../prompts/repair-system.md"),
        }
    }
}

/// Resolved template set
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    texts: HashMap<Template, String>,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self::embedded()
    }
}

impl PromptTemplates {
    /// Templates compiled into the binary
    pub fn embedded() -> Self {
        Self {
            texts: Template::ALL
                .iter()
                .map(|t| (*t, t.embedded().to_string()))
                .collect(),
        }
    }

    /// Embedded defaults, overridden by any `<file_name>` present in `dir`
    pub fn load(dir: Option<&Path>) -> Result<Self, ApiError> {
        let mut templates = Self::embedded();
        let Some(dir) = dir else {
            return Ok(templates);
        };

        for template in Template::ALL {
            let path = dir.join(template.file_name());
            if !path.is_file() {
                continue;
            }
            let text = std::fs::read_to_string(&path).map_err(|e| {
                ApiError::ConfigError(format!(
                    "Failed to read template {}: {}",
                    path.display(),
                    e
                ))
            })?;
            debug!(template = template.file_name(), path = %path.display(), "Template override loaded");
            templates.texts.insert(template, text);
        }
        Ok(templates)
    }

    /// Replace one template (used by tests and embedders)
    pub fn with_override(mut self, template: Template, text: impl Into<String>) -> Self {
        self.texts.insert(template, text.into());
        self
    }

    pub fn get(&self, template: Template) -> Result<&str, ApiError> {
        self.texts
            .get(&template)
            .map(String::as_str)
            .ok_or_else(|| ApiError::MissingTemplate(template.file_name().to_string()))
    }

    /// Render a template, filling the given slots
    pub fn render(&self, template: Template, slots: &[(&str, &str)]) -> Result<String, ApiError> {
        Ok(fill_slots(self.get(template)?, slots).trim_end().to_string())
    }

    /// Write the embedded defaults into `dir` for editing; existing files are kept unless `force`
    pub fn export_defaults(dir: &Path, force: bool) -> Result<Vec<PathBuf>, ApiError> {
        std::fs::create_dir_all(dir).map_err(|e| {
            ApiError::ConfigError(format!(
                "Failed to create templates directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        let mut written = Vec::new();
        for template in Template::ALL {
            let path = dir.join(template.file_name());
            if path.exists() && !force {
                continue;
            }
            std::fs::write(&path, template.embedded()).map_err(|e| {
                ApiError::ConfigError(format!("Failed to write {}: {}", path.display(), e))
            })?;
            written.push(path);
        }
        Ok(written)
    }
}

/// Single pass so slot values are never themselves scanned for slots
fn fill_slots(template: &str, slots: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replacement = after.find('}').and_then(|close| {
            let key = &after[..close];
            slots
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (close, *value))
        });
        match replacement {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
