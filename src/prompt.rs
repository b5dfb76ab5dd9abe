//! Prompt assembly for remote completions.
//!
//! Prompts are built from plain-text templates stored under `config/prompts/`.
//! Layers are appended in order and `{{key}}` variables are substituted once
//! at [`build()`](PromptBuilder::build) time, after all layers are joined.
//!
//! ```text
//! relay_system.txt — assistant rules + {{owner}} {{summary}} {{contact}}
//!                    {{projects}} {{experience}} {{education}} {{skills}}
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::context::ContextBundle;

const SEPARATOR: &str = "\n\n";

/// File name of the system prompt template used for remote completions.
pub const SYSTEM_TEMPLATE: &str = "relay_system.txt";

/// Built-in copy of [`SYSTEM_TEMPLATE`], used when the prompts directory has
/// no override.
const BUILTIN_SYSTEM_TEMPLATE: &str = include_str!("../config/prompts/relay_system.txt");

/// Fluent builder that assembles a layered prompt from template files.
pub struct PromptBuilder {
    prompts_dir: PathBuf,
    parts: Vec<String>,
    vars: HashMap<String, String>,
}

impl PromptBuilder {
    /// Create a builder rooted at `prompts_dir` (e.g. `"config/prompts"`).
    pub fn new(prompts_dir: impl Into<PathBuf>) -> Self {
        Self {
            prompts_dir: prompts_dir.into(),
            parts: Vec::new(),
            vars: HashMap::new(),
        }
    }

    /// Append a layer by loading `filename` from the prompts directory.
    /// Silently skips the layer when the file does not exist.
    pub fn layer(self, filename: &str) -> Self {
        self.layer_or(filename, "")
    }

    /// Like [`layer`](Self::layer), but appends `fallback` when the file is
    /// missing.
    pub fn layer_or(mut self, filename: &str, fallback: &str) -> Self {
        let path = self.prompts_dir.join(filename);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(_) => {
                tracing::debug!("prompt: layer '{}' not found, using fallback", path.display());
                fallback.to_string()
            }
        };
        self.append(text)
    }

    /// Directly append a text fragment.
    pub fn append(mut self, text: impl Into<String>) -> Self {
        let s = text.into();
        let trimmed = s.trim();
        if !trimmed.is_empty() {
            self.parts.push(trimmed.to_string());
        }
        self
    }

    /// Register `{{key}}` → `value` substitution pairs applied at build time.
    pub fn with_vars<'a, I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (k, v) in vars {
            self.vars.insert(k.to_string(), v.to_string());
        }
        self
    }

    /// Register a single variable.
    pub fn var(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }

    /// Assemble all layers, join with blank lines, and apply variable substitution.
    pub fn build(self) -> String {
        let mut prompt = self.parts.join(SEPARATOR);
        for (k, v) in &self.vars {
            let placeholder = format!("{{{{{}}}}}", k);
            prompt = prompt.replace(&placeholder, v);
        }
        prompt
    }
}

/// System prompt for a remote completion about `owner`, grounded in `context`.
pub fn system_prompt(prompts_dir: impl AsRef<Path>, owner: &str, context: &ContextBundle) -> String {
    PromptBuilder::new(prompts_dir.as_ref())
        .layer_or(SYSTEM_TEMPLATE, BUILTIN_SYSTEM_TEMPLATE)
        .with_vars([
            ("owner", owner),
            ("summary", context.summary.as_str()),
            ("contact", context.contact.as_str()),
            ("projects", context.projects.as_str()),
            ("experience", context.experience.as_str()),
            ("education", context.education.as_str()),
            ("skills", context.skills.as_str()),
        ])
        .build()
}
