//! The command-line tools.
//!
//! Each tool is data on top of one shared [`Session`]: a system prompt, a
//! response schema and a renderer. The session owns the configuration and
//! the backend for the lifetime of the process.

pub mod ask;
pub mod cmd;
pub mod rename_image;
pub mod translate;

use crate::adapter;
use crate::config::{Config, ModelSelection, ToolKind};
use crate::error::Result;
use crate::llm::{create_backend, Backend};
use crate::protocol::{ChatRequest, ParsedResult, ResponseSchema, UserInput};
use crate::render::Table;
use tracing::info;

/// Configuration, backend and command-line overrides for one invocation.
pub struct Session {
    config: Config,
    backend: Backend,
    selection: ModelSelection,
}

impl Session {
    pub fn new(config: Config, selection: ModelSelection) -> Result<Self> {
        let backend = create_backend(&config.backend)?;
        Ok(Self {
            config,
            backend,
            selection,
        })
    }

    /// Send one structured request on behalf of `tool`.
    pub async fn execute(
        &self,
        tool: ToolKind,
        system_prompt: String,
        input: UserInput,
        schema: ResponseSchema,
    ) -> Result<ParsedResult> {
        let (model, sampling) = self.selection.resolve(&self.config, tool);
        info!("{:?} using {} via {}", tool, model, self.backend.name());

        let request = ChatRequest::new(model, system_prompt, input, sampling, schema)?;
        let result = adapter::execute(&self.backend, &request).await?;

        if let Some(seed) = result.seed() {
            eprintln!("Using seed: {}", seed);
        }
        Ok(result)
    }

    /// Free-form completion on behalf of `tool`.
    pub async fn generate(&self, tool: ToolKind, prompt: &str) -> Result<String> {
        let (model, sampling) = self.selection.resolve(&self.config, tool);
        info!("{:?} using {} via {}", tool, model, self.backend.name());

        let text = self.backend.generate(&model, prompt, &sampling).await?;
        if let Some(seed) = sampling.seed {
            eprintln!("Using seed: {}", seed);
        }
        Ok(text)
    }
}

/// Join command-line words into the user's text.
pub fn join_text(words: &[String]) -> String {
    words.join(" ").trim().to_string()
}

/// Print a result table, or a notice when the model left every field blank.
fn print_table(table: &Table) {
    if table.is_empty() {
        eprintln!("The model returned nothing to show.");
    } else {
        println!("{}", table.render());
    }
}

/// `(left, right)` string pairs from an array of objects, skipping entries
/// that lack either key.
fn pairs(result: &ParsedResult, field: &str, left: &str, right: &str) -> Vec<(String, String)> {
    result
        .list(field)
        .iter()
        .filter_map(|item| {
            let l = item.get(left)?.as_str()?.trim();
            let r = item.get(right)?.as_str()?.trim();
            (!l.is_empty()).then(|| (l.to_string(), r.to_string()))
        })
        .collect()
}
