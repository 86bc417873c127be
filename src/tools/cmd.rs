//! `cmd`: turn a request into a shell command with an explanation.

use super::{join_text, pairs, print_table, Session};
use crate::config::ToolKind;
use crate::context::HostContext;
use crate::protocol::{ParsedResult, ResponseSchema, UserInput};
use crate::render::Table;
use anyhow::Result;
use crossterm::style::Color;
use serde_json::json;

/// Build the system prompt for the given host.
pub fn system_prompt(host: &HostContext) -> String {
    format!(
        r#"You are an expert Linux system administrator. The user describes a task; reply with a single command that performs it in the terminal of the system described below. Give the complete command, explain what every argument does, add short notes that give useful context, and show an example of its use. Keep every answer brief.

Never invent commands or options. Only use what is certainly available on this system.

If the request cannot be fulfilled, leave every other field empty and explain why in error_message.

System:
{}"#,
        host
    )
}

pub fn schema() -> ResponseSchema {
    ResponseSchema::new(json!({
        "type": "object",
        "properties": {
            "command": { "type": "string" },
            "arg_explanation": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "arg": { "type": "string" },
                        "description": { "type": "string" }
                    },
                    "required": ["arg", "description"]
                }
            },
            "notes": { "type": "string" },
            "example_usage": { "type": "string" },
            "error_message": { "anyOf": [{ "type": "string" }, { "type": "null" }] }
        },
        "required": ["command", "arg_explanation", "notes", "example_usage", "error_message"]
    }))
}

pub fn render(result: &ParsedResult) -> Table {
    let mut table = Table::new();
    table
        .text("Command", result.text("command"), Color::Yellow)
        .rows("Arguments", pairs(result, "arg_explanation", "arg", "description"))
        .text("Notes", result.text("notes"), Color::Magenta)
        .text("Example Usage", result.text("example_usage"), Color::Green)
        .text("Error", result.text("error_message"), Color::Red);
    table
}

pub async fn run(session: &Session, words: &[String]) -> Result<()> {
    let prompt = system_prompt(&HostContext::gather());
    let result = session
        .execute(ToolKind::Cmd, prompt, UserInput::Text(join_text(words)), schema())
        .await?;
    print_table(&render(&result));
    Ok(())
}
