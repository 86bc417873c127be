//! `translate`: translate text into English.

use super::{join_text, pairs, print_table, Session};
use crate::config::ToolKind;
use crate::protocol::{ParsedResult, ResponseSchema, UserInput};
use crate::render::Table;
use anyhow::Result;
use crossterm::style::Color;
use serde_json::json;

/// Knobs exposed on the command line.
#[derive(Debug, Clone, Default)]
pub struct TranslateOptions {
    /// Ask for a part-by-part breakdown.
    pub breakdown: bool,
    /// Source language hint; auto-detected when `None`.
    pub lang: Option<String>,
}

pub fn system_prompt(options: &TranslateOptions) -> String {
    let breakdown = if options.breakdown {
        "\n- Break the source text into parts and translate each one so the user can see how the sentence is built. Only use parts that appear in the source text."
    } else {
        ""
    };
    let lang = options
        .lang
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| format!("\n\nThe source language is {}.", l))
        .unwrap_or_default();

    format!(
        r#"You are a world-class professional translator. Translate the whole text provided by the user into English.

- Give the complete translation.
- Name the language of the original text.
- Add notes that help explain the context of the translation.{breakdown}
- Never guess at the meaning of a word. If unsure, give a literal translation.
- Do not add words that are not in the original text.
- Keep answers concise.{lang}

Leave any field empty if it does not apply.

If you cannot translate the text confidently and correctly, leave every other field empty and only fill in error_message, for example "I cannot confidently translate this text.""#
    )
}

pub fn schema(options: &TranslateOptions) -> ResponseSchema {
    let mut schema = json!({
        "type": "object",
        "properties": {
            "english_translation": { "type": "string" },
            "language": { "type": "string" },
            "notes": { "type": "string" },
            "error_message": { "anyOf": [{ "type": "string" }, { "type": "null" }] }
        },
        "required": ["english_translation", "language", "notes", "error_message"]
    });

    if options.breakdown {
        schema["properties"]["breakdown"] = json!({
            "type": "array",
            "items": {
                "type": "object",
                "properties": {
                    "part": { "type": "string" },
                    "translation": { "type": "string" }
                },
                "required": ["part", "translation"]
            }
        });
        if let Some(required) = schema["required"].as_array_mut() {
            required.push(json!("breakdown"));
        }
    }

    ResponseSchema::new(schema)
}

pub fn render(result: &ParsedResult) -> Table {
    let mut table = Table::new();
    table
        .text("Translation", result.text("english_translation"), Color::Yellow)
        .text("Language", result.text("language"), Color::Cyan)
        .rows("Breakdown", pairs(result, "breakdown", "part", "translation"))
        .text("Notes", result.text("notes"), Color::Green)
        .text("Error", result.text("error_message"), Color::Red);
    table
}

pub async fn run(session: &Session, options: &TranslateOptions, words: &[String]) -> Result<()> {
    let result = session
        .execute(
            ToolKind::Translate,
            system_prompt(options),
            UserInput::Text(join_text(words)),
            schema(options),
        )
        .await?;
    print_table(&render(&result));
    Ok(())
}
