//! `rename-image`: suggest descriptive filenames for an image.

use super::Session;
use crate::config::ToolKind;
use crate::picker::{self, PickResult};
use crate::protocol::{ParsedResult, ResponseSchema, UserInput};
use anyhow::{bail, Context, Result};
use atty::Stream;
use crossterm::style::{Color, Stylize};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;

pub const SYSTEM_PROMPT: &str = "Describe this image visually, accounting for every item in it including text and distinct objects; read any text it contains. Then, based on that description, create 5 unique, descriptive, lowercase filenames as name_choices. Vary them: make some short and some long and detailed.";

pub fn schema() -> ResponseSchema {
    ResponseSchema::new(json!({
        "type": "object",
        "properties": {
            "description": { "type": "string" },
            "name_choices": { "type": "array", "items": { "type": "string" } }
        },
        "required": ["description", "name_choices"]
    }))
}

/// Non-blank suggested names, in the model's order.
pub fn name_choices(result: &ParsedResult) -> Vec<String> {
    result
        .list("name_choices")
        .iter()
        .filter_map(|v| v.as_str())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Where `image` ends up when renamed to `name`: same directory, original
/// extension kept.
pub fn target_path(image: &Path, name: &str) -> PathBuf {
    let name = name.trim().replace(['/', '\\'], "-");
    let file_name = match image.extension().and_then(|e| e.to_str()) {
        Some(ext) => {
            let has_ext = Path::new(&name)
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(ext));
            if has_ext {
                name
            } else {
                format!("{}.{}", name, ext)
            }
        }
        None => name,
    };

    match image.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}

pub async fn run(session: &Session, image: &Path, apply: bool) -> Result<()> {
    let result = session
        .execute(
            ToolKind::RenameImage,
            SYSTEM_PROMPT.to_string(),
            UserInput::Image(image.to_path_buf()),
            schema(),
        )
        .await?;

    if let Some(description) = result.text("description") {
        println!("{} {}", "What I saw:".with(Color::Blue), description.with(Color::Cyan));
        println!();
    }

    let choices = name_choices(&result);
    if choices.is_empty() {
        bail!("The model did not suggest any filenames");
    }
    for (i, name) in choices.iter().enumerate() {
        println!("{}. {}", i + 1, name);
    }

    if !(atty::is(Stream::Stdin) && atty::is(Stream::Stdout)) {
        if apply {
            bail!("--apply needs an interactive terminal to pick a name");
        }
        return Ok(());
    }

    let name = match picker::pick_name(choices)? {
        PickResult::Picked(name) => name,
        PickResult::Cancelled => {
            eprintln!("Cancelled.");
            return Ok(());
        }
    };

    if apply {
        let target = target_path(image, &name);
        if target.exists() {
            bail!("Refusing to overwrite {}", target.display());
        }
        std::fs::rename(image, &target).with_context(|| {
            format!("Failed to rename {} to {}", image.display(), target.display())
        })?;
        info!("renamed {} to {}", image.display(), target.display());
        println!("{}", target.display());
    } else {
        println!("{}", name);
    }

    Ok(())
}
