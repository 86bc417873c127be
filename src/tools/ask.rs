//! `ask`: one-shot free-form prompt.

use super::Session;
use crate::config::ToolKind;
use anyhow::{bail, Context, Result};
use std::path::Path;

/// Combine inline text with file contents. Returns `None` when both are
/// missing or blank.
pub fn compose_prompt(text: Option<&str>, file_contents: Option<&str>) -> Option<String> {
    let text = text.filter(|t| !t.trim().is_empty());
    let file_contents = file_contents.filter(|c| !c.trim().is_empty());

    match (text, file_contents) {
        (Some(text), Some(contents)) => Some(format!("{}\n####\n{}", text, contents)),
        (Some(text), None) => Some(text.to_string()),
        (None, Some(contents)) => Some(contents.to_string()),
        (None, None) => None,
    }
}

pub async fn run(
    session: &Session,
    text: Option<&str>,
    input_file: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let file_contents = input_file
        .map(|path| {
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read input file: {}", path.display()))
        })
        .transpose()?;

    let Some(prompt) = compose_prompt(text, file_contents.as_deref()) else {
        bail!("Either quoted input text or --input-file must be given");
    };

    let answer = session.generate(ToolKind::Ask, &prompt).await?;

    match output {
        Some(path) => std::fs::write(path, &answer)
            .with_context(|| format!("Failed to write output file: {}", path.display()))?,
        None => println!("{}", answer),
    }

    Ok(())
}
