//! llmtools - small terminal front-ends to a local LLM.
//!
//! Each tool sends the user's text (or an image) to the model together with
//! a JSON schema, then renders the structured reply as a table.

mod adapter;
mod config;
mod context;
mod error;
mod llm;
mod picker;
mod protocol;
mod render;
mod tools;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use config::{Config, ModelSelection};
use std::path::PathBuf;
use std::process::Command as ProcessCommand;
use tools::Session;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "llmtools")]
#[command(author, version, about = "Small terminal front-ends to a local LLM")]
#[command(long_about = "Explain shell commands, translate text and name images using a locally hosted model.\n\nModel settings come from ~/.config/llmtools/config.toml and can be overridden per call.")]
struct Cli {
    /// Print debug information
    #[arg(long, global = true)]
    debug: bool,

    #[command(flatten)]
    selection: SelectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SelectionArgs {
    /// Override default model
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    model: Option<String>,

    /// Override default temperature
    #[arg(short = 't', long, global = true)]
    temperature: Option<f64>,

    /// Force seed value
    #[arg(short = 's', long, global = true)]
    seed: Option<i64>,

    /// Override context window size (0 to leave it to the server)
    #[arg(long, global = true, value_name = "TOKENS")]
    num_ctx: Option<u32>,
}

impl From<SelectionArgs> for ModelSelection {
    fn from(args: SelectionArgs) -> Self {
        Self {
            model: args.model,
            temperature: args.temperature,
            num_ctx: args.num_ctx,
            seed: args.seed,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Produce and explain a shell command for a task
    Cmd {
        /// What you want to do
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },
    /// Translate text into English
    Translate {
        /// Break down each part of the translation
        #[arg(short = 'b', long)]
        breakdown: bool,

        /// Source language (defaults to auto-detecting)
        #[arg(long)]
        lang: Option<String>,

        /// The text to translate
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },
    /// Suggest descriptive filenames for an image
    RenameImage {
        /// Image to describe
        image: PathBuf,

        /// Rename the file to the picked name
        #[arg(long)]
        apply: bool,
    },
    /// Send a free-form prompt and print the answer
    Ask {
        /// Input text
        input: Option<String>,

        /// Read (additional) input from a file
        #[arg(short = 'i', long, value_name = "FILE")]
        input_file: Option<PathBuf>,

        /// Write the answer to a file instead of stdout
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Open configuration file in $EDITOR
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug)?;

    let selection = ModelSelection::from(cli.selection);

    match cli.command {
        Commands::Config => handle_config(),
        Commands::Cmd { text } => tools::cmd::run(&open_session(selection)?, &text).await,
        Commands::Translate {
            breakdown,
            lang,
            text,
        } => {
            let options = tools::translate::TranslateOptions { breakdown, lang };
            tools::translate::run(&open_session(selection)?, &options, &text).await
        }
        Commands::RenameImage { image, apply } => {
            tools::rename_image::run(&open_session(selection)?, &image, apply).await
        }
        Commands::Ask {
            input,
            input_file,
            output,
        } => {
            tools::ask::run(
                &open_session(selection)?,
                input.as_deref(),
                input_file.as_deref(),
                output.as_deref(),
            )
            .await
        }
    }
}

/// Load the config file and connect the configured backend.
fn open_session(selection: ModelSelection) -> Result<Session> {
    let config = Config::load()?;
    debug!("using {} backend", config.backend_type());
    Ok(Session::new(config, selection)?)
}

/// Log to stderr so tool output on stdout stays clean.
fn init_logging(debug: bool) -> Result<()> {
    let level = if debug { "llmtools=debug" } else { "llmtools=warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(level.parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .init();
    Ok(())
}

/// Handle the config command.
fn handle_config() -> Result<()> {
    let config_path = Config::config_path()?;

    // Create default config if it doesn't exist
    if !config_path.exists() {
        Config::template().save()?;
        println!("Created default config at {}", config_path.display());
    }

    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
    let status = ProcessCommand::new(&editor)
        .arg(&config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        eprintln!("Editor exited with non-zero status");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_translate_args() {
        let cli = Cli::try_parse_from([
            "llmtools", "translate", "-b", "--lang", "French", "-s", "7", "bonjour", "le", "monde",
        ])
        .unwrap();
        assert_eq!(cli.selection.seed, Some(7));
        match cli.command {
            Commands::Translate {
                breakdown,
                lang,
                text,
            } => {
                assert!(breakdown);
                assert_eq!(lang.as_deref(), Some("French"));
                assert_eq!(text, vec!["bonjour", "le", "monde"]);
            }
            _ => panic!("expected translate"),
        }
    }

    #[test]
    fn test_global_overrides_before_subcommand() {
        let cli = Cli::try_parse_from([
            "llmtools", "-m", "qwen2.5:7b", "-t", "0.3", "--debug", "cmd", "list", "files",
        ])
        .unwrap();
        assert!(cli.debug);
        let selection = ModelSelection::from(cli.selection);
        assert_eq!(selection.model.as_deref(), Some("qwen2.5:7b"));
        assert_eq!(selection.temperature, Some(0.3));
    }

    #[test]
    fn test_config_subcommand_ignores_selection() {
        let cli = Cli::try_parse_from(["llmtools", "-m", "llava", "config"]).unwrap();
        assert!(matches!(cli.command, Commands::Config));
        assert_eq!(cli.selection.model.as_deref(), Some("llava"));
    }

    #[test]
    fn test_empty_text_is_rejected() {
        assert!(Cli::try_parse_from(["llmtools", "cmd"]).is_err());
        assert!(Cli::try_parse_from(["llmtools", "translate", "-b"]).is_err());
    }
}
