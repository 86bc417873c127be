//! Configuration management for llmtools.
//!
//! Configuration is loaded from `~/.config/llmtools/config.toml`. Every
//! value has a built-in default, so the file is optional.

use crate::protocol::SamplingOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend configuration.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Per-tool model settings.
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Backend configuration for LLM providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Ollama local backend.
    Ollama {
        /// Ollama host URL (default: http://localhost:11434).
        #[serde(default = "default_ollama_host")]
        host: String,
        /// Transport timeout; unset waits for the server indefinitely.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_timeout_secs: Option<u64>,
    },
    /// Any OpenAI-compatible chat-completions server.
    OpenAI {
        /// Base URL including the version prefix (default: http://localhost:8080/v1).
        #[serde(default = "default_openai_base_url")]
        base_url: String,
        /// API key (falls back to OPENAI_API_KEY, may be absent for local servers).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        api_key: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_timeout_secs: Option<u64>,
    },
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Ollama {
            host: default_ollama_host(),
            request_timeout_secs: None,
        }
    }
}

fn default_ollama_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_base_url() -> String {
    "http://localhost:8080/v1".to_string()
}

/// The tools whose settings can be configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Cmd,
    Translate,
    RenameImage,
    Ask,
}

impl ToolKind {
    /// Built-in settings used when neither the config file nor the command
    /// line say otherwise.
    pub fn defaults(self) -> ToolSettings {
        let (model, temperature, num_ctx) = match self {
            ToolKind::Cmd => ("llama3.2", 0.2, 2048),
            ToolKind::Translate => ("mistral-small:latest", 0.15, 2048),
            ToolKind::RenameImage => ("llama3.2-vision:latest", 0.4, 4096),
            ToolKind::Ask => ("llama3.1:latest", 0.75, 64 * 1024),
        };
        ToolSettings {
            model: model.to_string(),
            temperature,
            num_ctx: Some(num_ctx),
        }
    }
}

/// Resolved model settings for one tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSettings {
    pub model: String,
    pub temperature: f64,
    pub num_ctx: Option<u32>,
}

/// Optional overrides for a tool; missing values fall back to the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Context window size; `0` means "don't send one".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<u32>,
}

impl ToolOverrides {
    fn apply(&self, mut settings: ToolSettings) -> ToolSettings {
        if let Some(model) = &self.model {
            settings.model = model.clone();
        }
        if let Some(temperature) = self.temperature {
            settings.temperature = temperature;
        }
        if let Some(num_ctx) = self.num_ctx {
            settings.num_ctx = Some(num_ctx).filter(|n| *n > 0);
        }
        settings
    }

    fn from_settings(settings: ToolSettings) -> Self {
        Self {
            model: Some(settings.model),
            temperature: Some(settings.temperature),
            num_ctx: settings.num_ctx,
        }
    }
}

/// `[tools.*]` tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub cmd: ToolOverrides,
    #[serde(default)]
    pub translate: ToolOverrides,
    #[serde(default)]
    pub rename_image: ToolOverrides,
    #[serde(default)]
    pub ask: ToolOverrides,
}

impl ToolsConfig {
    fn get(&self, tool: ToolKind) -> &ToolOverrides {
        match tool {
            ToolKind::Cmd => &self.cmd,
            ToolKind::Translate => &self.translate,
            ToolKind::RenameImage => &self.rename_image,
            ToolKind::Ask => &self.ask,
        }
    }
}

impl Config {
    /// A config with every tool's defaults spelled out, used as the
    /// starting point for a freshly created file.
    pub fn template() -> Self {
        Self {
            backend: BackendConfig::default(),
            tools: ToolsConfig {
                cmd: ToolOverrides::from_settings(ToolKind::Cmd.defaults()),
                translate: ToolOverrides::from_settings(ToolKind::Translate.defaults()),
                rename_image: ToolOverrides::from_settings(ToolKind::RenameImage.defaults()),
                ask: ToolOverrides::from_settings(ToolKind::Ask.defaults()),
            },
        }
    }

    /// Get the config directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("llmtools"))
            .context("Could not determine config directory")
    }

    /// Get the config file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, using defaults if not found.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Get the backend type as a string.
    pub fn backend_type(&self) -> &'static str {
        match &self.backend {
            BackendConfig::Ollama { .. } => "ollama",
            BackendConfig::OpenAI { .. } => "openai",
        }
    }

    /// Settings for `tool` after applying the config file.
    pub fn tool_settings(&self, tool: ToolKind) -> ToolSettings {
        self.tools.get(tool).apply(tool.defaults())
    }
}

/// Model selection from the command line. Anything set here wins over the
/// config file.
#[derive(Debug, Clone, Default)]
pub struct ModelSelection {
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub num_ctx: Option<u32>,
    pub seed: Option<i64>,
}

impl ModelSelection {
    /// Resolve the model name and sampling options for `tool`.
    pub fn resolve(&self, config: &Config, tool: ToolKind) -> (String, SamplingOptions) {
        let settings = ToolOverrides {
            model: self
                .model
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string),
            temperature: self.temperature,
            num_ctx: self.num_ctx,
        }
        .apply(config.tool_settings(tool));

        let sampling = SamplingOptions::new(settings.temperature)
            .with_context_window(settings.num_ctx)
            .with_seed(self.seed);
        (settings.model, sampling)
    }
}
