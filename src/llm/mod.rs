//! LLM backend implementations.
//!
//! Two transports are supported: Ollama's native API and any server that
//! speaks the OpenAI chat-completions dialect (llama.cpp, LM Studio, ...).

pub mod ollama;
pub mod openai;

use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::protocol::{ChatRequest, SamplingOptions};
use reqwest::Client;
use std::time::Duration;

/// Enum-based backend for LLM providers.
pub enum Backend {
    Ollama(ollama::OllamaBackend),
    OpenAI(openai::OpenAIBackend),
}

impl Backend {
    /// Send a system + user exchange and return the reply text verbatim.
    pub async fn chat(&self, request: &ChatRequest) -> Result<String> {
        match self {
            Backend::Ollama(b) => b.chat(request).await,
            Backend::OpenAI(b) => b.chat(request).await,
        }
    }

    /// Free-form completion of a single prompt.
    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        sampling: &SamplingOptions,
    ) -> Result<String> {
        match self {
            Backend::Ollama(b) => b.generate(model, prompt, sampling).await,
            Backend::OpenAI(b) => b.generate(model, prompt, sampling).await,
        }
    }

    /// Get the backend name.
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Ollama(_) => "ollama",
            Backend::OpenAI(_) => "openai",
        }
    }
}

/// Create a backend from configuration.
pub fn create_backend(config: &BackendConfig) -> Result<Backend> {
    match config {
        BackendConfig::Ollama {
            host,
            request_timeout_secs,
        } => Ok(Backend::Ollama(ollama::OllamaBackend::new(
            host.clone(),
            http_client(*request_timeout_secs)?,
        ))),
        BackendConfig::OpenAI {
            base_url,
            api_key,
            request_timeout_secs,
        } => Ok(Backend::OpenAI(openai::OpenAIBackend::new(
            base_url.clone(),
            api_key.clone(),
            http_client(*request_timeout_secs)?,
        ))),
    }
}

/// Without a configured timeout the request waits as long as the server does.
fn http_client(timeout_secs: Option<u64>) -> Result<Client> {
    let mut builder = Client::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder
        .build()
        .map_err(|e| Error::BackendUnavailable(format!("Failed to create HTTP client: {}", e)))
}

/// Join a base URL and an endpoint path without doubling the slash.
fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
