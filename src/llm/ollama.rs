//! Ollama backend implementation.
//!
//! Talks to a local Ollama server through `/api/chat` (structured output)
//! and `/api/generate` (free-form completion).

use super::endpoint;
use crate::error::{Error, Result};
use crate::protocol::{ChatRequest, SamplingOptions, UserContent};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Ollama backend for local LLM inference.
pub struct OllamaBackend {
    host: String,
    client: Client,
}

impl OllamaBackend {
    pub fn new(host: String, client: Client) -> Self {
        Self { host, client }
    }

    /// Run one non-streaming chat exchange and return the reply content.
    pub async fn chat(&self, request: &ChatRequest) -> Result<String> {
        let url = endpoint(&self.host, "/api/chat");

        let user = match request.content() {
            UserContent::Text(text) => OllamaMessage {
                role: "user",
                content: text,
                images: Vec::new(),
            },
            UserContent::Image(image) => OllamaMessage {
                role: "user",
                content: "",
                images: vec![image.base64.as_str()],
            },
        };

        let body = OllamaChatRequest {
            model: request.model(),
            messages: vec![
                OllamaMessage {
                    role: "system",
                    content: request.system_prompt(),
                    images: Vec::new(),
                },
                user,
            ],
            stream: false,
            format: request.schema().as_value(),
            options: OllamaOptions::from(request.sampling()),
        };

        debug!("POST {} (model {})", url, request.model());
        let response = self.post(&url, &body).await?;

        let reply: OllamaChatResponse = response.json().await.map_err(|e| {
            Error::BackendUnavailable(format!("Failed to parse Ollama response: {}", e))
        })?;
        Ok(reply.message.content)
    }

    /// Complete a bare prompt without a system message or schema.
    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        sampling: &SamplingOptions,
    ) -> Result<String> {
        let url = endpoint(&self.host, "/api/generate");

        let body = OllamaGenerateRequest {
            model,
            prompt,
            stream: false,
            options: OllamaOptions::from(sampling),
        };

        debug!("POST {} (model {})", url, model);
        let response = self.post(&url, &body).await?;

        let reply: OllamaGenerateResponse = response.json().await.map_err(|e| {
            Error::BackendUnavailable(format!("Failed to parse Ollama response: {}", e))
        })?;
        Ok(reply.response)
    }

    async fn post<T: Serialize>(&self, url: &str, body: &T) -> Result<Response> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                Error::BackendUnavailable(format!(
                    "Failed to connect to Ollama at {} - is it running? ({})",
                    self.host, e
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::BackendUnavailable(format!(
                "Ollama request failed with status {}: {}",
                status, body
            )));
        }

        Ok(response)
    }
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
    format: &'a Value,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaMessage<'a> {
    role: &'static str,
    content: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_ctx: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<i64>,
}

impl From<&SamplingOptions> for OllamaOptions {
    fn from(sampling: &SamplingOptions) -> Self {
        Self {
            temperature: sampling.temperature,
            num_ctx: sampling.context_window,
            seed: sampling.seed,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaReplyMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaReplyMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ResponseSchema, UserInput};
    use serde_json::json;
    use std::io::Write;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> OllamaBackend {
        OllamaBackend::new(server.uri(), Client::new())
    }

    #[test]
    fn test_options_omit_unset_fields() {
        let options = OllamaOptions::from(&SamplingOptions::new(0.5));
        let value = serde_json::to_value(&options).unwrap();
        assert_eq!(value, json!({ "temperature": 0.5 }));
    }

    #[tokio::test]
    async fn test_image_request_carries_only_the_attachment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": { "role": "assistant", "content": "{}" },
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(b"abc").unwrap();
        let request = ChatRequest::new(
            "llava",
            "describe",
            UserInput::Image(file.path().to_path_buf()),
            SamplingOptions::new(0.4),
            ResponseSchema::new(json!({ "type": "object" })),
        )
        .unwrap();

        backend(&server).chat(&request).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let sent: Value = requests[0].body_json().unwrap();
        assert_eq!(sent["messages"][0]["role"], "system");
        assert_eq!(sent["messages"][0]["content"], "describe");
        assert!(sent["messages"][0].get("images").is_none());
        assert_eq!(sent["messages"][1]["content"], "");
        assert_eq!(sent["messages"][1]["images"], json!(["YWJj"]));
        assert_eq!(sent["stream"], false);
    }

    #[tokio::test]
    async fn test_generate_returns_response_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({
                "model": "llama3.1:latest",
                "prompt": "tell me a joke",
                "stream": false,
                "options": { "num_ctx": 65536 }
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "response": "knock knock", "done": true })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let sampling = SamplingOptions::new(0.75).with_context_window(Some(65536));
        let text = backend(&server)
            .generate("llama3.1:latest", "tell me a joke", &sampling)
            .await
            .unwrap();
        assert_eq!(text, "knock knock");
    }

    #[tokio::test]
    async fn test_unparseable_envelope_is_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
            .mount(&server)
            .await;

        let err = backend(&server)
            .generate("m", "p", &SamplingOptions::new(0.1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable(_)));
    }
}
