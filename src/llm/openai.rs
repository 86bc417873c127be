//! OpenAI-compatible backend implementation.
//!
//! Works against any server exposing `/chat/completions`; the API key is
//! optional because most local servers don't check it.

use super::endpoint;
use crate::error::{Error, Result};
use crate::protocol::{ChatRequest, SamplingOptions, UserContent};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Backend for OpenAI-compatible chat-completion servers.
pub struct OpenAIBackend {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAIBackend {
    pub fn new(base_url: String, api_key: Option<String>, client: Client) -> Self {
        Self {
            base_url,
            api_key,
            client,
        }
    }

    /// Get the API key from config or environment.
    fn api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
    }

    /// Run one chat exchange constrained by the request's JSON schema.
    pub async fn chat(&self, request: &ChatRequest) -> Result<String> {
        if request.sampling().context_window.is_some() {
            debug!("context window is not part of the chat-completions API; not sent");
        }

        let user_content = match request.content() {
            UserContent::Text(text) => OpenAIContent::Text(text.clone()),
            UserContent::Image(image) => OpenAIContent::Parts(vec![ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: format!("data:{};base64,{}", image.media_type, image.base64),
                },
            }]),
        };

        let body = OpenAIRequest {
            model: request.model(),
            messages: vec![
                OpenAIMessage {
                    role: "system",
                    content: OpenAIContent::Text(request.system_prompt().to_string()),
                },
                OpenAIMessage {
                    role: "user",
                    content: user_content,
                },
            ],
            temperature: request.sampling().temperature,
            seed: request.sampling().seed,
            response_format: Some(ResponseFormat {
                kind: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: "response",
                    schema: request.schema().as_value(),
                },
            }),
        };

        self.complete(&body).await
    }

    /// Complete a bare prompt as a single user message.
    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        sampling: &SamplingOptions,
    ) -> Result<String> {
        let body = OpenAIRequest {
            model,
            messages: vec![OpenAIMessage {
                role: "user",
                content: OpenAIContent::Text(prompt.to_string()),
            }],
            temperature: sampling.temperature,
            seed: sampling.seed,
            response_format: None,
        };

        self.complete(&body).await
    }

    async fn complete(&self, body: &OpenAIRequest<'_>) -> Result<String> {
        let url = endpoint(&self.base_url, "chat/completions");
        debug!("POST {} (model {})", url, body.model);

        let mut builder = self.client.post(&url).json(body);
        if let Some(key) = self.api_key() {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            Error::BackendUnavailable(format!("Failed to connect to {}: {}", self.base_url, e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body: std::result::Result<OpenAIError, _> = response.json().await;
            let message = body
                .map(|e| e.error.message)
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::BackendUnavailable(format!(
                "Chat completion request failed with status {}: {}",
                status, message
            )));
        }

        let reply: OpenAIResponse = response.json().await.map_err(|e| {
            Error::BackendUnavailable(format!("Failed to parse chat completion response: {}", e))
        })?;

        reply
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| Error::BackendUnavailable("Empty response from server".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage>,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat<'a>>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: &'static str,
    content: OpenAIContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum OpenAIContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'static str,
    schema: &'a Value,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessageResponse,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessageResponse {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIError {
    error: OpenAIErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ResponseSchema, UserInput};
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
        }))
    }

    #[tokio::test]
    async fn test_chat_sends_schema_and_seed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer local-key"))
            .respond_with(completion(r#"{"command": "ls"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let backend = OpenAIBackend::new(
            format!("{}/v1", server.uri()),
            Some("local-key".to_string()),
            Client::new(),
        );
        let request = ChatRequest::new(
            "qwen",
            "system",
            UserInput::Text("list files".to_string()),
            SamplingOptions::new(0.5)
                .with_seed(Some(42))
                .with_context_window(Some(2048)),
            ResponseSchema::new(json!({ "type": "object" })),
        )
        .unwrap();

        let reply = backend.chat(&request).await.unwrap();
        assert_eq!(reply, r#"{"command": "ls"}"#);

        let requests = server.received_requests().await.unwrap();
        let sent: Value = requests[0].body_json().unwrap();
        assert_eq!(sent["seed"], 42);
        assert_eq!(sent["response_format"]["type"], "json_schema");
        assert_eq!(sent["response_format"]["json_schema"]["schema"], json!({ "type": "object" }));
        assert_eq!(sent["messages"][1]["content"], "list files");
        assert!(sent.get("num_ctx").is_none());
    }

    #[tokio::test]
    async fn test_error_body_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({ "error": { "message": "model not loaded" } })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let backend = OpenAIBackend::new(server.uri(), None, Client::new());
        let err = backend
            .generate("missing", "hi", &SamplingOptions::new(0.2))
            .await
            .unwrap_err();
        match err {
            Error::BackendUnavailable(msg) => assert!(msg.contains("model not loaded")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_choices_is_backend_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let backend = OpenAIBackend::new(server.uri(), None, Client::new());
        let err = backend
            .generate("m", "hi", &SamplingOptions::new(0.2))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable(_)));
    }
}
