//! Request and result types shared by every tool.
//!
//! A [`ChatRequest`] is validated and fully materialized when it is built
//! (image bytes included), so sending it can only fail at the backend.

use crate::error::{Error, Result};
use base64::{engine::general_purpose, Engine as _};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// What the user hands to the model.
#[derive(Debug, Clone, PartialEq)]
pub enum UserInput {
    /// Literal text.
    Text(String),
    /// Path to an image on local storage.
    Image(PathBuf),
}

/// Sampling configuration for one request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingOptions {
    pub temperature: f64,
    /// Context window size. `None` means the field is not sent at all.
    pub context_window: Option<u32>,
    pub seed: Option<i64>,
}

impl SamplingOptions {
    pub fn new(temperature: f64) -> Self {
        Self {
            temperature,
            context_window: None,
            seed: None,
        }
    }

    pub fn with_context_window(mut self, context_window: Option<u32>) -> Self {
        self.context_window = context_window;
        self
    }

    pub fn with_seed(mut self, seed: Option<i64>) -> Self {
        self.seed = seed;
        self
    }
}

/// JSON schema describing the object the model should reply with.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSchema(Value);

impl ResponseSchema {
    pub fn new(schema: Value) -> Self {
        Self(schema)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Top-level property names, or `None` when the schema declares none.
    pub fn declared_fields(&self) -> Option<Vec<&str>> {
        self.0
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| props.keys().map(String::as_str).collect())
    }
}

/// Image bytes ready to attach to a message.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAttachment {
    pub base64: String,
    pub media_type: &'static str,
}

impl ImageAttachment {
    fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::Precondition(format!(
                "Image not found: {}",
                path.display()
            )));
        }
        let data = std::fs::read(path).map_err(|e| {
            Error::Precondition(format!("Failed to read image {}: {}", path.display(), e))
        })?;

        let media_type = match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("gif") => "image/gif",
            Some("bmp") => "image/bmp",
            Some("webp") => "image/webp",
            _ => "image/png",
        };

        Ok(Self {
            base64: general_purpose::STANDARD.encode(&data),
            media_type,
        })
    }
}

/// Body of the user message: text or a single image, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum UserContent {
    Text(String),
    Image(ImageAttachment),
}

/// One system + user exchange, immutable once built.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    model: String,
    system_prompt: String,
    content: UserContent,
    sampling: SamplingOptions,
    schema: ResponseSchema,
}

impl ChatRequest {
    /// Validate the inputs and build a request.
    ///
    /// Blank text, a blank system prompt, or an unreadable image are
    /// rejected with [`Error::Precondition`].
    pub fn new(
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        input: UserInput,
        sampling: SamplingOptions,
        schema: ResponseSchema,
    ) -> Result<Self> {
        let system_prompt = system_prompt.into();
        if system_prompt.trim().is_empty() {
            return Err(Error::Precondition("System prompt is empty".to_string()));
        }

        let content = match input {
            UserInput::Text(text) => {
                if text.trim().is_empty() {
                    return Err(Error::Precondition("No text provided".to_string()));
                }
                UserContent::Text(text)
            }
            UserInput::Image(path) => UserContent::Image(ImageAttachment::load(&path)?),
        };

        Ok(Self {
            model: model.into(),
            system_prompt,
            content,
            sampling,
            schema,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn content(&self) -> &UserContent {
        &self.content
    }

    pub fn sampling(&self) -> &SamplingOptions {
        &self.sampling
    }

    pub fn schema(&self) -> &ResponseSchema {
        &self.schema
    }
}

/// Decoded model reply.
///
/// Any field may be missing; absent, `null` and empty strings all mean
/// "not provided".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedResult {
    fields: Map<String, Value>,
    seed: Option<i64>,
}

impl ParsedResult {
    pub fn new(fields: Map<String, Value>, seed: Option<i64>) -> Self {
        Self { fields, seed }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// The seed sent with the request, if any.
    pub fn seed(&self) -> Option<i64> {
        self.seed
    }

    /// Non-empty string value of `key`.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// Array value of `key`, empty when absent or not an array.
    pub fn list(&self, key: &str) -> &[Value] {
        self.fields
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
