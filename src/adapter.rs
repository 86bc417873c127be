//! Request/response normalization.
//!
//! Sends one [`ChatRequest`] to a [`Backend`] and turns the reply text into a
//! [`ParsedResult`]. Models sometimes typeset JSON delimiters as curly
//! quotes, so the reply is sanitized before it is parsed.

use crate::error::{Error, Result};
use crate::llm::Backend;
use crate::protocol::{ChatRequest, ParsedResult, ResponseSchema, UserContent};
use serde_json::{Map, Value};
use tracing::debug;

/// Issue `request` once and parse the reply.
///
/// No retries: a transport failure is [`Error::BackendUnavailable`], a reply
/// that is not a JSON object is [`Error::ResponseFormat`].
pub async fn execute(backend: &Backend, request: &ChatRequest) -> Result<ParsedResult> {
    debug!(
        backend = backend.name(),
        model = request.model(),
        temperature = request.sampling().temperature,
        num_ctx = ?request.sampling().context_window,
        seed = ?request.sampling().seed,
        image = matches!(request.content(), UserContent::Image(_)),
        "sending chat request"
    );

    let raw = backend.chat(request).await?;
    debug!("raw reply: {}", raw);

    let result = ParsedResult::new(parse_reply(&raw, request.schema())?, request.sampling().seed);
    debug!("parsed reply: {:?}", result.fields());

    Ok(result)
}

/// Replace typographic quotes with their ASCII forms.
pub fn sanitize(text: &str) -> String {
    text.replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
}

/// Like [`sanitize`], but curly single quotes sitting where a JSON string
/// delimiter belongs become double quotes.
fn sanitize_delimiters(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());

    for (i, &c) in chars.iter().enumerate() {
        match c {
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2018}' | '\u{2019}' => {
                let before = chars[..i].iter().rev().find(|c| !c.is_whitespace());
                let after = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                let opens = matches!(before, None | Some('{' | '[' | ',' | ':'));
                let closes = matches!(after, None | Some('}' | ']' | ',' | ':'));
                out.push(if opens || closes { '"' } else { '\'' });
            }
            _ => out.push(c),
        }
    }

    out
}

/// Sanitize and decode a reply, keeping only the schema's declared fields.
///
/// Curly quotes inside string values are legal JSON, so when neither
/// sanitized form parses the untouched reply is tried last.
pub fn parse_reply(raw: &str, schema: &ResponseSchema) -> Result<Map<String, Value>> {
    let value = match serde_json::from_str::<Value>(&sanitize(raw)) {
        Ok(value) => value,
        Err(err) => serde_json::from_str::<Value>(&sanitize_delimiters(raw))
            .or_else(|_| serde_json::from_str::<Value>(raw))
            .map_err(|_| Error::response_format(err.to_string(), raw))?,
    };

    let Value::Object(mut fields) = value else {
        return Err(Error::response_format("expected a JSON object", raw));
    };

    if let Some(declared) = schema.declared_fields() {
        fields.retain(|key, _| {
            let keep = declared.contains(&key.as_str());
            if !keep {
                debug!("dropping undeclared field {:?}", key);
            }
            keep
        });
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::llm::create_backend;
    use crate::protocol::{SamplingOptions, UserInput};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn translation_schema() -> ResponseSchema {
        ResponseSchema::new(json!({
            "type": "object",
            "properties": {
                "translation_result": { "type": "string" },
                "language": { "type": "string" },
                "notes": { "type": "string" },
                "error_message": { "anyOf": [{ "type": "string" }, { "type": "null" }] }
            },
            "required": ["translation_result", "language", "notes", "error_message"]
        }))
    }

    fn ollama(uri: String) -> Backend {
        create_backend(&BackendConfig::Ollama {
            host: uri,
            request_timeout_secs: None,
        })
        .unwrap()
    }

    async fn stub(reply: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "mistral-small:latest",
                "message": { "role": "assistant", "content": reply },
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;
        server
    }

    fn translate_request(sampling: SamplingOptions) -> ChatRequest {
        ChatRequest::new(
            "mistral-small:latest",
            "Translate to English",
            UserInput::Text("bonjour".to_string()),
            sampling,
            translation_schema(),
        )
        .unwrap()
    }

    async fn sent_body(server: &MockServer) -> Value {
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        requests[0].body_json().unwrap()
    }

    #[test]
    fn test_sanitize_is_noop_on_ascii() {
        let text = r#"{"a": "it's fine"}"#;
        assert_eq!(sanitize(text), text);
    }

    #[test]
    fn test_sanitize_replaces_curly_quotes() {
        assert_eq!(
            sanitize("\u{201C}a\u{201D} \u{2018}b\u{2019}"),
            "\"a\" 'b'"
        );
    }

    #[test]
    fn test_parse_curly_double_quotes() {
        let schema = ResponseSchema::new(json!({ "type": "object" }));
        let fields = parse_reply("{\u{201C}a\u{201D}: \u{201C}b\u{201D}}", &schema).unwrap();
        assert_eq!(Value::Object(fields), json!({ "a": "b" }));
    }

    #[test]
    fn test_parse_curly_single_quoted_value() {
        let schema = ResponseSchema::new(json!({ "type": "object" }));
        let fields = parse_reply("{\u{201C}a\u{201D}: \u{2018}b\u{2019}}", &schema).unwrap();
        assert_eq!(Value::Object(fields), json!({ "a": "b" }));
    }

    #[test]
    fn test_parse_keeps_apostrophes_inside_strings() {
        let schema = ResponseSchema::new(json!({ "type": "object" }));
        let fields =
            parse_reply("{\u{201C}notes\u{201D}: \"don\u{2019}t panic\"}", &schema).unwrap();
        assert_eq!(Value::Object(fields), json!({ "notes": "don't panic" }));
    }

    #[test]
    fn test_parse_keeps_curly_quotes_inside_valid_json() {
        let schema = ResponseSchema::new(json!({ "type": "object" }));
        let raw = "{\"notes\": \"the \u{201C}best\u{201D} option\"}";
        let fields = parse_reply(raw, &schema).unwrap();
        assert_eq!(
            Value::Object(fields),
            json!({ "notes": "the \u{201C}best\u{201D} option" })
        );
    }

    #[test]
    fn test_parse_ascii_json_matches_serde() {
        let schema = ResponseSchema::new(json!({ "type": "object" }));
        let text = r#"{"a": [1, 2], "b": {"c": null}}"#;
        let fields = parse_reply(text, &schema).unwrap();
        assert_eq!(
            Value::Object(fields),
            serde_json::from_str::<Value>(text).unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_non_json() {
        let err = parse_reply("I'm not JSON", &translation_schema()).unwrap_err();
        match err {
            Error::ResponseFormat { raw, .. } => assert_eq!(raw, "I'm not JSON"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_non_object() {
        for text in ["[1, 2]", "\"hello\"", "42", "null"] {
            let err = parse_reply(text, &translation_schema()).unwrap_err();
            assert!(matches!(err, Error::ResponseFormat { .. }), "{text}");
        }
    }

    #[test]
    fn test_parse_drops_undeclared_fields() {
        let fields = parse_reply(
            r#"{"language": "French", "confidence": 0.9}"#,
            &translation_schema(),
        )
        .unwrap();
        assert_eq!(Value::Object(fields), json!({ "language": "French" }));
    }

    #[tokio::test]
    async fn test_execute_translation() {
        let server = stub(
            r#"{"translation_result": "hello", "language": "French", "notes": "", "error_message": null}"#,
        )
        .await;
        let backend = ollama(server.uri());

        let result = execute(&backend, &translate_request(SamplingOptions::new(0.15)))
            .await
            .unwrap();

        assert_eq!(result.text("translation_result"), Some("hello"));
        assert_eq!(result.text("language"), Some("French"));
        assert_eq!(result.text("notes"), None);
        assert_eq!(result.text("error_message"), None);
        assert_eq!(result.seed(), None);
    }

    #[tokio::test]
    async fn test_execute_request_shape() {
        let server = stub(r#"{"language": "French"}"#).await;
        let backend = ollama(server.uri());

        execute(&backend, &translate_request(SamplingOptions::new(0.5)))
            .await
            .unwrap();

        let body = sent_body(&server).await;
        assert_eq!(body["model"], "mistral-small:latest");
        assert_eq!(
            body["messages"],
            json!([
                { "role": "system", "content": "Translate to English" },
                { "role": "user", "content": "bonjour" }
            ])
        );
        assert_eq!(body["format"], *translation_schema().as_value());
        assert_eq!(body["options"], json!({ "temperature": 0.5 }));
        assert!(body["options"].get("num_ctx").is_none());
    }

    #[tokio::test]
    async fn test_execute_echoes_seed() {
        let server = stub(r#"{"language": "French"}"#).await;
        let backend = ollama(server.uri());
        let sampling = SamplingOptions::new(0.5)
            .with_context_window(Some(2048))
            .with_seed(Some(1234));

        let result = execute(&backend, &translate_request(sampling)).await.unwrap();

        assert_eq!(result.seed(), Some(1234));
        let body = sent_body(&server).await;
        assert_eq!(body["options"]["seed"], 1234);
        assert_eq!(body["options"]["num_ctx"], 2048);
    }

    #[tokio::test]
    async fn test_execute_non_json_reply() {
        let server = stub("I'm not JSON").await;
        let backend = ollama(server.uri());

        let err = execute(&backend, &translate_request(SamplingOptions::new(0.15)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ResponseFormat { .. }));
    }

    #[tokio::test]
    async fn test_execute_server_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
            .expect(1)
            .mount(&server)
            .await;
        let backend = ollama(server.uri());

        let err = execute(&backend, &translate_request(SamplingOptions::new(0.15)))
            .await
            .unwrap_err();
        match err {
            Error::BackendUnavailable(msg) => assert!(msg.contains("500")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_execute_connection_refused() {
        // Bind then release a port so nothing is listening on it.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let backend = ollama(format!("http://127.0.0.1:{port}"));

        let err = execute(&backend, &translate_request(SamplingOptions::new(0.15)))
            .await
            .unwrap_err();
        match err {
            Error::BackendUnavailable(msg) => assert!(msg.contains("Failed to connect")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
