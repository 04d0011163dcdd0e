//! Reasoning-service abstraction — builds single-prompt HTTP requests and
//! reduces each provider's response envelope to plain text.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportFailure;
use crate::settings::{LlmProvider, LlmProviderConfig};

/// An API key. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// `None` for a missing or blank key.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into().trim().to_string();
        (!key.is_empty()).then_some(Self(key))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// The external capability the interpreter depends on: one prompt in, one text
/// completion out.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    async fn complete(&self, credential: &Credential, prompt: &str)
        -> Result<String, TransportFailure>;
}

/// Resolved provider details ready for making an API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProvider {
    pub url: String,
    pub model: String,
    pub provider: LlmProvider,
}

impl ResolvedProvider {
    /// Resolve a provider config into a concrete URL and model.
    pub fn from_config(config: &LlmProviderConfig) -> Self {
        let base = |default: &'static str| {
            config
                .base_url
                .as_deref()
                .unwrap_or(default)
                .trim_end_matches('/')
                .to_string()
        };
        let model = |default: &'static str| {
            config
                .model
                .clone()
                .unwrap_or_else(|| default.to_string())
        };

        match config.provider {
            LlmProvider::Gemini => {
                let model = model("gemini-2.0-flash");
                Self {
                    url: format!(
                        "{}/models/{model}:generateContent",
                        base("https://generativelanguage.googleapis.com/v1beta")
                    ),
                    model,
                    provider: LlmProvider::Gemini,
                }
            }
            LlmProvider::Anthropic => Self {
                url: format!("{}/v1/messages", base("https://api.anthropic.com")),
                model: model("claude-sonnet-4-20250514"),
                provider: LlmProvider::Anthropic,
            },
            LlmProvider::OpenAiCompatible => Self {
                url: format!("{}/chat/completions", base("https://api.openai.com/v1")),
                model: model("gpt-4o"),
                provider: LlmProvider::OpenAiCompatible,
            },
        }
    }
}

/// Build the HTTP request carrying `prompt` as a single user turn.
pub fn build_request(
    client: &reqwest::Client,
    provider: &ResolvedProvider,
    credential: &Credential,
    prompt: &str,
) -> reqwest::RequestBuilder {
    match provider.provider {
        LlmProvider::Gemini => {
            let body = serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
                "generationConfig": { "temperature": 0.0 },
            });
            client
                .post(&provider.url)
                .header("x-goog-api-key", credential.expose())
                .json(&body)
        }
        LlmProvider::Anthropic => {
            let body = serde_json::json!({
                "model": provider.model,
                "max_tokens": 1024,
                "temperature": 0.0,
                "messages": [{ "role": "user", "content": prompt }],
            });
            client
                .post(&provider.url)
                .header("x-api-key", credential.expose())
                .header("anthropic-version", "2023-06-01")
                .json(&body)
        }
        LlmProvider::OpenAiCompatible => {
            let body = serde_json::json!({
                "model": provider.model,
                "temperature": 0.0,
                "messages": [{ "role": "user", "content": prompt }],
            });
            client
                .post(&provider.url)
                .bearer_auth(credential.expose())
                .json(&body)
        }
    }
}

/// Pull the completion text out of a provider response.
///
/// # Errors
/// Returns an error string when the envelope has no text where it should.
pub fn parse_response(provider: LlmProvider, json: &Value) -> Result<String, String> {
    match provider {
        LlmProvider::Gemini => json
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|c| c.first())
            .and_then(|c| c.pointer("/content/parts"))
            .and_then(Value::as_array)
            .map(|parts| join_text(parts.iter().filter_map(|p| p.get("text"))))
            .ok_or_else(|| "No candidates in Gemini response".to_string()),
        LlmProvider::Anthropic => json
            .get("content")
            .and_then(Value::as_array)
            .map(|blocks| {
                join_text(
                    blocks
                        .iter()
                        .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
                        .filter_map(|b| b.get("text")),
                )
            })
            .ok_or_else(|| "No content in Anthropic response".to_string()),
        LlmProvider::OpenAiCompatible => json
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|arr| arr.first())
            .and_then(|choice| choice.pointer("/message/content"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| "No message content in OpenAI response".to_string()),
    }
}

fn join_text<'a>(values: impl Iterator<Item = &'a Value>) -> String {
    values.filter_map(Value::as_str).collect::<Vec<_>>().join("")
}

/// [`ReasoningService`] backed by a provider's HTTP API.
pub struct HttpReasoningService {
    client: reqwest::Client,
    provider: ResolvedProvider,
}

impl HttpReasoningService {
    pub fn new(config: &LlmProviderConfig, timeout: Duration) -> Result<Self, TransportFailure> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportFailure::network(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            provider: ResolvedProvider::from_config(config),
        })
    }
}

#[async_trait]
impl ReasoningService for HttpReasoningService {
    async fn complete(
        &self,
        credential: &Credential,
        prompt: &str,
    ) -> Result<String, TransportFailure> {
        tracing::debug!(
            provider = ?self.provider.provider,
            model = %self.provider.model,
            prompt_chars = prompt.len(),
            "sending prompt"
        );

        let response = build_request(&self.client, &self.provider, credential, prompt)
            .send()
            .await
            .map_err(|e| TransportFailure::network(format!("API request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportFailure::http(status.as_u16(), body));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| TransportFailure::network(format!("Failed to read response: {e}")))?;

        parse_response(self.provider.provider, &json).map_err(|message| TransportFailure {
            status: Some(status.as_u16()),
            body: json.to_string(),
            message,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use std::net::SocketAddr;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    fn config(provider: LlmProvider) -> LlmProviderConfig {
        LlmProviderConfig {
            provider,
            ..LlmProviderConfig::default()
        }
    }

    #[test]
    fn blank_credential_is_none() {
        assert!(Credential::new("   ").is_none());
        let cred = Credential::new(" abc ").unwrap();
        assert_eq!(cred.expose(), "abc");
        assert_eq!(format!("{cred:?}"), "Credential(***)");
    }

    #[test]
    fn resolves_default_urls() {
        let gemini = ResolvedProvider::from_config(&config(LlmProvider::Gemini));
        assert_eq!(
            gemini.url,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );

        let openai = ResolvedProvider::from_config(&LlmProviderConfig {
            base_url: Some("http://localhost:11434/v1/".to_string()),
            model: Some("llama3".to_string()),
            ..config(LlmProvider::OpenAiCompatible)
        });
        assert_eq!(openai.url, "http://localhost:11434/v1/chat/completions");
        assert_eq!(openai.model, "llama3");
    }

    #[test]
    fn gemini_request_sends_key_in_header_not_url() {
        let provider = ResolvedProvider::from_config(&config(LlmProvider::Gemini));
        let cred = Credential::new("k-123").unwrap();
        let request = build_request(&reqwest::Client::new(), &provider, &cred, "hello")
            .build()
            .unwrap();

        assert!(!request.url().as_str().contains("k-123"));
        assert_eq!(request.headers()["x-goog-api-key"], "k-123");
        let body: Value =
            serde_json::from_slice(request.body().unwrap().as_bytes().unwrap()).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
    }

    #[test]
    fn parses_each_provider_envelope() {
        let gemini = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"a\":" }, { "text": "1}" }] } }]
        });
        assert_eq!(parse_response(LlmProvider::Gemini, &gemini).unwrap(), "{\"a\":1}");

        let anthropic = serde_json::json!({
            "content": [{ "type": "text", "text": "hi" }, { "type": "tool_use", "id": "x" }]
        });
        assert_eq!(parse_response(LlmProvider::Anthropic, &anthropic).unwrap(), "hi");

        let openai = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "ok" } }]
        });
        assert_eq!(parse_response(LlmProvider::OpenAiCompatible, &openai).unwrap(), "ok");
    }

    #[test]
    fn missing_envelope_fields_are_errors() {
        let empty = serde_json::json!({});
        assert!(parse_response(LlmProvider::Gemini, &empty).is_err());
        assert!(parse_response(LlmProvider::Anthropic, &empty).is_err());
        assert!(parse_response(LlmProvider::OpenAiCompatible, &empty).is_err());
    }

    /// Answer exactly one HTTP request on a loopback port with a canned response.
    async fn serve_once(status_line: &'static str, body: &'static str) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let content_length = text[..head_end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + content_length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        addr
    }

    fn local_service(addr: SocketAddr) -> HttpReasoningService {
        let config = LlmProviderConfig {
            base_url: Some(format!("http://{addr}")),
            ..config(LlmProvider::OpenAiCompatible)
        };
        HttpReasoningService::new(&config, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn error_status_keeps_body_verbatim() {
        let addr = serve_once("429 Too Many Requests", r#"{"error":"quota"}"#).await;
        let cred = Credential::new("k-123").unwrap();
        let failure = local_service(addr).complete(&cred, "hello").await.unwrap_err();
        assert_eq!(failure.status, Some(429));
        assert_eq!(failure.body, r#"{"error":"quota"}"#);
        assert_eq!(failure.message, "API error 429");
    }

    #[tokio::test]
    async fn unreadable_envelope_is_a_transport_failure() {
        let addr = serve_once("200 OK", "{}").await;
        let cred = Credential::new("k-123").unwrap();
        let failure = local_service(addr).complete(&cred, "hello").await.unwrap_err();
        assert_eq!(failure.status, Some(200));
        assert_eq!(failure.body, "{}");
        assert!(failure.message.contains("No message content"), "{}", failure.message);
    }
}
