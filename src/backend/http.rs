//! HTTP backend for OpenAI-compatible chat providers and Anthropic Claude.
//!
//! OpenAI, OpenRouter and SiliconFlow share the chat-completions format
//! (`POST {base}/chat/completions`, bearer auth, reply text at
//! `choices[0].message.content`). Claude uses the Messages API
//! (`POST {base}/messages`, `x-api-key` auth, reply text at
//! `content[0].text`).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::prompt::{parse_reply, system_prompt, user_prompt};
use super::ClassificationBackend;
use crate::config::ClientConfig;
use crate::credentials::{ApiCredentials, Provider};
use crate::error::{Result, SieveError};
use crate::types::ClassificationRequest;

/// Anthropic API version header value.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Token budget for Claude replies.
const CLAUDE_MAX_TOKENS: u32 = 1000;

/// Sampling temperature for chat-completions providers.
const CHAT_TEMPERATURE: f64 = 0.7;

/// User-Agent sent with every provider request.
const USER_AGENT: &str = concat!("serp-sieve/", env!("CARGO_PKG_VERSION"));

/// Build a [`reqwest::Client`] for provider calls.
///
/// # Errors
///
/// Returns [`SieveError::Config`] if the client cannot be constructed.
pub fn build_client(config: &ClientConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(10));
    if let Some(timeout) = config.attempt_timeout() {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| SieveError::Config(format!("failed to build HTTP client: {e}")))
}

/// Provider-backed [`ClassificationBackend`].
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl HttpBackend {
    /// Backend using each provider's public API root.
    ///
    /// # Errors
    ///
    /// Returns [`SieveError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            base_url: None,
        })
    }

    /// Send every request to `base_url` instead of the provider default.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_owned());
        self
    }

    /// Endpoint URL for `provider`.
    pub fn endpoint_url(&self, provider: Provider) -> String {
        let base = self
            .base_url
            .as_deref()
            .unwrap_or_else(|| provider.default_base_url());
        if provider.is_openai_compatible() {
            format!("{base}/chat/completions")
        } else {
            format!("{base}/messages")
        }
    }
}

/// Request body for a chat-completions provider.
pub fn build_chat_request(model: &str, request: &ClassificationRequest) -> Value {
    json!({
        "model": model,
        "messages": [
            {"role": "system", "content": system_prompt(request.endpoint)},
            {"role": "user", "content": user_prompt(request)},
        ],
        "temperature": CHAT_TEMPERATURE,
    })
}

/// Request body for the Claude Messages API.
pub fn build_claude_request(model: &str, request: &ClassificationRequest) -> Value {
    json!({
        "model": model,
        "system": system_prompt(request.endpoint),
        "messages": [
            {"role": "user", "content": user_prompt(request)},
        ],
        "max_tokens": CLAUDE_MAX_TOKENS,
    })
}

/// Pull the model's reply text out of a provider response body.
///
/// # Errors
///
/// Returns [`SieveError::Validation`] if the body lacks a reply.
pub fn reply_text(provider: Provider, body: &Value) -> Result<&str> {
    let pointer = if provider.is_openai_compatible() {
        "/choices/0/message/content"
    } else {
        "/content/0/text"
    };
    body.pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| SieveError::Validation(format!("{provider} response has no reply text")))
}

/// Map an unsuccessful HTTP status to a transport error.
pub fn map_http_error(provider: Provider, status: reqwest::StatusCode, body: &str) -> SieveError {
    let detail = extract_error_message(body);
    match status.as_u16() {
        429 => SieveError::Transport(format!("{provider} rate limit exceeded: {detail}")),
        401 | 403 => SieveError::Transport(format!("{provider} rejected credentials: {detail}")),
        s if s >= 500 => SieveError::Transport(format!("{provider} server error {s}: {detail}")),
        _ => SieveError::Transport(format!("{provider} HTTP {status}: {detail}")),
    }
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(String::from)
        })
        .unwrap_or_else(|| {
            if body.is_empty() {
                "no response body".to_string()
            } else {
                body.chars().take(200).collect()
            }
        })
}

#[async_trait]
impl ClassificationBackend for HttpBackend {
    async fn call(
        &self,
        credentials: &ApiCredentials,
        request: &ClassificationRequest,
    ) -> Result<Value> {
        let provider = credentials.provider;
        let url = self.endpoint_url(provider);
        let mut builder = self.client.post(&url);
        let body = if provider.is_openai_compatible() {
            builder = builder.bearer_auth(&credentials.api_key);
            if provider == Provider::OpenRouter {
                builder = builder.header("X-Title", "serp-sieve");
            }
            build_chat_request(&credentials.model, request)
        } else {
            builder = builder
                .header("x-api-key", &credentials.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION);
            build_claude_request(&credentials.model, request)
        };

        tracing::trace!(%provider, endpoint = %request.endpoint, "sending classification request");

        let response = builder.json(&body).send().await.map_err(|e| {
            SieveError::Transport(format!("{provider} request failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(map_http_error(provider, status, &text));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| SieveError::Transport(format!("{provider} response unreadable: {e}")))?;
        parse_reply(reply_text(provider, &payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::ProviderCredentials;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn creds(provider: Provider) -> ApiCredentials {
        ProviderCredentials::new(provider, "test-model", "test-key")
            .authorize()
            .expect("authorized")
    }

    fn backend(server: &MockServer) -> HttpBackend {
        HttpBackend::new(&ClientConfig::default())
            .expect("client")
            .with_base_url(server.uri())
    }

    #[test]
    fn default_endpoint_urls() {
        let backend = HttpBackend::new(&ClientConfig::default()).expect("client");
        assert_eq!(
            backend.endpoint_url(Provider::OpenAi),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            backend.endpoint_url(Provider::OpenRouter),
            "https://openrouter.ai/api/v1/chat/completions"
        );
        assert_eq!(
            backend.endpoint_url(Provider::SiliconFlow),
            "https://api.siliconflow.com/v1/chat/completions"
        );
        assert_eq!(
            backend.endpoint_url(Provider::Claude),
            "https://api.anthropic.com/v1/messages"
        );
    }

    #[test]
    fn base_url_override_drops_trailing_slash() {
        let backend = HttpBackend::new(&ClientConfig::default())
            .expect("client")
            .with_base_url("http://localhost:9/");
        assert_eq!(
            backend.endpoint_url(Provider::Claude),
            "http://localhost:9/messages"
        );
    }

    #[test]
    fn chat_request_shape() {
        let req = ClassificationRequest::ad_check("Buy now", "mouse");
        let body = build_chat_request("gpt-3.5-turbo", &req);
        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert!(body["messages"][1]["content"]
            .as_str()
            .unwrap_or_default()
            .contains("Buy now"));
    }

    #[test]
    fn claude_request_uses_system_field() {
        let req = ClassificationRequest::summarize("text");
        let body = build_claude_request("claude-3-haiku", &req);
        assert!(body["system"].is_string());
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn reply_text_missing_is_validation_error() {
        let err = reply_text(Provider::OpenAi, &json!({"choices": []})).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_FAILED");
    }

    #[test]
    fn http_errors_are_retryable_transport() {
        let err = map_http_error(
            Provider::OpenAi,
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"message":"slow down"}}"#,
        );
        assert!(err.is_retryable());
        assert!(err.to_string().contains("slow down"));
    }

    #[tokio::test]
    async fn openai_compatible_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({"model": "test-model"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "{\"isAd\": true}"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = backend(&server)
            .call(
                &creds(Provider::SiliconFlow),
                &ClassificationRequest::ad_check("Sponsored", "mouse"),
            )
            .await
            .expect("reply");
        assert_eq!(reply["isAd"], true);
    }

    #[tokio::test]
    async fn claude_round_trip_with_fenced_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "```json\n{\"relevanceScore\": 0.8}\n```"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = backend(&server)
            .call(
                &creds(Provider::Claude),
                &ClassificationRequest::relevance("Rust book", "rust"),
            )
            .await
            .expect("reply");
        assert_eq!(reply["relevanceScore"], 0.8);
    }

    #[tokio::test]
    async fn server_error_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = backend(&server)
            .call(
                &creds(Provider::OpenAi),
                &ClassificationRequest::ad_check("x", "y"),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "TRANSPORT_FAILED");
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn prose_reply_is_validation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "Probably not an ad."}}]
            })))
            .mount(&server)
            .await;

        let err = backend(&server)
            .call(
                &creds(Provider::OpenAi),
                &ClassificationRequest::ad_check("x", "y"),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_FAILED");
    }
}
