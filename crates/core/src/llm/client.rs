//! LLM provider client (§6): an OpenAI-compatible `/chat/completions`
//! call over HTTPS, JSON-mode, bearer-token auth.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by the LLM client. Transport and timeout errors are
/// retried by the caller (§4.6); this type only distinguishes what kind
/// of retry/backoff applies.
#[derive(Debug, Error)]
pub enum LlmClientError {
    #[error("LLM request timed out")]
    Timeout,
    #[error("LLM transport error: {0}")]
    Transport(String),
    #[error("LLM returned an error response: {0}")]
    ProviderError(String),
}

/// One call to an LLM chat-completions endpoint.
pub trait LlmClient: Send + Sync {
    /// Sends `prompt` and returns the raw completion text.
    ///
    /// # Errors
    ///
    /// Returns `LlmClientError` on transport failure, timeout, or a
    /// non-success provider response.
    fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
    ) -> impl Future<Output = Result<String, LlmClientError>> + Send;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    /// The wire protocol wants a bare JSON number; `Decimal` is kept at
    /// every other layer (config, domain types) and converted only here,
    /// at the boundary the external API forces on us.
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// `reqwest`-backed OpenAI-compatible chat completions client.
pub struct OpenAiCompatibleClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: Decimal,
}

impl OpenAiCompatibleClient {
    /// Builds a client bound to `base_url` (e.g.
    /// `https://api.openai.com/v1`), sending `Authorization: Bearer
    /// {api_key}` and requesting `model` with a single-attempt
    /// `request_timeout`.
    #[must_use]
    pub fn new(
        base_url: String,
        api_key: String,
        model: String,
        temperature: Decimal,
        request_timeout: Duration,
    ) -> Self {
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .expect("reqwest client builds with a valid timeout");

        Self {
            http,
            base_url,
            api_key,
            model,
            temperature,
        }
    }
}

impl LlmClient for OpenAiCompatibleClient {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmClientError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature.to_f32().unwrap_or(0.3),
            max_tokens,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmClientError::Timeout
                } else {
                    LlmClientError::Transport(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmClientError::ProviderError(format!("{status}: {body}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmClientError::Transport(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmClientError::ProviderError("empty choices array".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn completes_against_mock_server() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "{\"vendor\": \"Acme\"}"}}]
            })))
            .mount(&server)
            .await;

        let client = OpenAiCompatibleClient::new(
            server.uri(),
            "test-key".to_string(),
            "gpt-test".to_string(),
            dec!(0.3),
            Duration::from_secs(5),
        );

        let reply = client.complete("extract this", 200).await.unwrap();
        assert_eq!(reply, "{\"vendor\": \"Acme\"}");
    }

    #[tokio::test]
    async fn surfaces_provider_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .mount(&server)
            .await;

        let client = OpenAiCompatibleClient::new(
            server.uri(),
            "test-key".to_string(),
            "gpt-test".to_string(),
            dec!(0.3),
            Duration::from_secs(5),
        );

        let err = client.complete("extract this", 200).await.unwrap_err();
        assert!(matches!(err, LlmClientError::ProviderError(_)));
    }
}
