//! LLM backend abstraction and the chat-completions HTTP implementation.

use async_trait::async_trait;
use econo_core::HttpClient;
use econo_types::{EconError, LlmConfig};
use serde_json::{json, Value};

/// A structured-output-capable LLM backend.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// One completion round: system prompt plus a single user message,
    /// returning the model's text.
    async fn complete(&self, system: &str, user: &str) -> Result<String, EconError>;
}

/// HTTP client for OpenAI-compatible chat-completions endpoints and the
/// Anthropic messages API, selected by `LlmConfig::provider`.
pub struct HttpLlmClient {
    http: HttpClient,
    cfg: LlmConfig,
}

impl HttpLlmClient {
    /// Wrap the shared pool with the configured backend.
    #[must_use]
    pub fn new(http: HttpClient, cfg: LlmConfig) -> Self {
        Self { http, cfg }
    }

    fn is_anthropic(&self) -> bool {
        self.cfg.provider.eq_ignore_ascii_case("anthropic")
    }

    fn endpoint(&self) -> String {
        if let Some(base) = &self.cfg.base_url {
            return base.clone();
        }
        if self.is_anthropic() {
            "https://api.anthropic.com/v1/messages".to_string()
        } else {
            "https://api.openai.com/v1/chat/completions".to_string()
        }
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, EconError> {
        let endpoint = self.endpoint();
        let (headers, body): (Vec<(&str, &str)>, Value) = if self.is_anthropic() {
            (
                vec![
                    ("x-api-key", self.cfg.api_key.as_str()),
                    ("anthropic-version", "2023-06-01"),
                ],
                json!({
                    "model": self.cfg.model,
                    "max_tokens": 1024,
                    "system": system,
                    "messages": [{"role": "user", "content": user}],
                }),
            )
        } else {
            (
                Vec::new(),
                json!({
                    "model": self.cfg.model,
                    "messages": [
                        {"role": "system", "content": system},
                        {"role": "user", "content": user}
                    ],
                    "temperature": 0,
                }),
            )
        };

        let auth_header = format!("Bearer {}", self.cfg.api_key);
        let mut headers = headers;
        if !self.is_anthropic() {
            headers.push(("authorization", auth_header.as_str()));
        }

        let resp = self
            .http
            .post_json("llm", &endpoint, &headers, &body)
            .await?;
        if resp.status == 429 || resp.status >= 500 || resp.status == 401 || resp.status == 403 {
            return Err(EconError::Intent(format!(
                "LLM backend returned status {}",
                resp.status
            )));
        }
        let value: Value = resp.ensure_success("llm").map_err(|e| match e {
            EconError::Upstream { status, .. } => {
                EconError::Intent(format!("LLM backend returned status {status}"))
            }
            other => other,
        })?.json()?;

        let text = if self.is_anthropic() {
            value.pointer("/content/0/text").and_then(Value::as_str)
        } else {
            value
                .pointer("/choices/0/message/content")
                .and_then(Value::as_str)
        };
        text.map(str::to_string)
            .ok_or_else(|| EconError::Intent("LLM response carried no text".into()))
    }
}
