//! Chat completion capability and an OpenAI-compatible HTTP client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::AiError;

/// Single-turn text completion.
///
/// Implementations own their retry policy.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, AiError>;
}

/// Connection settings for [`HttpChatClient`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Base URL of an OpenAI-compatible API, e.g. `http://localhost:8000/v1`.
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/v1".into(),
            model: "HCX-005".into(),
            api_key: None,
            temperature: 0.0,
            max_tokens: 1200,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Client for `POST {base_url}/chat/completions`.
pub struct HttpChatClient {
    client: reqwest::Client,
    config: ChatConfig,
    endpoint: String,
}

impl HttpChatClient {
    pub fn new(config: ChatConfig) -> Self {
        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        Self {
            client: reqwest::Client::new(),
            config,
            endpoint,
        }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }
}

#[async_trait]
impl ChatClient for HttpChatClient {
    async fn complete(&self, prompt: &str) -> Result<String, AiError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let mut req = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.config.api_key {
            req = req.bearer_auth(key);
        }

        debug!(url = %self.endpoint, model = %self.config.model, "chat completion request");
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AiError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = resp.json().await?;
        first_content(parsed)
    }
}

fn first_content(resp: ChatResponse) -> Result<String, AiError> {
    resp.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or(AiError::EmptyResponse)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_strips_trailing_slash() {
        let client = HttpChatClient::new(ChatConfig {
            base_url: "http://llm.local/v1/".into(),
            ..Default::default()
        });
        assert_eq!(client.endpoint, "http://llm.local/v1/chat/completions");
    }

    #[test]
    fn request_serializes_openai_shape() {
        let req = ChatRequest {
            model: "m",
            messages: vec![ChatMessage {
                role: "user",
                content: "질문",
            }],
            temperature: 0.0,
            max_tokens: 10,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "질문");
        assert_eq!(json["max_tokens"], 10);
    }

    #[test]
    fn response_content_extracted() {
        let resp: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"{\"follow\":true}"}}]}"#,
        )
        .unwrap();
        assert_eq!(first_content(resp).unwrap(), r#"{"follow":true}"#);

        let empty: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(first_content(empty), Err(AiError::EmptyResponse)));
    }

    #[test]
    fn config_fills_missing_fields() {
        let config: ChatConfig = serde_json::from_str(r#"{"model":"local"}"#).unwrap();
        assert_eq!(config.model, "local");
        assert_eq!(config.max_tokens, 1200);
        assert!(config.api_key.is_none());
    }
}
