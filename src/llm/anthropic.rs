//! Anthropic messages API client.

use super::{TextGenerator, http_client, join_url};
use crate::config::LlmConfig;
use crate::error::{EvalError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<RequestMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

/// Only text blocks carry answer text; anything else is skipped.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Clone)]
pub struct AnthropicClient {
    client: Client,
    config: LlmConfig,
}

impl AnthropicClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(&config)?,
            config,
        })
    }

    fn endpoint(&self) -> String {
        join_url(self.config.effective_api_base(), "v1/messages")
    }
}

#[async_trait]
impl TextGenerator for AnthropicClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = MessagesRequest {
            model: self.config.effective_model(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            messages: vec![RequestMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(EvalError::Api(format!("API error ({}): {}", status, message)));
        }

        parse_text(&body)
    }

    fn describe(&self) -> String {
        format!("anthropic:{}", self.config.effective_model())
    }
}

fn parse_text(body: &str) -> Result<String> {
    let response: MessagesResponse = serde_json::from_str(body)?;

    let text = response
        .content
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Other => None,
        })
        .collect::<Vec<_>>()
        .join("");

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_blocks() {
        let body = r#"{"id":"msg_1","content":[{"type":"thinking","thinking":"..."},{"type":"text","text":"Article 9 "},{"type":"text","text":"protects privacy."}],"stop_reason":"end_turn"}"#;
        assert_eq!(parse_text(body).unwrap(), "Article 9 protects privacy.");
    }

    #[test]
    fn test_endpoint_default_base() {
        let client = AnthropicClient::new(LlmConfig {
            provider: crate::config::Provider::Anthropic,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.endpoint(), "https://api.anthropic.com/v1/messages");
    }
}
