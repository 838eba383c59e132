//! Ollama client using the non-streaming `/api/generate` endpoint.

use super::{TextGenerator, http_client, join_url};
use crate::config::LlmConfig;
use crate::error::{EvalError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    config: LlmConfig,
}

impl OllamaClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(&config)?,
            config,
        })
    }

    fn endpoint(&self) -> String {
        join_url(self.config.effective_api_base(), "api/generate")
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: self.config.effective_model(),
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        };

        let response = self.client.post(self.endpoint()).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        parse_response(status, &body)
    }

    fn describe(&self) -> String {
        format!("ollama:{}", self.config.effective_model())
    }
}

fn parse_response(status: reqwest::StatusCode, body: &str) -> Result<String> {
    match serde_json::from_str::<GenerateResponse>(body) {
        Ok(GenerateResponse {
            error: Some(message),
            ..
        }) => Err(EvalError::Api(format!("Ollama error ({}): {}", status, message))),
        Ok(resp) if status.is_success() => Ok(resp.response),
        Err(e) if status.is_success() => Err(e.into()),
        _ => Err(EvalError::Api(format!("Request failed ({}): {}", status, body))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_endpoint() {
        let client = OllamaClient::new(LlmConfig {
            api_base: "http://192.168.1.58:8889/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.endpoint(), "http://192.168.1.58:8889/api/generate");
    }

    #[test]
    fn test_parse_success() {
        let body = r#"{"model":"qwen3:4b","response":"A tort is a civil wrong.","done":true}"#;
        assert_eq!(
            parse_response(StatusCode::OK, body).unwrap(),
            "A tort is a civil wrong."
        );
    }

    #[test]
    fn test_parse_error_body() {
        let body = r#"{"error":"model 'x' not found"}"#;
        let err = parse_response(StatusCode::NOT_FOUND, body).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_parse_non_json_failure() {
        let err = parse_response(StatusCode::BAD_GATEWAY, "upstream down").unwrap_err();
        assert!(err.to_string().contains("upstream down"));
    }
}
