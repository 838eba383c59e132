//! Text generation backends.
//!
//! The harness only ever sees [`TextGenerator`]: a prompt goes in, plain text
//! comes out. Each backend gets one adapter that normalizes its own response
//! shape into a string.

mod anthropic;
mod ollama;
mod openai;
mod prompts;

pub use anthropic::AnthropicClient;
pub use ollama::OllamaClient;
pub use openai::{Message, OpenAiClient, Role};
pub use prompts::Prompts;

use crate::config::{LlmConfig, Provider};
use crate::error::{EvalError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A backend-agnostic text completion capability.
///
/// Implementations must be safe to call from many tasks at once.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Short `provider:model` label for logs.
    fn describe(&self) -> String;
}

/// Build the generator adapter for the configured provider.
pub fn build_generator(config: &LlmConfig) -> Result<Arc<dyn TextGenerator>> {
    let generator: Arc<dyn TextGenerator> = match config.provider {
        Provider::OpenAi => Arc::new(OpenAiClient::new(config.clone())?),
        Provider::Ollama => Arc::new(OllamaClient::new(config.clone())?),
        Provider::Anthropic => Arc::new(AnthropicClient::new(config.clone())?),
    };
    Ok(generator)
}

/// Test connectivity with a trivial prompt.
pub async fn test_connection(generator: &dyn TextGenerator) -> Result<()> {
    let response = generator
        .generate("Say 'hello' and nothing else.")
        .await?;

    if response.to_lowercase().contains("hello") {
        Ok(())
    } else {
        Err(EvalError::Api(format!("Unexpected response: {}", response)))
    }
}

/// Shared HTTP client with the per-call timeout applied.
pub(crate) fn http_client(config: &LlmConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(EvalError::from)
}

/// Join an API base and a path without doubling slashes.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo(&'static str);

    #[async_trait]
    impl TextGenerator for Echo {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.to_string())
        }

        fn describe(&self) -> String {
            "echo".to_string()
        }
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://host/", "/api/generate"), "http://host/api/generate");
        assert_eq!(join_url("http://host", "v1/messages"), "http://host/v1/messages");
    }

    #[test]
    fn test_build_generator_per_provider() {
        for provider in [Provider::OpenAi, Provider::Ollama, Provider::Anthropic] {
            let config = LlmConfig {
                provider,
                ..Default::default()
            };
            let generator = build_generator(&config).unwrap();
            assert!(generator.describe().starts_with(&provider.to_string()));
        }
    }

    #[tokio::test]
    async fn test_connection_check() {
        assert!(test_connection(&Echo("Hello!")).await.is_ok());
        assert!(test_connection(&Echo("Bonjour")).await.is_err());
    }
}
