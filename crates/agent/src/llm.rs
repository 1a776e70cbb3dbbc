use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::warn;

use autostream_core::config::LlmConfig;

/// The generation engine: one ordered prompt in, one reply string out. The
/// reply may embed an inline intent tag; parsing it is the caller's problem
/// (`intent` module). Fallible by contract - implementations time out and
/// error, they do not hang.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String>;
}

/// Groq chat-completions client (OpenAI-compatible wire format).
#[derive(Debug)]
pub struct GroqClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: SecretString,
    temperature: f32,
    max_tokens: u32,
    max_retries: u32,
}

impl GroqClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| anyhow!("llm.api_key is required for the Groq client"))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("building llm http client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
        })
    }

    async fn request(&self, system_prompt: &str, user_message: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_message },
            ],
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .context("sending chat completion request")?
            .error_for_status()
            .context("chat completion returned an error status")?;

        let completion: ChatCompletionResponse =
            response.json().await.context("decoding chat completion response")?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("chat completion response contained no choices"))
    }
}

#[async_trait]
impl LlmClient for GroqClient {
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String> {
        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            match self.request(system_prompt, user_message).await {
                Ok(reply) => return Ok(reply),
                Err(error) => {
                    warn!(
                        event_name = "agent.llm.attempt_failed",
                        attempt,
                        error = %error,
                        "chat completion attempt failed"
                    );
                    last_error = Some(error);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow!("chat completion failed with no attempts made")))
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use autostream_core::config::LlmConfig;

    use super::GroqClient;

    fn config_with_key(api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            api_key: api_key.map(|key| key.to_string().into()),
            base_url: "https://api.groq.com/openai/v1/".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.4,
            max_tokens: 1024,
            timeout_secs: 30,
            max_retries: 2,
        }
    }

    #[test]
    fn client_requires_an_api_key() {
        let error = GroqClient::new(&config_with_key(None)).expect_err("missing key must fail");
        assert!(error.to_string().contains("llm.api_key"));
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client = GroqClient::new(&config_with_key(Some("gsk-test"))).expect("client builds");
        assert_eq!(client.base_url, "https://api.groq.com/openai/v1");
    }
}
