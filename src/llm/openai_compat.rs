//! OpenAI-compatible text-generation client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::generator::{Generation, GeneratorError, TextGenerator};

/// Configuration for the OpenAI-compatible generator
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
    pub max_retries: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/v1/chat/completions".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

/// [`TextGenerator`] speaking the OpenAI-compatible chat-completions format
pub struct OpenAiCompatGenerator {
    client: Client,
    config: GeneratorConfig,
}

impl OpenAiCompatGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self, GeneratorError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GeneratorError::Initialization(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatGenerator {
    async fn generate(
        &self,
        prompt: &str,
        max_tokens: usize,
        temperature: f32,
    ) -> Result<Generation, GeneratorError> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: Some(max_tokens),
            temperature: Some(temperature),
        };

        let mut last_error = None;
        for attempt in 0..self.config.max_retries {
            if attempt > 0 {
                debug!(attempt, "retrying generation request");
                tokio::time::sleep(Duration::from_millis(100 * (1 << attempt))).await;
            }

            let mut req = self.client.post(&self.config.endpoint).json(&request);
            if let Some(ref api_key) = self.config.api_key {
                req = req.header("Authorization", format!("Bearer {api_key}"));
            }

            match req.send().await {
                Ok(response) => {
                    if !response.status().is_success() {
                        let status = response.status();
                        let body = response.text().await.unwrap_or_default();
                        last_error = Some(GeneratorError::Api(format!("HTTP {status}: {body}")));
                        continue;
                    }

                    match response.json::<ChatCompletionResponse>().await {
                        Ok(resp) => match resp.choices.into_iter().next() {
                            Some(choice) => {
                                debug!(model = %self.config.model, "generation succeeded");
                                return Ok(Generation {
                                    content: choice.message.content,
                                });
                            }
                            None => {
                                last_error = Some(GeneratorError::EmptyCompletion);
                            }
                        },
                        Err(e) => {
                            last_error =
                                Some(GeneratorError::Api(format!("invalid response body: {e}")));
                        }
                    }
                }
                Err(e) if e.is_timeout() => {
                    last_error = Some(GeneratorError::Timeout(e.to_string()));
                }
                Err(e) => {
                    last_error = Some(GeneratorError::Network(e.to_string()));
                }
            }
        }

        warn!(
            retries = self.config.max_retries,
            "generation failed after all attempts"
        );
        Err(last_error.unwrap_or(GeneratorError::EmptyCompletion))
    }
}

// OpenAI-compatible wire types
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(server: &mockito::ServerGuard) -> GeneratorConfig {
        GeneratorConfig {
            endpoint: format!("{}/v1/chat/completions", server.url()),
            max_retries: 2,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_successful_generation() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"choices":[{"message":{"role":"assistant","content":"a concise summary"}}]}"#,
            )
            .create_async()
            .await;

        let generator = OpenAiCompatGenerator::new(config_for(&server)).unwrap();
        let generation = generator.generate("summarize this", 100, 0.3).await.unwrap();
        assert_eq!(generation.content, "a concise summary");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_persistent_api_error_exhausts_retries() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(503)
            .with_body("unavailable")
            .expect(2)
            .create_async()
            .await;

        let generator = OpenAiCompatGenerator::new(config_for(&server)).unwrap();
        let err = generator.generate("summarize this", 100, 0.3).await.unwrap_err();
        assert!(matches!(err, GeneratorError::Api(_)));
        // max_retries = 2: both attempts reached the server
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_no_choices_is_empty_completion() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let generator = OpenAiCompatGenerator::new(config_for(&server)).unwrap();
        let err = generator.generate("summarize this", 100, 0.3).await.unwrap_err();
        assert!(matches!(err, GeneratorError::EmptyCompletion));
    }
}
