use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    },
    Client,
};
use reqwest::StatusCode;

use crate::{
    config::CleanupConfig,
    error::{Result, ScribeError},
};

/// Chat-completion client for any OpenAI-compatible endpoint.
///
/// Every call is sent exactly once; failures surface to the caller.
#[derive(Clone)]
pub struct CompletionClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl CompletionClient {
    pub fn new(config: &CleanupConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ScribeError::Cleanup("API key required for cleanup".to_string()))?;

        let openai_config = OpenAIConfig::new()
            .with_api_base(config.base_url.clone())
            .with_api_key(api_key);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| {
                ScribeError::Cleanup(format!("Failed to create cleanup HTTP client: {error}"))
            })?;

        // async-openai retries rate limits and server errors with its own
        // exponential backoff; a zero elapsed-time budget turns that off.
        let backoff = backoff::ExponentialBackoff {
            max_elapsed_time: Some(Duration::ZERO),
            ..Default::default()
        };

        let client = Client::with_config(openai_config)
            .with_http_client(http_client)
            .with_backoff(backoff);

        Ok(Self {
            client,
            model: config.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn complete(&self, prompt: &str) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(ScribeError::Validation("Prompt cannot be empty".to_string()));
        }

        let request = self.build_request(prompt)?;

        match self.client.chat().create(request).await {
            Ok(response) => Self::extract_content(response),
            Err(error) => Err(Self::map_openai_error(error)),
        }
    }

    fn build_request(&self, prompt: &str) -> Result<CreateChatCompletionRequest> {
        let messages = vec![ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|error| ScribeError::Validation(format!("Invalid user prompt: {error}")))?
            .into()];

        CreateChatCompletionRequestArgs::default()
            .model(self.model.clone())
            .messages(messages)
            .build()
            .map_err(|error| {
                ScribeError::Validation(format!("Invalid cleanup completion request: {error}"))
            })
    }

    fn extract_content(response: CreateChatCompletionResponse) -> Result<String> {
        let message = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ScribeError::Cleanup("Completion contained no choices".to_string()))?
            .message
            .content
            .unwrap_or_default();

        if message.trim().is_empty() {
            return Err(ScribeError::Cleanup(
                "Completion contained empty content".to_string(),
            ));
        }

        Ok(message)
    }

    fn map_openai_error(error: OpenAIError) -> ScribeError {
        match error {
            OpenAIError::Reqwest(reqwest_error) => match reqwest_error.status() {
                Some(status)
                    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN =>
                {
                    ScribeError::Cleanup(format!("Authentication failed: {reqwest_error}"))
                }
                Some(status) if status == StatusCode::TOO_MANY_REQUESTS => {
                    ScribeError::Cleanup(format!("Rate limit exceeded: {reqwest_error}"))
                }
                _ => ScribeError::Cleanup(format!("Completion request failed: {reqwest_error}")),
            },
            OpenAIError::ApiError(api_error) => {
                ScribeError::Cleanup(format!("Completion API error: {api_error}"))
            }
            OpenAIError::JSONDeserialize(err) => {
                ScribeError::Cleanup(format!("Failed to parse completion response: {err}"))
            }
            OpenAIError::InvalidArgument(message) => ScribeError::Validation(message),
            other => ScribeError::Cleanup(other.to_string()),
        }
    }
}
