use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::CleanupConfig;
use crate::error::{Result, ScribeError};

use super::api::CompletionClient;
use super::prompts::cleanup_prompt;
use super::Cleaner;

#[derive(Clone)]
pub struct CleanupProvider {
    client: CompletionClient,
}

impl CleanupProvider {
    pub fn new(config: &CleanupConfig) -> Result<Self> {
        let client = CompletionClient::new(config)?;
        info!(model = %client.model(), "Cleanup client initialized");
        Ok(Self { client })
    }
}

#[async_trait]
impl Cleaner for CleanupProvider {
    async fn clean(&self, raw_text: &str) -> Result<String> {
        if raw_text.trim().is_empty() {
            debug!("Raw text is empty, skipping cleanup request");
            return Ok(raw_text.to_string());
        }

        let prompt = cleanup_prompt(raw_text);
        let cleaned = self.client.complete(&prompt).await?;
        let cleaned = cleaned.trim();

        if cleaned.is_empty() {
            return Err(ScribeError::Cleanup(
                "Completion contained empty content".to_string(),
            ));
        }

        debug!(
            raw_len = raw_text.len(),
            cleaned_len = cleaned.len(),
            "Cleanup completed"
        );
        Ok(cleaned.to_string())
    }
}
