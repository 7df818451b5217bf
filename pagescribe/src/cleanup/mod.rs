//! Cleanup pass: sends raw OCR text to a chat-completion model together with
//! a fixed instruction and returns the normalized Markdown.

mod api;
pub mod prompts;
mod provider;

pub use api::CompletionClient;
pub use provider::CleanupProvider;

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait Cleaner: Send + Sync {
    /// Returns the cleaned form of `raw_text`. Empty input comes back unchanged.
    async fn clean(&self, raw_text: &str) -> Result<String>;
}
