use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::OcrConfig;
use crate::error::{Result, ScribeError};

use super::api::{AzureReadClient, ImageAnalysis};
use super::{ReadApi, RecognitionResult, Recognizer};

#[derive(Clone, Debug)]
pub struct OcrProvider {
    client: AzureReadClient,
    deadline: Duration,
}

impl OcrProvider {
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let client = AzureReadClient::new(config)?;
        info!(endpoint = %client.endpoint(), "Azure OCR client initialized");

        Ok(Self {
            client,
            deadline: config.recognition_deadline(),
        })
    }

    async fn recognize_internal(&self, image_bytes: &[u8]) -> Result<RecognitionResult> {
        match self.client.analyze_image(image_bytes).await? {
            ImageAnalysis::Read(read) if !read.text.is_empty() => {
                return Ok(RecognitionResult {
                    text: read.text,
                    lines: read.lines,
                    api: ReadApi::ImageAnalysis,
                });
            }
            ImageAnalysis::Read(_) => {
                debug!("Image analysis returned no text, trying Read 3.2");
            }
            ImageAnalysis::Rejected(e) => {
                warn!("Image analysis unavailable, falling back to Read 3.2: {}", e);
            }
        }

        let read = self.client.read_v32(image_bytes).await?;
        if read.text.is_empty() {
            return Err(ScribeError::Ocr("No text found in image".to_string()));
        }

        Ok(RecognitionResult {
            text: read.text,
            lines: read.lines,
            api: ReadApi::ReadV32,
        })
    }
}

#[async_trait]
impl Recognizer for OcrProvider {
    async fn recognize(&self, image: &[u8]) -> Result<RecognitionResult> {
        if image.is_empty() {
            return Err(ScribeError::Validation(
                "Image bytes cannot be empty".to_string(),
            ));
        }

        let result = tokio::time::timeout(self.deadline, self.recognize_internal(image)).await;

        match result {
            Ok(inner_result) => inner_result,
            Err(_) => Err(ScribeError::Ocr(format!(
                "OCR operation timed out after {} seconds",
                self.deadline.as_secs()
            ))),
        }
    }
}
