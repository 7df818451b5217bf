//! OCR (Optical Character Recognition) Module
//!
//! Turns a photographed notebook page into text by calling the Azure AI Vision
//! read service. Nothing is recognized locally.
//!
//! # Architecture
//!
//! - `Recognizer` trait is the seam the pipeline depends on
//! - `OcrProvider` implements it, trying Image Analysis 4.0 first and falling
//!   back to the asynchronous Read 3.2 operation
//! - `AzureReadClient` owns the HTTP details of both service surfaces
//!
//! # Configuration
//!
//! Controlled via `OcrConfig` (see `config.rs`):
//! - `endpoint`: resource endpoint, e.g. `https://<name>.cognitiveservices.azure.com`
//! - `api_key`: sent as `Ocp-Apim-Subscription-Key`
//! - `timeout_secs`: per HTTP request; the whole recognition may take two
//!   requests plus the polling schedule (`OcrConfig::recognition_deadline`)
//! - `poll_interval_ms` / `max_polls`: Read 3.2 polling cadence
//!
//! # Usage
//!
//! ```rust,ignore
//! let ocr = OcrProvider::new(&config.ocr)?;
//! let result = ocr.recognize(&image_bytes).await?;
//! println!("{}", result.text);
//! ```

mod api;
mod provider;

pub use api::AzureReadClient;
pub use provider::OcrProvider;

use async_trait::async_trait;

use crate::error::Result;

/// Which Azure surface produced a recognition result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadApi {
    ImageAnalysis,
    ReadV32,
}

impl std::fmt::Display for ReadApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ImageAnalysis => write!(f, "image_analysis"),
            Self::ReadV32 => write!(f, "read_v3.2"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionResult {
    /// Full page text, lines separated by `\n`.
    pub text: String,
    /// Individual recognized lines in reading order.
    pub lines: Vec<String>,
    pub api: ReadApi,
}

/// Extracts text from image bytes (JPEG/PNG).
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(&self, image: &[u8]) -> Result<RecognitionResult>;
}
