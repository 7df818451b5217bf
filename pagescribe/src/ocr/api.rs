use std::time::Duration;

use reqwest::{header, Client, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::config::OcrConfig;
use crate::error::{Result, ScribeError};

const IMAGE_ANALYSIS_PATH: &str = "/computervision/imageanalysis:analyze";
const IMAGE_ANALYSIS_API_VERSION: &str = "2023-02-01-preview";
const READ_V32_PATH: &str = "/vision/v3.2/read/analyze";
const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const OPERATION_LOCATION_HEADER: &str = "Operation-Location";

#[derive(Debug, Default, Deserialize)]
struct ImageAnalysisResponse {
    #[serde(rename = "readResult", default)]
    read_result: Option<ImageAnalysisReadResult>,
}

#[derive(Debug, Default, Deserialize)]
struct ImageAnalysisReadResult {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    blocks: Vec<ReadBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct ReadBlock {
    #[serde(default)]
    lines: Vec<ReadLine>,
}

#[derive(Debug, Default, Deserialize)]
struct ReadLine {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReadOperation {
    #[serde(default)]
    status: Option<String>,
    #[serde(rename = "analyzeResult", default)]
    analyze_result: Option<AnalyzeResult>,
}

#[derive(Debug, Default, Deserialize)]
struct AnalyzeResult {
    #[serde(rename = "readResults", default)]
    read_results: Vec<ReadPage>,
}

#[derive(Debug, Default, Deserialize)]
struct ReadPage {
    #[serde(default)]
    lines: Vec<ReadLine>,
}

/// Text read from one image, before the provider decides what to keep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ReadText {
    pub text: String,
    pub lines: Vec<String>,
}

impl ReadText {
    fn from_lines<'a>(lines: impl Iterator<Item = &'a ReadLine>) -> Self {
        let lines: Vec<String> = lines
            .filter_map(|line| line.text.as_deref())
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .collect();
        let text = lines.join("\n").trim().to_string();
        Self { text, lines }
    }
}

/// Outcome of an Image Analysis call that reached the service.
#[derive(Debug)]
pub(crate) enum ImageAnalysis {
    Read(ReadText),
    /// The service answered with a non-success status, e.g. because the
    /// resource or region does not offer Image Analysis 4.0.
    Rejected(ScribeError),
}

#[derive(Clone, Debug)]
pub struct AzureReadClient {
    client: Client,
    endpoint: String,
    api_key: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl AzureReadClient {
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .as_deref()
            .map(|endpoint| endpoint.trim_end_matches('/').to_string())
            .filter(|endpoint| !endpoint.is_empty())
            .ok_or_else(|| ScribeError::Ocr("Endpoint required for Azure OCR".to_string()))?;

        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ScribeError::Ocr("API key required for Azure OCR".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ScribeError::Ocr(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_polls: config.max_polls,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Synchronous Image Analysis 4.0 call with the `read` feature.
    pub(crate) async fn analyze_image(&self, image_bytes: &[u8]) -> Result<ImageAnalysis> {
        let url = format!(
            "{}{IMAGE_ANALYSIS_PATH}?api-version={IMAGE_ANALYSIS_API_VERSION}&features=read",
            self.endpoint
        );
        debug!("Sending image analysis request to {}", url);

        let response = self
            .client
            .post(&url)
            .header(SUBSCRIPTION_KEY_HEADER, &self.api_key)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(image_bytes.to_vec())
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        debug!("Image analysis response status: {}", status);

        if !status.is_success() {
            let body = read_error_body(response).await;
            return Ok(ImageAnalysis::Rejected(map_http_error(status, &body)));
        }

        let parsed: ImageAnalysisResponse = response.json().await.map_err(|e| {
            ScribeError::Ocr(format!("Failed to parse image analysis response: {e}"))
        })?;

        let read_result = parsed.read_result.unwrap_or_default();
        let mut read = ReadText::from_lines(
            read_result
                .blocks
                .iter()
                .flat_map(|block| block.lines.iter()),
        );

        if let Some(content) = read_result
            .content
            .as_deref()
            .map(str::trim)
            .filter(|content| !content.is_empty())
        {
            read.text = content.to_string();
        }

        Ok(ImageAnalysis::Read(read))
    }

    /// Asynchronous Read 3.2 operation: submit, then poll `Operation-Location`.
    pub(crate) async fn read_v32(&self, image_bytes: &[u8]) -> Result<ReadText> {
        let url = format!("{}{READ_V32_PATH}", self.endpoint);
        debug!("Submitting read operation to {}", url);

        let submit = self
            .client
            .post(&url)
            .header(SUBSCRIPTION_KEY_HEADER, &self.api_key)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(image_bytes.to_vec())
            .send()
            .await
            .map_err(map_request_error)?;

        let status = submit.status();
        if !status.is_success() {
            let body = read_error_body(submit).await;
            return Err(map_http_error(status, &body));
        }

        let operation_location = submit
            .headers()
            .get(OPERATION_LOCATION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                ScribeError::Ocr("Read 3.2: missing Operation-Location header".to_string())
            })?;

        for attempt in 1..=self.max_polls {
            tokio::time::sleep(self.poll_interval).await;

            let poll = self
                .client
                .get(&operation_location)
                .header(SUBSCRIPTION_KEY_HEADER, &self.api_key)
                .send()
                .await
                .map_err(map_request_error)?;

            let status = poll.status();
            if !status.is_success() {
                let body = read_error_body(poll).await;
                return Err(map_http_error(status, &body));
            }

            let operation: ReadOperation = poll.json().await.map_err(|e| {
                ScribeError::Ocr(format!("Failed to parse read operation response: {e}"))
            })?;

            let state = operation.status.unwrap_or_default().to_lowercase();
            debug!(attempt, status = %state, "Read 3.2 poll");

            match state.as_str() {
                "succeeded" => {
                    let analyze = operation.analyze_result.unwrap_or_default();
                    return Ok(ReadText::from_lines(
                        analyze.read_results.iter().flat_map(|page| page.lines.iter()),
                    ));
                }
                "failed" => {
                    return Err(ScribeError::Ocr(
                        "Read 3.2 operation reported status 'failed'".to_string(),
                    ));
                }
                _ => continue,
            }
        }

        Err(ScribeError::Ocr(format!(
            "Read 3.2 timed out while polling after {} attempts",
            self.max_polls
        )))
    }
}

fn map_request_error(error: reqwest::Error) -> ScribeError {
    if error.is_timeout() {
        ScribeError::Ocr("Request timeout".to_string())
    } else {
        ScribeError::Ocr(format!("Request failed: {error}"))
    }
}

async fn read_error_body(response: Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error response".to_string())
}

fn map_http_error(status: StatusCode, error_body: &str) -> ScribeError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ScribeError::Ocr(format!(
            "Authentication failed ({status}): check AZURE_VISION_KEY. Error: {error_body}"
        )),
        StatusCode::TOO_MANY_REQUESTS => ScribeError::Ocr(format!(
            "Rate limit exceeded (429): Too many requests. Error: {error_body}"
        )),
        _ => ScribeError::Ocr(format!("OCR API error ({status}): {error_body}")),
    }
}
