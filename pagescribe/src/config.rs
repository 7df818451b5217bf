use std::env;
use std::time::Duration;

use url::Url;

use crate::error::{Result, ScribeError};

pub const OCR_ENDPOINT_VAR: &str = "AZURE_VISION_ENDPOINT";
pub const OCR_KEY_VAR: &str = "AZURE_VISION_KEY";
pub const CLEANUP_KEY_VAR: &str = "OPENAI_API_KEY";

const DEFAULT_CLEANUP_MODEL: &str = "gpt-4.1-mini";
const DEFAULT_CLEANUP_BASE_URL: &str = "https://api.openai.com/v1";

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

/// Reads a variable, treating unset, empty and whitespace-only values alike.
fn env_non_empty(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Clone)]
pub struct Config {
    pub ocr: OcrConfig,
    pub cleanup: CleanupConfig,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub max_polls: u32,
}

/// Completion-service settings for the cleanup pass
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

/// Which pipeline stages a run is going to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stages {
    pub recognize: bool,
    pub cleanup: bool,
}

impl Stages {
    pub fn for_run(skip_cleanup: bool) -> Self {
        Self {
            recognize: true,
            cleanup: !skip_cleanup,
        }
    }
}

impl OcrConfig {
    /// Budget for a whole recognition: one Image Analysis request, one Read 3.2
    /// submit and the full polling schedule.
    pub fn recognition_deadline(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.saturating_mul(2))
            + Duration::from_millis(self.poll_interval_ms.saturating_mul(u64::from(self.max_polls)))
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_secs: 60,
            poll_interval_ms: 500,
            max_polls: 60,
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_CLEANUP_MODEL.to_string(),
            base_url: DEFAULT_CLEANUP_BASE_URL.to_string(),
            timeout_secs: 60,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            ocr: OcrConfig {
                endpoint: env_non_empty(OCR_ENDPOINT_VAR)
                    .map(|endpoint| endpoint.trim_end_matches('/').to_string()),
                api_key: env_non_empty(OCR_KEY_VAR),
                timeout_secs: parse_env_or("OCR_TIMEOUT", 60),
                poll_interval_ms: parse_env_or("OCR_POLL_INTERVAL_MS", 500),
                max_polls: parse_env_or("OCR_MAX_POLLS", 60),
            },
            cleanup: CleanupConfig {
                api_key: env_non_empty(CLEANUP_KEY_VAR),
                model: env_non_empty("CLEANUP_MODEL")
                    .unwrap_or_else(|| DEFAULT_CLEANUP_MODEL.to_string()),
                base_url: env_non_empty("CLEANUP_BASE_URL")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| DEFAULT_CLEANUP_BASE_URL.to_string()),
                timeout_secs: parse_env_or("CLEANUP_TIMEOUT", 60),
            },
        }
    }

    /// Fails with every missing variable the requested stages need, so a
    /// misconfigured run is rejected before any client is built.
    pub fn require(&self, stages: Stages) -> Result<()> {
        let mut missing = Vec::new();

        if stages.recognize {
            if is_blank(self.ocr.endpoint.as_deref()) {
                missing.push(OCR_ENDPOINT_VAR.to_string());
            }
            if is_blank(self.ocr.api_key.as_deref()) {
                missing.push(OCR_KEY_VAR.to_string());
            }
        }

        if stages.cleanup && is_blank(self.cleanup.api_key.as_deref()) {
            missing.push(CLEANUP_KEY_VAR.to_string());
        }

        if !missing.is_empty() {
            return Err(ScribeError::Configuration { missing });
        }

        if stages.recognize {
            if let Some(endpoint) = self.ocr.endpoint.as_deref() {
                validate_http_url(OCR_ENDPOINT_VAR, endpoint)?;
            }
        }

        if stages.cleanup {
            validate_http_url("CLEANUP_BASE_URL", &self.cleanup.base_url)?;
        }

        Ok(())
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

fn validate_http_url(var: &str, value: &str) -> Result<()> {
    let url = Url::parse(value).map_err(|e| {
        ScribeError::InvalidConfiguration(format!("{var} is not a valid URL ('{value}'): {e}"))
    })?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ScribeError::InvalidConfiguration(format!(
            "{var} must use http or https, got '{other}'"
        ))),
    }
}
