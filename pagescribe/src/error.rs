use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScribeError {
    #[error("Configuration error: missing required environment variable(s): {}", .missing.join(", "))]
    Configuration { missing: Vec<String> },

    #[error("Configuration error: {0}")]
    InvalidConfiguration(String),

    #[error("File error at {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File error at {}: image file is empty", .0.display())]
    EmptyImage(PathBuf),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("Cleanup error: {0}")]
    Cleanup(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Coarse grouping of [`ScribeError`] variants used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Configuration,
    File,
    Service,
    Validation,
}

impl ScribeError {
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            ScribeError::Configuration { .. } | ScribeError::InvalidConfiguration(_) => {
                ErrorClass::Configuration
            }
            ScribeError::File { .. } | ScribeError::EmptyImage(_) => ErrorClass::File,
            ScribeError::Ocr(_) | ScribeError::Cleanup(_) => ErrorClass::Service,
            ScribeError::Validation(_) => ErrorClass::Validation,
        }
    }

    /// Process exit status for the binary. Always non-zero.
    pub fn exit_code(&self) -> u8 {
        match self.class() {
            ErrorClass::Configuration => 2,
            ErrorClass::File => 3,
            ErrorClass::Service => 4,
            ErrorClass::Validation => 5,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScribeError>;
