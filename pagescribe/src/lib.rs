//! Digitizes handwritten notebook pages: an image goes to a cloud OCR service,
//! the recognized text optionally goes through an LLM cleanup pass, and the
//! result is written to an output directory.

pub mod cleanup;
pub mod cli;
pub mod config;
pub mod error;
pub mod ocr;
pub mod pipeline;
