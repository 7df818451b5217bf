use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use crate::cleanup::{Cleaner, CleanupProvider};
use crate::config::{Config, Stages};
use crate::error::Result;
use crate::ocr::{OcrProvider, Recognizer};
use crate::pipeline::{Pipeline, TranscriptionOutput, TranscriptionRequest};

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "pagescribe")]
#[command(version, about = "Transcribe a handwritten notebook page with cloud OCR and an optional LLM cleanup pass")]
pub struct Args {
    /// Path to an image (jpg/png) of a notebook page
    pub image: PathBuf,

    /// Output directory, created if absent
    #[arg(long, default_value = "out")]
    pub outdir: PathBuf,

    /// Skip the LLM cleanup pass and write the raw OCR text
    #[arg(long)]
    pub no_clean: bool,

    /// Also write the raw OCR text next to the cleaned result
    #[arg(long)]
    pub keep_raw: bool,
}

impl Args {
    pub fn to_request(&self) -> TranscriptionRequest {
        TranscriptionRequest {
            image_path: self.image.clone(),
            output_dir: self.outdir.clone(),
            skip_cleanup: self.no_clean,
            keep_raw: self.keep_raw,
        }
    }
}

/// Validates configuration for the stages this run needs, builds the service
/// clients and runs the pipeline once.
pub async fn run(args: &Args, config: &Config) -> Result<TranscriptionOutput> {
    config.require(Stages::for_run(args.no_clean))?;

    let recognizer: Arc<dyn Recognizer> = Arc::new(OcrProvider::new(&config.ocr)?);
    let cleaner: Option<Arc<dyn Cleaner>> = if args.no_clean {
        None
    } else {
        Some(Arc::new(CleanupProvider::new(&config.cleanup)?))
    };

    Pipeline::new(recognizer, cleaner)
        .run(&args.to_request())
        .await
}
