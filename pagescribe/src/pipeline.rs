use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;
use tracing::{error, info, warn};

use crate::cleanup::Cleaner;
use crate::error::{Result, ScribeError};
use crate::ocr::{ReadApi, Recognizer};

const RAW_SUFFIX: &str = "raw.txt";
const CLEAN_SUFFIX: &str = "clean.md";
#[cfg(unix)]
const OUTPUT_MODE: u32 = 0o644;

/// One page to transcribe and where to put the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionRequest {
    pub image_path: PathBuf,
    pub output_dir: PathBuf,
    pub skip_cleanup: bool,
    /// Also persist the raw OCR text next to a cleaned result.
    pub keep_raw: bool,
}

impl TranscriptionRequest {
    pub fn new(image_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            image_path: image_path.into(),
            output_dir: output_dir.into(),
            skip_cleanup: false,
            keep_raw: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    LoadingImage,
    Recognizing,
    Cleaning,
    Writing,
    Done,
    Failed,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LoadingImage => write!(f, "loading_image"),
            Self::Recognizing => write!(f, "recognizing"),
            Self::Cleaning => write!(f, "cleaning"),
            Self::Writing => write!(f, "writing"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    Skipped,
    Cleaned,
    /// Cleanup failed; the raw text was written instead.
    FellBack { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionOutput {
    pub final_path: PathBuf,
    /// Separate raw-text file, only present when it differs from `final_path`.
    pub raw_path: Option<PathBuf>,
    pub text: String,
    pub cleanup: CleanupOutcome,
    pub recognized_with: ReadApi,
}

impl TranscriptionOutput {
    /// Every file written by the run, raw text first.
    pub fn written(&self) -> Vec<&Path> {
        self.raw_path
            .as_deref()
            .into_iter()
            .chain(std::iter::once(self.final_path.as_path()))
            .collect()
    }
}

struct Artifact {
    path: PathBuf,
    contents: String,
}

pub struct Pipeline {
    recognizer: Arc<dyn Recognizer>,
    cleaner: Option<Arc<dyn Cleaner>>,
}

impl Pipeline {
    /// A `None` cleaner behaves as if every request set `skip_cleanup`.
    pub fn new(recognizer: Arc<dyn Recognizer>, cleaner: Option<Arc<dyn Cleaner>>) -> Self {
        Self {
            recognizer,
            cleaner,
        }
    }

    pub async fn run(&self, request: &TranscriptionRequest) -> Result<TranscriptionOutput> {
        match self.execute(request).await {
            Ok(output) => {
                info!(
                    stage = %PipelineStage::Done,
                    output = %output.final_path.display(),
                    "Transcription finished"
                );
                Ok(output)
            }
            Err(e) => {
                error!(stage = %PipelineStage::Failed, error = %e, "Transcription failed");
                Err(e)
            }
        }
    }

    async fn execute(&self, request: &TranscriptionRequest) -> Result<TranscriptionOutput> {
        enter(PipelineStage::LoadingImage, &request.image_path);
        let stem = image_stem(&request.image_path)?;
        let image = load_image(&request.image_path).await?;

        enter(PipelineStage::Recognizing, &request.image_path);
        let recognition = self.recognizer.recognize(&image).await?;
        info!(
            api = %recognition.api,
            lines = recognition.lines.len(),
            "Text recognized"
        );

        let cleaner = self.cleaner.as_ref().filter(|_| !request.skip_cleanup);
        let (text, cleanup) = match cleaner {
            Some(cleaner) => {
                enter(PipelineStage::Cleaning, &request.image_path);
                match cleaner.clean(&recognition.text).await {
                    Ok(cleaned) => (cleaned, CleanupOutcome::Cleaned),
                    Err(e) => {
                        warn!("Cleanup failed, keeping raw text: {}", e);
                        (
                            recognition.text.clone(),
                            CleanupOutcome::FellBack {
                                reason: e.to_string(),
                            },
                        )
                    }
                }
            }
            None => (recognition.text.clone(), CleanupOutcome::Skipped),
        };

        enter(PipelineStage::Writing, &request.output_dir);
        let raw_path = request.output_dir.join(format!("{stem}.{RAW_SUFFIX}"));
        let clean_path = request.output_dir.join(format!("{stem}.{CLEAN_SUFFIX}"));

        let mut artifacts = Vec::with_capacity(2);
        let (final_path, raw_path, stale) = if cleanup == CleanupOutcome::Cleaned {
            artifacts.push(Artifact {
                path: clean_path.clone(),
                contents: text.clone(),
            });
            let kept_raw = if request.keep_raw {
                artifacts.push(Artifact {
                    path: raw_path.clone(),
                    contents: recognition.text.clone(),
                });
                Some(raw_path)
            } else {
                None
            };
            (clean_path, kept_raw, None)
        } else {
            artifacts.push(Artifact {
                path: raw_path.clone(),
                contents: text.clone(),
            });
            // A cleaned file from an earlier run no longer matches this one.
            (raw_path, None, Some(clean_path))
        };

        write_artifacts(&request.output_dir, &artifacts)?;
        for artifact in &artifacts {
            info!("Wrote {}", artifact.path.display());
        }

        if let Some(stale) = stale {
            remove_stale(&stale);
        }

        Ok(TranscriptionOutput {
            final_path,
            raw_path,
            text,
            cleanup,
            recognized_with: recognition.api,
        })
    }
}

fn enter(stage: PipelineStage, path: &Path) {
    info!(stage = %stage, path = %path.display(), "Pipeline stage");
}

async fn load_image(path: &Path) -> Result<Vec<u8>> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ScribeError::file(path, e))?;

    if bytes.is_empty() {
        return Err(ScribeError::EmptyImage(path.to_path_buf()));
    }

    Ok(bytes)
}

fn image_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| {
            ScribeError::Validation(format!(
                "Cannot derive an output name from {}",
                path.display()
            ))
        })
}

/// Stages every artifact as a temp file in `output_dir` before renaming any of
/// them into place. If a rename fails, the files already renamed are removed
/// so the run leaves none of its output behind.
fn write_artifacts(output_dir: &Path, artifacts: &[Artifact]) -> Result<()> {
    std::fs::create_dir_all(output_dir).map_err(|e| ScribeError::file(output_dir, e))?;

    let mut staged = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let mut file = stage_file(output_dir)?;
        file.write_all(artifact.contents.as_bytes())
            .map_err(|e| ScribeError::file(file.path(), e))?;
        file.as_file()
            .sync_all()
            .map_err(|e| ScribeError::file(file.path(), e))?;
        staged.push((file, &artifact.path));
    }

    let mut persisted: Vec<&Path> = Vec::with_capacity(staged.len());
    for (file, path) in staged {
        if let Err(e) = file.persist(path) {
            for done in persisted {
                if let Err(remove_error) = std::fs::remove_file(done) {
                    warn!("Failed to roll back {}: {}", done.display(), remove_error);
                }
            }
            return Err(ScribeError::file(path, e.error));
        }
        persisted.push(path);
    }

    Ok(())
}

/// Temp files default to owner-only; outputs get the usual umask-filtered mode.
fn stage_file(output_dir: &Path) -> Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(".pagescribe");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(OUTPUT_MODE));
    }

    builder
        .tempfile_in(output_dir)
        .map_err(|e| ScribeError::file(output_dir, e))
}

fn remove_stale(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => info!("Removed stale {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove stale {}: {}", path.display(), e),
    }
}
