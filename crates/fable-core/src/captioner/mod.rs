//! Local image captioning: the first pipeline stage.
//!
//! `LocalCaptioner` owns the lazily-initialized BLIP session. Weights are
//! acquired and loaded at most once per process, on the first caption call;
//! concurrent first calls coalesce into a single initialization, and a failed
//! initialization leaves the cell empty so a later request can retry.

mod blip;
mod decode;
mod fetch;
mod preprocess;

pub use blip::BlipSession;
pub use decode::{DecodedUpload, UploadDecoder};
pub use fetch::{ensure_model_files, ModelFiles};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tokio::time::timeout;

use crate::config::{CaptionerConfig, Config, LimitsConfig};
use crate::error::PipelineError;
use crate::types::{ImageInput, LiteralCaption};

/// Trait for the first pipeline stage. Object-safe via `async_trait` so
/// the pipeline can hold an `Arc<dyn Captioner>` and tests can substitute
/// a deterministic stub.
#[async_trait]
pub trait Captioner: Send + Sync {
    /// Captioner name for logging (e.g. "blip").
    fn name(&self) -> &str;

    /// Produce a literal caption for the given image.
    async fn caption(&self, image: &ImageInput) -> Result<LiteralCaption, PipelineError>;
}

/// Captioner backed by a locally-run BLIP model.
pub struct LocalCaptioner {
    captioner_cfg: CaptionerConfig,
    limits: LimitsConfig,
    model_dir: PathBuf,
    decoder: UploadDecoder,
    client: reqwest::Client,
    session: OnceCell<Arc<BlipSession>>,
}

impl LocalCaptioner {
    /// Create a captioner from the full configuration. No model files are
    /// touched until the first caption call.
    pub fn new(config: &Config) -> Self {
        Self {
            captioner_cfg: config.captioner.clone(),
            limits: config.limits.clone(),
            model_dir: config.model_dir(),
            decoder: UploadDecoder::new(config.limits.clone()),
            client: reqwest::Client::new(),
            session: OnceCell::new(),
        }
    }

    /// Get the loaded session, acquiring weights and loading the model on
    /// first use.
    async fn session(&self) -> Result<Arc<BlipSession>, PipelineError> {
        let session = self
            .session
            .get_or_try_init(|| async {
                let files = fetch::ensure_model_files(
                    &self.client,
                    &self.captioner_cfg.repo,
                    &self.model_dir,
                )
                .await?;
                let loaded = tokio::task::spawn_blocking(move || {
                    BlipSession::load(&files.weights, &files.tokenizer)
                })
                .await
                .map_err(|e| PipelineError::ModelUnavailable {
                    message: format!("Model load task failed: {e}"),
                })??;
                Ok::<_, PipelineError>(Arc::new(loaded))
            })
            .await?;
        Ok(session.clone())
    }
}

#[async_trait]
impl Captioner for LocalCaptioner {
    fn name(&self) -> &str {
        "blip"
    }

    async fn caption(&self, image: &ImageInput) -> Result<LiteralCaption, PipelineError> {
        let start = Instant::now();

        let decoded = self.decoder.decode(image).await?;
        tracing::debug!(
            "Decoded upload: {:?} {}x{}",
            decoded.format,
            decoded.width,
            decoded.height
        );

        // Acquisition happens outside the caption timeout: a first-run
        // weight download must not count against inference time.
        let session = self.session().await?;

        let max_tokens = self.captioner_cfg.max_tokens;
        let img = decoded.image;
        let timeout_duration = Duration::from_millis(self.limits.caption_timeout_ms);

        let generated = match timeout(
            timeout_duration,
            tokio::task::spawn_blocking(move || session.generate(&img, max_tokens)),
        )
        .await
        {
            Ok(Ok(result)) => result?,
            Ok(Err(e)) => {
                return Err(PipelineError::ModelUnavailable {
                    message: format!("Caption task failed: {e}"),
                })
            }
            Err(_) => {
                return Err(PipelineError::ModelUnavailable {
                    message: format!(
                        "Caption generation timed out after {}ms",
                        self.limits.caption_timeout_ms
                    ),
                })
            }
        };

        let latency_ms = start.elapsed().as_millis() as u64;
        tracing::debug!("Caption generated in {latency_ms}ms: {generated:?}");

        Ok(LiteralCaption {
            text: generated,
            model: self.captioner_cfg.repo.clone(),
            latency_ms,
        })
    }
}
