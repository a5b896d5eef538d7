//! Two-stage caption pipeline.
//!
//! Sequences the local captioner and the narrative enhancer:
//! image in, literal caption, narrative caption out. Any stage failure
//! short-circuits the request; no partial results are returned.

use crate::captioner::{Captioner, LocalCaptioner};
use crate::config::Config;
use crate::enhancer::NarrativeEnhancer;
use crate::error::PipelineError;
use crate::types::{CaptionRecord, ImageInput};
use std::sync::Arc;
use std::time::Instant;

/// Orchestrates captioner and enhancer for one request at a time.
///
/// Cheap to share behind an `Arc`; the heavyweight state (model weights)
/// lives inside the captioner and is initialized at most once.
pub struct CaptionPipeline {
    captioner: Arc<dyn Captioner>,
    enhancer: Arc<NarrativeEnhancer>,
    enhancement_enabled: bool,
}

impl CaptionPipeline {
    pub fn new(
        captioner: Arc<dyn Captioner>,
        enhancer: Arc<NarrativeEnhancer>,
        enhancement_enabled: bool,
    ) -> Self {
        Self {
            captioner,
            enhancer,
            enhancement_enabled,
        }
    }

    /// Build the production pipeline from config.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(LocalCaptioner::new(config)),
            Arc::new(NarrativeEnhancer::from_config(&config.enhancer)),
            config.enhancer.enabled,
        )
    }

    /// Whether the narrative stage has a credential configured.
    pub async fn enhancer_available(&self) -> bool {
        self.enhancer.is_available().await
    }

    /// Run the full pipeline with enhancement on.
    pub async fn run(&self, input: &ImageInput) -> Result<CaptionRecord, PipelineError> {
        self.run_with(input, true).await
    }

    /// Run the pipeline, optionally skipping the narrative stage.
    ///
    /// `narrative` is `None` only when enhancement was deliberately skipped,
    /// never as a fallback for a failed enhancement.
    pub async fn run_with(
        &self,
        input: &ImageInput,
        enhance: bool,
    ) -> Result<CaptionRecord, PipelineError> {
        let start = Instant::now();

        let literal = self.captioner.caption(input).await?;
        tracing::info!(caption = %literal.text, model = %literal.model, "Literal caption generated");

        let narrative = if enhance && self.enhancement_enabled {
            let narrative = self.enhancer.enhance(&literal).await?;
            tracing::info!(narrative = %narrative.text, model = %narrative.model, "Narrative caption generated");
            Some(narrative)
        } else {
            tracing::debug!("Narrative stage skipped");
            None
        };

        Ok(CaptionRecord {
            literal,
            narrative,
            total_ms: start.elapsed().as_millis() as u64,
        })
    }
}
