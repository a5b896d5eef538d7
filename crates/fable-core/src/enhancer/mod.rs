//! Narrative enhancement of literal captions.
//!
//! Wraps a [`NarrativeProvider`] and turns the captioner's literal output
//! into a single vivid sentence. Degenerate captions skip the provider
//! entirely.

mod gemini;
mod provider;

pub use gemini::GeminiProvider;
pub use provider::{
    provider_from_config, resolve_env_var, NarrativeProvider, NarrativeRequest, NarrativeResponse,
    STORYTELLER_INSTRUCTION,
};

use crate::config::EnhancerConfig;
use crate::error::PipelineError;
use crate::types::{LiteralCaption, NarrativeCaption};

/// Captions shorter than this are passed through unchanged.
const MIN_CAPTION_LEN: usize = 3;

/// Model label used when the caption bypassed the provider.
pub const PASSTHROUGH_MODEL: &str = "passthrough";

/// Rewrites literal captions into narrative ones via a remote provider.
pub struct NarrativeEnhancer {
    provider: Box<dyn NarrativeProvider>,
    config: EnhancerConfig,
}

impl NarrativeEnhancer {
    pub fn new(provider: Box<dyn NarrativeProvider>, config: EnhancerConfig) -> Self {
        Self { provider, config }
    }

    /// Build the production enhancer, resolving the credential once here.
    pub fn from_config(config: &EnhancerConfig) -> Self {
        Self::new(provider_from_config(config), config.clone())
    }

    /// Whether the underlying provider has a credential configured.
    pub async fn is_available(&self) -> bool {
        self.provider.is_available().await
    }

    /// Rewrite a literal caption into a narrative sentence.
    ///
    /// Makes exactly one provider call; rate limits and transient failures
    /// surface to the caller instead of being retried.
    pub async fn enhance(
        &self,
        literal: &LiteralCaption,
    ) -> Result<NarrativeCaption, PipelineError> {
        if literal.text.trim().len() < MIN_CAPTION_LEN {
            tracing::debug!(caption = %literal.text, "Caption too short to enhance; passing through");
            return Ok(NarrativeCaption {
                text: literal.text.clone(),
                model: PASSTHROUGH_MODEL.to_string(),
                latency_ms: 0,
                tokens: None,
            });
        }

        let request = NarrativeRequest::rewrite(&literal.text, &self.config);
        tracing::debug!(provider = %self.provider.name(), "Requesting narrative rewrite");
        let response = self.provider.generate(&request).await?;

        tracing::debug!(
            model = %response.model,
            latency_ms = response.latency_ms,
            "Narrative rewrite complete"
        );

        Ok(NarrativeCaption {
            text: response.text,
            model: response.model,
            latency_ms: response.latency_ms,
            tokens: response.tokens_used,
        })
    }
}
