//! Narrative provider trait and request/response types.
//!
//! Defines the interface the remote text-generation service sits behind,
//! plus the factory that creates the production provider from config.

use crate::config::EnhancerConfig;
use crate::error::PipelineError;
use async_trait::async_trait;
use std::time::Duration;

/// System instruction sent with every narrative request.
pub const STORYTELLER_INSTRUCTION: &str = "You are a creative storyteller. Your task is to \
     transform simple image captions into vivid, cinematic, and emotional descriptions. \
     Output only one sentence in English.";

/// A request to rewrite a literal caption into a narrative one.
#[derive(Debug, Clone)]
pub struct NarrativeRequest {
    /// Full prompt text, with the literal caption embedded
    pub prompt: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus sampling parameter
    pub top_p: f32,
    /// Maximum tokens the provider may generate
    pub max_output_tokens: u32,
}

impl NarrativeRequest {
    /// Build a rewrite request for the given literal caption.
    pub fn rewrite(caption: &str, config: &EnhancerConfig) -> Self {
        let prompt = format!(
            "Context: {caption}\n\
             Task: Rewrite this into a single, long, cinematic, and vivid sentence. \
             Focus on the atmosphere and textures. Output only the enhanced sentence. \
             Do not truncate the sentence."
        );

        Self {
            prompt,
            temperature: config.temperature,
            top_p: config.top_p,
            max_output_tokens: config.max_output_tokens,
        }
    }
}

/// The response from a narrative generation call.
#[derive(Debug, Clone)]
pub struct NarrativeResponse {
    /// Generated narrative text
    pub text: String,
    /// Model identifier used
    pub model: String,
    /// Number of tokens used (input + output), if reported
    pub tokens_used: Option<u32>,
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
}

/// Trait the narrative provider implements.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (the enhancer holds a `Box<dyn NarrativeProvider>` for dynamic dispatch).
#[async_trait]
pub trait NarrativeProvider: Send + Sync {
    /// Provider name for logging (e.g. "gemini").
    fn name(&self) -> &str;

    /// Check whether the provider has a credential configured.
    async fn is_available(&self) -> bool;

    /// Generate a narrative for the given request.
    async fn generate(&self, request: &NarrativeRequest)
        -> Result<NarrativeResponse, PipelineError>;
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok()
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Create the production provider from the enhancer config section.
///
/// The credential is resolved here, once, at construction; the provider never
/// reads the environment again. A missing credential still yields a provider:
/// it reports `CredentialMissing` per request, keeping the server alive.
pub fn provider_from_config(config: &EnhancerConfig) -> Box<dyn NarrativeProvider> {
    let api_key = resolve_env_var(&config.api_key);
    if api_key.is_none() {
        tracing::warn!(
            "No Gemini API key configured; enhancement requests will fail until one is set"
        );
    }
    Box::new(
        super::gemini::GeminiProvider::new(api_key, &config.model)
            .with_endpoint(&config.endpoint)
            .with_timeout(Duration::from_millis(config.timeout_ms)),
    )
}
