//! Core data types for the Fable captioning pipeline.
//!
//! These types flow through a single request: uploaded bytes in, a caption
//! record out. Nothing here is persisted.

use serde::{Deserialize, Serialize};

/// An uploaded image, held in memory for the duration of one request.
#[derive(Debug, Clone)]
pub struct ImageInput {
    /// Raw image bytes as uploaded
    pub bytes: Vec<u8>,

    /// Optional decoding hint from the upload (filename or MIME type).
    /// Content sniffing is authoritative; the hint is a fallback only.
    pub hint: Option<String>,
}

impl ImageInput {
    /// Create an input from raw bytes with no decoding hint.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, hint: None }
    }

    /// Attach a decoding hint (e.g. the upload filename or content type).
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// The short, factual caption produced by the local model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiteralCaption {
    /// Generated caption text
    pub text: String,

    /// Model identifier that produced it
    pub model: String,

    /// Stage latency in milliseconds (decode + inference)
    pub latency_ms: u64,
}

/// The embellished caption produced by the narrative provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeCaption {
    /// Generated narrative text
    pub text: String,

    /// Model identifier that produced it
    pub model: String,

    /// Stage latency in milliseconds (round trip to the provider)
    pub latency_ms: u64,

    /// Token usage, if the provider reported it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u32>,
}

/// The complete result of one trip through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionRecord {
    /// First-stage output from the local model
    pub literal: LiteralCaption,

    /// Second-stage output; absent when enhancement is disabled or skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative: Option<NarrativeCaption>,

    /// Total pipeline latency in milliseconds
    pub total_ms: u64,
}
