//! Error types for the Fable captioning pipeline.
//!
//! `PipelineError` is a closed taxonomy: every failure in either captioning
//! stage maps to exactly one of its five variants, so callers (and the HTTP
//! layer) never have to pattern-match on message strings.

use thiserror::Error;

/// Top-level error type for Fable operations.
#[derive(Error, Debug)]
pub enum FableError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline errors. Each failure during captioning or enhancement is one of
/// these five variants; errors propagate to the caller unchanged.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Uploaded bytes are not a usable image (bad format, oversized, decode timeout)
    #[error("Invalid image: {message}")]
    InvalidImage { message: String },

    /// The local captioning model cannot be acquired, loaded, or run
    #[error("Caption model unavailable: {message}")]
    ModelUnavailable { message: String },

    /// The narrative provider credential is absent or rejected
    #[error("Credential missing: {message}")]
    CredentialMissing { message: String },

    /// The narrative provider failed (transport error, bad response, timeout)
    #[error("Remote service error: {message}")]
    RemoteServiceError {
        message: String,
        /// Upstream HTTP status, when one was received
        status_code: Option<u16>,
    },

    /// The narrative provider refused the request due to quota or rate limits
    #[error("Rate limited: {message}")]
    RateLimited { message: String },
}

impl PipelineError {
    /// Stable snake_case identifier for the variant, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidImage { .. } => "invalid_image",
            PipelineError::ModelUnavailable { .. } => "model_unavailable",
            PipelineError::CredentialMissing { .. } => "credential_missing",
            PipelineError::RemoteServiceError { .. } => "remote_service_error",
            PipelineError::RateLimited { .. } => "rate_limited",
        }
    }
}

/// Convenience type alias for Fable results.
pub type Result<T> = std::result::Result<T, FableError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
