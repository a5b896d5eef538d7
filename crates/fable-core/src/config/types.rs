//! Sub-configuration structs with their defaults.

use serde::Deserialize;
use std::path::PathBuf;

/// General settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory where model weights are cached
    pub model_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("~/.fable/models"),
        }
    }
}

/// Resource limits to protect against problematic uploads.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum upload size in megabytes
    pub max_upload_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,

    /// Decode timeout in milliseconds
    pub decode_timeout_ms: u64,

    /// Caption generation timeout in milliseconds.
    /// Applies to inference only; the one-time weight download is exempt.
    pub caption_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_mb: 25,
            max_image_dimension: 10000,
            decode_timeout_ms: 5000,
            caption_timeout_ms: 120_000,
        }
    }
}

/// Local captioning model settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptionerConfig {
    /// Hugging Face repository holding the BLIP checkpoint
    pub repo: String,

    /// Maximum tokens to generate per caption
    pub max_tokens: usize,
}

impl Default for CaptionerConfig {
    fn default() -> Self {
        Self {
            repo: "Salesforce/blip-image-captioning-base".to_string(),
            max_tokens: 50,
        }
    }
}

/// Narrative enhancement settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnhancerConfig {
    /// Whether enhancement runs at all
    pub enabled: bool,

    /// Gemini API endpoint base
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Nucleus sampling parameter
    pub top_p: f32,

    /// Maximum tokens the provider may generate
    pub max_output_tokens: u32,

    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: "${GEMINI_API_KEY}".to_string(),
            model: "gemini-1.5-flash".to_string(),
            temperature: 0.8,
            top_p: 0.9,
            max_output_tokens: 256,
            timeout_ms: 60_000,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Bind port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
