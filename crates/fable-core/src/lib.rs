//! Fable Core - narrative image captioning library.
//!
//! Fable turns an uploaded image into two captions: a short literal one
//! from a local BLIP model, and a narrative rewrite of it from a remote
//! text-generation service.
//!
//! # Architecture
//!
//! The pipeline is a strictly sequential two-stage chain:
//!
//! ```text
//! Image → Decode → Literal caption (BLIP, local) → Narrative caption (Gemini, remote)
//! ```
//!
//! Model weights are fetched lazily on first use and cached on disk; the
//! remote stage needs an API key and fails cleanly without one.
//!
//! # Usage
//!
//! ```rust,ignore
//! use fable_core::{CaptionPipeline, Config, ImageInput};
//!
//! #[tokio::main]
//! async fn main() -> fable_core::Result<()> {
//!     let config = Config::load()?;
//!     let pipeline = CaptionPipeline::from_config(&config);
//!
//!     let bytes = std::fs::read("./dog.jpg")?;
//!     let record = pipeline.run(&ImageInput::new(bytes)).await?;
//!     println!("{}", record.literal.text);
//!     if let Some(narrative) = record.narrative {
//!         println!("{}", narrative.text);
//!     }
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod captioner;
pub mod config;
pub mod enhancer;
pub mod error;
pub mod pipeline;
pub mod types;

// Re-exports for convenient access
pub use captioner::{Captioner, LocalCaptioner};
pub use config::Config;
pub use enhancer::{NarrativeEnhancer, NarrativeProvider};
pub use error::{ConfigError, FableError, PipelineError, PipelineResult, Result};
pub use pipeline::CaptionPipeline;
pub use types::{CaptionRecord, ImageInput, LiteralCaption, NarrativeCaption};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
