//! BLIP model session management and caption generation.
//!
//! Loads the Salesforce BLIP base checkpoint (fp32 safetensors) through
//! candle and runs greedy autoregressive decoding. Decoding is argmax with a
//! fixed seed and a fresh logits processor per call, so the same image always
//! yields the same caption.

use std::path::Path;
use std::sync::Mutex;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::{blip, blip_text};
use tokenizers::Tokenizer;

use crate::error::PipelineError;

use super::preprocess;

/// Decoder start token for the BLIP base text decoder.
const BOS_TOKEN_ID: u32 = 30522;
/// Separator token that terminates generation.
const SEP_TOKEN_ID: u32 = 102;
/// Fixed seed; irrelevant to argmax sampling but pinned for reproducibility.
const CAPTION_SEED: u64 = 1337;

/// Model configuration for `Salesforce/blip-image-captioning-base`.
fn blip_base_config() -> blip::Config {
    let text_config = blip_text::Config {
        vocab_size: 30524,
        hidden_size: 768,
        encoder_hidden_size: 768,
        intermediate_size: 3072,
        projection_dim: 768,
        num_hidden_layers: 12,
        num_attention_heads: 12,
        max_position_embeddings: 512,
        hidden_act: candle_nn::Activation::Gelu,
        layer_norm_eps: 1e-12,
        is_decoder: true,
    };
    let vision_config = blip::VisionConfig {
        hidden_size: 768,
        intermediate_size: 3072,
        projection_dim: 512,
        num_hidden_layers: 12,
        num_attention_heads: 12,
        image_size: 384,
        patch_size: 16,
        hidden_act: candle_nn::Activation::Gelu,
        layer_norm_eps: 1e-5,
    };

    blip::Config {
        text_config,
        vision_config,
        projection_dim: 512,
        image_text_hidden_size: 256,
    }
}

/// Pick the fastest available device, falling back to CPU.
fn select_device() -> Device {
    if candle_core::utils::cuda_is_available() {
        match Device::new_cuda(0) {
            Ok(device) => return device,
            Err(e) => tracing::warn!("CUDA reported available but failed to initialize: {e}"),
        }
    }
    if candle_core::utils::metal_is_available() {
        match Device::new_metal(0) {
            Ok(device) => return device,
            Err(e) => tracing::warn!("Metal reported available but failed to initialize: {e}"),
        }
    }
    Device::Cpu
}

/// A loaded BLIP captioning model.
///
/// Uses a `Mutex` because the text decoder's KV cache mutates during
/// generation. The lock is only ever taken inside blocking sections.
#[derive(Debug)]
pub struct BlipSession {
    tokenizer: Tokenizer,
    device: Device,
    model: Mutex<blip::BlipForConditionalGeneration>,
}

impl BlipSession {
    /// Load the model and tokenizer from local files.
    pub fn load(weights: &Path, tokenizer_path: &Path) -> Result<Self, PipelineError> {
        let tokenizer =
            Tokenizer::from_file(tokenizer_path).map_err(|e| PipelineError::ModelUnavailable {
                message: format!("Failed to load tokenizer from {:?}: {e}", tokenizer_path),
            })?;

        let device = select_device();

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights.to_path_buf()], DType::F32, &device)
        }
        .map_err(|e| PipelineError::ModelUnavailable {
            message: format!("Failed to map model weights from {:?}: {e}", weights),
        })?;

        let model = blip::BlipForConditionalGeneration::new(&blip_base_config(), vb).map_err(
            |e| PipelineError::ModelUnavailable {
                message: format!("Failed to build BLIP model: {e}"),
            },
        )?;

        tracing::info!("Loaded BLIP captioning model on {:?}", device);

        Ok(Self {
            tokenizer,
            device,
            model: Mutex::new(model),
        })
    }

    /// Generate a caption for a decoded image.
    ///
    /// Blocking; callers run this under `spawn_blocking`.
    pub fn generate(
        &self,
        image: &image::DynamicImage,
        max_tokens: usize,
    ) -> Result<String, PipelineError> {
        let tensor = preprocess::image_tensor(image, &self.device).map_err(|e| {
            PipelineError::ModelUnavailable {
                message: format!("Image preprocessing failed: {e}"),
            }
        })?;

        let mut model = self
            .model
            .lock()
            .map_err(|e| PipelineError::ModelUnavailable {
                message: format!("Model lock poisoned: {e}"),
            })?;

        let token_ids = generate_tokens(&mut model, &tensor, &self.device, max_tokens).map_err(
            |e| PipelineError::ModelUnavailable {
                message: format!("Caption generation failed: {e}"),
            },
        )?;

        let text = self.tokenizer.decode(&token_ids, true).map_err(|e| {
            PipelineError::ModelUnavailable {
                message: format!("Failed to decode caption tokens: {e}"),
            }
        })?;

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(PipelineError::ModelUnavailable {
                message: "Model produced an empty caption".to_string(),
            });
        }

        Ok(text)
    }
}

/// Greedy decode loop: encode the image once, then feed one token at a time
/// through the cached text decoder until the separator or the token budget.
fn generate_tokens(
    model: &mut blip::BlipForConditionalGeneration,
    image: &Tensor,
    device: &Device,
    max_tokens: usize,
) -> candle_core::Result<Vec<u32>> {
    let image_embeds = image.unsqueeze(0)?.apply(model.vision_model())?;

    // Fresh processor per call; no temperature or top-p means pure argmax.
    let mut logits_processor = LogitsProcessor::new(CAPTION_SEED, None, None);
    let mut token_ids = vec![BOS_TOKEN_ID];

    model.reset_kv_cache();

    for index in 0..max_tokens {
        let context_size = if index > 0 { 1 } else { token_ids.len() };
        let start_pos = token_ids.len().saturating_sub(context_size);
        let input_ids = Tensor::new(&token_ids[start_pos..], device)?.unsqueeze(0)?;
        let logits = model.text_decoder().forward(&input_ids, &image_embeds)?;
        let logits = logits.squeeze(0)?;
        let logits = logits.get(logits.dim(0)? - 1)?;
        let token = logits_processor.sample(&logits)?;
        if token == SEP_TOKEN_ID {
            break;
        }
        token_ids.push(token);
    }

    Ok(token_ids)
}
