//! Model weight acquisition from the Hugging Face CDN.
//!
//! Downloads stream to a `.partial` file and rename into place on completion,
//! so an interrupted download never leaves a truncated file where the loader
//! expects one. Files already present are never re-fetched.

use std::path::{Path, PathBuf};

use crate::error::PipelineError;

pub(crate) const WEIGHTS_FILE: &str = "model.safetensors";
pub(crate) const TOKENIZER_FILE: &str = "tokenizer.json";

/// Resolved local paths of the model artifacts.
pub struct ModelFiles {
    pub weights: PathBuf,
    pub tokenizer: PathBuf,
}

fn hf_url(repo: &str, file: &str) -> String {
    format!("https://huggingface.co/{repo}/resolve/main/{file}")
}

/// Ensure the BLIP weights and tokenizer exist locally, downloading any
/// missing file. The weights are ~990 MB; the tokenizer is small.
pub async fn ensure_model_files(
    client: &reqwest::Client,
    repo: &str,
    model_dir: &Path,
) -> Result<ModelFiles, PipelineError> {
    let weights = model_dir.join(WEIGHTS_FILE);
    let tokenizer = model_dir.join(TOKENIZER_FILE);

    if weights.exists() && tokenizer.exists() {
        tracing::debug!("Model files already present in {:?}", model_dir);
        return Ok(ModelFiles { weights, tokenizer });
    }

    std::fs::create_dir_all(model_dir).map_err(|e| PipelineError::ModelUnavailable {
        message: format!("Cannot create model directory {:?}: {e}", model_dir),
    })?;

    if !weights.exists() {
        let url = hf_url(repo, WEIGHTS_FILE);
        tracing::info!("Downloading caption model weights (first run, ~990 MB)...");
        tracing::info!("  Source: {url}");
        tracing::info!("  Destination: {:?}", weights);
        download_file(client, &url, &weights).await?;
        if let Ok(metadata) = std::fs::metadata(&weights) {
            tracing::info!(
                "  Weights complete ({:.1} MB)",
                metadata.len() as f64 / (1024.0 * 1024.0)
            );
        }
    }

    if !tokenizer.exists() {
        let url = hf_url(repo, TOKENIZER_FILE);
        tracing::info!("Downloading tokenizer...");
        tracing::info!("  Source: {url}");
        tracing::info!("  Destination: {:?}", tokenizer);
        download_file(client, &url, &tokenizer).await?;
        tracing::info!("  Tokenizer complete");
    }

    Ok(ModelFiles { weights, tokenizer })
}

/// Download a file from a URL, streaming to `<dest>.partial` and renaming
/// into place once the stream ends cleanly.
async fn download_file(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
) -> Result<(), PipelineError> {
    use futures_util::StreamExt;
    use tokio::io::AsyncWriteExt;

    let response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| PipelineError::ModelUnavailable {
            message: format!("Download failed for {url}: {e}"),
        })?;

    let total_size = response.content_length();
    if let Some(size) = total_size {
        tracing::info!("  Size: {:.1} MB", size as f64 / (1024.0 * 1024.0));
    }

    let partial = dest.with_extension("partial");
    let mut file = tokio::fs::File::create(&partial)
        .await
        .map_err(|e| write_error(&partial, e))?;
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| PipelineError::ModelUnavailable {
            message: format!("Download interrupted for {url}: {e}"),
        })?;
        file.write_all(&chunk)
            .await
            .map_err(|e| write_error(&partial, e))?;
        downloaded += chunk.len() as u64;

        if let Some(total) = total_size {
            if downloaded % (50 * 1024 * 1024) < chunk.len() as u64 {
                tracing::info!(
                    "  Progress: {:.0}%",
                    downloaded as f64 / total as f64 * 100.0
                );
            }
        }
    }

    file.flush().await.map_err(|e| write_error(&partial, e))?;
    drop(file);

    tokio::fs::rename(&partial, dest)
        .await
        .map_err(|e| write_error(dest, e))?;

    Ok(())
}

fn write_error(path: &Path, e: std::io::Error) -> PipelineError {
    PipelineError::ModelUnavailable {
        message: format!("Failed to write {:?}: {e}", path),
    }
}
