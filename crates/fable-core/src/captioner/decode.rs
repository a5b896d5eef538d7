//! Upload decoding with content sniffing, limit checks, and timeout support.

use image::{DynamicImage, GenericImageView, ImageFormat};
use std::time::Duration;
use tokio::time::timeout;

use crate::config::LimitsConfig;
use crate::error::PipelineError;
use crate::types::ImageInput;

/// Decodes uploaded bytes into an image, enforcing the configured limits.
pub struct UploadDecoder {
    limits: LimitsConfig,
}

/// Result of decoding an upload.
#[derive(Debug)]
pub struct DecodedUpload {
    /// The decoded image data
    pub image: DynamicImage,
    /// Detected image format
    pub format: ImageFormat,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl UploadDecoder {
    /// Create a new decoder with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Decode an upload with validation and timeout.
    ///
    /// Decoding runs on the blocking pool; untrusted input must never stall
    /// the async runtime.
    pub async fn decode(&self, input: &ImageInput) -> Result<DecodedUpload, PipelineError> {
        let max_bytes = self.limits.max_upload_mb * 1024 * 1024;
        if input.bytes.is_empty() {
            return Err(PipelineError::InvalidImage {
                message: "Upload is empty".to_string(),
            });
        }
        if input.bytes.len() as u64 > max_bytes {
            return Err(PipelineError::InvalidImage {
                message: format!(
                    "Upload too large: {} bytes (limit {} MB)",
                    input.bytes.len(),
                    self.limits.max_upload_mb
                ),
            });
        }

        let bytes = input.bytes.clone();
        let hint = input.hint.clone();
        let timeout_duration = Duration::from_millis(self.limits.decode_timeout_ms);

        let decode_result = timeout(timeout_duration, async {
            tokio::task::spawn_blocking(move || decode_bytes_sync(bytes, hint.as_deref())).await
        })
        .await;

        match decode_result {
            Ok(Ok(Ok(decoded))) => {
                if decoded.width > self.limits.max_image_dimension
                    || decoded.height > self.limits.max_image_dimension
                {
                    return Err(PipelineError::InvalidImage {
                        message: format!(
                            "Image too large: {}x{} (limit {})",
                            decoded.width, decoded.height, self.limits.max_image_dimension
                        ),
                    });
                }
                Ok(decoded)
            }
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(e)) => Err(PipelineError::InvalidImage {
                message: format!("Decode task failed: {e}"),
            }),
            Err(_) => Err(PipelineError::InvalidImage {
                message: format!(
                    "Decode timed out after {}ms",
                    self.limits.decode_timeout_ms
                ),
            }),
        }
    }
}

/// Synchronous decode (runs in spawn_blocking).
///
/// Format detection sniffs content first; the caller-provided hint is only
/// consulted when the magic bytes are inconclusive.
fn decode_bytes_sync(bytes: Vec<u8>, hint: Option<&str>) -> Result<DecodedUpload, PipelineError> {
    use std::io::Cursor;

    let cursor = Cursor::new(bytes);
    let mut reader = image::ImageReader::new(cursor)
        .with_guessed_format()
        .map_err(|e| PipelineError::InvalidImage {
            message: format!("Cannot inspect image content: {e}"),
        })?;

    let format = match reader.format() {
        Some(f) => f,
        None => {
            let format = format_from_hint(hint).ok_or_else(|| PipelineError::InvalidImage {
                message: "Unrecognized image format".to_string(),
            })?;
            reader.set_format(format);
            format
        }
    };

    let image = reader.decode().map_err(|e| PipelineError::InvalidImage {
        message: e.to_string(),
    })?;

    let (width, height) = image.dimensions();
    Ok(DecodedUpload {
        image,
        format,
        width,
        height,
    })
}

/// Map an upload hint (filename or MIME type) to an image format.
fn format_from_hint(hint: Option<&str>) -> Option<ImageFormat> {
    let hint = hint?;
    if let Some(mime) = hint.strip_prefix("image/") {
        return ImageFormat::from_extension(mime);
    }
    let extension = hint.rsplit('.').next()?;
    ImageFormat::from_extension(extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(width, height));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn decoder() -> UploadDecoder {
        UploadDecoder::new(LimitsConfig::default())
    }

    #[tokio::test]
    async fn test_decode_valid_png() {
        let input = ImageInput::new(png_bytes(16, 12));
        let decoded = decoder().decode(&input).await.unwrap();
        assert_eq!(decoded.format, ImageFormat::Png);
        assert_eq!((decoded.width, decoded.height), (16, 12));
    }

    #[tokio::test]
    async fn test_decode_garbage_is_invalid_image() {
        let input = ImageInput::new(b"this is definitely not an image".to_vec());
        let err = decoder().decode(&input).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidImage { .. }));
    }

    #[tokio::test]
    async fn test_decode_empty_upload() {
        let input = ImageInput::new(Vec::new());
        let err = decoder().decode(&input).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidImage { .. }));
    }

    #[tokio::test]
    async fn test_decode_rejects_oversized_dimensions() {
        let mut limits = LimitsConfig::default();
        limits.max_image_dimension = 8;
        let decoder = UploadDecoder::new(limits);

        let input = ImageInput::new(png_bytes(32, 32));
        let err = decoder.decode(&input).await.unwrap_err();
        match err {
            PipelineError::InvalidImage { message } => {
                assert!(message.contains("Image too large"), "got: {message}");
            }
            other => panic!("expected InvalidImage, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_decode_rejects_oversized_upload() {
        let mut limits = LimitsConfig::default();
        limits.max_upload_mb = 1;
        let decoder = UploadDecoder::new(limits);

        // 2 MB of zeros; rejected on size before any decoding happens.
        let input = ImageInput::new(vec![0u8; 2 * 1024 * 1024]);
        let err = decoder.decode(&input).await.unwrap_err();
        match err {
            PipelineError::InvalidImage { message } => {
                assert!(message.contains("Upload too large"), "got: {message}");
            }
            other => panic!("expected InvalidImage, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_content_sniff_beats_misleading_hint() {
        // PNG bytes presented as a .jpg upload still decode as PNG.
        let input = ImageInput::new(png_bytes(8, 8)).with_hint("photo.jpg");
        let decoded = decoder().decode(&input).await.unwrap();
        assert_eq!(decoded.format, ImageFormat::Png);
    }

    #[test]
    fn test_format_from_hint() {
        assert_eq!(format_from_hint(Some("image/png")), Some(ImageFormat::Png));
        assert_eq!(
            format_from_hint(Some("holiday.jpeg")),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(format_from_hint(Some("mystery")), None);
        assert_eq!(format_from_hint(None), None);
    }
}
