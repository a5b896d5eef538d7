//! Image preprocessing for the BLIP vision encoder.
//!
//! BLIP expects a 384x384 CLIP-normalized NCHW tensor. Resize uses
//! `resize_to_fill` so the full frame is covered without letterboxing.

use candle_core::{DType, Device, Tensor};
use image::DynamicImage;

/// Input resolution of the BLIP base vision encoder.
pub const IMAGE_SIZE: usize = 384;

const MEAN: [f32; 3] = [0.48145466, 0.4578275, 0.40821073];
const STD: [f32; 3] = [0.26862954, 0.261_302_6, 0.275_777_1];

/// Convert a decoded image into a normalized `[3, 384, 384]` tensor on the
/// given device.
pub fn image_tensor(img: &DynamicImage, device: &Device) -> candle_core::Result<Tensor> {
    let img = img
        .resize_to_fill(
            IMAGE_SIZE as u32,
            IMAGE_SIZE as u32,
            image::imageops::FilterType::Triangle,
        )
        .to_rgb8();
    let data = img.into_raw();
    let data = Tensor::from_vec(data, (IMAGE_SIZE, IMAGE_SIZE, 3), &Device::Cpu)?
        .permute((2, 0, 1))?;
    let mean = Tensor::new(&MEAN, &Device::Cpu)?.reshape((3, 1, 1))?;
    let std = Tensor::new(&STD, &Device::Cpu)?.reshape((3, 1, 1))?;
    let normalized = ((data.to_dtype(DType::F32)? / 255.)?
        .broadcast_sub(&mean)?
        .broadcast_div(&std))?;
    normalized.to_device(device)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_shape() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(64, 48));
        let tensor = image_tensor(&img, &Device::Cpu).unwrap();
        assert_eq!(tensor.dims(), &[3, IMAGE_SIZE, IMAGE_SIZE]);
    }

    #[test]
    fn test_normalization_range() {
        // A pure white image maps each channel to (1.0 - mean) / std.
        let mut rgb = image::RgbImage::new(8, 8);
        for pixel in rgb.pixels_mut() {
            *pixel = image::Rgb([255, 255, 255]);
        }
        let img = DynamicImage::ImageRgb8(rgb);
        let tensor = image_tensor(&img, &Device::Cpu).unwrap();
        let values = tensor.flatten_all().unwrap().to_vec1::<f32>().unwrap();
        let expected_red = (1.0 - MEAN[0]) / STD[0];
        assert!((values[0] - expected_red).abs() < 1e-4);
        // All values well inside the normalized range
        assert!(values.iter().all(|v| v.abs() < 4.0));
    }

    #[test]
    fn test_non_square_input_fills_frame() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(640, 120));
        let tensor = image_tensor(&img, &Device::Cpu).unwrap();
        assert_eq!(tensor.dims(), &[3, IMAGE_SIZE, IMAGE_SIZE]);
    }
}
