use crate::error::{InferenceError, InferenceResult};
use image::imageops::{self, FilterType};
use ndarray::Array4;

/// Decode an already validated upload into a `[1, size, size, 3]` NHWC tensor
/// with intensities scaled to `[0, 1]`.
///
/// The aspect ratio is not preserved. Decoding is expected to succeed because
/// the validator ran first, so a failure here is reported loudly and tagged
/// as a preprocessing error rather than a rejection.
pub fn preprocess(bytes: &[u8], size: u32) -> InferenceResult<Array4<f32>> {
    let decoded = image::load_from_memory(bytes).map_err(|e| {
        tracing::error!(error = %e, "Decode failed after validation accepted the upload");
        InferenceError::Preprocess(e.to_string())
    })?;
    let rgb = decoded.to_rgb8();
    drop(decoded);

    let resized = imageops::resize(&rgb, size, size, FilterType::CatmullRom);
    let side = size as usize;

    Ok(Array4::<f32>::from_shape_fn((1, side, side, 3), |(_, y, x, c)| {
        let p = resized.get_pixel(x as u32, y as u32);
        p[c] as f32 / 255.0
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Luma, Rgb, RgbImage};
    use std::io::Cursor;

    fn encode(img: DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_output_shape() {
        let bytes = encode(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            300,
            120,
            Rgb([10, 20, 30]),
        )));
        let tensor = preprocess(&bytes, 224).unwrap();
        assert_eq!(tensor.shape(), &[1, 224, 224, 3]);
    }

    #[test]
    fn test_values_scaled_to_unit_range() {
        let bytes = encode(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            64,
            64,
            Rgb([255, 0, 51]),
        )));
        let tensor = preprocess(&bytes, 32).unwrap();
        assert!((tensor[[0, 5, 5, 0]] - 1.0).abs() < 1e-6);
        assert!(tensor[[0, 5, 5, 1]].abs() < 1e-6);
        assert!((tensor[[0, 5, 5, 2]] - 0.2).abs() < 1e-6);
        assert!(tensor.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_grayscale_is_expanded_to_three_channels() {
        let gray = image::GrayImage::from_pixel(80, 80, Luma([128]));
        let bytes = encode(DynamicImage::ImageLuma8(gray));
        let tensor = preprocess(&bytes, 16).unwrap();
        let expected = 128.0 / 255.0;
        for c in 0..3 {
            assert!((tensor[[0, 8, 8, c]] - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_undecodable_bytes_are_a_preprocess_error() {
        let err = preprocess(b"not an image", 224).unwrap_err();
        assert!(matches!(err, InferenceError::Preprocess(_)));
    }
}
