//! Heuristic upload gate
//!
//! Short-circuits uploads that cannot plausibly be a brain scan before any
//! preprocessing or inference work happens. This is not medical-image
//! verification: it only looks at decodability, filename suffix and size.

use crate::config::{ValidationRules, normalize_extension};
use crate::types::ValidationVerdict;
use image::ImageReader;
use std::io::Cursor;

pub const VALID_MESSAGE: &str = "Valid MRI image";
pub const FORMAT_MESSAGE: &str = "Invalid file format. Please upload medical image files.";
pub const TOO_SMALL_MESSAGE: &str = "Image too small for MRI analysis.";
pub const TOO_LARGE_MESSAGE: &str = "Image too large. Please upload a standard MRI scan.";

/// Decide whether an upload may enter the pipeline.
///
/// The header is read first so that oversized images are rejected before
/// their pixels are decoded. The suffix check runs even when the bytes
/// decode fine.
pub fn validate(bytes: &[u8], filename: &str, rules: &ValidationRules) -> ValidationVerdict {
    let (width, height) = match read_dimensions(bytes) {
        Ok(dims) => dims,
        Err(e) => return ValidationVerdict::reject(decode_message(&e)),
    };

    if !has_allowed_extension(filename, &rules.allowed_extensions) {
        return ValidationVerdict::reject(FORMAT_MESSAGE);
    }

    if width < rules.min_dimension || height < rules.min_dimension {
        return ValidationVerdict::reject(TOO_SMALL_MESSAGE);
    }

    if width > rules.max_dimension || height > rules.max_dimension {
        return ValidationVerdict::reject(TOO_LARGE_MESSAGE);
    }

    // Truncated pixel data can still carry a valid header
    if let Err(e) = image::load_from_memory(bytes) {
        return ValidationVerdict::reject(decode_message(&e));
    }

    ValidationVerdict::accept(VALID_MESSAGE)
}

/// Case-insensitive suffix match against the allow-list. Entries without a
/// leading dot still only match a whole extension.
pub fn has_allowed_extension(filename: &str, allowed: &[String]) -> bool {
    let lower = filename.to_lowercase();
    allowed
        .iter()
        .filter_map(|ext| normalize_extension(ext))
        .any(|ext| lower.ends_with(&ext))
}

fn read_dimensions(bytes: &[u8]) -> Result<(u32, u32), image::ImageError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?
        .into_dimensions()
}

fn decode_message(e: &image::ImageError) -> String {
    format!("Error validating image: {}", e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8])
        });
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_accepts_plain_scan() {
        let verdict = validate(&png(128, 128), "scan.png", &ValidationRules::default());
        assert!(verdict.accepted);
        assert_eq!(verdict.reason, VALID_MESSAGE);
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        let verdict = validate(&png(128, 128), "SCAN.PNG", &ValidationRules::default());
        assert!(verdict.accepted);
    }

    #[test]
    fn test_rejects_disallowed_extension_even_when_decodable() {
        let verdict = validate(&png(128, 128), "scan.txt", &ValidationRules::default());
        assert!(!verdict.accepted);
        assert_eq!(verdict.reason, FORMAT_MESSAGE);
    }

    #[test]
    fn test_rejects_too_small() {
        let verdict = validate(&png(32, 32), "scan.png", &ValidationRules::default());
        assert!(!verdict.accepted);
        assert_eq!(verdict.reason, TOO_SMALL_MESSAGE);
    }

    #[test]
    fn test_rejects_when_one_side_too_small() {
        let verdict = validate(&png(500, 63), "scan.png", &ValidationRules::default());
        assert_eq!(verdict.reason, TOO_SMALL_MESSAGE);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let rules = ValidationRules::default();
        assert!(validate(&png(64, 64), "scan.png", &rules).accepted);
        assert!(validate(&png(2000, 64), "scan.png", &rules).accepted);
    }

    #[test]
    fn test_rejects_too_large() {
        let verdict = validate(&png(2001, 100), "scan.png", &ValidationRules::default());
        assert!(!verdict.accepted);
        assert_eq!(verdict.reason, TOO_LARGE_MESSAGE);
    }

    #[test]
    fn test_rejects_garbage_bytes() {
        let verdict = validate(b"definitely not an image", "scan.png", &ValidationRules::default());
        assert!(!verdict.accepted);
        assert!(verdict.reason.starts_with("Error validating image:"));
    }

    #[test]
    fn test_decode_failure_wins_over_extension() {
        let verdict = validate(b"garbage", "scan.txt", &ValidationRules::default());
        assert!(verdict.reason.starts_with("Error validating image:"));
    }

    #[test]
    fn test_rejects_truncated_pixel_data() {
        let mut bytes = png(128, 128);
        bytes.truncate(bytes.len() / 2);
        let verdict = validate(&bytes, "scan.png", &ValidationRules::default());
        assert!(!verdict.accepted);
        assert!(verdict.reason.starts_with("Error validating image:"));
    }

    #[test]
    fn test_custom_rules() {
        let rules = ValidationRules {
            allowed_extensions: vec![".tif".to_string()],
            min_dimension: 8,
            max_dimension: 16,
        };
        assert!(validate(&png(16, 16), "a.png", &rules).reason == FORMAT_MESSAGE);
        assert!(has_allowed_extension("brain.TIF", &rules.allowed_extensions));
    }

    #[test]
    fn test_dotless_rule_matches_whole_extension_only() {
        let allowed = vec!["png".to_string()];
        assert!(has_allowed_extension("scan.png", &allowed));
        assert!(!has_allowed_extension("scan.xpng", &allowed));
        assert!(!has_allowed_extension("scanpng", &allowed));
    }
}
