//! Image (OCR) extraction (§4.1).
//!
//! OCR itself is delegated to an `OcrEngine` so the core crate never links
//! a native Tesseract dependency directly; preprocessing (grayscale,
//! upscale, contrast, denoise, threshold) is done with the `image` crate
//! regardless of which engine is plugged in.
//!
//! Pixel geometry, not money, so float arithmetic is fine here.
#![allow(clippy::float_arithmetic)]

use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use serde_json::json;

use super::{validate_file, ExtractionError, Extractor, RawExtraction};

const EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "tiff", "tif"];
const MIME_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/jpg",
    "image/gif",
    "image/bmp",
    "image/tiff",
];

/// Minimum dimension (px) an image is upscaled to before OCR, mirroring a
/// ~300dpi scan of a typical receipt.
const MIN_DIMENSION: u32 = 1000;
const BINARY_THRESHOLD: u8 = 128;

/// Result of running OCR over a preprocessed image.
pub struct OcrOutput {
    pub text: String,
    /// Average per-word confidence in `[0, 1]`, or `0.0` if unavailable.
    pub confidence: f32,
}

/// Abstraction over an OCR backend, so the extractor can be unit tested
/// without a native Tesseract install and swapped for a remote OCR
/// provider in deployments that prefer one.
pub trait OcrEngine: Send + Sync {
    /// Runs OCR over a preprocessed grayscale image.
    ///
    /// # Errors
    ///
    /// Returns an error message on OCR engine failure.
    fn recognize(&self, image: &DynamicImage) -> Result<OcrOutput, String>;
}

/// A deterministic OCR stand-in for tests and environments without a
/// native OCR install: reports the image's pixel dimensions as "text" and
/// a fixed confidence, so pipeline wiring can be exercised without a real
/// OCR engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockOcrEngine;

impl OcrEngine for MockOcrEngine {
    fn recognize(&self, image: &DynamicImage) -> Result<OcrOutput, String> {
        let (w, h) = image.dimensions();
        Ok(OcrOutput {
            text: format!("[mock ocr output for {w}x{h} image]"),
            confidence: 0.5,
        })
    }
}

/// Extracts text from images via OCR, after standard preprocessing.
pub struct ImageExtractor<E: OcrEngine> {
    engine: E,
    max_size_bytes: u64,
}

impl<E: OcrEngine> ImageExtractor<E> {
    pub fn new(engine: E, max_size_bytes: u64) -> Self {
        Self {
            engine,
            max_size_bytes,
        }
    }

    /// Applies the same preprocessing pipeline as the original service:
    /// upscale small scans, grayscale, contrast boost, median denoise,
    /// binary threshold.
    fn preprocess(image: &DynamicImage) -> DynamicImage {
        let (width, height) = image.dimensions();

        let scaled = if width < MIN_DIMENSION || height < MIN_DIMENSION {
            let scale = f64::from(MIN_DIMENSION) / f64::from(width.min(height).max(1));
            let new_w = (f64::from(width) * scale).round() as u32;
            let new_h = (f64::from(height) * scale).round() as u32;
            image.resize(new_w, new_h, FilterType::Lanczos3)
        } else {
            image.clone()
        };

        let gray = scaled.grayscale();
        let contrasted = gray.adjust_contrast(40.0);
        let denoised = DynamicImage::ImageLuma8(image::imageops::median_filter(
            &contrasted.to_luma8(),
            1,
            1,
        ));

        let mut luma = denoised.to_luma8();
        for pixel in luma.pixels_mut() {
            pixel.0[0] = if pixel.0[0] > BINARY_THRESHOLD { 255 } else { 0 };
        }
        DynamicImage::ImageLuma8(luma)
    }
}

impl<E: OcrEngine> Extractor for ImageExtractor<E> {
    fn extensions(&self) -> &[&str] {
        EXTENSIONS
    }

    fn mime_types(&self) -> &[&str] {
        MIME_TYPES
    }

    fn extract(&self, path: &Path) -> Result<RawExtraction, ExtractionError> {
        validate_file(path, self.max_size_bytes)?;

        let original = image::open(path)
            .map_err(|e| ExtractionError::Failed(format!("could not open image: {e}")))?;
        let (width, height) = original.dimensions();

        let processed = Self::preprocess(&original);
        let ocr = self
            .engine
            .recognize(&processed)
            .map_err(|e| ExtractionError::Failed(format!("OCR failed: {e}")))?;

        let cleaned = ocr.text.trim().to_string();

        Ok(RawExtraction {
            raw_text: cleaned.clone(),
            structured_tables: Vec::new(),
            metadata: json!({
                "extraction_method": "ocr",
                "confidence_score": ocr.confidence,
                "word_count": cleaned.split_whitespace().count(),
                "preprocessing_applied": true,
                "width": width,
                "height": height,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::image::{ImageBuffer, Luma};

    fn sample_image(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageLuma8(ImageBuffer::from_fn(w, h, |x, y| {
            Luma([if (x + y) % 2 == 0 { 255 } else { 0 }])
        }))
    }

    #[test]
    fn preprocess_upscales_small_images() {
        let small = sample_image(100, 50);
        let processed = ImageExtractor::<MockOcrEngine>::preprocess(&small);
        let (w, h) = processed.dimensions();
        assert!(w >= MIN_DIMENSION || h >= MIN_DIMENSION);
    }

    #[test]
    fn can_handle_matches_extension() {
        let extractor = ImageExtractor::new(MockOcrEngine, 50 * 1024 * 1024);
        assert!(extractor.can_handle(Path::new("receipt.png"), "application/octet-stream"));
        assert!(!extractor.can_handle(Path::new("receipt.pdf"), "application/pdf"));
    }
}
