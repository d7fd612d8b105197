//! Classical OCR backend
//!
//! Drives a Tesseract installation through rusty_tesseract, keeping the
//! engine's two-call shape: one pass for the free-form text, a second
//! data-extraction pass for the per-word confidences.

use image::DynamicImage;
use rusty_tesseract::{Args, Image};
use tracing::debug;

use crate::config::OcrSettings;
use crate::error::{OcrError, Result};

pub struct ClassicalOcr {
    args: Args,
}

impl ClassicalOcr {
    /// Probe the Tesseract installation and fix the language set.
    pub fn new(settings: &OcrSettings) -> Result<Self> {
        let version = rusty_tesseract::get_tesseract_version()
            .map_err(|e| OcrError::classify(e.to_string()))?;
        debug!(?version, "Tesseract detected");

        let args = Args {
            lang: settings.languages.join("+"),
            ..Args::default()
        };

        Ok(Self { args })
    }

    /// Whole-image text plus the mean of the per-word confidences.
    pub fn recognize_image(&self, image: &DynamicImage) -> Result<(String, f64)> {
        let img =
            Image::from_dynamic_image(image).map_err(|e| OcrError::classify(e.to_string()))?;

        let text = rusty_tesseract::image_to_string(&img, &self.args)
            .map_err(|e| OcrError::classify(e.to_string()))?;

        let data = rusty_tesseract::image_to_data(&img, &self.args)
            .map_err(|e| OcrError::classify(e.to_string()))?;
        let confidences: Vec<f32> = data.data.iter().map(|record| record.conf).collect();

        Ok((text, mean_word_confidence(&confidences)))
    }
}

/// Mean of the positive 0-100 confidences, scaled to [0, 1].
///
/// Tesseract reports -1 for structural rows and 0 for rejected words; both are
/// dropped before averaging.
fn mean_word_confidence(confidences: &[f32]) -> f64 {
    let kept: Vec<f64> = confidences
        .iter()
        .filter(|conf| **conf > 0.0)
        .map(|conf| *conf as f64)
        .collect();

    if kept.is_empty() {
        return 0.0;
    }

    kept.iter().sum::<f64>() / kept.len() as f64 / 100.0
}
