//! Neural OCR backend
//!
//! Wraps the ocrs engine (rten text detection + recognition models). Model
//! files are fetched through the model manager on first use; `textgrab-prepare`
//! warms the cache ahead of time so that first run is fast.

use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
use rten::Model;
use std::path::Path;
use tracing::{debug, warn};

use super::Detection;
use crate::config::OcrSettings;
use crate::error::{OcrError, Result};
use crate::models::{ModelKind, ModelManager};

pub struct NeuralOcr {
    engine: OcrEngine,
}

impl NeuralOcr {
    /// Load the engine, downloading the model files if they are not cached.
    pub fn load(settings: &OcrSettings, models_dir: Option<&Path>) -> Result<Self> {
        if settings.use_gpu {
            // No GPU execution provider in this engine.
            warn!("GPU execution requested; the neural engine runs on CPU");
        }
        if let Some(lang) = settings
            .languages
            .iter()
            .find(|l| l.as_str() != "eng" && l.as_str() != "en")
        {
            debug!("neural engine reads Latin script only; ignoring language {lang}");
        }

        let models = match models_dir {
            Some(dir) => ModelManager::with_dir(dir.to_path_buf()),
            None => ModelManager::new(),
        }
        .map_err(|e| OcrError::classify(format!("{e:#}")))?;

        let detection_path = models
            .ensure_model(ModelKind::Detection)
            .map_err(|e| OcrError::classify(format!("{e:#}")))?;
        let recognition_path = models
            .ensure_model(ModelKind::Recognition)
            .map_err(|e| OcrError::classify(format!("{e:#}")))?;

        let detection_model =
            Model::load_file(&detection_path).map_err(|e| OcrError::classify(e.to_string()))?;
        let recognition_model =
            Model::load_file(&recognition_path).map_err(|e| OcrError::classify(e.to_string()))?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|e| OcrError::classify(e.to_string()))?;

        Ok(Self { engine })
    }

    /// Feed the engine the raw byte buffer; the buffer is decoded in place.
    pub fn recognize_bytes(&self, bytes: &[u8]) -> Result<Vec<Detection>> {
        let image =
            image::load_from_memory(bytes).map_err(|e| OcrError::classify(e.to_string()))?;
        self.recognize_image(&image)
    }

    /// Run detection + recognition on a decoded image.
    ///
    /// Detections come back in the engine's own order and are not re-sorted.
    pub fn recognize_image(&self, image: &DynamicImage) -> Result<Vec<Detection>> {
        let rgb = image.to_rgb8();
        let source = ImageSource::from_bytes(rgb.as_raw(), rgb.dimensions())
            .map_err(|e| OcrError::classify(e.to_string()))?;
        let ocr_input = self
            .engine
            .prepare_input(source)
            .map_err(|e| OcrError::classify(e.to_string()))?;

        let word_rects = self
            .engine
            .detect_words(&ocr_input)
            .map_err(|e| OcrError::classify(e.to_string()))?;
        let line_rects = self.engine.find_text_lines(&ocr_input, &word_rects);
        let line_texts = self
            .engine
            .recognize_text(&ocr_input, &line_rects)
            .map_err(|e| OcrError::classify(e.to_string()))?;

        let detections = line_texts
            .into_iter()
            .flatten()
            .map(|line| Detection {
                text: line.to_string(),
                // ocrs does not surface per-line scores
                confidence: 1.0,
            })
            .filter(|d| !d.text.trim().is_empty())
            .collect();

        Ok(detections)
    }
}
