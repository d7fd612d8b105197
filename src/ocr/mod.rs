//! OCR backends
//!
//! Text extraction is delegated to one of two engines, chosen once at startup:
//! the ocrs neural engine when its model files are usable, Tesseract otherwise.
//! Both CLI modes funnel into the single [`Backend::recognize`] operation.

pub mod classical;
pub mod neural;

use image::DynamicImage;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::OcrSettings;
use crate::error::{OcrError, Result};
use crate::input::ImageInput;

pub use classical::ClassicalOcr;
pub use neural::NeuralOcr;

/// Minimum characters (after trimming) for a result to count as detected text.
const MIN_TEXT_LEN: usize = 3;

/// One recognized fragment from the neural engine.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Recognized text
    pub text: String,
    /// Recognition confidence (0.0 - 1.0)
    pub confidence: f32,
}

/// Final result for the whole image.
#[derive(Debug, Clone)]
pub struct Recognition {
    /// Trimmed recognized text
    pub text: String,
    /// Mean confidence (0.0 - 1.0)
    pub confidence: f64,
}

/// The engine resolved at startup and passed into the recognition call as
/// configuration, never consulted as ambient state.
pub enum Backend {
    Neural(NeuralOcr),
    Classical(ClassicalOcr),
}

impl Backend {
    /// Pick an engine: neural first, Tesseract as fallback.
    pub fn select(settings: &OcrSettings, models_dir: Option<&Path>) -> Result<Self> {
        match NeuralOcr::load(settings, models_dir) {
            Ok(engine) => {
                info!("neural OCR backend ready");
                return Ok(Backend::Neural(engine));
            }
            Err(err) => warn!("neural OCR backend unavailable: {err}"),
        }

        match ClassicalOcr::new(settings) {
            Ok(engine) => {
                info!("Tesseract OCR backend ready");
                Ok(Backend::Classical(engine))
            }
            Err(err) => {
                warn!("Tesseract OCR backend unavailable: {err}");
                Err(OcrError::BackendUnavailable)
            }
        }
    }

    /// Recognize text in the given image source.
    ///
    /// A path is opened with one image-loading call. A byte buffer goes to the
    /// neural engine as-is first; if that fails, the buffer is decoded and the
    /// engine retried exactly once with the image object.
    pub fn recognize(&self, input: &ImageInput) -> Result<Recognition> {
        let (text, confidence) = match (self, input) {
            (Backend::Neural(engine), ImageInput::Path(path)) => {
                aggregate(&engine.recognize_image(&open_image(path)?)?)
            }
            (Backend::Neural(engine), ImageInput::Base64(_)) => {
                let bytes = input.bytes()?;
                let detections = match engine.recognize_bytes(&bytes) {
                    Ok(detections) => detections,
                    Err(err) => {
                        debug!("byte-buffer recognition failed ({err}), retrying with decoded image");
                        engine.recognize_image(&decode_image(&bytes)?)?
                    }
                };
                aggregate(&detections)
            }
            (Backend::Classical(engine), ImageInput::Path(path)) => {
                engine.recognize_image(&open_image(path)?)?
            }
            (Backend::Classical(engine), ImageInput::Base64(_)) => {
                engine.recognize_image(&decode_image(&input.bytes()?)?)?
            }
        };

        finish(text, confidence)
    }
}

fn open_image(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|e| OcrError::classify(e.to_string()))
}

fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| OcrError::classify(e.to_string()))
}

/// Join detection texts with single spaces, in engine order, and average their
/// confidences. Zero detections means confidence 0.
fn aggregate(detections: &[Detection]) -> (String, f64) {
    let text = detections
        .iter()
        .map(|d| d.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let confidence = if detections.is_empty() {
        0.0
    } else {
        detections.iter().map(|d| d.confidence as f64).sum::<f64>() / detections.len() as f64
    };

    (text, confidence)
}

/// Trim the final text and apply the minimum-length gate.
///
/// Short or empty text is reported as "no text detected" regardless of how
/// confident the engine was.
fn finish(text: String, confidence: f64) -> Result<Recognition> {
    let trimmed = text.trim();
    if trimmed.chars().count() < MIN_TEXT_LEN {
        return Err(OcrError::NoTextDetected);
    }

    Ok(Recognition {
        text: trimmed.to_string(),
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(text: &str, confidence: f32) -> Detection {
        Detection {
            text: text.to_string(),
            confidence,
        }
    }

    #[test]
    fn aggregate_joins_with_single_spaces_and_averages() {
        let detections = vec![detection("Hello", 0.9), detection("World", 0.8)];
        let (text, confidence) = aggregate(&detections);

        assert_eq!(text, "Hello World");
        assert!((confidence - 0.85).abs() < 1e-9);
    }

    #[test]
    fn aggregate_preserves_engine_order() {
        let detections = vec![detection("second", 0.5), detection("first", 0.5)];
        let (text, _) = aggregate(&detections);
        assert_eq!(text, "second first");
    }

    #[test]
    fn aggregate_of_nothing_is_zero_confidence() {
        let (text, confidence) = aggregate(&[]);
        assert_eq!(text, "");
        assert_eq!(confidence, 0.0);
    }

    #[test]
    fn finish_trims_and_keeps_confidence() {
        let recognition = finish("  Hello World \n".to_string(), 0.85).unwrap();
        assert_eq!(recognition.text, "Hello World");
        assert!((recognition.confidence - 0.85).abs() < 1e-9);
    }

    #[test]
    fn short_text_is_no_text_detected() {
        assert!(matches!(
            finish("hi".to_string(), 0.99),
            Err(OcrError::NoTextDetected)
        ));
        assert!(matches!(
            finish("  a  ".to_string(), 1.0),
            Err(OcrError::NoTextDetected)
        ));
    }

    #[test]
    fn empty_text_is_no_text_detected_even_at_full_confidence() {
        assert!(matches!(
            finish(String::new(), 1.0),
            Err(OcrError::NoTextDetected)
        ));
    }

    #[test]
    fn three_characters_pass_the_gate() {
        let recognition = finish("abc".to_string(), 0.5).unwrap();
        assert_eq!(recognition.text, "abc");
    }
}
