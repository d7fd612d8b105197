//! Error taxonomy
//!
//! The wrapped OCR engines expose no structured errors, so failures are
//! classified from their message text by an ordered list of substring rules.
//! The rules run top to bottom; the first match wins.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, OcrError>;

#[derive(Debug, Error)]
pub enum OcrError {
    /// No usable engine could be resolved at startup.
    #[error("No OCR library available. Run `textgrab-prepare` to download the recognition models or install Tesseract.")]
    BackendUnavailable,

    /// Engine failure mentioning CUDA or the GPU.
    #[error("GPU error. Please ensure CUDA is properly configured or use CPU mode.")]
    Configuration(String),

    /// Engine failure mentioning the model files or their download.
    #[error("OCR model download failed. Please check your internet connection and try again.")]
    ModelFetch(String),

    /// Anything else raised while decoding or recognizing.
    #[error("OCR processing error: {0}")]
    Processing(String),

    /// Semantic result, not a caught failure: the image produced no usable text.
    #[error("No text detected in image. Please ensure the image is clear and contains readable text.")]
    NoTextDetected,
}

impl OcrError {
    /// Classify a raw engine or decoder message.
    ///
    /// The CUDA/GPU match is case-sensitive, the model/download match is not;
    /// the raw message is retained on the variant for logging.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.contains("CUDA") || message.contains("GPU") {
            return OcrError::Configuration(message);
        }
        let lowered = message.to_lowercase();
        if lowered.contains("model") || lowered.contains("download") {
            return OcrError::ModelFetch(message);
        }
        OcrError::Processing(message)
    }

    /// Process exit status after this error has been reported as JSON.
    ///
    /// "No text detected" is printed as an error object but still exits 0.
    pub fn exit_code(&self) -> i32 {
        match self {
            OcrError::NoTextDetected => 0,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuda_message_classifies_as_gpu_error() {
        let err = OcrError::classify("CUDA out of memory");
        assert!(matches!(err, OcrError::Configuration(_)));
        assert_eq!(
            err.to_string(),
            "GPU error. Please ensure CUDA is properly configured or use CPU mode."
        );
    }

    #[test]
    fn gpu_match_is_case_sensitive() {
        // "cuda" does not hit the first rule and falls through to the catch-all
        let err = OcrError::classify("cuda unavailable");
        assert!(matches!(err, OcrError::Processing(_)));
    }

    #[test]
    fn model_and_download_match_any_case() {
        assert!(matches!(
            OcrError::classify("Model weights missing"),
            OcrError::ModelFetch(_)
        ));
        assert!(matches!(
            OcrError::classify("failed to DOWNLOAD weights"),
            OcrError::ModelFetch(_)
        ));
    }

    #[test]
    fn gpu_rule_wins_over_model_rule() {
        let err = OcrError::classify("CUDA kernel for model missing");
        assert!(matches!(err, OcrError::Configuration(_)));
    }

    #[test]
    fn unmatched_message_embeds_raw_text() {
        let err = OcrError::classify("No such file or directory (os error 2)");
        assert_eq!(
            err.to_string(),
            "OCR processing error: No such file or directory (os error 2)"
        );
    }

    #[test]
    fn only_no_text_detected_exits_zero() {
        assert_eq!(OcrError::NoTextDetected.exit_code(), 0);
        assert_eq!(OcrError::BackendUnavailable.exit_code(), 1);
        assert_eq!(OcrError::classify("boom").exit_code(), 1);
        assert_eq!(OcrError::classify("CUDA").exit_code(), 1);
    }
}
