//! Image input sources
//!
//! The tool accepts either a filesystem path argument or base64-encoded image
//! bytes piped on stdin; the two modes are mutually exclusive and chosen by the
//! presence of the argument.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::io::Read;
use std::path::PathBuf;

use crate::error::{OcrError, Result};

/// Where the image comes from.
#[derive(Debug, Clone)]
pub enum ImageInput {
    /// Filesystem path given as the CLI argument.
    Path(PathBuf),
    /// Base64 payload read from stdin.
    Base64(String),
}

impl ImageInput {
    /// Read a base64 payload from stdin until end-of-stream.
    pub fn from_stdin() -> Result<Self> {
        let mut payload = String::new();
        std::io::stdin()
            .read_to_string(&mut payload)
            .map_err(|e| OcrError::classify(e.to_string()))?;
        Ok(ImageInput::Base64(payload))
    }

    /// Resolve the source to raw encoded image bytes.
    ///
    /// Stray whitespace in the base64 payload is dropped before decoding, so
    /// line-wrapped input (e.g. `base64 file.png | textgrab`) works.
    pub fn bytes(&self) -> Result<Vec<u8>> {
        match self {
            ImageInput::Path(path) => {
                std::fs::read(path).map_err(|e| OcrError::classify(e.to_string()))
            }
            ImageInput::Base64(payload) => {
                let compact: String = payload.split_whitespace().collect();
                STANDARD
                    .decode(compact)
                    .map_err(|e| OcrError::classify(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn decodes_valid_base64() {
        let payload = STANDARD.encode(b"not really an image");
        let input = ImageInput::Base64(payload);
        assert_eq!(input.bytes().unwrap(), b"not really an image");
    }

    #[test]
    fn decodes_line_wrapped_base64() {
        let payload = STANDARD.encode(vec![7u8; 120]);
        let wrapped: String = payload
            .as_bytes()
            .chunks(16)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect::<Vec<_>>()
            .join("\n");
        let input = ImageInput::Base64(format!("{wrapped}\n"));
        assert_eq!(input.bytes().unwrap(), vec![7u8; 120]);
    }

    #[test]
    fn corrupt_base64_is_a_processing_error() {
        let input = ImageInput::Base64("this is not base64!!!".to_string());
        let err = input.bytes().unwrap_err();
        assert!(matches!(err, OcrError::Processing(_)));
    }

    #[test]
    fn missing_file_is_a_processing_error() {
        let input = ImageInput::Path(PathBuf::from("/nonexistent/image.png"));
        let err = input.bytes().unwrap_err();
        assert!(matches!(err, OcrError::Processing(_)));
    }

    #[test]
    fn reads_file_bytes() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"\x89PNG").unwrap();
        let input = ImageInput::Path(file.path().to_path_buf());
        assert_eq!(input.bytes().unwrap(), b"\x89PNG");
    }
}
