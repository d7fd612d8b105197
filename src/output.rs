//! JSON output contract
//!
//! Exactly one line on stdout per invocation: either the recognized text with
//! its confidence, or a single error message. Logs never share this stream.

use serde::Serialize;
use tracing::error;

use crate::error::OcrError;
use crate::ocr::Recognition;

/// The single JSON object printed on stdout.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Response {
    Recognized { text: String, confidence: f64 },
    Failed { error: String },
}

impl Response {
    pub fn from_recognition(recognition: Recognition) -> Self {
        Response::Recognized {
            text: recognition.text,
            confidence: recognition.confidence,
        }
    }

    pub fn from_error(err: &OcrError) -> Self {
        Response::Failed {
            error: err.to_string(),
        }
    }
}

/// Print the response as one line on stdout.
pub fn emit(response: &Response) {
    match serde_json::to_string(response) {
        Ok(line) => println!("{line}"),
        Err(err) => {
            error!("failed to encode response: {err}");
            println!("{}", r#"{"error":"failed to encode OCR response"}"#);
        }
    }
}
