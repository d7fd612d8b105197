//! textgrab
//!
//! Thin adapter between process-level I/O (argv/stdin/stdout, base64, JSON) and
//! the OCR engines that do the actual reading: the ocrs neural engine when its
//! model files are available, Tesseract otherwise. Each process run performs
//! exactly one recognition.

pub mod config;
pub mod error;
pub mod input;
pub mod models;
pub mod ocr;
pub mod output;

pub use config::AppConfig;
pub use error::OcrError;
pub use input::ImageInput;
pub use models::{ModelKind, ModelManager};
pub use ocr::{Backend, Detection, Recognition};
pub use output::Response;
