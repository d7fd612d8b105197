//! textgrab - command-line OCR
//!
//! Reads an image from a path argument (or base64-encoded bytes on stdin),
//! recognizes its text with the available OCR backend, and prints exactly one
//! JSON line with the result.

use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use textgrab::config::{self, AppConfig};
use textgrab::error::OcrError;
use textgrab::input::ImageInput;
use textgrab::ocr::{Backend, Recognition};
use textgrab::output::{self, Response};

/// Extract text from an image and print it as a JSON line
#[derive(Parser, Debug)]
#[command(name = "textgrab", version)]
#[command(about = "Extract text from an image and print it as a JSON line")]
struct Args {
    /// Image to recognize; reads base64-encoded image bytes from stdin when omitted
    image: Option<PathBuf>,
}

fn main() {
    init_logging();
    let args = Args::parse();
    let config = load_or_default_config();

    match run(&args, &config) {
        Ok(recognition) => {
            output::emit(&Response::from_recognition(recognition));
        }
        Err(err) => {
            output::emit(&Response::from_error(&err));
            std::process::exit(err.exit_code());
        }
    }
}

/// Resolve a backend once, then perform the single recognition.
fn run(args: &Args, config: &AppConfig) -> Result<Recognition, OcrError> {
    let backend = Backend::select(&config.ocr, config.models.models_dir.as_deref())?;

    let input = match &args.image {
        Some(path) => ImageInput::Path(path.clone()),
        None => ImageInput::from_stdin()?,
    };

    backend.recognize(&input)
}

/// Logs go to stderr; stdout carries only the JSON result line.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load configuration from the config dir or fall back to defaults.
fn load_or_default_config() -> AppConfig {
    if let Ok(config_dir) = config::get_config_dir() {
        let config_path = config_dir.join("config.toml");
        if config_path.exists() {
            match config::load_config(&config_path) {
                Ok(config) => {
                    info!("loaded configuration from {:?}", config_path);
                    return config;
                }
                Err(err) => warn!("ignoring invalid config at {:?}: {err}", config_path),
            }
        }
    }
    AppConfig::default()
}
