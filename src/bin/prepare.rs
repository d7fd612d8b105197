//! textgrab-prepare - warm the OCR model cache
//!
//! Downloads the neural detection and recognition models ahead of time so the
//! first `textgrab` run does not block on the network. Running it again is a
//! cheap no-op once the files are cached.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use textgrab::models::{DownloadProgress, ModelManager, REQUIRED_MODELS};

/// Pre-download the OCR models used by textgrab
#[derive(Parser, Debug)]
#[command(name = "textgrab-prepare", version)]
#[command(about = "Pre-download the OCR models used by textgrab")]
struct Args {
    /// Directory to store the model files (defaults to the platform data dir)
    #[arg(long)]
    models_dir: Option<PathBuf>,

    /// Re-download models even if they are already cached
    #[arg(long)]
    force: bool,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let manager = match args.models_dir {
        Some(dir) => ModelManager::with_dir(dir),
        None => ModelManager::new(),
    }?;

    println!("Preparing OCR models in {:?}", manager.models_dir());

    for kind in REQUIRED_MODELS {
        if args.force {
            std::fs::remove_file(manager.model_path(kind)).ok();
        }

        if manager.is_model_available(kind) {
            println!("{} model already cached", kind.display_name());
            continue;
        }

        println!(
            "Downloading {} model (this is a one-time setup)...",
            kind.display_name()
        );
        let progress: DownloadProgress = Box::new(move |downloaded, total| {
            debug!("{:?}: {} / {:?} bytes", kind, downloaded, total);
        });
        manager.download_model_with_progress(kind, Some(progress))?;
        println!("{} model ready", kind.display_name());
    }

    println!("All models cached. The first recognition will now be fast.");
    Ok(())
}
