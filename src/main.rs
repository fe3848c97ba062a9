//! cnic-capture: guided identity-document capture and extraction
//!
//! Drives a live frame loop: the operator aligns the card inside a fixed
//! guide rectangle, triggers a capture, and the pipeline crops the
//! document, extracts the face photo and the printed text fields, and
//! stores the record with duplicate protection.

mod analysis;
mod capture;
mod config;
mod shared;
mod storage;
mod vision;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::analysis::FieldExtractor;
use crate::capture::{
    run_session, stdin_triggers, CapturePipeline, CaptureState, ImageSequenceCamera,
};
use crate::config::AppConfig;
use crate::shared::{new_shared_status, SharedStatus};
use crate::storage::RecordStore;
use crate::vision::{FaceExtractor, SidecarFaceDetector, SidecarRecognizer};

/// Guided CNIC capture with OCR field extraction
#[derive(Parser, Debug)]
#[command(name = "cnic-capture")]
#[command(about = "Guided CNIC capture with OCR field extraction and duplicate-safe storage")]
struct Args {
    /// Directory of frame images replayed as the camera source
    #[arg(short, long)]
    frames: PathBuf,

    /// Directory of recognizer sidecar files (defaults to the frames directory)
    #[arg(long)]
    sidecars: Option<PathBuf>,

    /// Database path (defaults to records.db in the data directory)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Disable face extraction for this session
    #[arg(long)]
    no_face: bool,

    /// Disable database persistence for this session
    #[arg(long)]
    no_store: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let mut config = load_or_create_config(args.config.as_deref())?;
    if args.no_face {
        config.capture.extract_face = false;
    }
    if args.no_store {
        config.capture.persist = false;
    }
    if let Some(path) = args.database {
        config.storage.database_path = Some(path);
    }

    info!("cnic-capture starting");
    info!("Controls: 'c' + Enter to capture, 'q' + Enter to quit");

    let sidecar_dir = args.sidecars.clone().unwrap_or_else(|| args.frames.clone());

    // Camera and engine collaborators
    let camera = ImageSequenceCamera::new(&args.frames)?;
    let recognizer = SidecarRecognizer::new(&sidecar_dir, config.ocr.min_confidence)?;

    let mut pipeline = CapturePipeline::new(
        Box::new(recognizer),
        FieldExtractor::new(&config.ocr.country),
    );

    if config.capture.extract_face {
        let detector = SidecarFaceDetector::new(&sidecar_dir)?;
        pipeline = pipeline.with_face_extraction(
            FaceExtractor::new(Box::new(detector)),
            config.storage.face_image_path.clone(),
        );
    }

    if config.capture.persist {
        let db_path = match &config.storage.database_path {
            Some(path) => path.clone(),
            None => storage::get_data_dir()?.join("records.db"),
        };
        let store = RecordStore::open(&db_path)
            .with_context(|| format!("Failed to open record store at {:?}", db_path))?;
        pipeline = pipeline.with_store(store);
    }

    let status = new_shared_status();
    spawn_status_reporter(SharedStatus::clone(&status));

    let triggers = stdin_triggers();
    let summary = run_session(Box::new(camera), triggers, &config, pipeline, status)?;

    info!(
        "Session complete: {} frames, {} captures, {} records saved",
        summary.frames, summary.captures, summary.records_saved
    );

    Ok(())
}

/// Load configuration: an explicit path must parse, the default location
/// falls back to defaults
fn load_or_create_config(path: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = path {
        let config = config::load_config(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?;
        info!("Loaded configuration from {:?}", path);
        return Ok(config);
    }

    if let Ok(config_dir) = storage::get_config_dir() {
        let config_path = config_dir.join("config.toml");
        if config_path.exists() {
            if let Ok(config) = config::load_config(&config_path) {
                info!("Loaded configuration from {:?}", config_path);
                return Ok(config);
            }
        }
    }

    info!("Using default configuration");
    Ok(AppConfig::default())
}

/// Periodically log the shared session status for the operator.
///
/// Stands in for the on-screen display layer: it only reads the shared
/// state and never feeds back into capture decisions.
fn spawn_status_reporter(status: SharedStatus) {
    std::thread::spawn(move || loop {
        std::thread::sleep(Duration::from_secs(2));

        let snapshot = status.read().clone();
        if snapshot.state == CaptureState::Terminated {
            break;
        }

        let alignment = if snapshot.aligned {
            "card aligned - press 'c' to capture"
        } else {
            "align card fully inside the guide"
        };
        info!(
            "Status: {} | sharpness {:.2} | {} frames | {} records",
            alignment, snapshot.sharpness, snapshot.frames_seen, snapshot.records_saved
        );
    });
}
