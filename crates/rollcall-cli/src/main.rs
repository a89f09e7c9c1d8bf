use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rollcall_core::ledger::read_records;
use rollcall_core::{
    ArcFaceVerifier, AttendanceLog, AttendanceSession, CaptureLoop, DistanceMatcher, FaceRecognizer,
    LivenessGate, LocalClock, ReferenceStore, Renderer, ScrfdDetector,
};
use rollcall_hw::Camera;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;
mod display;
mod source;

use config::Config;
use display::{Sink, WindowSink};
use source::CameraSource;

#[derive(Parser)]
#[command(name = "rollcall", about = "Webcam attendance: mark each known face once per session")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Camera device path (e.g. /dev/video0)
    #[arg(long, global = true)]
    camera: Option<String>,

    /// Directory of reference images
    #[arg(long, global = true)]
    images: Option<PathBuf>,

    /// Attendance CSV file
    #[arg(long, global = true)]
    log: Option<PathBuf>,

    /// Directory containing det_10g.onnx and w600k_r50.onnx
    #[arg(long, global = true)]
    models: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the attendance loop (default)
    Run {
        /// Do not open a window
        #[arg(long)]
        headless: bool,
        /// Stop after this many frames
        #[arg(long)]
        max_frames: Option<u64>,
    },
    /// List loaded reference images
    References {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print rows recorded in the attendance log
    History,
    /// List V4L2 capture devices
    Devices,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(camera) = cli.camera {
        config.camera_device = camera;
    }
    if let Some(images) = cli.images {
        config.images_dir = images;
    }
    if let Some(log) = cli.log {
        config.attendance_log = log;
    }
    if let Some(models) = cli.models {
        config.model_dir = models;
    }

    match cli.command.unwrap_or(Commands::Run { headless: false, max_frames: None }) {
        Commands::Run { headless, max_frames } => {
            config.headless |= headless;
            config.max_frames = max_frames.or(config.max_frames);
            run(&config)
        }
        Commands::References { json } => list_references(&config, json),
        Commands::History => history(&config),
        Commands::Devices => {
            list_devices();
            Ok(())
        }
    }
}

fn run(config: &Config) -> Result<()> {
    tracing::debug!(?config, "configuration");

    let references = ReferenceStore::load(&config.images_dir)?;
    let log = AttendanceLog::open(&config.attendance_log)?;

    let detector = ScrfdDetector::load(&config.detector_model_path(), config.detector_confidence)?;
    let verifier = ArcFaceVerifier::new(
        ScrfdDetector::load(&config.detector_model_path(), config.detector_confidence)?,
        FaceRecognizer::load(&config.recognizer_model_path())?,
        config.verify_threshold,
    );

    let mut session = AttendanceSession::new(
        detector,
        verifier,
        references,
        DistanceMatcher {
            threshold: config.match_threshold,
        },
        LivenessGate {
            min_area: config.liveness_min_area,
            min_side: config.liveness_min_side,
        },
        log,
    );

    let camera = Camera::open(&config.camera_device)?;
    let mut stream = camera.stream()?;
    if config.warmup_frames > 0 {
        tracing::info!(count = config.warmup_frames, "discarding warmup frames");
        stream.skip(config.warmup_frames);
    }

    let sink = if config.headless {
        Sink::Headless
    } else {
        Sink::Window(WindowSink::open(camera.width, camera.height)?)
    };

    println!("Press ESC to quit.");
    let summary = {
        let mut capture = CaptureLoop::new(CameraSource::new(stream), sink, LocalClock, load_renderer(config))
            .with_max_frames(config.max_frames);
        capture.run(&mut session)?
    };

    tracing::info!(
        frames = summary.frames,
        frames_without_faces = summary.frames_without_faces,
        marked = ?summary.marked,
        stop = ?summary.stop,
        log = %config.attendance_log.display(),
        "session finished"
    );
    Ok(())
}

/// The bundled font unless `font_path` names a readable replacement.
fn load_renderer(config: &Config) -> Renderer {
    let Some(path) = &config.font_path else {
        return Renderer::default();
    };
    let renderer = std::fs::read(path)
        .map_err(anyhow::Error::from)
        .and_then(|bytes| Renderer::with_font_bytes(bytes).map_err(anyhow::Error::from));
    match renderer {
        Ok(renderer) => renderer,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "overlay font unavailable; using bundled font");
            Renderer::default()
        }
    }
}

fn list_references(config: &Config, json: bool) -> Result<()> {
    let store = ReferenceStore::load(&config.images_dir)?;

    if json {
        let entries: Vec<_> = store
            .iter()
            .map(|e| {
                serde_json::json!({
                    "name": e.name,
                    "width": e.image.width(),
                    "height": e.image.height(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if store.is_empty() {
        println!("No reference images in {}", config.images_dir.display());
    }
    for entry in store.iter() {
        println!("{:<24} {}x{}", entry.name, entry.image.width(), entry.image.height());
    }
    Ok(())
}

fn history(config: &Config) -> Result<()> {
    let path = &config.attendance_log;
    if !path.exists() {
        println!("No attendance log at {}", path.display());
        return Ok(());
    }
    let records = read_records(path).with_context(|| format!("reading {}", path.display()))?;
    for record in &records {
        println!("{:<24} {}", record.name, record.time);
    }
    println!("{} record(s)", records.len());
    Ok(())
}

fn list_devices() {
    let devices = Camera::list_devices();
    if devices.is_empty() {
        println!("No V4L2 capture devices found");
    }
    for device in devices {
        println!("{}  {} ({}, {})", device.path, device.name, device.driver, device.bus);
    }
}
