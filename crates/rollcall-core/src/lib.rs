//! rollcall-core — Webcam attendance engine.
//!
//! Detects faces with SCRFD, verifies them against known reference images
//! with ArcFace (both via ONNX Runtime), and records each person's first
//! sighting per session in a CSV attendance log.

pub mod alignment;
pub mod capture;
pub mod detector;
pub mod ledger;
pub mod liveness;
pub mod matcher;
pub mod recognizer;
pub mod references;
pub mod render;
pub mod session;
pub mod tracker;
pub mod types;
pub mod verifier;

pub use capture::{CaptureError, CaptureLoop, Clock, FrameSink, FrameSource, LocalClock, LoopSummary, StopReason};
pub use detector::{Detector, DetectorError, ScrfdDetector};
pub use ledger::{AttendanceLog, AttendanceRecord, LedgerError};
pub use liveness::LivenessGate;
pub use matcher::{DistanceMatcher, MatchResult};
pub use recognizer::{Embedder, FaceRecognizer, RecognizerError};
pub use references::{ReferenceEntry, ReferenceError, ReferenceStore};
pub use render::Renderer;
pub use session::{AttendanceSession, FaceOutcome, FrameReport, MatchStatus};
pub use tracker::SessionTracker;
pub use types::{BoundingBox, Embedding, FaceRegion};
pub use verifier::{ArcFaceVerifier, Verification, Verifier, VerifyError};

use std::path::PathBuf;

/// File name of the SCRFD detection model inside the model directory.
pub const DETECTOR_MODEL_FILE: &str = "det_10g.onnx";
/// File name of the ArcFace recognition model inside the model directory.
pub const RECOGNIZER_MODEL_FILE: &str = "w600k_r50.onnx";

/// `$XDG_DATA_HOME/rollcall/models`, falling back to `~/.local/share`.
pub fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("rollcall/models")
}
