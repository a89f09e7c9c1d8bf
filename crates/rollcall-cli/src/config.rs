use anyhow::{Context, Result};
use rollcall_core::{detector, liveness, matcher, verifier};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Runtime configuration.
///
/// Layered: built-in defaults, then an optional TOML file, then
/// `ROLLCALL_*` environment variables, then command-line flags.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Directory of reference images, one per known person.
    pub images_dir: PathBuf,
    /// Attendance CSV file.
    pub attendance_log: PathBuf,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// Exclusive upper bound on verification distance for a match.
    pub match_threshold: f32,
    /// Cosine distance at or below which ArcFace calls two faces the same.
    pub verify_threshold: f32,
    /// Minimum SCRFD detection score.
    pub detector_confidence: f32,
    /// Liveness: face box area must exceed this many pixels.
    pub liveness_min_area: u64,
    /// Liveness: both crop sides must exceed this many pixels.
    pub liveness_min_side: u32,
    /// Frames to discard at startup while the camera settles.
    pub warmup_frames: usize,
    /// TrueType font for overlay labels, replacing the bundled DejaVu Sans.
    pub font_path: Option<PathBuf>,
    /// Run without a window (no ESC key; stop with `max_frames` or end of stream).
    pub headless: bool,
    /// Stop after this many frames.
    pub max_frames: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera_device: rollcall_hw::camera::device_path(0),
            images_dir: PathBuf::from("images"),
            attendance_log: PathBuf::from("attendance.csv"),
            model_dir: rollcall_core::default_model_dir(),
            match_threshold: matcher::DEFAULT_MATCH_THRESHOLD,
            verify_threshold: verifier::DEFAULT_VERIFY_THRESHOLD,
            detector_confidence: detector::DEFAULT_CONFIDENCE,
            liveness_min_area: liveness::DEFAULT_MIN_AREA,
            liveness_min_side: liveness::DEFAULT_MIN_SIDE,
            warmup_frames: 0,
            font_path: None,
            headless: false,
            max_frames: None,
        }
    }
}

impl Config {
    /// Defaults, overlaid with `file` (if given) and the environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut config = match file {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Apply `ROLLCALL_*` overrides. Unparseable values are ignored with a warning.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("ROLLCALL_CAMERA_DEVICE") {
            self.camera_device = v;
        }
        if let Some(v) = var("ROLLCALL_IMAGES_DIR") {
            self.images_dir = PathBuf::from(v);
        }
        if let Some(v) = var("ROLLCALL_ATTENDANCE_LOG") {
            self.attendance_log = PathBuf::from(v);
        }
        if let Some(v) = var("ROLLCALL_MODEL_DIR") {
            self.model_dir = PathBuf::from(v);
        }
        if let Some(v) = var("ROLLCALL_FONT_PATH") {
            self.font_path = (!v.is_empty()).then(|| PathBuf::from(v));
        }
        parse_into(&var, "ROLLCALL_MATCH_THRESHOLD", &mut self.match_threshold);
        parse_into(&var, "ROLLCALL_VERIFY_THRESHOLD", &mut self.verify_threshold);
        parse_into(&var, "ROLLCALL_DETECTOR_CONFIDENCE", &mut self.detector_confidence);
        parse_into(&var, "ROLLCALL_LIVENESS_MIN_AREA", &mut self.liveness_min_area);
        parse_into(&var, "ROLLCALL_LIVENESS_MIN_SIDE", &mut self.liveness_min_side);
        parse_into(&var, "ROLLCALL_WARMUP_FRAMES", &mut self.warmup_frames);
        if let Some(v) = var("ROLLCALL_HEADLESS") {
            self.headless = v != "0";
        }
        if let Some(v) = var("ROLLCALL_MAX_FRAMES") {
            match v.parse() {
                Ok(n) => self.max_frames = Some(n),
                Err(_) => tracing::warn!(value = %v, "ignoring invalid ROLLCALL_MAX_FRAMES"),
            }
        }
    }

    /// Path to the SCRFD detection model.
    pub fn detector_model_path(&self) -> PathBuf {
        self.model_dir.join(rollcall_core::DETECTOR_MODEL_FILE)
    }

    /// Path to the ArcFace recognition model.
    pub fn recognizer_model_path(&self) -> PathBuf {
        self.model_dir.join(rollcall_core::RECOGNIZER_MODEL_FILE)
    }
}

fn parse_into<T: FromStr>(var: &impl Fn(&str) -> Option<String>, key: &str, slot: &mut T) {
    let Some(raw) = var(key) else {
        return;
    };
    match raw.parse() {
        Ok(value) => *slot = value,
        Err(_) => tracing::warn!(key, value = %raw, "ignoring unparseable environment override"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.camera_device, "/dev/video0");
        assert_eq!(config.images_dir, PathBuf::from("images"));
        assert_eq!(config.attendance_log, PathBuf::from("attendance.csv"));
        assert_eq!(config.match_threshold, 0.35);
        assert_eq!(config.liveness_min_area, 8000);
        assert_eq!(config.liveness_min_side, 80);
        assert!(!config.headless);
        assert_eq!(config.font_path, None);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env(env(&[
            ("ROLLCALL_CAMERA_DEVICE", "/dev/video4"),
            ("ROLLCALL_MATCH_THRESHOLD", "0.3"),
            ("ROLLCALL_HEADLESS", "1"),
            ("ROLLCALL_MAX_FRAMES", "25"),
            ("ROLLCALL_FONT_PATH", "/opt/fonts/label.ttf"),
        ]));
        assert_eq!(config.camera_device, "/dev/video4");
        assert_eq!(config.match_threshold, 0.3);
        assert!(config.headless);
        assert_eq!(config.max_frames, Some(25));
        assert_eq!(config.font_path, Some(PathBuf::from("/opt/fonts/label.ttf")));
    }

    #[test]
    fn test_bad_env_value_keeps_default() {
        let mut config = Config::default();
        config.apply_env(env(&[("ROLLCALL_LIVENESS_MIN_SIDE", "wide")]));
        assert_eq!(config.liveness_min_side, 80);
    }

    #[test]
    fn test_toml_file_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rollcall.toml");
        std::fs::write(&path, "images_dir = \"faces\"\nwarmup_frames = 4\n").unwrap();

        let config = Config::from_toml_file(&path).unwrap();
        assert_eq!(config.images_dir, PathBuf::from("faces"));
        assert_eq!(config.warmup_frames, 4);
        assert_eq!(config.attendance_log, PathBuf::from("attendance.csv"));
    }

    #[test]
    fn test_toml_unknown_key_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rollcall.toml");
        std::fs::write(&path, "camera = 0\n").unwrap();
        assert!(Config::from_toml_file(&path).is_err());
    }

    #[test]
    fn test_model_paths() {
        let config = Config { model_dir: PathBuf::from("/opt/models"), ..Config::default() };
        assert_eq!(config.detector_model_path(), PathBuf::from("/opt/models/det_10g.onnx"));
        assert_eq!(config.recognizer_model_path(), PathBuf::from("/opt/models/w600k_r50.onnx"));
    }
}
