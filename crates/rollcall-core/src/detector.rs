//! Face detection: the [`Detector`] seam and its SCRFD backend.
//!
//! SCRFD (Sample and Computation Redistribution for Efficient Face Detection)
//! runs via ONNX Runtime with 3-stride anchor-free decoding and NMS.

use crate::types::BoundingBox;
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const SCRFD_INPUT_SIZE: u32 = 640;
const SCRFD_MEAN: f32 = 127.5;
const SCRFD_STD: f32 = 128.0;
const SCRFD_NMS_THRESHOLD: f32 = 0.4;
const SCRFD_STRIDES: [usize; 3] = [8, 16, 32];
const SCRFD_ANCHORS_PER_CELL: usize = 2;

/// Default minimum detection score.
pub const DEFAULT_CONFIDENCE: f32 = 0.5;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0} — download from insightface and place in the model directory")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("empty image")]
    EmptyImage,
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Finds face regions in an image.
///
/// Returning an empty list is not an error; callers decide what "no face"
/// means for them.
pub trait Detector {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<BoundingBox>, DetectorError>;
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<BoundingBox>, DetectorError> {
        (**self).detect(image)
    }
}

/// Maps letterboxed model coordinates back to the source image.
#[derive(Debug, Clone, Copy)]
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

impl Letterbox {
    fn fit(width: u32, height: u32, target: u32) -> Self {
        let scale = (target as f32 / width as f32).min(target as f32 / height as f32);
        let new_w = (width as f32 * scale).round();
        let new_h = (height as f32 * scale).round();
        Self {
            scale,
            pad_x: ((target as f32 - new_w) / 2.0).floor(),
            pad_y: ((target as f32 - new_h) / 2.0).floor(),
        }
    }

    fn unmap(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// Output tensor indices for one stride: (score_idx, bbox_idx, kps_idx).
type StrideOutputIndices = (usize, usize, usize);

/// SCRFD-based face detector.
pub struct ScrfdDetector {
    session: Session,
    confidence: f32,
    /// Per-stride output indices for strides [8, 16, 32].
    stride_indices: [StrideOutputIndices; 3],
}

impl ScrfdDetector {
    /// Load the SCRFD ONNX model from the given path.
    pub fn load(model_path: &Path, confidence: f32) -> Result<Self, DetectorError> {
        if !model_path.exists() {
            return Err(DetectorError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        let output_names: Vec<String> = session.outputs().iter().map(|o| o.name().to_string()).collect();

        tracing::info!(
            path = %model_path.display(),
            outputs = ?output_names,
            "loaded SCRFD model"
        );

        if output_names.len() < 9 {
            return Err(DetectorError::InferenceFailed(format!(
                "SCRFD model requires 9 outputs (3 strides × score/bbox/kps), got {}",
                output_names.len()
            )));
        }

        let stride_indices = discover_output_indices(&output_names);
        tracing::debug!(?stride_indices, "SCRFD output tensor mapping");

        Ok(Self {
            session,
            confidence,
            stride_indices,
        })
    }

    /// Letterbox an RGB image into a normalized 1×3×640×640 tensor.
    fn preprocess(image: &RgbImage) -> (Array4<f32>, Letterbox) {
        let letterbox = Letterbox::fit(image.width(), image.height(), SCRFD_INPUT_SIZE);
        let new_w = ((image.width() as f32 * letterbox.scale).round() as u32).max(1);
        let new_h = ((image.height() as f32 * letterbox.scale).round() as u32).max(1);
        let resized = imageops::resize(image, new_w, new_h, FilterType::Triangle);

        let size = SCRFD_INPUT_SIZE as usize;
        // Padding is zero after normalization, i.e. SCRFD_MEAN.
        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
        let (off_x, off_y) = (letterbox.pad_x as usize, letterbox.pad_y as usize);

        for (x, y, pixel) in resized.enumerate_pixels() {
            let (tx, ty) = (x as usize + off_x, y as usize + off_y);
            if tx >= size || ty >= size {
                continue;
            }
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = (pixel[c] as f32 - SCRFD_MEAN) / SCRFD_STD;
            }
        }

        (tensor, letterbox)
    }
}

impl Detector for ScrfdDetector {
    /// Detect faces, returning boxes sorted by descending confidence.
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<BoundingBox>, DetectorError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(DetectorError::EmptyImage);
        }

        let (input, letterbox) = Self::preprocess(image);
        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let mut candidates = Vec::new();
        for (pos, &stride) in SCRFD_STRIDES.iter().enumerate() {
            let (score_idx, bbox_idx, kps_idx) = self.stride_indices[pos];
            let extract = |idx: usize, what: &str| {
                outputs[idx]
                    .try_extract_tensor::<f32>()
                    .map(|(_, data)| data)
                    .map_err(|e| DetectorError::InferenceFailed(format!("{what} stride {stride}: {e}")))
            };

            let tensors = StrideTensors {
                scores: extract(score_idx, "scores")?,
                bboxes: extract(bbox_idx, "bboxes")?,
                kps: extract(kps_idx, "kps")?,
            };
            candidates.extend(tensors.decode(stride, &letterbox, self.confidence));
        }

        Ok(nms(candidates, SCRFD_NMS_THRESHOLD))
    }
}

/// Raw per-stride network outputs.
struct StrideTensors<'a> {
    scores: &'a [f32],
    bboxes: &'a [f32],
    kps: &'a [f32],
}

impl StrideTensors<'_> {
    fn decode(&self, stride: usize, letterbox: &Letterbox, threshold: f32) -> Vec<BoundingBox> {
        let grid = SCRFD_INPUT_SIZE as usize / stride;
        let num_anchors = grid * grid * SCRFD_ANCHORS_PER_CELL;
        let s = stride as f32;

        (0..num_anchors)
            .filter_map(|idx| {
                let score = self.scores.get(idx).copied()?;
                if score <= threshold {
                    return None;
                }

                let cell = idx / SCRFD_ANCHORS_PER_CELL;
                let anchor_x = (cell % grid) as f32 * s;
                let anchor_y = (cell / grid) as f32 * s;

                let d = self.bboxes.get(idx * 4..idx * 4 + 4)?;
                let (x1, y1) = letterbox.unmap(anchor_x - d[0] * s, anchor_y - d[1] * s);
                let (x2, y2) = letterbox.unmap(anchor_x + d[2] * s, anchor_y + d[3] * s);

                let landmarks = self.kps.get(idx * 10..idx * 10 + 10).map(|k| {
                    std::array::from_fn(|i| {
                        letterbox.unmap(anchor_x + k[i * 2] * s, anchor_y + k[i * 2 + 1] * s)
                    })
                });

                Some(BoundingBox {
                    x: x1,
                    y: y1,
                    width: x2 - x1,
                    height: y2 - y1,
                    confidence: score,
                    landmarks,
                })
            })
            .collect()
    }
}

/// Discover output tensor ordering by name.
///
/// Named exports ("score_8", "bbox_16", ...) map directly; anything else falls
/// back to the positional layout [scores 8/16/32, bboxes 8/16/32, kps 8/16/32].
fn discover_output_indices(names: &[String]) -> [StrideOutputIndices; 3] {
    let find = |prefix: &str, stride: usize| -> Option<usize> {
        let target = format!("{prefix}_{stride}");
        names.iter().position(|n| n == &target)
    };

    let named: Option<Vec<StrideOutputIndices>> = SCRFD_STRIDES
        .iter()
        .map(|&stride| Some((find("score", stride)?, find("bbox", stride)?, find("kps", stride)?)))
        .collect();

    match named {
        Some(found) => [found[0], found[1], found[2]],
        None => {
            tracing::debug!(?names, "SCRFD output names not recognized, using positional mapping");
            [(0, 3, 6), (1, 4, 7), (2, 5, 8)]
        }
    }
}

/// Non-Maximum Suppression, highest confidence first.
fn nms(mut detections: Vec<BoundingBox>, iou_threshold: f32) -> Vec<BoundingBox> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<BoundingBox> = Vec::new();
    for det in detections {
        if keep.iter().all(|k| k.iou(&det) <= iou_threshold) {
            keep.push(det);
        }
    }
    keep
}
