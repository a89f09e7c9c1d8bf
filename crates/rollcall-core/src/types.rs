use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Bounding box for a detected face, with optional facial landmarks.
///
/// Coordinates are in frame pixels and may extend past the frame edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

impl BoundingBox {
    /// A landmark-free box with full confidence.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence: 1.0,
            landmarks: None,
        }
    }

    /// Integer pixel region, truncating toward zero.
    pub fn region(&self) -> FaceRegion {
        FaceRegion {
            x: self.x as i32,
            y: self.y as i32,
            width: self.width.max(0.0) as u32,
            height: self.height.max(0.0) as u32,
        }
    }

    /// Compute Intersection-over-Union with another box.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.width * self.height + other.width * other.height - inter;

        if union > 0.0 {
            inter / union
        } else {
            0.0
        }
    }
}

/// Integer face region used for cropping, liveness and rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl FaceRegion {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Nominal area of the detector box (not clipped to the frame).
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Intersect with a `frame_width` × `frame_height` frame.
    ///
    /// Returns `(x, y, width, height)` of the visible part, or `None` when
    /// the region lies entirely outside the frame.
    pub fn clip(&self, frame_width: u32, frame_height: u32) -> Option<(u32, u32, u32, u32)> {
        let x0 = (self.x.max(0) as i64).min(frame_width as i64);
        let y0 = (self.y.max(0) as i64).min(frame_height as i64);
        let x1 = (self.x as i64 + self.width as i64).clamp(0, frame_width as i64);
        let y1 = (self.y as i64 + self.height as i64).clamp(0, frame_height as i64);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32))
    }

    /// Copy the visible part of this region out of `frame`.
    pub fn crop(&self, frame: &RgbImage) -> Option<RgbImage> {
        let (x, y, w, h) = self.clip(frame.width(), frame.height())?;
        Some(image::imageops::crop_imm(frame, x, y, w, h).to_image())
    }
}

/// Face embedding vector (512-dimensional for ArcFace).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
    /// Model version that produced this embedding (e.g., "w600k_r50").
    pub model_version: Option<String>,
}

impl Embedding {
    /// Cosine similarity in [-1, 1]. Higher = more similar.
    pub fn similarity(&self, other: &Embedding) -> f32 {
        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;

        for (a, b) in self.values.iter().zip(other.values.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 {
            dot / denom
        } else {
            0.0
        }
    }

    /// Cosine distance in [0, 2]. Lower = more similar.
    pub fn cosine_distance(&self, other: &Embedding) -> f32 {
        1.0 - self.similarity(other)
    }
}
