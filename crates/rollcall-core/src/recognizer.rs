//! ArcFace face recognizer via ONNX Runtime.
//!
//! Extracts 512-dimensional embeddings from aligned 112×112 RGB face crops,
//! using the w600k_r50 ArcFace model.

use crate::alignment::ALIGNED_SIZE;
use crate::types::Embedding;
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const ARCFACE_MEAN: f32 = 127.5;
const ARCFACE_STD: f32 = 127.5; // symmetric normalization, unlike SCRFD
const ARCFACE_EMBEDDING_DIM: usize = 512;
const ARCFACE_MODEL_VERSION: &str = "w600k_r50";

#[derive(Error, Debug)]
pub enum RecognizerError {
    #[error("model file not found: {0} — download from insightface and place in the model directory")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("expected a 112x112 face crop, got {0}x{1}")]
    BadCropSize(u32, u32),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Turns an aligned 112×112 face crop into an embedding.
pub trait Embedder {
    fn extract(&mut self, aligned: &RgbImage) -> Result<Embedding, RecognizerError>;
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn extract(&mut self, aligned: &RgbImage) -> Result<Embedding, RecognizerError> {
        (**self).extract(aligned)
    }
}

/// ArcFace-based face recognizer.
pub struct FaceRecognizer {
    session: Session,
}

impl FaceRecognizer {
    /// Load the ArcFace ONNX model from the given path.
    pub fn load(model_path: &Path) -> Result<Self, RecognizerError> {
        if !model_path.exists() {
            return Err(RecognizerError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(path = %model_path.display(), "loaded ArcFace model");

        Ok(Self { session })
    }

    /// Convert an aligned RGB crop into a normalized NCHW tensor.
    fn preprocess(aligned: &RgbImage) -> Array4<f32> {
        let size = ALIGNED_SIZE as usize;
        let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
        for (x, y, pixel) in aligned.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] = (pixel[c] as f32 - ARCFACE_MEAN) / ARCFACE_STD;
            }
        }
        tensor
    }
}

impl Embedder for FaceRecognizer {
    /// Extract an L2-normalized embedding from an aligned face crop.
    fn extract(&mut self, aligned: &RgbImage) -> Result<Embedding, RecognizerError> {
        if aligned.dimensions() != (ALIGNED_SIZE, ALIGNED_SIZE) {
            return Err(RecognizerError::BadCropSize(aligned.width(), aligned.height()));
        }

        let input = Self::preprocess(aligned);
        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| RecognizerError::InferenceFailed(format!("embedding extraction: {e}")))?;

        if raw.len() != ARCFACE_EMBEDDING_DIM {
            return Err(RecognizerError::InferenceFailed(format!(
                "expected {ARCFACE_EMBEDDING_DIM}-dim embedding, got {}",
                raw.len()
            )));
        }

        Ok(Embedding {
            values: l2_normalize(raw),
            model_version: Some(ARCFACE_MODEL_VERSION.to_string()),
        })
    }
}

fn l2_normalize(raw: &[f32]) -> Vec<f32> {
    let norm = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        raw.iter().map(|x| x / norm).collect()
    } else {
        raw.to_vec()
    }
}
