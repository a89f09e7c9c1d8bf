//! Pairwise face verification: the [`Verifier`] seam and its ArcFace backend.

use crate::alignment;
use crate::detector::{Detector, DetectorError};
use crate::recognizer::{Embedder, FaceRecognizer, RecognizerError};
use crate::references::ReferenceEntry;
use crate::types::Embedding;
use image::RgbImage;
use std::collections::HashMap;
use thiserror::Error;

/// Cosine-distance cutoff for ArcFace to call two faces the same person.
pub const DEFAULT_VERIFY_THRESHOLD: f32 = 0.68;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
    #[error("empty image")]
    EmptyImage,
}

/// Outcome of comparing one reference against one probe face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verification {
    pub verified: bool,
    /// Dissimilarity; lower = more similar.
    pub distance: f32,
}

/// Decides whether a probe image shows the same person as a reference.
pub trait Verifier {
    fn verify(&mut self, reference: &ReferenceEntry, probe: &RgbImage) -> Result<Verification, VerifyError>;
}

impl<V: Verifier + ?Sized> Verifier for Box<V> {
    fn verify(&mut self, reference: &ReferenceEntry, probe: &RgbImage) -> Result<Verification, VerifyError> {
        (**self).verify(reference, probe)
    }
}

/// Detect → align → ArcFace embed on both images, then compare by cosine distance.
///
/// Images without a detectable face are embedded whole rather than rejected.
/// Reference embeddings are computed once per reference name; the last probe
/// embedding is reused while the same crop is verified against every reference.
pub struct ArcFaceVerifier<D, E = FaceRecognizer> {
    detector: D,
    recognizer: E,
    threshold: f32,
    references: HashMap<String, Embedding>,
    last_probe: Option<(RgbImage, Embedding)>,
}

impl<D: Detector, E: Embedder> ArcFaceVerifier<D, E> {
    pub fn new(detector: D, recognizer: E, threshold: f32) -> Self {
        Self {
            detector,
            recognizer,
            threshold,
            references: HashMap::new(),
            last_probe: None,
        }
    }

    fn embed(&mut self, image: &RgbImage) -> Result<Embedding, VerifyError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(VerifyError::EmptyImage);
        }

        let faces = self.detector.detect(image)?;
        let aligned = match faces.iter().find_map(|f| f.landmarks.as_ref()) {
            Some(landmarks) => alignment::align_face(image, landmarks),
            None => {
                tracing::trace!("no landmarks found, embedding whole image");
                alignment::fit_face(image)
            }
        };
        Ok(self.recognizer.extract(&aligned)?)
    }

    fn reference_embedding(&mut self, reference: &ReferenceEntry) -> Result<Embedding, VerifyError> {
        if let Some(embedding) = self.references.get(&reference.name) {
            return Ok(embedding.clone());
        }
        let embedding = self.embed(&reference.image)?;
        tracing::debug!(name = %reference.name, "cached reference embedding");
        self.references.insert(reference.name.clone(), embedding.clone());
        Ok(embedding)
    }

    fn probe_embedding(&mut self, probe: &RgbImage) -> Result<Embedding, VerifyError> {
        if let Some((image, embedding)) = &self.last_probe {
            if image == probe {
                return Ok(embedding.clone());
            }
        }
        let embedding = self.embed(probe)?;
        self.last_probe = Some((probe.clone(), embedding.clone()));
        Ok(embedding)
    }
}

impl<D: Detector, E: Embedder> Verifier for ArcFaceVerifier<D, E> {
    fn verify(&mut self, reference: &ReferenceEntry, probe: &RgbImage) -> Result<Verification, VerifyError> {
        let known = self.reference_embedding(reference)?;
        let candidate = self.probe_embedding(probe)?;
        let distance = known.cosine_distance(&candidate);
        Ok(Verification {
            verified: distance <= self.threshold,
            distance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;
    use image::Rgb;
    use std::collections::VecDeque;

    /// Returns the same detections for every image.
    struct FixedDetector(Vec<BoundingBox>);

    impl Detector for FixedDetector {
        fn detect(&mut self, _image: &RgbImage) -> Result<Vec<BoundingBox>, DetectorError> {
            Ok(self.0.clone())
        }
    }

    /// Hands out queued embeddings and keeps every crop it was given.
    #[derive(Default)]
    struct QueuedEmbedder {
        queue: VecDeque<Vec<f32>>,
        seen: Vec<RgbImage>,
    }

    impl QueuedEmbedder {
        fn with(values: &[&[f32]]) -> Self {
            Self {
                queue: values.iter().map(|v| v.to_vec()).collect(),
                seen: Vec::new(),
            }
        }
    }

    impl Embedder for QueuedEmbedder {
        fn extract(&mut self, aligned: &RgbImage) -> Result<Embedding, RecognizerError> {
            self.seen.push(aligned.clone());
            let values = self
                .queue
                .pop_front()
                .ok_or_else(|| RecognizerError::InferenceFailed("queue exhausted".into()))?;
            Ok(Embedding { values, model_version: None })
        }
    }

    fn reference(name: &str, shade: u8) -> ReferenceEntry {
        ReferenceEntry {
            name: name.to_string(),
            image: RgbImage::from_pixel(160, 160, Rgb([shade, shade, shade])),
        }
    }

    fn probe(shade: u8) -> RgbImage {
        RgbImage::from_pixel(120, 140, Rgb([shade, 0, 0]))
    }

    fn verifier(embeddings: &[&[f32]]) -> ArcFaceVerifier<FixedDetector, QueuedEmbedder> {
        ArcFaceVerifier::new(FixedDetector(vec![]), QueuedEmbedder::with(embeddings), DEFAULT_VERIFY_THRESHOLD)
    }

    #[test]
    fn test_reference_embedding_cached_by_name() {
        let mut v = verifier(&[&[1.0, 0.0], &[1.0, 0.0], &[0.0, 1.0]]);
        let alice = reference("alice", 200);
        let face = probe(90);

        v.verify(&alice, &face).unwrap();
        v.verify(&alice, &face).unwrap();
        assert_eq!(v.recognizer.seen.len(), 2);

        let bob = reference("bob", 40);
        let result = v.verify(&bob, &face).unwrap();
        assert_eq!(v.recognizer.seen.len(), 3);
        assert!((result.distance - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_new_face_is_embedded_again() {
        // alice, first face, second face
        let mut v = verifier(&[&[1.0, 0.0], &[1.0, 0.0], &[0.0, 1.0]]);
        let alice = reference("alice", 200);

        let first = v.verify(&alice, &probe(90)).unwrap();
        let second = v.verify(&alice, &probe(91)).unwrap();

        assert_eq!(v.recognizer.seen.len(), 3);
        assert!(first.verified);
        assert!(first.distance.abs() < 1e-6);
        assert!(!second.verified);
        assert!((second.distance - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_no_landmarks_embeds_whole_image() {
        let mut v = ArcFaceVerifier::new(
            FixedDetector(vec![BoundingBox::new(10.0, 10.0, 50.0, 50.0)]),
            QueuedEmbedder::with(&[&[1.0, 0.0], &[1.0, 0.0]]),
            DEFAULT_VERIFY_THRESHOLD,
        );
        let alice = reference("alice", 200);
        let face = probe(90);

        v.verify(&alice, &face).unwrap();

        assert_eq!(v.recognizer.seen[0], alignment::fit_face(&alice.image));
        assert_eq!(v.recognizer.seen[1], alignment::fit_face(&face));
    }

    #[test]
    fn test_landmarks_are_aligned() {
        let mut face_box = BoundingBox::new(20.0, 20.0, 80.0, 80.0);
        let landmarks = [(45.0, 50.0), (75.0, 50.0), (60.0, 65.0), (48.0, 82.0), (72.0, 82.0)];
        face_box.landmarks = Some(landmarks);
        let mut v = ArcFaceVerifier::new(
            FixedDetector(vec![face_box]),
            QueuedEmbedder::with(&[&[1.0, 0.0], &[1.0, 0.0]]),
            DEFAULT_VERIFY_THRESHOLD,
        );
        let alice = reference("alice", 200);

        v.verify(&alice, &probe(90)).unwrap();

        assert_eq!(v.recognizer.seen[0], alignment::align_face(&alice.image, &landmarks));
    }

    #[test]
    fn test_verified_includes_threshold() {
        let known = Embedding { values: vec![1.0, 0.0], model_version: None };
        let candidate = Embedding { values: vec![0.3, 0.9], model_version: None };
        let distance = known.cosine_distance(&candidate);

        let at = |threshold: f32| {
            let mut v = ArcFaceVerifier::new(
                FixedDetector(vec![]),
                QueuedEmbedder::with(&[known.values.as_slice(), candidate.values.as_slice()]),
                threshold,
            );
            v.verify(&reference("alice", 200), &probe(90)).unwrap()
        };

        let on = at(distance);
        assert!(on.verified);
        assert_eq!(on.distance, distance);
        assert!(!at(distance - 1e-4).verified);
    }

    #[test]
    fn test_default_threshold() {
        // Similarity 0.4 and 0.2 give distances 0.6 and 0.8 either side of 0.68.
        let near = [0.4, (1.0f32 - 0.16).sqrt()];
        let far = [0.2, (1.0f32 - 0.04).sqrt()];
        let mut v = verifier(&[&[1.0, 0.0], &near[..], &far[..]]);
        let alice = reference("alice", 200);

        assert!(v.verify(&alice, &probe(10)).unwrap().verified);
        assert!(!v.verify(&alice, &probe(20)).unwrap().verified);
    }

    #[test]
    fn test_empty_face_rejected() {
        let mut v = verifier(&[&[1.0, 0.0]]);
        let err = v.verify(&reference("alice", 200), &RgbImage::new(0, 0)).unwrap_err();
        assert!(matches!(err, VerifyError::EmptyImage));
    }
}
