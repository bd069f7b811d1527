//! Combined detect-and-embed face analysis.

use image::RgbImage;
use thiserror::Error;

use crate::detector::{DetectorError, FaceDetector};
use crate::embedder::{EmbedderError, FaceEmbedder};
use crate::types::{Embedding, FaceBox};

/// One face found in an image: where it is, and what it looks like.
#[derive(Debug, Clone)]
pub struct DetectedFace {
    pub face_box: FaceBox,
    pub embedding: Embedding,
}

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error(transparent)]
    Detector(#[from] DetectorError),
    #[error(transparent)]
    Embedder(#[from] EmbedderError),
}

/// Detect faces and compute an embedding per face.
///
/// Deterministic for identical pixel input; may return an empty set.
pub trait FaceAnalyzer {
    fn analyze(&mut self, image: &RgbImage) -> Result<Vec<DetectedFace>, AnalyzerError>;
}

/// ONNX-backed analyzer: SCRFD detection followed by ArcFace embedding.
pub struct OnnxFaceAnalyzer {
    detector: FaceDetector,
    embedder: FaceEmbedder,
}

impl OnnxFaceAnalyzer {
    /// Load both models, failing fast on a missing file.
    pub fn load(detector_path: &str, embedder_path: &str) -> Result<Self, AnalyzerError> {
        Ok(Self {
            detector: FaceDetector::load(detector_path)?,
            embedder: FaceEmbedder::load(embedder_path)?,
        })
    }
}

impl FaceAnalyzer for OnnxFaceAnalyzer {
    fn analyze(&mut self, image: &RgbImage) -> Result<Vec<DetectedFace>, AnalyzerError> {
        let boxes = self.detector.detect(image)?;
        let mut faces = Vec::with_capacity(boxes.len());

        for face_box in boxes {
            let embedding = self.embedder.embed(image, &face_box)?;
            faces.push(DetectedFace {
                face_box,
                embedding,
            });
        }

        Ok(faces)
    }
}
