//! ArcFace face embedder via ONNX Runtime.
//!
//! Produces 512-dimensional, L2-normalized embeddings from a square crop
//! of the detected face resized to 112x112.

use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

use crate::types::{Embedding, FaceBox};

const CROP_SIZE: u32 = 112;
// ArcFace normalizes symmetrically, unlike the detector's 127.5/128.
const PIXEL_MEAN: f32 = 127.5;
const PIXEL_STD: f32 = 127.5;
const EMBEDDING_DIM: usize = 512;
/// Widen the detector box by this fraction on each side before cropping,
/// so chin and forehead survive tight detections.
const CROP_MARGIN: f32 = 0.1;

#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("embedding model not found: {0}")]
    ModelNotFound(String),
    #[error("embedding inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// ArcFace-based face embedder.
pub struct FaceEmbedder {
    session: Session,
}

impl FaceEmbedder {
    /// Load the ArcFace ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, EmbedderError> {
        if !Path::new(model_path).exists() {
            return Err(EmbedderError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(path = model_path, "loaded embedding model");
        Ok(Self { session })
    }

    /// Embed the face inside `face_box`.
    pub fn embed(&mut self, image: &RgbImage, face_box: &FaceBox) -> Result<Embedding, EmbedderError> {
        let crop = crop_face(image, face_box);
        let input = preprocess(&crop);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EmbedderError::InferenceFailed(format!("embedding output: {e}")))?;

        if raw.len() != EMBEDDING_DIM {
            return Err(EmbedderError::InferenceFailed(format!(
                "expected {EMBEDDING_DIM}-dim embedding, got {}",
                raw.len()
            )));
        }

        Ok(Embedding {
            values: l2_normalize(raw),
        })
    }
}

/// Square crop around the face box, widened by the margin and clamped to
/// the image bounds, resized to the model input size.
fn crop_face(image: &RgbImage, face_box: &FaceBox) -> RgbImage {
    let (img_w, img_h) = image.dimensions();

    let side = face_box.width.max(face_box.height) * (1.0 + 2.0 * CROP_MARGIN);
    let center_x = face_box.x + face_box.width / 2.0;
    let center_y = face_box.y + face_box.height / 2.0;

    let x0 = (center_x - side / 2.0).max(0.0) as u32;
    let y0 = (center_y - side / 2.0).max(0.0) as u32;
    let x0 = x0.min(img_w.saturating_sub(1));
    let y0 = y0.min(img_h.saturating_sub(1));
    let w = (side as u32).max(1).min(img_w - x0);
    let h = (side as u32).max(1).min(img_h - y0);

    let crop = image::imageops::crop_imm(image, x0, y0, w, h).to_image();
    image::imageops::resize(&crop, CROP_SIZE, CROP_SIZE, image::imageops::FilterType::Triangle)
}

/// 112x112 RGB crop into a normalized NCHW tensor.
fn preprocess(crop: &RgbImage) -> Array4<f32> {
    let size = CROP_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

    for (x, y, pixel) in crop.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (pixel.0[c] as f32 - PIXEL_MEAN) / PIXEL_STD;
        }
    }

    tensor
}

fn l2_normalize(raw: &[f32]) -> Vec<f32> {
    let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        raw.iter().map(|x| x / norm).collect()
    } else {
        raw.to_vec()
    }
}
