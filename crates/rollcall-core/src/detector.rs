//! SCRFD face detector via ONNX Runtime.
//!
//! Anchor-free detection across three stride levels with NMS. Landmark
//! outputs are ignored — downstream embedding works on a box crop, not an
//! aligned face.

use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

use crate::types::FaceBox;

const INPUT_SIZE: u32 = 640;
const PIXEL_MEAN: f32 = 127.5;
const PIXEL_STD: f32 = 128.0;
const CONFIDENCE_THRESHOLD: f32 = 0.5;
const NMS_IOU_THRESHOLD: f32 = 0.4;
const STRIDES: [usize; 3] = [8, 16, 32];
const ANCHORS_PER_CELL: usize = 2;
/// det_10g exports 9 outputs: scores for strides 8/16/32 first, then bboxes,
/// then landmarks (unused here).
const BBOX_OUTPUT_BASE: usize = 3;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("detection model not found: {0}")]
    ModelNotFound(String),
    #[error("detection inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Scale/padding applied by the letterbox resize, kept to map detections
/// back into source-image coordinates.
#[derive(Debug, Clone, Copy)]
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

/// SCRFD-based face detector.
pub struct FaceDetector {
    session: Session,
}

impl FaceDetector {
    /// Load the SCRFD ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, DetectorError> {
        if !Path::new(model_path).exists() {
            return Err(DetectorError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        let num_outputs = session.outputs().len();
        tracing::info!(path = model_path, outputs = num_outputs, "loaded detection model");

        if num_outputs < 6 {
            return Err(DetectorError::InferenceFailed(format!(
                "detection model needs score and bbox outputs for 3 strides, got {num_outputs}"
            )));
        }

        Ok(Self { session })
    }

    /// Detect faces, returning boxes in source pixel coordinates sorted by
    /// confidence descending. An empty result is a normal outcome.
    pub fn detect(&mut self, image: &RgbImage) -> Result<Vec<FaceBox>, DetectorError> {
        let (input, letterbox) = preprocess(image);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let mut detections = Vec::new();
        for (stride_pos, &stride) in STRIDES.iter().enumerate() {
            let (_, scores) = outputs[stride_pos]
                .try_extract_tensor::<f32>()
                .map_err(|e| DetectorError::InferenceFailed(format!("scores stride {stride}: {e}")))?;
            let (_, bboxes) = outputs[BBOX_OUTPUT_BASE + stride_pos]
                .try_extract_tensor::<f32>()
                .map_err(|e| DetectorError::InferenceFailed(format!("bboxes stride {stride}: {e}")))?;

            decode_stride(scores, bboxes, stride, &letterbox, &mut detections);
        }

        let mut faces = nms(detections, NMS_IOU_THRESHOLD);
        faces.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(faces)
    }
}

/// Letterbox the image into a 640x640 NCHW tensor normalized to the SCRFD
/// input distribution.
fn preprocess(image: &RgbImage) -> (Array4<f32>, Letterbox) {
    let (width, height) = image.dimensions();
    let scale = (INPUT_SIZE as f32 / width as f32).min(INPUT_SIZE as f32 / height as f32);
    let new_w = (width as f32 * scale).round().max(1.0) as u32;
    let new_h = (height as f32 * scale).round().max(1.0) as u32;
    let pad_x = ((INPUT_SIZE - new_w) / 2) as f32;
    let pad_y = ((INPUT_SIZE - new_h) / 2) as f32;

    let resized = image::imageops::resize(image, new_w, new_h, image::imageops::FilterType::Triangle);

    // Pad value equals the mean, so padding normalizes to 0.
    let size = INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    let x0 = pad_x as u32;
    let y0 = pad_y as u32;

    for y in 0..size {
        for x in 0..size {
            let inside = (x as u32) >= x0
                && (x as u32) < x0 + new_w
                && (y as u32) >= y0
                && (y as u32) < y0 + new_h;
            let pixel = if inside {
                *resized.get_pixel(x as u32 - x0, y as u32 - y0)
            } else {
                image::Rgb([PIXEL_MEAN as u8; 3])
            };
            for c in 0..3 {
                tensor[[0, c, y, x]] = (pixel.0[c] as f32 - PIXEL_MEAN) / PIXEL_STD;
            }
        }
    }

    (
        tensor,
        Letterbox {
            scale,
            pad_x,
            pad_y,
        },
    )
}

/// Decode one stride level's anchor grid into source-coordinate boxes.
fn decode_stride(
    scores: &[f32],
    bboxes: &[f32],
    stride: usize,
    letterbox: &Letterbox,
    out: &mut Vec<FaceBox>,
) {
    let grid = INPUT_SIZE as usize / stride;
    let num_anchors = grid * grid * ANCHORS_PER_CELL;

    for idx in 0..num_anchors {
        let confidence = scores.get(idx).copied().unwrap_or(0.0);
        if confidence <= CONFIDENCE_THRESHOLD {
            continue;
        }

        let bbox_off = idx * 4;
        if bbox_off + 3 >= bboxes.len() {
            continue;
        }

        let cell = idx / ANCHORS_PER_CELL;
        let anchor_cx = ((cell % grid) * stride) as f32;
        let anchor_cy = ((cell / grid) * stride) as f32;

        // Offsets are distances from the anchor center, in stride units.
        let x1 = anchor_cx - bboxes[bbox_off] * stride as f32;
        let y1 = anchor_cy - bboxes[bbox_off + 1] * stride as f32;
        let x2 = anchor_cx + bboxes[bbox_off + 2] * stride as f32;
        let y2 = anchor_cy + bboxes[bbox_off + 3] * stride as f32;

        out.push(FaceBox {
            x: (x1 - letterbox.pad_x) / letterbox.scale,
            y: (y1 - letterbox.pad_y) / letterbox.scale,
            width: (x2 - x1) / letterbox.scale,
            height: (y2 - y1) / letterbox.scale,
            confidence,
        });
    }
}

/// Non-maximum suppression: drop boxes overlapping a higher-confidence one.
fn nms(mut detections: Vec<FaceBox>, iou_threshold: f32) -> Vec<FaceBox> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<FaceBox> = Vec::new();
    for candidate in detections {
        if keep.iter().all(|kept| iou(kept, &candidate) <= iou_threshold) {
            keep.push(candidate);
        }
    }
    keep
}

fn iou(a: &FaceBox, b: &FaceBox) -> f32 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = (a.x + a.width).min(b.x + b.width);
    let y2 = (a.y + a.height).min(b.y + b.height);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.width * a.height + b.width * b.height - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(x: f32, y: f32, w: f32, h: f32, confidence: f32) -> FaceBox {
        FaceBox {
            x,
            y,
            width: w,
            height: h,
            confidence,
        }
    }

    #[test]
    fn test_iou_identical() {
        let a = face(0.0, 0.0, 100.0, 100.0, 1.0);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_disjoint() {
        let a = face(0.0, 0.0, 10.0, 10.0, 1.0);
        let b = face(50.0, 50.0, 10.0, 10.0, 1.0);
        assert!(iou(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_iou_half_overlap() {
        let a = face(0.0, 0.0, 10.0, 10.0, 1.0);
        let b = face(5.0, 0.0, 10.0, 10.0, 1.0);
        // intersection 50, union 150
        assert!((iou(&a, &b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_nms_suppresses_overlapping_lower_confidence() {
        let detections = vec![
            face(0.0, 0.0, 100.0, 100.0, 0.9),
            face(5.0, 5.0, 100.0, 100.0, 0.8),
            face(300.0, 300.0, 50.0, 50.0, 0.7),
        ];
        let kept = nms(detections, 0.4);
        assert_eq!(kept.len(), 2);
        assert!((kept[0].confidence - 0.9).abs() < 1e-6);
        assert!((kept[1].confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_nms_keeps_disjoint_boxes() {
        let detections = vec![
            face(0.0, 0.0, 10.0, 10.0, 0.6),
            face(100.0, 100.0, 10.0, 10.0, 0.9),
        ];
        let kept = nms(detections, 0.4);
        assert_eq!(kept.len(), 2);
        // Output is confidence-ordered regardless of input order.
        assert!(kept[0].confidence > kept[1].confidence);
    }

    #[test]
    fn test_nms_empty() {
        assert!(nms(vec![], 0.4).is_empty());
    }

    #[test]
    fn test_letterbox_coordinate_roundtrip() {
        let image = RgbImage::from_pixel(320, 240, image::Rgb([128, 128, 128]));
        let (_, letterbox) = preprocess(&image);

        // A point mapped into letterbox space and back lands where it started.
        let (orig_x, orig_y) = (100.0f32, 50.0f32);
        let boxed_x = orig_x * letterbox.scale + letterbox.pad_x;
        let boxed_y = orig_y * letterbox.scale + letterbox.pad_y;
        let back_x = (boxed_x - letterbox.pad_x) / letterbox.scale;
        let back_y = (boxed_y - letterbox.pad_y) / letterbox.scale;

        assert!((back_x - orig_x).abs() < 0.1);
        assert!((back_y - orig_y).abs() < 0.1);
    }

    #[test]
    fn test_preprocess_shape_and_padding() {
        // Wide image: vertical padding, normalized pad value must be 0.
        let image = RgbImage::from_pixel(640, 320, image::Rgb([200, 200, 200]));
        let (tensor, letterbox) = preprocess(&image);

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert!(letterbox.pad_y > 0.0);
        assert_eq!(letterbox.pad_x, 0.0);
        // Top-left corner is padding.
        assert!(tensor[[0, 0, 0, 0]].abs() < 0.01);
    }

    #[test]
    fn test_decode_stride_respects_threshold() {
        let letterbox = Letterbox {
            scale: 1.0,
            pad_x: 0.0,
            pad_y: 0.0,
        };
        let grid = INPUT_SIZE as usize / 32;
        let num_anchors = grid * grid * ANCHORS_PER_CELL;
        let mut scores = vec![0.0f32; num_anchors];
        scores[0] = 0.9;
        let bboxes = vec![1.0f32; num_anchors * 4];

        let mut out = Vec::new();
        decode_stride(&scores, &bboxes, 32, &letterbox, &mut out);

        assert_eq!(out.len(), 1);
        // Anchor (0,0), offsets of 1 stride each way: a 64x64 box at -32,-32.
        assert!((out[0].width - 64.0).abs() < 1e-3);
        assert!((out[0].x + 32.0).abs() < 1e-3);
    }
}
