/// YOLO face detector using ONNX Runtime via `ort`.
///
/// Letterboxes the frame to the model's square input, filters candidates by
/// confidence, suppresses duplicates with greedy IoU NMS, and reports the
/// surviving boxes in frame-normalized coordinates. Association across
/// frames is left to the tracker.
use std::path::Path;

use crate::detection::domain::detection::RawDetection;
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::frame::Frame;

use super::execution_provider::load_session;

/// Fallback YOLO model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// Letterbox padding value (YOLO convention).
const PAD_VALUE: f32 = 114.0 / 255.0;

/// YOLO face detector backed by an ONNX Runtime session.
pub struct OnnxYoloDetector {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Load a YOLO ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (NCHW),
    /// falling back to 640 when the shape is dynamic.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        log::debug!(
            "Loaded face model {} (input {input_size}x{input_size})",
            model_path.display()
        );

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }
}

impl FaceDetector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>, Box<dyn std::error::Error>> {
        let (input_tensor, transform) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape();
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }

        // Output is [1, features, candidates] or [1, candidates, features].
        let transposed = shape[1] < shape[2];
        let (num_candidates, num_feats) = if transposed {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };
        if num_feats < 5 {
            return Err(format!("YOLO output has {num_feats} features, need at least 5").into());
        }
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;
        let feature = |candidate: usize, f: usize| -> f64 {
            if transposed {
                data[f * num_candidates + candidate] as f64
            } else {
                data[candidate * num_feats + f] as f64
            }
        };

        let mut candidates = Vec::new();
        for i in 0..num_candidates {
            // [cx, cy, w, h, conf, keypoints...]
            let confidence = feature(i, 4);
            if confidence < self.confidence {
                continue;
            }
            let (cx, cy, w, h) = (feature(i, 0), feature(i, 1), feature(i, 2), feature(i, 3));
            candidates.push(transform.unmap(
                [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
                confidence,
            ));
        }

        let kept = nms(&mut candidates, NMS_IOU_THRESH);
        Ok(kept
            .iter()
            .filter_map(|b| b.normalized(frame.width(), frame.height()))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Scale and padding applied by [`letterbox`].
#[derive(Clone, Copy, Debug)]
struct LetterboxTransform {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl LetterboxTransform {
    /// Maps an `[x1, y1, x2, y2]` box from letterbox space back to source pixels.
    fn unmap(&self, bbox: [f64; 4], confidence: f64) -> PixelBox {
        let px = self.pad_x as f64;
        let py = self.pad_y as f64;
        PixelBox {
            x1: (bbox[0] - px) / self.scale,
            y1: (bbox[1] - py) / self.scale,
            x2: (bbox[2] - px) / self.scale,
            y2: (bbox[3] - py) / self.scale,
            confidence,
        }
    }
}

/// Letterbox-resize a frame to `target_size` x `target_size`, NCHW float32.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, LetterboxTransform) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    let side = target_size as usize;
    let mut tensor = ndarray::Array4::<f32>::from_elem((1, 3, side, side), PAD_VALUE);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    // Nearest-neighbor resize into the padded area
    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        LetterboxTransform {
            scale,
            pad_x,
            pad_y,
        },
    )
}

// ---------------------------------------------------------------------------
// Postprocessing
// ---------------------------------------------------------------------------

/// Candidate box in source-frame pixel coordinates.
#[derive(Clone, Debug)]
struct PixelBox {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    confidence: f64,
}

impl PixelBox {
    fn iou(&self, other: &PixelBox) -> f64 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        let area_a = (self.x2 - self.x1) * (self.y2 - self.y1);
        let area_b = (other.x2 - other.x1) * (other.y2 - other.y1);
        inter / (area_a + area_b - inter)
    }

    /// Clamps to the frame and divides by its dimensions. Boxes with no
    /// visible area are dropped.
    fn normalized(&self, frame_width: u32, frame_height: u32) -> Option<RawDetection> {
        let fw = frame_width as f64;
        let fh = frame_height as f64;
        let x1 = self.x1.clamp(0.0, fw);
        let y1 = self.y1.clamp(0.0, fh);
        let x2 = self.x2.clamp(0.0, fw);
        let y2 = self.y2.clamp(0.0, fh);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(RawDetection {
            xmin: x1 / fw,
            ymin: y1 / fh,
            width: (x2 - x1) / fw,
            height: (y2 - y1) / fh,
            confidence: self.confidence,
        })
    }
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(boxes: &mut [PixelBox], iou_thresh: f64) -> Vec<PixelBox> {
    boxes.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<PixelBox> = Vec::new();
    for candidate in boxes.iter() {
        if keep.iter().all(|k| k.iou(candidate) <= iou_thresh) {
            keep.push(candidate.clone());
        }
    }
    keep
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
