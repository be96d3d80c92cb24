use crate::detection::domain::detection::RawDetection;
use crate::shared::frame::Frame;

/// Domain interface for face detection.
///
/// Returns boxes in frame-normalized coordinates. Order is not significant.
/// Implementations may hold inference sessions, hence `&mut self`.
pub trait FaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>, Box<dyn std::error::Error>>;
}
