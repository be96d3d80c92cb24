use crate::shared::constants::DEFAULT_FPS;

#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    /// Frame rate as reported by the container; 0.0 when unknown.
    pub fps: f64,
    /// Frame count as reported by the container; 0 when unknown.
    pub total_frames: usize,
}

/// Reported fps, or [`DEFAULT_FPS`] when the source reports nothing usable.
pub fn effective_fps(reported: f64) -> f64 {
    if reported.is_finite() && reported > 0.0 {
        reported
    } else {
        DEFAULT_FPS
    }
}
