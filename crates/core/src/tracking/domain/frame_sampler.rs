use crate::shared::error::TrackingError;
use crate::shared::video_metadata::effective_fps;

/// Selects which decoded frames are analyzed and timestamps them.
///
/// Pure function of `(frame_index, fps, stride)`: frame `i` is analyzed iff
/// `i % stride == 0`, at `i / fps` seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameSampler {
    stride: usize,
    fps: f64,
}

impl FrameSampler {
    /// `reported_fps` is the container's rate; non-positive or non-finite
    /// values fall back to the default.
    pub fn new(stride: usize, reported_fps: f64) -> Result<Self, TrackingError> {
        if stride < 1 {
            return Err(TrackingError::InvalidConfig(
                "stride must be >= 1".to_string(),
            ));
        }
        Ok(Self {
            stride,
            fps: effective_fps(reported_fps),
        })
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn should_analyze(&self, frame_index: usize) -> bool {
        frame_index % self.stride == 0
    }

    pub fn timestamp(&self, frame_index: usize) -> f64 {
        frame_index as f64 / self.fps
    }

    /// Timestamp of the frame if it is analyzed, `None` if it is skipped.
    pub fn sample(&self, frame_index: usize) -> Option<f64> {
        self.should_analyze(frame_index)
            .then(|| self.timestamp(frame_index))
    }
}
