pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Frame rate assumed when the container reports none (or a non-positive one).
pub const DEFAULT_FPS: f64 = 30.0;

/// Analyze every Nth decoded frame.
pub const DEFAULT_STRIDE: usize = 2;

/// Minimum detector confidence for a face to be reported.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Max center distance (normalized units) for a detection to continue a track.
pub const MATCH_DISTANCE: f64 = 0.15;

/// Max `|dw| + |dh|` (normalized units) for a detection to continue a track.
pub const MAX_SIZE_DIFFERENCE: f64 = 0.2;

/// Seconds a track may go unmatched before it stops being matched.
pub const MAX_GAP_SECONDS: f64 = 0.5;

/// Tracks shorter than this (first to last keyframe) are discarded.
pub const MIN_TRACK_DURATION: f64 = 1.0;
