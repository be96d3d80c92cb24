use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Reads decoded frames from a video source.
///
/// The tracking pipeline consumes frames strictly in decode order. An `Err`
/// item means the frame could not be decoded; the pipeline treats it as the
/// end of the stream.
pub trait VideoReader {
    /// Opens a video file and returns its metadata.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Returns an iterator over frames in decode order, indexed from 0.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    /// Releases any resources held by the reader.
    fn close(&mut self);
}
