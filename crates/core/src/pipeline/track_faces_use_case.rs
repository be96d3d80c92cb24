use std::path::Path;
use std::time::Instant;

use crate::detection::domain::detection::normalize_all;
use crate::detection::domain::face_detector::FaceDetector;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::error::TrackingError;
use crate::tracking::domain::frame_sampler::FrameSampler;
use crate::tracking::domain::track::{OutputTrack, Track};
use crate::tracking::domain::track_associator::TrackAssociator;
use crate::tracking::domain::track_finalizer::TrackFinalizer;
use crate::tracking::domain::tracker_config::TrackerConfig;
use crate::video::domain::video_reader::VideoReader;

/// Single pass over a video: sample frames, detect faces, associate them
/// into tracks, and return the ranked tracks that lasted long enough.
///
/// Frames are processed strictly in decode order on the calling thread.
pub struct TrackFacesUseCase {
    reader: Box<dyn VideoReader>,
    detector: Box<dyn FaceDetector>,
    stride: usize,
    config: TrackerConfig,
    logger: Box<dyn PipelineLogger>,
}

impl TrackFacesUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        detector: Box<dyn FaceDetector>,
        stride: usize,
        config: TrackerConfig,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            reader,
            detector,
            stride,
            config,
            logger,
        }
    }

    pub fn execute(&mut self, input: &Path) -> Result<Vec<OutputTrack>, TrackingError> {
        self.config.validate()?;

        let metadata = self.reader.open(input).map_err(|e| {
            log::debug!("Failed to open {}: {e}", input.display());
            TrackingError::SourceUnavailable
        })?;

        let result = self.run(metadata.fps, metadata.total_frames);
        self.reader.close();

        let tracks = result?;
        let total = tracks.len();
        let output = TrackFinalizer::new(self.config.min_track_duration).finalize(tracks);

        self.logger.info(&format!(
            "Kept {} of {total} tracks (min duration {:.2}s)",
            output.len(),
            self.config.min_track_duration
        ));
        self.logger.summary();
        Ok(output)
    }

    fn run(
        &mut self,
        reported_fps: f64,
        total_frames: usize,
    ) -> Result<Vec<Track>, TrackingError> {
        let sampler = FrameSampler::new(self.stride, reported_fps)?;
        let mut associator = TrackAssociator::new(&self.config, sampler.fps());

        if sampler.fps() != reported_fps {
            log::warn!(
                "Source reports {reported_fps} fps, assuming {:.0}",
                sampler.fps()
            );
        }
        self.logger.info(&format!(
            "Analyzing every {} frame(s) at {:.3} fps, max gap {} frames",
            sampler.stride(),
            sampler.fps(),
            associator.max_frame_gap()
        ));

        for frame_result in self.reader.frames() {
            let frame = match frame_result {
                Ok(frame) => frame,
                Err(e) => {
                    log::warn!("Stopping at undecodable frame: {e}");
                    break;
                }
            };
            let frame_index = frame.index();

            if let Some(timestamp) = sampler.sample(frame_index) {
                let detect_start = Instant::now();
                let raw = self
                    .detector
                    .detect(&frame)
                    .map_err(|e| TrackingError::Processing(e.to_string()))?;
                self.logger
                    .timing("detect", detect_start.elapsed().as_secs_f64() * 1000.0);

                let detections = normalize_all(&raw);
                let associate_start = Instant::now();
                let association = associator.update(frame_index, timestamp, &detections);
                self.logger.timing(
                    "associate",
                    associate_start.elapsed().as_secs_f64() * 1000.0,
                );

                self.logger.metric("detections", detections.len() as f64);
                self.logger
                    .metric("live_tracks", associator.eligible_count(frame_index) as f64);
                log::trace!(
                    "Frame {frame_index}: {} detections, {} matched, {} new",
                    detections.len(),
                    association.matched,
                    association.spawned
                );
            }

            self.logger.progress(frame_index + 1, total_frames);
        }

        Ok(associator.into_tracks())
    }
}
