use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

/// Decodes video frames via ffmpeg-next (libavformat + libavcodec).
///
/// Each decoded frame is converted to packed RGB24 and tagged with its
/// decode-order index.
pub struct FfmpegReader {
    input_ctx: Option<ffmpeg_next::format::context::Input>,
    video_stream_index: usize,
}

impl FfmpegReader {
    pub fn new() -> Self {
        Self {
            input_ctx: None,
            video_stream_index: 0,
        }
    }
}

impl Default for FfmpegReader {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoReader for FfmpegReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = ffmpeg_next::format::input(path)?;
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            fps,
            total_frames: stream.frames().max(0) as usize,
        };
        log::debug!(
            "Opened {}: {}x{} @ {:.3} fps, {} frames",
            path.display(),
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata.total_frames
        );

        self.video_stream_index = stream.index();
        self.input_ctx = Some(ictx);
        Ok(metadata)
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        let video_stream_index = self.video_stream_index;
        let Some(ictx) = self.input_ctx.as_mut() else {
            return Box::new(std::iter::once(Err::<Frame, _>("FfmpegReader: not opened".into())));
        };

        match FfmpegFrameIter::new(ictx, video_stream_index) {
            Ok(iter) => Box::new(iter),
            Err(e) => Box::new(std::iter::once(Err::<Frame, _>(e))),
        }
    }

    fn close(&mut self) {
        self.input_ctx = None;
    }
}

/// Lazy iterator that decodes one frame at a time.
struct FfmpegFrameIter<'a> {
    ictx: &'a mut ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    video_stream_index: usize,
    frame_index: usize,
    flushing: bool,
    done: bool,
}

impl<'a> FfmpegFrameIter<'a> {
    fn new(
        ictx: &'a mut ffmpeg_next::format::context::Input,
        video_stream_index: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let stream = ictx
            .stream(video_stream_index)
            .ok_or("Video stream disappeared")?;
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        Ok(Self {
            ictx,
            decoder,
            scaler,
            width,
            height,
            video_stream_index,
            frame_index: 0,
            flushing: false,
            done: false,
        })
    }

    fn try_receive(&mut self) -> Option<Result<Frame, Box<dyn std::error::Error>>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return None;
        }

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        if let Err(e) = self.scaler.run(&decoded, &mut rgb_frame) {
            return Some(Err(Box::new(e)));
        }

        let pixels = packed_rgb(&rgb_frame, self.width, self.height);
        let frame = Frame::new(pixels, self.width, self.height, self.frame_index);
        self.frame_index += 1;
        Some(Ok(frame))
    }
}

impl Iterator for FfmpegFrameIter<'_> {
    type Item = Result<Frame, Box<dyn std::error::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if let Some(result) = self.try_receive() {
            return Some(result);
        }

        if self.flushing {
            self.done = true;
            return None;
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                if let Some(result) = self.try_receive() {
                    return Some(result);
                }
                self.done = true;
                return None;
            };

            if stream.index() != self.video_stream_index {
                continue;
            }

            if let Err(e) = self.decoder.send_packet(&packet) {
                log::debug!("Dropping undecodable packet: {e}");
                continue;
            }

            if let Some(result) = self.try_receive() {
                return Some(result);
            }
        }
    }
}

/// Copies an RGB24 ffmpeg frame into a tightly-packed buffer, dropping the
/// per-row stride padding.
fn packed_rgb(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_bytes = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }
    pixels
}
