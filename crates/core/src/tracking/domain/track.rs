use serde::Serialize;

use crate::detection::domain::detection::Detection;

/// One observed position/size sample of a track.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Keyframe {
    #[serde(rename = "t")]
    pub timestamp: f64,
    #[serde(rename = "x")]
    pub center_x: f64,
    #[serde(rename = "y")]
    pub center_y: f64,
    #[serde(rename = "w")]
    pub width: f64,
    #[serde(rename = "h")]
    pub height: f64,
}

impl Keyframe {
    pub fn from_detection(timestamp: f64, det: &Detection) -> Self {
        Self {
            timestamp,
            center_x: det.center_x,
            center_y: det.center_y,
            width: det.width,
            height: det.height,
        }
    }
}

/// A hypothesized single face's trajectory.
///
/// Only ever grows: a match appends one keyframe and advances
/// `last_seen_frame`. Fields are private so that the append path is the
/// only way to mutate it.
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    id: u32,
    keyframes: Vec<Keyframe>,
    last_seen_frame: usize,
}

impl Track {
    pub fn new(id: u32, first: Keyframe, frame_index: usize) -> Self {
        Self {
            id,
            keyframes: vec![first],
            last_seen_frame: frame_index,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn last_seen_frame(&self) -> usize {
        self.last_seen_frame
    }

    pub fn last_keyframe(&self) -> Option<&Keyframe> {
        self.keyframes.last()
    }

    /// Seconds between the first and last keyframe; 0 for a single sample.
    pub fn duration(&self) -> f64 {
        match (self.keyframes.first(), self.keyframes.last()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => 0.0,
        }
    }

    pub(crate) fn append(&mut self, keyframe: Keyframe, frame_index: usize) {
        debug_assert!(
            self.last_keyframe()
                .map_or(true, |k| k.timestamp <= keyframe.timestamp),
            "keyframe timestamps must be non-decreasing"
        );
        self.keyframes.push(keyframe);
        self.last_seen_frame = frame_index;
    }

    pub fn into_output(self) -> OutputTrack {
        OutputTrack {
            id: self.id,
            keyframes: self.keyframes,
        }
    }
}

/// A track that survived finalization, in its serialized shape.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OutputTrack {
    pub id: u32,
    pub keyframes: Vec<Keyframe>,
}

/// Success envelope written by the CLI: `{"tracks": [...]}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TrackReport {
    pub tracks: Vec<OutputTrack>,
}
