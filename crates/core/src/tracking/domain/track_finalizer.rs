use crate::tracking::domain::track::{OutputTrack, Track};

/// Turns the associator's full track history into the ranked output list.
///
/// Drops tracks spanning less than `min_duration` seconds (inclusive bound)
/// and ranks the rest by keyframe count, most samples first. The sort is
/// stable, so equal counts keep creation order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackFinalizer {
    min_duration: f64,
}

impl TrackFinalizer {
    pub fn new(min_duration: f64) -> Self {
        Self { min_duration }
    }

    pub fn finalize(&self, tracks: Vec<Track>) -> Vec<OutputTrack> {
        let mut kept: Vec<OutputTrack> = tracks
            .into_iter()
            .filter(|t| !t.keyframes().is_empty() && t.duration() >= self.min_duration)
            .map(Track::into_output)
            .collect();
        kept.sort_by(|a, b| b.keyframes.len().cmp(&a.keyframes.len()));
        kept
    }
}
