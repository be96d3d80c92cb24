/// Greedy frame-to-frame face association.
///
/// Each analyzed frame, every still-eligible track (in creation order)
/// claims the nearest unclaimed detection that lies strictly within the
/// distance bound and has a strictly similar size. Detections left over
/// start new tracks. Matching is per-track greedy, not globally optimal:
/// when two tracks converge, the older one picks first.
use crate::detection::domain::detection::Detection;
use crate::tracking::domain::track::{Keyframe, Track};
use crate::tracking::domain::tracker_config::TrackerConfig;

/// What one call to [`TrackAssociator::update`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameAssociation {
    /// Tracks eligible for matching this frame.
    pub eligible: usize,
    /// Detections absorbed by existing tracks.
    pub matched: usize,
    /// New tracks started from unclaimed detections.
    pub spawned: usize,
}

/// Owns all track state for one run. Tracks are never removed; a track that
/// has gone unmatched for more than `max_frame_gap` frames simply stops
/// being offered detections.
pub struct TrackAssociator {
    tracks: Vec<Track>,
    next_id: u32,
    max_frame_gap: usize,
    match_distance: f64,
    max_size_difference: f64,
}

impl TrackAssociator {
    pub fn new(config: &TrackerConfig, fps: f64) -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 0,
            max_frame_gap: config.max_frame_gap(fps),
            match_distance: config.match_distance,
            max_size_difference: config.max_size_difference,
        }
    }

    pub fn max_frame_gap(&self) -> usize {
        self.max_frame_gap
    }

    /// All tracks so far, in ascending ID order.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn into_tracks(self) -> Vec<Track> {
        self.tracks
    }

    /// Tracks that would be offered detections at `frame_index`.
    pub fn eligible_count(&self, frame_index: usize) -> usize {
        self.tracks
            .iter()
            .filter(|t| self.is_eligible(t, frame_index))
            .count()
    }

    /// Feeds one analyzed frame. `frame_index` must not decrease between calls.
    pub fn update(
        &mut self,
        frame_index: usize,
        timestamp: f64,
        detections: &[Detection],
    ) -> FrameAssociation {
        let mut claimed = vec![false; detections.len()];
        let mut result = FrameAssociation::default();

        for ti in 0..self.tracks.len() {
            if !self.is_eligible(&self.tracks[ti], frame_index) {
                continue;
            }
            result.eligible += 1;

            let Some(di) = self.nearest_match(&self.tracks[ti], detections, &claimed) else {
                continue;
            };
            claimed[di] = true;
            let keyframe = Keyframe::from_detection(timestamp, &detections[di]);
            self.tracks[ti].append(keyframe, frame_index);
            result.matched += 1;
        }

        for (det, _) in detections.iter().zip(&claimed).filter(|(_, c)| !**c) {
            self.spawn(Keyframe::from_detection(timestamp, det), frame_index);
            result.spawned += 1;
        }

        result
    }

    fn is_eligible(&self, track: &Track, frame_index: usize) -> bool {
        frame_index.saturating_sub(track.last_seen_frame()) <= self.max_frame_gap
    }

    /// Index of the closest unclaimed detection satisfying both bounds.
    /// Ties keep the earliest detection.
    fn nearest_match(
        &self,
        track: &Track,
        detections: &[Detection],
        claimed: &[bool],
    ) -> Option<usize> {
        let last = track.last_keyframe()?;
        let mut best_dist = self.match_distance;
        let mut best = None;

        for (i, det) in detections.iter().enumerate() {
            if claimed[i] {
                continue;
            }
            let dist = det.distance_to(last.center_x, last.center_y);
            let size_diff = det.size_difference(last.width, last.height);
            if dist < best_dist && size_diff < self.max_size_difference {
                best_dist = dist;
                best = Some(i);
            }
        }
        best
    }

    fn spawn(&mut self, first: Keyframe, frame_index: usize) {
        log::trace!("Track {} started at frame {frame_index}", self.next_id);
        self.tracks.push(Track::new(self.next_id, first, frame_index));
        self.next_id += 1;
    }
}
