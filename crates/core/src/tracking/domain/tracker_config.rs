use crate::shared::constants::{
    MATCH_DISTANCE, MAX_GAP_SECONDS, MAX_SIZE_DIFFERENCE, MIN_TRACK_DURATION,
};
use crate::shared::error::TrackingError;

/// Association and finalization tunables. All distances are in normalized
/// frame units; both match bounds are strict.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackerConfig {
    pub match_distance: f64,
    pub max_size_difference: f64,
    pub max_gap_seconds: f64,
    /// Inclusive lower bound on first-to-last keyframe span.
    pub min_track_duration: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            match_distance: MATCH_DISTANCE,
            max_size_difference: MAX_SIZE_DIFFERENCE,
            max_gap_seconds: MAX_GAP_SECONDS,
            min_track_duration: MIN_TRACK_DURATION,
        }
    }
}

impl TrackerConfig {
    /// Frames a track may go unmatched and still be eligible:
    /// `floor(fps * max_gap_seconds)`.
    pub fn max_frame_gap(&self, fps: f64) -> usize {
        (fps * self.max_gap_seconds).floor().max(0.0) as usize
    }

    pub fn validate(&self) -> Result<(), TrackingError> {
        let checks = [
            ("match distance", self.match_distance),
            ("max size difference", self.max_size_difference),
            ("max gap", self.max_gap_seconds),
            ("min track duration", self.min_track_duration),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(TrackingError::InvalidConfig(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.match_distance, 0.15);
        assert_eq!(config.max_size_difference, 0.2);
        assert_eq!(config.max_gap_seconds, 0.5);
        assert_eq!(config.min_track_duration, 1.0);
        assert!(config.validate().is_ok());
    }

    #[rstest]
    #[case::thirty(30.0, 15)]
    #[case::twenty_five(25.0, 12)]
    #[case::ntsc(29.97, 14)]
    #[case::sixty(60.0, 30)]
    #[case::one(1.0, 0)]
    fn test_max_frame_gap_floors(#[case] fps: f64, #[case] expected: usize) {
        assert_eq!(TrackerConfig::default().max_frame_gap(fps), expected);
    }

    #[test]
    fn test_negative_value_rejected() {
        let config = TrackerConfig {
            max_gap_seconds: -0.1,
            ..TrackerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TrackingError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_nan_rejected() {
        let config = TrackerConfig {
            match_distance: f64::NAN,
            ..TrackerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
