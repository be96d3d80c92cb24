/// A face box as reported by a detector: top-left corner plus size, all
/// normalized to the frame (fractions of frame width/height).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawDetection {
    pub xmin: f64,
    pub ymin: f64,
    pub width: f64,
    pub height: f64,
    pub confidence: f64,
}

/// A face box in the form the tracker matches on: center plus size.
///
/// Ephemeral; lives for one analyzed frame unless a track absorbs it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
    pub confidence: f64,
}

impl RawDetection {
    pub fn normalize(&self) -> Detection {
        Detection {
            center_x: self.xmin + self.width / 2.0,
            center_y: self.ymin + self.height / 2.0,
            width: self.width,
            height: self.height,
            confidence: self.confidence,
        }
    }
}

/// Converts a frame's detector output into tracker detections, preserving order.
pub fn normalize_all(raw: &[RawDetection]) -> Vec<Detection> {
    raw.iter().map(RawDetection::normalize).collect()
}

impl Detection {
    /// Euclidean distance between box centers.
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        let dx = self.center_x - x;
        let dy = self.center_y - y;
        (dx * dx + dy * dy).sqrt()
    }

    /// `|dw| + |dh|` against another box size.
    pub fn size_difference(&self, width: f64, height: f64) -> f64 {
        (self.width - width).abs() + (self.height - height).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn raw(xmin: f64, ymin: f64, width: f64, height: f64) -> RawDetection {
        RawDetection {
            xmin,
            ymin,
            width,
            height,
            confidence: 0.87,
        }
    }

    #[test]
    fn test_normalize_computes_center() {
        let det = raw(0.2, 0.1, 0.3, 0.4).normalize();
        assert_relative_eq!(det.center_x, 0.35);
        assert_relative_eq!(det.center_y, 0.3);
    }

    #[test]
    fn test_normalize_passes_size_and_confidence_through() {
        let det = raw(0.2, 0.1, 0.3, 0.4).normalize();
        assert_relative_eq!(det.width, 0.3);
        assert_relative_eq!(det.height, 0.4);
        assert_relative_eq!(det.confidence, 0.87);
    }

    #[test]
    fn test_normalize_does_not_clamp() {
        // Boxes hanging off the frame edge keep their reported geometry.
        let det = raw(-0.1, 0.9, 0.2, 0.3).normalize();
        assert_relative_eq!(det.center_x, 0.0);
        assert_relative_eq!(det.center_y, 1.05);
    }

    #[test]
    fn test_normalize_all_preserves_order() {
        let dets = normalize_all(&[raw(0.0, 0.0, 0.2, 0.2), raw(0.6, 0.6, 0.2, 0.2)]);
        assert_eq!(dets.len(), 2);
        assert_relative_eq!(dets[0].center_x, 0.1);
        assert_relative_eq!(dets[1].center_x, 0.7);
    }

    #[test]
    fn test_normalize_all_empty() {
        assert!(normalize_all(&[]).is_empty());
    }

    #[test]
    fn test_distance_to() {
        let det = raw(0.0, 0.0, 0.2, 0.2).normalize(); // center (0.1, 0.1)
        assert_relative_eq!(det.distance_to(0.4, 0.5), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_size_difference() {
        let det = raw(0.0, 0.0, 0.2, 0.3).normalize();
        assert_relative_eq!(det.size_difference(0.25, 0.2), 0.15, epsilon = 1e-12);
    }
}
