//! Per-frame hand tracking results.
//!
//! A [`TrackingSample`] carries what a hand-landmark detector reports for one
//! camera frame: zero or more hands, each 21 normalized keypoints in the
//! MediaPipe Hands layout.  Only the first hand is ever played.
//!
//! The JSON wire shape follows the detector's result object, one object per
//! line:
//!
//! ```text
//! {"multiHandLandmarks": [[{"x":0.51,"y":0.62,"z":-0.03}, … 21 points …]]}
//! {"multiHandLandmarks": null}
//! {}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ThereminError;

/// Keypoints per hand.
pub const LANDMARK_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const INDEX_FINGER_TIP: usize = 8;

/// Skeleton edges between landmark indices, for drawing.
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    // thumb
    (0, 1), (1, 2), (2, 3), (3, 4),
    // index
    (0, 5), (5, 6), (6, 7), (7, 8),
    // middle
    (5, 9), (9, 10), (10, 11), (11, 12),
    // ring
    (9, 13), (13, 14), (14, 15), (15, 16),
    // pinky + palm edge
    (13, 17), (0, 17), (17, 18), (18, 19), (19, 20),
];

/// One keypoint in normalized image coordinates.
///
/// `x` and `y` run 0.0–1.0 across the frame (`y` = 0.0 is the top); `z` is
/// relative depth and may be omitted on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64) -> Self { Landmark { x, y, z } }
}

/// The landmark set of one detected hand.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hand {
    pub landmarks: Vec<Landmark>,
}

/// Landmark offsets (dx, dy) from the index fingertip for a relaxed hand
/// pointing upward, in normalized units.
const POINTING_SHAPE: [(f64, f64); LANDMARK_COUNT] = [
    ( 0.00,  0.36),                                          // wrist
    (-0.07,  0.32), (-0.11,  0.26), (-0.12,  0.20), (-0.12,  0.15), // thumb
    ( 0.00,  0.19), ( 0.00,  0.12), ( 0.00,  0.06), ( 0.00,  0.00), // index
    ( 0.04,  0.19), ( 0.05,  0.21), ( 0.05,  0.25), ( 0.04,  0.27), // middle (curled)
    ( 0.07,  0.20), ( 0.08,  0.22), ( 0.08,  0.26), ( 0.07,  0.28), // ring (curled)
    ( 0.10,  0.22), ( 0.11,  0.24), ( 0.11,  0.27), ( 0.10,  0.29), // pinky (curled)
];

impl Hand {
    pub fn new(landmarks: Vec<Landmark>) -> Self { Hand { landmarks } }

    /// A stylized pointing hand whose index fingertip sits at `(x, y)`.
    ///
    /// Used by sources that only know where the fingertip is.
    pub fn pointing_at(x: f64, y: f64) -> Self {
        let landmarks = POINTING_SHAPE
            .iter()
            .map(|&(dx, dy)| Landmark::new(x + dx, y + dy, 0.0))
            .collect();
        Hand { landmarks }
    }

    pub fn landmark(&self, index: usize) -> Option<&Landmark> {
        self.landmarks.get(index)
    }
}

/// Raw detector result as it appears on the wire.
#[derive(Deserialize)]
struct DetectorResult {
    #[serde(default, rename = "multiHandLandmarks", alias = "hands")]
    multi_hand_landmarks: Option<Vec<Hand>>,
}

/// One detector result.  Discarded after its frame is processed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackingSample {
    pub hands: Vec<Hand>,
}

impl TrackingSample {
    /// A frame in which no hand was detected.
    pub fn empty() -> Self { TrackingSample::default() }

    pub fn with_hand(hand: Hand) -> Self {
        TrackingSample { hands: vec![hand] }
    }

    /// Decode one JSON detector result.
    pub fn from_json(line: &str) -> Result<Self, ThereminError> {
        let raw: DetectorResult = serde_json::from_str(line)?;
        Ok(TrackingSample { hands: raw.multi_hand_landmarks.unwrap_or_default() })
    }

    /// The only hand that is played.
    pub fn primary_hand(&self) -> Option<&Hand> {
        self.hands.first()
    }

    /// Vertical position of landmark `index` on the primary hand.
    ///
    /// `None` when there is no hand, the landmark is missing, or the
    /// coordinate is not a finite number.
    pub fn landmark_y(&self, index: usize) -> Option<f64> {
        self.primary_hand()
            .and_then(|h| h.landmark(index))
            .map(|l| l.y)
            .filter(|y| y.is_finite())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn hand_json(tip_y: f64) -> String {
        let points: Vec<String> = (0..LANDMARK_COUNT)
            .map(|i| {
                let y = if i == INDEX_FINGER_TIP { tip_y } else { 0.5 };
                format!("{{\"x\":0.5,\"y\":{},\"z\":0.0}}", y)
            })
            .collect();
        format!("[{}]", points.join(","))
    }

    #[test]
    fn decode_single_hand() {
        let line = format!("{{\"multiHandLandmarks\":[{}]}}", hand_json(0.3));
        let s = TrackingSample::from_json(&line).unwrap();
        assert_eq!(s.hands.len(), 1);
        assert_eq!(s.hands[0].landmarks.len(), LANDMARK_COUNT);
        assert_eq!(s.landmark_y(INDEX_FINGER_TIP), Some(0.3));
    }

    #[test]
    fn decode_null_and_missing_as_no_hand() {
        for line in ["{\"multiHandLandmarks\":null}", "{}", "{\"multiHandLandmarks\":[]}"] {
            let s = TrackingSample::from_json(line).unwrap();
            assert!(s.primary_hand().is_none(), "{}", line);
            assert_eq!(s.landmark_y(INDEX_FINGER_TIP), None);
        }
    }

    #[test]
    fn z_is_optional() {
        let s = TrackingSample::from_json("{\"hands\":[[{\"x\":0.1,\"y\":0.2}]]}").unwrap();
        assert_eq!(s.hands[0].landmarks[0], Landmark::new(0.1, 0.2, 0.0));
    }

    #[test]
    fn only_first_hand_is_read() {
        let line = format!(
            "{{\"multiHandLandmarks\":[{},{}]}}",
            hand_json(0.1),
            hand_json(0.9)
        );
        let s = TrackingSample::from_json(&line).unwrap();
        assert_eq!(s.landmark_y(INDEX_FINGER_TIP), Some(0.1));
    }

    #[test]
    fn short_hand_has_no_fingertip() {
        let s = TrackingSample::with_hand(Hand::new(vec![Landmark::default(); 5]));
        assert_eq!(s.landmark_y(INDEX_FINGER_TIP), None);
    }

    #[test]
    fn non_finite_coordinate_is_absent() {
        let mut hand = Hand::pointing_at(0.5, 0.5);
        hand.landmarks[INDEX_FINGER_TIP].y = f64::NAN;
        assert_eq!(TrackingSample::with_hand(hand).landmark_y(INDEX_FINGER_TIP), None);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(TrackingSample::from_json("{\"multiHandLandmarks\": [[{\"x\":").is_err());
    }

    #[test]
    fn pointing_hand_puts_tip_under_pointer() {
        let h = Hand::pointing_at(0.4, 0.2);
        assert_eq!(h.landmarks.len(), LANDMARK_COUNT);
        let tip = h.landmark(INDEX_FINGER_TIP).unwrap();
        assert_eq!((tip.x, tip.y), (0.4, 0.2));
        assert!(h.landmark(WRIST).unwrap().y > tip.y);
    }

    #[test]
    fn connections_stay_in_range() {
        for &(a, b) in HAND_CONNECTIONS.iter() {
            assert!(a < LANDMARK_COUNT && b < LANDMARK_COUNT);
        }
    }
}
