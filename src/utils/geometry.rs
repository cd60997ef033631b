use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate2D {
    pub x: f32,
    pub y: f32,
}

impl Coordinate2D {
    pub fn new(x: f32, y: f32) -> Self {
        Coordinate2D { x, y }
    }

    pub fn to_point(self) -> Point2<f32> {
        Point2::new(self.x, self.y)
    }

    pub fn distance_to(self, other: Coordinate2D) -> f32 {
        (self.to_point() - other.to_point()).norm()
    }

    pub fn midpoint(self, other: Coordinate2D) -> Coordinate2D {
        Coordinate2D::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Integer pixel rectangle, origin top-left. Width and height are positive
/// for any box the detectors emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        BoundingBox { x, y, width, height }
    }

    /// Build a box from two corners, clamped to image bounds. Returns `None`
    /// when the clamped box degenerates to zero width or height.
    pub fn from_corners_clamped(
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        img_w: i32,
        img_h: i32,
    ) -> Option<Self> {
        let x1 = x1.max(0);
        let y1 = y1.max(0);
        let x2 = x2.min(img_w);
        let y2 = y2.min(img_h);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(BoundingBox::new(x1, y1, x2 - x1, y2 - y1))
    }

    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    pub fn center(&self) -> Coordinate2D {
        Coordinate2D::new(
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }
}

/// Number of points in the canonical facial landmark scheme.
pub const FACIAL_LANDMARK_COUNT: usize = 68;

/// Canonical landmark indices (68-point scheme). Index positions are stable
/// across calls so symmetric left/right features are addressable by constant.
pub mod landmark_idx {
    pub const JAW_LEFT: usize = 0;
    pub const JAW_LEFT_CHEEK: usize = 2;
    pub const JAW_LEFT_MID: usize = 4;
    pub const CHIN: usize = 8;
    pub const JAW_RIGHT_MID: usize = 12;
    pub const JAW_RIGHT: usize = 16;
    pub const LEFT_BROW_INNER: usize = 21;
    pub const RIGHT_BROW_INNER: usize = 22;
    pub const NOSE_BRIDGE: usize = 27;
    pub const NOSE_TIP: usize = 30;
    pub const NOSE_LEFT: usize = 31;
    pub const NOSE_RIGHT: usize = 35;
    pub const LEFT_EYE_OUTER: usize = 36;
    pub const LEFT_EYE_TOP: usize = 37;
    pub const LEFT_EYE_INNER: usize = 39;
    pub const LEFT_EYE_BOTTOM: usize = 41;
    pub const RIGHT_EYE_INNER: usize = 42;
    pub const RIGHT_EYE_TOP: usize = 44;
    pub const RIGHT_EYE_OUTER: usize = 45;
    pub const RIGHT_EYE_BOTTOM: usize = 46;
    pub const MOUTH_LEFT: usize = 48;
    pub const UPPER_LIP: usize = 51;
    pub const MOUTH_RIGHT: usize = 54;
}

/// Left/right landmark pairs compared against the facial midline when scoring
/// symmetry.
pub const SYMMETRY_PAIRS: [(usize, usize); 4] = [
    (landmark_idx::LEFT_EYE_OUTER, landmark_idx::RIGHT_EYE_OUTER),
    (landmark_idx::MOUTH_LEFT, landmark_idx::MOUTH_RIGHT),
    (landmark_idx::LEFT_BROW_INNER, landmark_idx::RIGHT_BROW_INNER),
    (landmark_idx::NOSE_LEFT, landmark_idx::NOSE_RIGHT),
];

/// Ordered facial landmark points. The sequence is either empty (landmarks
/// unavailable for this subject) or exactly [`FACIAL_LANDMARK_COUNT`] points
/// in the canonical indexing scheme. Callers treat an empty set as "metric
/// unavailable", never as an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSet {
    points: Vec<Coordinate2D>,
}

impl LandmarkSet {
    pub fn empty() -> Self {
        LandmarkSet { points: Vec::new() }
    }

    /// Wraps a full canonical point sequence; any other length collapses to
    /// the empty (unavailable) set.
    pub fn from_points(points: Vec<Coordinate2D>) -> Self {
        if points.len() == FACIAL_LANDMARK_COUNT {
            LandmarkSet { points }
        } else {
            LandmarkSet::empty()
        }
    }

    pub fn is_available(&self) -> bool {
        self.points.len() == FACIAL_LANDMARK_COUNT
    }

    pub fn point(&self, idx: usize) -> Option<Coordinate2D> {
        self.points.get(idx).copied()
    }

    pub fn points(&self) -> &[Coordinate2D] {
        &self.points
    }

    /// Temple-to-temple distance.
    pub fn face_width(&self) -> Option<f32> {
        let left = self.point(landmark_idx::JAW_LEFT)?;
        let right = self.point(landmark_idx::JAW_RIGHT)?;
        Some(left.distance_to(right))
    }

    /// Chin-to-nose-bridge distance.
    pub fn face_height(&self) -> Option<f32> {
        let chin = self.point(landmark_idx::CHIN)?;
        let bridge = self.point(landmark_idx::NOSE_BRIDGE)?;
        Some(chin.distance_to(bridge))
    }
}

/// Named body pose keypoints with a "point or absent" contract mirroring
/// facial landmarks: metrics that need an absent point degrade to
/// unavailable rather than failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseKeypoints {
    pub nose: Option<Coordinate2D>,
    pub neck: Option<Coordinate2D>,
    pub left_shoulder: Option<Coordinate2D>,
    pub right_shoulder: Option<Coordinate2D>,
    pub left_elbow: Option<Coordinate2D>,
    pub right_elbow: Option<Coordinate2D>,
    pub left_wrist: Option<Coordinate2D>,
    pub right_wrist: Option<Coordinate2D>,
    pub torso_mid: Option<Coordinate2D>,
    pub left_hip: Option<Coordinate2D>,
    pub right_hip: Option<Coordinate2D>,
    pub left_knee: Option<Coordinate2D>,
    pub right_knee: Option<Coordinate2D>,
    pub left_ankle: Option<Coordinate2D>,
    pub right_ankle: Option<Coordinate2D>,
}

impl PoseKeypoints {
    pub fn shoulder_mid(&self) -> Option<Coordinate2D> {
        Some(self.left_shoulder?.midpoint(self.right_shoulder?))
    }

    pub fn hip_mid(&self) -> Option<Coordinate2D> {
        Some(self.left_hip?.midpoint(self.right_hip?))
    }

    /// All detected keypoints, used as a center-of-mass proxy.
    pub fn available(&self) -> Vec<Coordinate2D> {
        [
            self.nose,
            self.neck,
            self.left_shoulder,
            self.right_shoulder,
            self.left_elbow,
            self.right_elbow,
            self.left_wrist,
            self.right_wrist,
            self.torso_mid,
            self.left_hip,
            self.right_hip,
            self.left_knee,
            self.right_knee,
            self.left_ankle,
            self.right_ankle,
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Angle in degrees between a direction vector and true vertical.
pub fn angle_from_vertical_deg(v: Vector2<f32>) -> f32 {
    if v.norm() == 0.0 {
        return 0.0;
    }
    // Vertical in image coordinates points down the y axis.
    let angle = (v.x.abs()).atan2(v.y.abs());
    angle.to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_clamp_to_image_bounds() {
        let b = BoundingBox::from_corners_clamped(-10, -5, 50, 60, 100, 100).unwrap();
        assert_eq!(b, BoundingBox::new(0, 0, 50, 60));

        let b = BoundingBox::from_corners_clamped(80, 90, 200, 220, 100, 100).unwrap();
        assert_eq!(b, BoundingBox::new(80, 90, 20, 10));
    }

    #[test]
    fn degenerate_corners_yield_no_box() {
        assert!(BoundingBox::from_corners_clamped(120, 10, 140, 30, 100, 100).is_none());
        assert!(BoundingBox::from_corners_clamped(10, 10, 10, 30, 100, 100).is_none());
    }

    #[test]
    fn short_landmark_sequences_collapse_to_empty() {
        let set = LandmarkSet::from_points(vec![Coordinate2D::new(1.0, 2.0); 5]);
        assert!(!set.is_available());
        assert!(set.point(0).is_none());
    }

    #[test]
    fn full_landmark_sequence_is_available() {
        let set = LandmarkSet::from_points(vec![Coordinate2D::new(1.0, 2.0); FACIAL_LANDMARK_COUNT]);
        assert!(set.is_available());
        assert!(set.point(landmark_idx::NOSE_TIP).is_some());
    }

    #[test]
    fn vertical_vector_has_zero_deviation() {
        let a = angle_from_vertical_deg(Vector2::new(0.0, 10.0));
        assert!(a.abs() < 1e-6);
        let a = angle_from_vertical_deg(Vector2::new(10.0, 10.0));
        assert!((a - 45.0).abs() < 1e-4);
    }

    #[test]
    fn pose_midpoints_require_both_sides() {
        let mut pose = PoseKeypoints::default();
        pose.left_shoulder = Some(Coordinate2D::new(10.0, 20.0));
        assert!(pose.shoulder_mid().is_none());
        pose.right_shoulder = Some(Coordinate2D::new(30.0, 24.0));
        let mid = pose.shoulder_mid().unwrap();
        assert!((mid.x - 20.0).abs() < 1e-6);
        assert!((mid.y - 22.0).abs() < 1e-6);
    }
}
