use crate::config::config::AnalysisConfig;
use crate::metrics::{Band, MetricRecord};
use crate::utils::geometry::{landmark_idx, LandmarkSet, SYMMETRY_PAIRS};

/// Golden ratio reference for facial proportion scoring.
pub const GOLDEN_RATIO: f64 = 1.618;

pub const FACIAL_SYMMETRY: &str = "facial_symmetry";
pub const EYE_LEVEL_SYMMETRY: &str = "eye_level_symmetry";
pub const GOLDEN_RATIO_HARMONY: &str = "golden_ratio_harmony";
pub const FACIAL_FULLNESS: &str = "facial_fullness";
pub const EYE_FATIGUE: &str = "eye_fatigue";
pub const EYE_BAGS: &str = "eye_bags";

/// Advisory keys attached to facial metric records.
pub const NOTE_SIGNIFICANT_ASYMMETRY: &str = "significant_asymmetry";
pub const NOTE_ASYMMETRY_NOTED: &str = "asymmetry_noted";
pub const NOTE_FATIGUE_HIGH: &str = "eye_fatigue_high";
pub const NOTE_FATIGUE_MODERATE: &str = "eye_fatigue_moderate";
pub const NOTE_EYE_BAGS_MODERATE: &str = "eye_bags_moderate";

/// Discrete fatigue levels derived from the averaged eye aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatigueLevel {
    Low,
    Moderate,
    High,
}

impl FatigueLevel {
    pub fn from_ear(ear: f64, cfg: &AnalysisConfig) -> Self {
        if ear < cfg.ear_high_fatigue {
            FatigueLevel::High
        } else if ear < cfg.ear_moderate_fatigue {
            FatigueLevel::Moderate
        } else {
            FatigueLevel::Low
        }
    }

    /// Aggregation contribution in [0,1].
    pub fn contribution(self) -> f64 {
        match self {
            FatigueLevel::Low => 1.0,
            FatigueLevel::Moderate => 0.7,
            FatigueLevel::High => 0.4,
        }
    }

    pub fn band(self) -> Band {
        match self {
            FatigueLevel::Low => Band::Excellent,
            FatigueLevel::Moderate => Band::Fair,
            FatigueLevel::High => Band::Poor,
        }
    }
}

/// Mirror-offset symmetry across the vertical midline through the nose tip.
///
/// Each symmetric pair contributes the absolute difference between its left
/// and right horizontal distances from the midline; the mean difference is
/// normalized by face width and inverted. A perfectly mirrored face scores
/// exactly 1.0.
pub fn symmetry(landmarks: &LandmarkSet) -> Option<(f64, f64)> {
    let midline = landmarks.point(landmark_idx::NOSE_TIP)?.x as f64;
    let face_width = landmarks.face_width()? as f64;
    if face_width <= 0.0 {
        return None;
    }
    let mut total = 0.0;
    for (left_idx, right_idx) in SYMMETRY_PAIRS {
        let left = landmarks.point(left_idx)?.x as f64;
        let right = landmarks.point(right_idx)?.x as f64;
        let left_offset = (midline - left).abs();
        let right_offset = (right - midline).abs();
        total += (left_offset - right_offset).abs();
    }
    let mean_diff = total / SYMMETRY_PAIRS.len() as f64;
    let score = (1.0 - mean_diff / face_width).clamp(0.0, 1.0);
    Some((score, mean_diff))
}

/// Vertical alignment of the two upper eyelids, normalized by face height.
pub fn eye_level(landmarks: &LandmarkSet) -> Option<(f64, f64)> {
    let left = landmarks.point(landmark_idx::LEFT_EYE_TOP)?;
    let right = landmarks.point(landmark_idx::RIGHT_EYE_TOP)?;
    let face_height = landmarks.face_height()? as f64;
    if face_height <= 0.0 {
        return None;
    }
    let dy = (left.y - right.y).abs() as f64;
    let score = (1.0 - dy / face_height).clamp(0.0, 1.0);
    Some((score, dy))
}

/// Proximity of the brow-to-nose / nose-to-mouth proportion to the golden
/// ratio. Never negative; degenerate segment lengths make it unavailable.
pub fn golden_ratio(landmarks: &LandmarkSet) -> Option<(f64, f64)> {
    let brow = landmarks.point(landmark_idx::LEFT_BROW_INNER)?;
    let bridge = landmarks.point(landmark_idx::NOSE_BRIDGE)?;
    let lip = landmarks.point(landmark_idx::UPPER_LIP)?;
    let upper = brow.distance_to(bridge) as f64;
    let lower = bridge.distance_to(lip) as f64;
    if lower <= 0.0 {
        return None;
    }
    let ratio = upper / lower;
    let score = (1.0 - (ratio - GOLDEN_RATIO).abs() / GOLDEN_RATIO).max(0.0);
    Some((score, ratio))
}

/// Jaw-width to face-height proportion mapped linearly onto a reference range.
pub fn fullness(landmarks: &LandmarkSet, cfg: &AnalysisConfig) -> Option<(f64, f64)> {
    let left = landmarks.point(landmark_idx::JAW_LEFT_MID)?;
    let right = landmarks.point(landmark_idx::JAW_RIGHT_MID)?;
    let face_height = landmarks.face_height()? as f64;
    if face_height <= 0.0 {
        return None;
    }
    let span = cfg.fullness_ref_high - cfg.fullness_ref_low;
    if span <= 0.0 {
        return None;
    }
    let ratio = left.distance_to(right) as f64 / face_height;
    let score = ((ratio - cfg.fullness_ref_low) / span).clamp(0.0, 1.0);
    Some((score, ratio))
}

/// Averaged eye aspect ratio: eyelid opening over eye width, per eye.
pub fn eye_aspect_ratio(landmarks: &LandmarkSet) -> Option<f64> {
    let left_h = landmarks
        .point(landmark_idx::LEFT_EYE_TOP)?
        .distance_to(landmarks.point(landmark_idx::LEFT_EYE_BOTTOM)?) as f64;
    let left_w = landmarks
        .point(landmark_idx::LEFT_EYE_OUTER)?
        .distance_to(landmarks.point(landmark_idx::LEFT_EYE_INNER)?) as f64;
    let right_h = landmarks
        .point(landmark_idx::RIGHT_EYE_TOP)?
        .distance_to(landmarks.point(landmark_idx::RIGHT_EYE_BOTTOM)?) as f64;
    let right_w = landmarks
        .point(landmark_idx::RIGHT_EYE_INNER)?
        .distance_to(landmarks.point(landmark_idx::RIGHT_EYE_OUTER)?) as f64;
    if left_w <= 0.0 || right_w <= 0.0 {
        return None;
    }
    Some((left_h / left_w + right_h / right_w) / 2.0)
}

/// Infraorbital extent (lower eyelid to nose wing) as a percentage of face
/// height. Larger values indicate more pronounced eye bags.
pub fn eye_bags_ratio(landmarks: &LandmarkSet) -> Option<f64> {
    let eyelid = landmarks.point(landmark_idx::LEFT_EYE_BOTTOM)?;
    let nose_wing = landmarks.point(landmark_idx::NOSE_LEFT)?;
    let face_height = landmarks.face_height()? as f64;
    if face_height <= 0.0 {
        return None;
    }
    Some(eyelid.distance_to(nose_wing) as f64 / face_height * 100.0)
}

/// Runs every landmark-based facial metric and returns one record per metric,
/// with unavailable records for anything the landmark set cannot support.
pub fn evaluate(landmarks: &LandmarkSet, cfg: &AnalysisConfig) -> Vec<MetricRecord> {
    let mut records = Vec::with_capacity(6);

    records.push(match symmetry(landmarks) {
        Some((score, mean_diff)) => {
            let rec = MetricRecord::normalized(FACIAL_SYMMETRY, mean_diff, score);
            if score < 0.6 {
                rec.with_note(NOTE_SIGNIFICANT_ASYMMETRY)
            } else if score < cfg.symmetry_flag_threshold {
                rec.with_note(NOTE_ASYMMETRY_NOTED)
            } else {
                rec
            }
        }
        None => MetricRecord::unavailable(FACIAL_SYMMETRY),
    });

    records.push(match eye_level(landmarks) {
        Some((score, dy)) => {
            let rec = MetricRecord::normalized(EYE_LEVEL_SYMMETRY, dy, score);
            if score < cfg.eye_level_flag_threshold {
                rec.with_note(NOTE_ASYMMETRY_NOTED)
            } else {
                rec
            }
        }
        None => MetricRecord::unavailable(EYE_LEVEL_SYMMETRY),
    });

    records.push(match golden_ratio(landmarks) {
        Some((score, ratio)) => MetricRecord::normalized(GOLDEN_RATIO_HARMONY, ratio, score),
        None => MetricRecord::unavailable(GOLDEN_RATIO_HARMONY),
    });

    records.push(match fullness(landmarks, cfg) {
        Some((score, ratio)) => MetricRecord::normalized(FACIAL_FULLNESS, ratio, score),
        None => MetricRecord::unavailable(FACIAL_FULLNESS),
    });

    records.push(match eye_aspect_ratio(landmarks) {
        Some(ear) => {
            let level = FatigueLevel::from_ear(ear, cfg);
            let rec = MetricRecord::raw_threshold(
                EYE_FATIGUE,
                ear,
                Some(level.contribution()),
                level.band(),
            );
            match level {
                FatigueLevel::High => rec.with_note(NOTE_FATIGUE_HIGH),
                FatigueLevel::Moderate => rec.with_note(NOTE_FATIGUE_MODERATE),
                FatigueLevel::Low => rec,
            }
        }
        None => MetricRecord::unavailable(EYE_FATIGUE),
    });

    records.push(match eye_bags_ratio(landmarks) {
        Some(ratio) => {
            let band = crate::metrics::DescendingBands {
                excellent_below: cfg.eye_bags_mild,
                good_below: cfg.eye_bags_moderate,
                fair_below: cfg.eye_bags_moderate * 1.5,
            }
            .band(ratio);
            let contribution = (1.0 - ratio / 100.0).max(0.0);
            let rec = MetricRecord::raw_threshold(EYE_BAGS, ratio, Some(contribution), band);
            if ratio >= cfg.eye_bags_moderate {
                rec.with_note(NOTE_EYE_BAGS_MODERATE)
            } else {
                rec
            }
        }
        None => MetricRecord::unavailable(EYE_BAGS),
    });

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::geometry::{Coordinate2D, FACIAL_LANDMARK_COUNT};

    /// A synthetic upright, mirror-symmetric face centered on x = 100.
    fn symmetric_face() -> Vec<Coordinate2D> {
        let mut pts = vec![Coordinate2D::new(100.0, 100.0); FACIAL_LANDMARK_COUNT];
        pts[landmark_idx::JAW_LEFT] = Coordinate2D::new(20.0, 120.0);
        pts[landmark_idx::JAW_RIGHT] = Coordinate2D::new(180.0, 120.0);
        pts[landmark_idx::JAW_LEFT_MID] = Coordinate2D::new(40.0, 200.0);
        pts[landmark_idx::JAW_RIGHT_MID] = Coordinate2D::new(160.0, 200.0);
        pts[landmark_idx::CHIN] = Coordinate2D::new(100.0, 280.0);
        pts[landmark_idx::NOSE_BRIDGE] = Coordinate2D::new(100.0, 90.0);
        pts[landmark_idx::NOSE_TIP] = Coordinate2D::new(100.0, 150.0);
        pts[landmark_idx::NOSE_LEFT] = Coordinate2D::new(85.0, 160.0);
        pts[landmark_idx::NOSE_RIGHT] = Coordinate2D::new(115.0, 160.0);
        pts[landmark_idx::LEFT_BROW_INNER] = Coordinate2D::new(85.0, 80.0);
        pts[landmark_idx::RIGHT_BROW_INNER] = Coordinate2D::new(115.0, 80.0);
        pts[landmark_idx::LEFT_EYE_OUTER] = Coordinate2D::new(50.0, 110.0);
        pts[landmark_idx::LEFT_EYE_INNER] = Coordinate2D::new(80.0, 110.0);
        pts[landmark_idx::LEFT_EYE_TOP] = Coordinate2D::new(65.0, 100.0);
        pts[landmark_idx::LEFT_EYE_BOTTOM] = Coordinate2D::new(65.0, 120.0);
        pts[landmark_idx::RIGHT_EYE_OUTER] = Coordinate2D::new(150.0, 110.0);
        pts[landmark_idx::RIGHT_EYE_INNER] = Coordinate2D::new(120.0, 110.0);
        pts[landmark_idx::RIGHT_EYE_TOP] = Coordinate2D::new(135.0, 100.0);
        pts[landmark_idx::RIGHT_EYE_BOTTOM] = Coordinate2D::new(135.0, 120.0);
        pts[landmark_idx::MOUTH_LEFT] = Coordinate2D::new(70.0, 220.0);
        pts[landmark_idx::MOUTH_RIGHT] = Coordinate2D::new(130.0, 220.0);
        pts[landmark_idx::UPPER_LIP] = Coordinate2D::new(100.0, 215.0);
        pts
    }

    #[test]
    fn mirror_symmetric_face_scores_exactly_one() {
        let set = LandmarkSet::from_points(symmetric_face());
        let (score, mean_diff) = symmetry(&set).unwrap();
        assert_eq!(score, 1.0);
        assert_eq!(mean_diff, 0.0);
    }

    #[test]
    fn asymmetry_lowers_the_symmetry_score() {
        let mut pts = symmetric_face();
        pts[landmark_idx::MOUTH_RIGHT] = Coordinate2D::new(146.0, 220.0);
        let set = LandmarkSet::from_points(pts);
        let (score, _) = symmetry(&set).unwrap();
        // One pair off by 16px of 160px face width, averaged over 4 pairs.
        assert!((score - (1.0 - 4.0 / 160.0)).abs() < 1e-6);
    }

    #[test]
    fn eye_level_matches_reference_scenario() {
        let mut pts = symmetric_face();
        // Face height 190px, eyelids 19px apart vertically.
        pts[landmark_idx::NOSE_BRIDGE] = Coordinate2D::new(100.0, 90.0);
        pts[landmark_idx::CHIN] = Coordinate2D::new(100.0, 280.0);
        pts[landmark_idx::LEFT_EYE_TOP] = Coordinate2D::new(65.0, 100.0);
        pts[landmark_idx::RIGHT_EYE_TOP] = Coordinate2D::new(135.0, 119.0);
        let set = LandmarkSet::from_points(pts);
        let (score, dy) = eye_level(&set).unwrap();
        assert!((dy - 19.0).abs() < 1e-4);
        assert!((score - 0.90).abs() < 1e-6);
    }

    #[test]
    fn golden_ratio_peaks_at_phi() {
        let mut pts = symmetric_face();
        pts[landmark_idx::LEFT_BROW_INNER] = Coordinate2D::new(100.0, 90.0 - 161.8);
        pts[landmark_idx::NOSE_BRIDGE] = Coordinate2D::new(100.0, 90.0);
        pts[landmark_idx::UPPER_LIP] = Coordinate2D::new(100.0, 190.0);
        let set = LandmarkSet::from_points(pts);
        let (score, ratio) = golden_ratio(&set).unwrap();
        assert!((ratio - GOLDEN_RATIO).abs() < 1e-3);
        assert!(score > 0.999);
    }

    #[test]
    fn golden_ratio_is_never_negative() {
        let mut pts = symmetric_face();
        // Extreme proportion, far beyond phi.
        pts[landmark_idx::LEFT_BROW_INNER] = Coordinate2D::new(100.0, -900.0);
        pts[landmark_idx::UPPER_LIP] = Coordinate2D::new(100.0, 91.0);
        let set = LandmarkSet::from_points(pts);
        let (score, _) = golden_ratio(&set).unwrap();
        assert_eq!(score, 0.0);
    }

    #[test]
    fn fullness_clamps_to_reference_range() {
        let cfg = AnalysisConfig::new();
        let mut pts = symmetric_face();
        pts[landmark_idx::JAW_LEFT_MID] = Coordinate2D::new(99.0, 200.0);
        pts[landmark_idx::JAW_RIGHT_MID] = Coordinate2D::new(101.0, 200.0);
        let set = LandmarkSet::from_points(pts);
        let (score, _) = fullness(&set, &cfg).unwrap();
        assert_eq!(score, 0.0);
    }

    #[test]
    fn fatigue_levels_follow_ear_thresholds() {
        let cfg = AnalysisConfig::new();
        assert_eq!(FatigueLevel::from_ear(0.35, &cfg), FatigueLevel::Low);
        assert_eq!(FatigueLevel::from_ear(0.25, &cfg), FatigueLevel::Moderate);
        assert_eq!(FatigueLevel::from_ear(0.15, &cfg), FatigueLevel::High);
        assert!((FatigueLevel::High.contribution() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn wide_open_eyes_read_as_low_fatigue() {
        let set = LandmarkSet::from_points(symmetric_face());
        // 20px opening over 30px width.
        let ear = eye_aspect_ratio(&set).unwrap();
        assert!((ear - 20.0 / 30.0).abs() < 1e-6);
    }

    #[test]
    fn empty_landmarks_yield_all_unavailable() {
        let cfg = AnalysisConfig::new();
        let records = evaluate(&LandmarkSet::empty(), &cfg);
        assert_eq!(records.len(), 6);
        assert!(records.iter().all(|r| r.band == Band::Unavailable));
        assert!(records.iter().all(|r| r.normalized_value.is_none()));
    }

    #[test]
    fn evaluate_flags_low_eye_level() {
        let cfg = AnalysisConfig::new();
        let mut pts = symmetric_face();
        pts[landmark_idx::RIGHT_EYE_TOP] = Coordinate2D::new(135.0, 180.0);
        let records = evaluate(&LandmarkSet::from_points(pts), &cfg);
        let eye = records
            .iter()
            .find(|r| r.name == EYE_LEVEL_SYMMETRY)
            .unwrap();
        assert_eq!(eye.note.as_deref(), Some(NOTE_ASYMMETRY_NOTED));
    }
}
