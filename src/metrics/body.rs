use nalgebra::Vector2;

use crate::config::config::AnalysisConfig;
use crate::metrics::{band_for_score, Band, MetricKind, MetricRecord};
use crate::utils::geometry::{angle_from_vertical_deg, Coordinate2D, PoseKeypoints};

pub const SPINE_ALIGNMENT: &str = "spine_alignment";
pub const SHOULDER_SYMMETRY: &str = "shoulder_symmetry";
pub const HIP_SYMMETRY: &str = "hip_symmetry";
pub const WEIGHT_DISTRIBUTION: &str = "weight_distribution";

pub const NOTE_FORWARD_LEAN: &str = "forward_lean";
pub const NOTE_UNEVEN_SHOULDERS: &str = "uneven_shoulders";

/// Deviation of the shoulder-midpoint to hip-midpoint axis from vertical.
///
/// The score is signed on [-1,1]: 1.0 for a perfectly vertical spine, falling
/// linearly and crossing zero at half the configured cap, clamped to -1.0 at
/// or beyond the cap.
pub fn spine_alignment(pose: &PoseKeypoints, cfg: &AnalysisConfig) -> Option<(f64, f64)> {
    let top = pose.shoulder_mid()?;
    let bottom = pose.hip_mid()?;
    let axis = Vector2::new(bottom.x - top.x, bottom.y - top.y);
    if axis.norm() == 0.0 || cfg.spine_angle_cap_deg <= 0.0 {
        return None;
    }
    let angle = angle_from_vertical_deg(axis) as f64;
    let score = (1.0 - 2.0 * (angle / cfg.spine_angle_cap_deg)).clamp(-1.0, 1.0);
    Some((score, angle))
}

fn lateral_symmetry(left: Coordinate2D, right: Coordinate2D) -> Option<(f64, f64)> {
    let width = (left.x - right.x).abs() as f64;
    if width <= 0.0 {
        return None;
    }
    let dy = (left.y - right.y).abs() as f64;
    let score = (1.0 - dy / width).clamp(0.0, 1.0);
    Some((score, dy))
}

/// Vertical levelness of the shoulder line, normalized by shoulder width.
pub fn shoulder_symmetry(pose: &PoseKeypoints) -> Option<(f64, f64)> {
    lateral_symmetry(pose.left_shoulder?, pose.right_shoulder?)
}

/// Vertical levelness of the hip line, normalized by hip width.
pub fn hip_symmetry(pose: &PoseKeypoints) -> Option<(f64, f64)> {
    lateral_symmetry(pose.left_hip?, pose.right_hip?)
}

/// Horizontal offset of the keypoint center of mass from the stance midpoint,
/// normalized by stance width and inverted. Centered weight scores 1.0.
pub fn weight_distribution(pose: &PoseKeypoints) -> Option<(f64, f64)> {
    let left_ankle = pose.left_ankle?;
    let right_ankle = pose.right_ankle?;
    let stance_width = (left_ankle.x - right_ankle.x).abs() as f64;
    if stance_width <= 0.0 {
        return None;
    }
    let points = pose.available();
    if points.is_empty() {
        return None;
    }
    let com_x = points.iter().map(|p| p.x as f64).sum::<f64>() / points.len() as f64;
    let mid_x = left_ankle.midpoint(right_ankle).x as f64;
    let offset = (com_x - mid_x).abs();
    let score = (1.0 - offset / stance_width).clamp(0.0, 1.0);
    Some((score, offset))
}

/// Runs every pose-based body metric. The signed spine score is shifted into
/// [0,1] for aggregation; its raw value stays in degrees.
pub fn evaluate(pose: &PoseKeypoints, cfg: &AnalysisConfig) -> Vec<MetricRecord> {
    let mut records = Vec::with_capacity(4);

    records.push(match spine_alignment(pose, cfg) {
        Some((score, angle)) => {
            let contribution = (score + 1.0) / 2.0;
            let rec = MetricRecord {
                name: SPINE_ALIGNMENT.to_string(),
                kind: MetricKind::RawThreshold,
                raw_value: Some(angle),
                normalized_value: Some(contribution),
                band: band_for_score(contribution * 10.0),
                note: None,
            };
            if score < 0.0 {
                rec.with_note(NOTE_FORWARD_LEAN)
            } else {
                rec
            }
        }
        None => MetricRecord::unavailable(SPINE_ALIGNMENT),
    });

    records.push(match shoulder_symmetry(pose) {
        Some((score, dy)) => {
            let rec = MetricRecord::normalized(SHOULDER_SYMMETRY, dy, score);
            if score < 0.8 {
                rec.with_note(NOTE_UNEVEN_SHOULDERS)
            } else {
                rec
            }
        }
        None => MetricRecord::unavailable(SHOULDER_SYMMETRY),
    });

    records.push(match hip_symmetry(pose) {
        Some((score, dy)) => MetricRecord::normalized(HIP_SYMMETRY, dy, score),
        None => MetricRecord::unavailable(HIP_SYMMETRY),
    });

    records.push(match weight_distribution(pose) {
        Some((score, offset)) => MetricRecord::normalized(WEIGHT_DISTRIBUTION, offset, score),
        None => MetricRecord::unavailable(WEIGHT_DISTRIBUTION),
    });

    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upright_pose() -> PoseKeypoints {
        PoseKeypoints {
            nose: Some(Coordinate2D::new(100.0, 40.0)),
            neck: Some(Coordinate2D::new(100.0, 70.0)),
            left_shoulder: Some(Coordinate2D::new(60.0, 80.0)),
            right_shoulder: Some(Coordinate2D::new(140.0, 80.0)),
            left_hip: Some(Coordinate2D::new(70.0, 200.0)),
            right_hip: Some(Coordinate2D::new(130.0, 200.0)),
            left_ankle: Some(Coordinate2D::new(75.0, 340.0)),
            right_ankle: Some(Coordinate2D::new(125.0, 340.0)),
            ..PoseKeypoints::default()
        }
    }

    #[test]
    fn vertical_spine_scores_one() {
        let cfg = AnalysisConfig::new();
        let (score, angle) = spine_alignment(&upright_pose(), &cfg).unwrap();
        assert!(angle.abs() < 1e-6);
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn spine_at_cap_clamps_to_negative_one() {
        let cfg = AnalysisConfig::new();
        let mut pose = upright_pose();
        // Hips displaced so the spine axis leans well past 30 degrees.
        pose.left_hip = Some(Coordinate2D::new(170.0, 160.0));
        pose.right_hip = Some(Coordinate2D::new(230.0, 160.0));
        let (score, angle) = spine_alignment(&pose, &cfg).unwrap();
        assert!(angle >= cfg.spine_angle_cap_deg);
        assert_eq!(score, -1.0);
    }

    #[test]
    fn spine_crosses_zero_at_half_cap() {
        let cfg = AnalysisConfig::new();
        let mut pose = upright_pose();
        // tan(15 deg) * 120px vertical drop.
        let dx = (15.0_f32.to_radians().tan()) * 120.0;
        pose.left_hip = Some(Coordinate2D::new(70.0 + dx, 200.0));
        pose.right_hip = Some(Coordinate2D::new(130.0 + dx, 200.0));
        let (score, _) = spine_alignment(&pose, &cfg).unwrap();
        assert!(score.abs() < 1e-3);
    }

    #[test]
    fn spine_record_carries_angle_and_shifted_contribution() {
        let cfg = AnalysisConfig::new();
        let mut pose = upright_pose();
        // tan(7.5 deg) * 120px drop puts the signed score at 0.5.
        let dx = (7.5_f32.to_radians().tan()) * 120.0;
        pose.left_hip = Some(Coordinate2D::new(70.0 + dx, 200.0));
        pose.right_hip = Some(Coordinate2D::new(130.0 + dx, 200.0));
        let records = evaluate(&pose, &cfg);
        let spine = records.iter().find(|r| r.name == SPINE_ALIGNMENT).unwrap();
        assert!((spine.raw_value.unwrap() - 7.5).abs() < 1e-3);
        let contribution = spine.normalized_value.unwrap();
        assert!((contribution - 0.75).abs() < 1e-3);
        // The signed score is recoverable from the contribution.
        assert!((2.0 * contribution - 1.0 - 0.5).abs() < 1e-3);
    }

    #[test]
    fn level_shoulders_score_one() {
        let (score, dy) = shoulder_symmetry(&upright_pose()).unwrap();
        assert_eq!(dy, 0.0);
        assert_eq!(score, 1.0);
    }

    #[test]
    fn dropped_shoulder_lowers_symmetry() {
        let mut pose = upright_pose();
        pose.right_shoulder = Some(Coordinate2D::new(140.0, 96.0));
        let (score, dy) = shoulder_symmetry(&pose).unwrap();
        assert!((dy - 16.0).abs() < 1e-6);
        assert!((score - 0.8).abs() < 1e-6);
    }

    #[test]
    fn centered_mass_scores_one() {
        let (score, offset) = weight_distribution(&upright_pose()).unwrap();
        assert!(offset.abs() < 1e-6);
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn missing_keypoints_make_metrics_unavailable() {
        let cfg = AnalysisConfig::new();
        let records = evaluate(&PoseKeypoints::default(), &cfg);
        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| r.band == Band::Unavailable));
    }

    #[test]
    fn missing_ankle_disables_weight_distribution_only() {
        let cfg = AnalysisConfig::new();
        let mut pose = upright_pose();
        pose.left_ankle = None;
        let records = evaluate(&pose, &cfg);
        let wd = records
            .iter()
            .find(|r| r.name == WEIGHT_DISTRIBUTION)
            .unwrap();
        assert_eq!(wd.band, Band::Unavailable);
        let spine = records.iter().find(|r| r.name == SPINE_ALIGNMENT).unwrap();
        assert!(spine.is_available());
    }
}
