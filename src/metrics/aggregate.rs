use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::config::{BODY_CATEGORY_WEIGHT, FACIAL_CATEGORY_WEIGHT};
use crate::metrics::{band_for_score, body, facial, skin, Band, MetricRecord};

/// Fixed advisory keys emitted by the recommendation rules, in evaluation
/// order. Keys are stable identifiers for an external renderer, never prose.
pub const REC_SCREEN_BREAK: &str = "screen_break";
pub const REC_SLEEPING_POSITION: &str = "sleeping_position_review";
pub const REC_HYDRATION_SKINCARE: &str = "hydration_skincare";
pub const REC_ALIGNMENT_CHECK: &str = "musculoskeletal_alignment_check";
pub const REC_POSTURE_EXERCISES: &str = "posture_exercises";
pub const REC_STRENGTHEN_WEAKER_SIDE: &str = "strengthen_weaker_side";
pub const REC_BALANCE_EXERCISES: &str = "balance_exercises";
pub const REC_MAINTAIN_HABITS: &str = "maintain_healthy_habits";

/// Texture variance above this fires the skincare recommendation.
const TEXTURE_SKINCARE_THRESHOLD: f64 = 30.0;
/// Spine contribution (shifted into [0,1]) below this fires posture work.
const SPINE_POSTURE_THRESHOLD: f64 = 0.8;
const SHOULDER_STRENGTH_THRESHOLD: f64 = 0.8;
const WEIGHT_BALANCE_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    Face,
    Body,
}

/// Scored assessment for one subject: every metric record keyed by name, the
/// weighted category score on the 0-10 scale, its band, and the advisory keys
/// raised by this subject's metrics.
///
/// `overall_score` is `None` when not a single metric was available; the band
/// is `Unavailable` in that case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthAssessment {
    pub subject: SubjectKind,
    pub metrics: BTreeMap<String, MetricRecord>,
    pub overall_score: Option<f64>,
    pub overall_band: Band,
    pub recommendations: Vec<String>,
}

/// Weighted mean of the available metric contributions, re-normalized over
/// the weights of the metrics actually present, scaled to 0-10.
pub fn category_score<F>(records: &[MetricRecord], weight_for: F) -> Option<f64>
where
    F: Fn(&str) -> f64,
{
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for rec in records {
        if let Some(value) = rec.normalized_value {
            let w = weight_for(&rec.name);
            weighted_sum += w * value;
            weight_total += w;
        }
    }
    if weight_total <= 0.0 {
        return None;
    }
    Some(weighted_sum / weight_total * 10.0)
}

/// Assembles a subject assessment from its metric records. The fallback
/// advisory key is added when metrics were available but no rule fired.
pub fn assess<F>(subject: SubjectKind, records: Vec<MetricRecord>, weight_for: F) -> HealthAssessment
where
    F: Fn(&str) -> f64,
{
    let overall_score = category_score(&records, weight_for);
    let overall_band = match overall_score {
        Some(score) => band_for_score(score),
        None => Band::Unavailable,
    };
    let metrics: BTreeMap<String, MetricRecord> = records
        .into_iter()
        .map(|r| (r.name.clone(), r))
        .collect();
    let mut recommendations = recommendations_for(&metrics);
    if recommendations.is_empty() && overall_score.is_some() {
        recommendations.push(REC_MAINTAIN_HABITS.to_string());
    }
    HealthAssessment {
        subject,
        metrics,
        overall_score,
        overall_band,
        recommendations,
    }
}

fn normalized_below(metrics: &BTreeMap<String, MetricRecord>, name: &str, threshold: f64) -> bool {
    metrics
        .get(name)
        .and_then(|r| r.normalized_value)
        .map(|v| v < threshold)
        .unwrap_or(false)
}

fn raw_above(metrics: &BTreeMap<String, MetricRecord>, name: &str, threshold: f64) -> bool {
    metrics
        .get(name)
        .and_then(|r| r.raw_value)
        .map(|v| v > threshold)
        .unwrap_or(false)
}

fn has_note(metrics: &BTreeMap<String, MetricRecord>, name: &str, note: &str) -> bool {
    metrics
        .get(name)
        .and_then(|r| r.note.as_deref())
        .map(|n| n == note)
        .unwrap_or(false)
}

/// Evaluates the fixed, ordered rule list against the metric records. Rules
/// fire independently; a rule referencing an absent metric simply does not
/// fire. No fallback is added here.
pub fn recommendations_for(metrics: &BTreeMap<String, MetricRecord>) -> Vec<String> {
    let mut out = Vec::new();

    let fatigued = metrics
        .get(facial::EYE_FATIGUE)
        .map(|r| matches!(r.band, Band::Fair | Band::Poor))
        .unwrap_or(false);
    if fatigued {
        out.push(REC_SCREEN_BREAK.to_string());
    }

    if has_note(
        metrics,
        facial::FACIAL_SYMMETRY,
        facial::NOTE_SIGNIFICANT_ASYMMETRY,
    ) || has_note(metrics, facial::FACIAL_SYMMETRY, facial::NOTE_ASYMMETRY_NOTED)
    {
        out.push(REC_SLEEPING_POSITION.to_string());
    }

    if raw_above(metrics, skin::SKIN_TEXTURE, TEXTURE_SKINCARE_THRESHOLD) {
        out.push(REC_HYDRATION_SKINCARE.to_string());
    }

    if has_note(
        metrics,
        facial::EYE_LEVEL_SYMMETRY,
        facial::NOTE_ASYMMETRY_NOTED,
    ) {
        out.push(REC_ALIGNMENT_CHECK.to_string());
    }

    if normalized_below(metrics, body::SPINE_ALIGNMENT, SPINE_POSTURE_THRESHOLD) {
        out.push(REC_POSTURE_EXERCISES.to_string());
    }

    if normalized_below(metrics, body::SHOULDER_SYMMETRY, SHOULDER_STRENGTH_THRESHOLD) {
        out.push(REC_STRENGTHEN_WEAKER_SIDE.to_string());
    }

    if normalized_below(metrics, body::WEIGHT_DISTRIBUTION, WEIGHT_BALANCE_THRESHOLD) {
        out.push(REC_BALANCE_EXERCISES.to_string());
    }

    out
}

/// Full result for one frame: every detected face, the optional body subject,
/// and the category-weighted combined score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteAssessment {
    pub faces: Vec<HealthAssessment>,
    pub body: Option<HealthAssessment>,
    pub overall_score: Option<f64>,
    pub overall_band: Band,
    pub recommendations: Vec<String>,
}

impl CompleteAssessment {
    /// Combines subject assessments. The facial category is represented by
    /// the first face; when both categories scored, the combined score
    /// weights them 0.6 facial / 0.4 body, otherwise the single available
    /// category stands alone. Advisory keys merge in subject order with
    /// duplicates and per-subject fallbacks removed, re-adding the fallback
    /// only when nothing else fired.
    pub fn combine(faces: Vec<HealthAssessment>, body: Option<HealthAssessment>) -> Self {
        let facial_score = faces.first().and_then(|f| f.overall_score);
        let body_score = body.as_ref().and_then(|b| b.overall_score);

        let overall_score = match (facial_score, body_score) {
            (Some(f), Some(b)) => Some(f * FACIAL_CATEGORY_WEIGHT + b * BODY_CATEGORY_WEIGHT),
            (Some(f), None) => Some(f),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        };
        let overall_band = match overall_score {
            Some(score) => band_for_score(score),
            None => Band::Unavailable,
        };

        let mut recommendations: Vec<String> = Vec::new();
        for assessment in faces.iter().chain(body.iter()) {
            for key in &assessment.recommendations {
                if key != REC_MAINTAIN_HABITS && !recommendations.iter().any(|k| k == key) {
                    recommendations.push(key.clone());
                }
            }
        }
        if recommendations.is_empty() && overall_score.is_some() {
            recommendations.push(REC_MAINTAIN_HABITS.to_string());
        }

        CompleteAssessment {
            faces,
            body,
            overall_score,
            overall_band,
            recommendations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::config::{BodyWeights, FacialWeights};

    fn rec(name: &str, value: f64) -> MetricRecord {
        MetricRecord::normalized(name, value, value)
    }

    #[test]
    fn weights_renormalize_over_available_metrics() {
        let records = vec![
            rec(facial::FACIAL_SYMMETRY, 0.8),
            rec(facial::EYE_LEVEL_SYMMETRY, 0.6),
            MetricRecord::unavailable(facial::GOLDEN_RATIO_HARMONY),
            rec(facial::FACIAL_FULLNESS, 1.0),
        ];
        let w = FacialWeights::new();
        let score = category_score(&records, |m| w.weight_for(m)).unwrap();
        // (2.5*0.8 + 1.5*0.6 + 0.5*1.0) / (2.5 + 1.5 + 0.5) * 10
        let expected = (2.5 * 0.8 + 1.5 * 0.6 + 0.5) / 4.5 * 10.0;
        assert!((score - expected).abs() < 1e-9);
    }

    #[test]
    fn all_unavailable_yields_no_score() {
        let records = vec![
            MetricRecord::unavailable(facial::FACIAL_SYMMETRY),
            MetricRecord::unavailable(facial::EYE_LEVEL_SYMMETRY),
        ];
        let w = FacialWeights::new();
        assert!(category_score(&records, |m| w.weight_for(m)).is_none());
        let assessment = assess(SubjectKind::Face, records, |m| w.weight_for(m));
        assert_eq!(assessment.overall_band, Band::Unavailable);
        assert!(assessment.overall_score.is_none());
        assert!(assessment.recommendations.is_empty());
    }

    #[test]
    fn healthy_subject_gets_the_fallback_key() {
        let w = FacialWeights::new();
        let records = vec![rec(facial::FACIAL_SYMMETRY, 0.95)];
        let assessment = assess(SubjectKind::Face, records, |m| w.weight_for(m));
        assert_eq!(assessment.recommendations, vec![REC_MAINTAIN_HABITS]);
    }

    #[test]
    fn rules_fire_in_declaration_order() {
        let w = BodyWeights::new();
        let records = vec![
            rec(body::WEIGHT_DISTRIBUTION, 0.5),
            rec(body::SPINE_ALIGNMENT, 0.6),
            rec(body::SHOULDER_SYMMETRY, 0.7),
        ];
        let assessment = assess(SubjectKind::Body, records, |m| w.weight_for(m));
        assert_eq!(
            assessment.recommendations,
            vec![
                REC_POSTURE_EXERCISES,
                REC_STRENGTHEN_WEAKER_SIDE,
                REC_BALANCE_EXERCISES
            ]
        );
    }

    #[test]
    fn fatigue_band_triggers_screen_break() {
        let w = FacialWeights::new();
        let records = vec![MetricRecord::raw_threshold(
            facial::EYE_FATIGUE,
            0.18,
            Some(0.4),
            Band::Poor,
        )];
        let assessment = assess(SubjectKind::Face, records, |m| w.weight_for(m));
        assert_eq!(assessment.recommendations, vec![REC_SCREEN_BREAK]);
    }

    #[test]
    fn combined_score_weights_categories() {
        let w = FacialWeights::new();
        let bw = BodyWeights::new();
        let face = assess(SubjectKind::Face, vec![rec(facial::FACIAL_SYMMETRY, 0.9)], |m| {
            w.weight_for(m)
        });
        let body = assess(SubjectKind::Body, vec![rec(body::SPINE_ALIGNMENT, 0.8)], |m| {
            bw.weight_for(m)
        });
        let complete = CompleteAssessment::combine(vec![face], Some(body));
        let expected = 9.0 * 0.6 + 8.0 * 0.4;
        assert!((complete.overall_score.unwrap() - expected).abs() < 1e-9);
        assert_eq!(complete.overall_band, band_for_score(expected));
    }

    #[test]
    fn single_category_stands_alone() {
        let w = FacialWeights::new();
        let face = assess(SubjectKind::Face, vec![rec(facial::FACIAL_SYMMETRY, 0.9)], |m| {
            w.weight_for(m)
        });
        let complete = CompleteAssessment::combine(vec![face], None);
        assert!((complete.overall_score.unwrap() - 9.0).abs() < 1e-9);
    }

    #[test]
    fn merge_deduplicates_and_restores_fallback() {
        let w = FacialWeights::new();
        let bw = BodyWeights::new();
        let face = assess(SubjectKind::Face, vec![rec(facial::FACIAL_SYMMETRY, 0.95)], |m| {
            w.weight_for(m)
        });
        let body = assess(SubjectKind::Body, vec![rec(body::SPINE_ALIGNMENT, 0.95)], |m| {
            bw.weight_for(m)
        });
        // Each subject carries the fallback; the merge must not double it.
        let complete = CompleteAssessment::combine(vec![face], Some(body));
        assert_eq!(complete.recommendations, vec![REC_MAINTAIN_HABITS]);
    }

    #[test]
    fn assessment_serializes_round_trip() {
        let w = FacialWeights::new();
        let assessment = assess(
            SubjectKind::Face,
            vec![
                rec(facial::FACIAL_SYMMETRY, 0.65),
                MetricRecord::unavailable(facial::GOLDEN_RATIO_HARMONY),
            ],
            |m| w.weight_for(m),
        );
        let json = serde_json::to_string(&assessment).unwrap();
        let back: HealthAssessment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, assessment);
    }
}
