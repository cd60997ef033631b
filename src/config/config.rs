use std::path::PathBuf;
use serde::{Deserialize, Serialize};

/// Face detection strategy requested by the caller. `Auto` starts at the top
/// of the fallback chain and settles on the first rung whose preconditions
/// hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    Auto,
    GpuMultitask,
    LandmarkClassical,
    NeuralNet,
    Cascade,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectorConfig {
    pub method: DetectionMethod,
    pub use_gpu: bool,
    /// Minimum detector confidence accepted as a positive detection, in [0,1].
    pub confidence_threshold: f32,
    /// Directory holding model files; its absence downgrades capability, it
    /// never fails pipeline construction.
    pub model_dir: PathBuf,
}

impl DetectorConfig {
    pub fn new() -> Self {
        DetectorConfig {
            method: DetectionMethod::Auto,
            use_gpu: true,
            confidence_threshold: 0.5,
            model_dir: PathBuf::from("models"),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Thresholds and reference ranges for the metric engines. The numeric values
/// are empirically chosen constants carried over from the reference data; they
/// are kept as named configuration rather than recomputed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    /// Eye-level symmetry below this raises the asymmetry-noted flag.
    pub eye_level_flag_threshold: f64,
    /// Facial symmetry below this raises the sleeping-position rule.
    pub symmetry_flag_threshold: f64,
    /// Spine angles at or beyond this many degrees from vertical clamp the
    /// alignment score to -1.0.
    pub spine_angle_cap_deg: f64,
    /// Laplacian-variance bands for skin texture: below `texture_smooth` is
    /// Excellent, below `texture_normal` Good, below `texture_high` Fair.
    pub texture_smooth: f64,
    pub texture_normal: f64,
    pub texture_high: f64,
    /// Eye aspect ratios below these mark High and Moderate fatigue.
    pub ear_high_fatigue: f64,
    pub ear_moderate_fatigue: f64,
    /// Eye-bag ratio (percent of face height) bands.
    pub eye_bags_mild: f64,
    pub eye_bags_moderate: f64,
    /// Reference range for jaw-width / face-height; measurements outside it
    /// clamp to the nearest bound.
    pub fullness_ref_low: f64,
    pub fullness_ref_high: f64,
}

impl AnalysisConfig {
    pub fn new() -> Self {
        AnalysisConfig {
            eye_level_flag_threshold: 0.7,
            symmetry_flag_threshold: 0.7,
            spine_angle_cap_deg: 30.0,
            texture_smooth: 20.0,
            texture_normal: 40.0,
            texture_high: 60.0,
            ear_high_fatigue: 0.2,
            ear_moderate_fatigue: 0.3,
            eye_bags_mild: 20.0,
            eye_bags_moderate: 40.0,
            fullness_ref_low: 0.55,
            fullness_ref_high: 0.95,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Relative weights used when aggregating facial metrics into a category
/// score. Weights are re-normalized over the metrics actually present, so
/// unavailable metrics never drag the score toward zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FacialWeights {
    pub symmetry: f64,
    pub eye_level: f64,
    pub texture: f64,
    pub eye_fatigue: f64,
    pub tone: f64,
    pub golden_ratio: f64,
    pub fullness: f64,
    pub eye_bags: f64,
}

impl FacialWeights {
    pub fn new() -> Self {
        FacialWeights {
            symmetry: 2.5,
            eye_level: 1.5,
            texture: 1.0,
            eye_fatigue: 1.0,
            tone: 0.5,
            golden_ratio: 0.5,
            fullness: 0.5,
            eye_bags: 0.5,
        }
    }

    pub fn weight_for(&self, metric: &str) -> f64 {
        match metric {
            "facial_symmetry" => self.symmetry,
            "eye_level_symmetry" => self.eye_level,
            "skin_texture" => self.texture,
            "eye_fatigue" => self.eye_fatigue,
            "skin_tone" => self.tone,
            "golden_ratio_harmony" => self.golden_ratio,
            "facial_fullness" => self.fullness,
            "eye_bags" => self.eye_bags,
            _ => 1.0,
        }
    }
}

impl Default for FacialWeights {
    fn default() -> Self {
        Self::new()
    }
}

/// Body metrics carry equal weight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BodyWeights {
    pub spine_alignment: f64,
    pub shoulder_symmetry: f64,
    pub hip_symmetry: f64,
    pub weight_distribution: f64,
}

impl BodyWeights {
    pub fn new() -> Self {
        BodyWeights {
            spine_alignment: 1.0,
            shoulder_symmetry: 1.0,
            hip_symmetry: 1.0,
            weight_distribution: 1.0,
        }
    }

    pub fn weight_for(&self, metric: &str) -> f64 {
        match metric {
            "spine_alignment" => self.spine_alignment,
            "shoulder_symmetry" => self.shoulder_symmetry,
            "hip_symmetry" => self.hip_symmetry,
            "weight_distribution" => self.weight_distribution,
            _ => 1.0,
        }
    }
}

impl Default for BodyWeights {
    fn default() -> Self {
        Self::new()
    }
}

/// Weighting of the facial vs body category when both subjects were analyzed.
pub const FACIAL_CATEGORY_WEIGHT: f64 = 0.6;
pub const BODY_CATEGORY_WEIGHT: f64 = 0.4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_detector_config_targets_auto() {
        let cfg = DetectorConfig::new();
        assert_eq!(cfg.method, DetectionMethod::Auto);
        assert!((cfg.confidence_threshold - 0.5).abs() < 1e-6);
    }

    #[test]
    fn method_serializes_snake_case() {
        let json = serde_json::to_string(&DetectionMethod::GpuMultitask).unwrap();
        assert_eq!(json, "\"gpu_multitask\"");
        let back: DetectionMethod = serde_json::from_str("\"landmark_classical\"").unwrap();
        assert_eq!(back, DetectionMethod::LandmarkClassical);
    }

    #[test]
    fn unknown_metric_weight_defaults_to_one() {
        let w = FacialWeights::new();
        assert!((w.weight_for("facial_symmetry") - 2.5).abs() < 1e-6);
        assert!((w.weight_for("something_else") - 1.0).abs() < 1e-6);
    }
}
