use serde::{Deserialize, Serialize};

pub mod aggregate;
pub mod body;
pub mod facial;
pub mod skin;

/// Qualitative category a numeric score maps into. Ordered so that a higher
/// band always compares greater; `Unavailable` sits at the bottom and never
/// participates in aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Unavailable,
    Poor,
    Fair,
    Good,
    Excellent,
}

/// Band thresholds on the 0-10 score scale. Lower bounds are closed, so a
/// score sitting exactly on a boundary takes the higher band.
pub const BAND_FAIR_FLOOR: f64 = 5.0;
pub const BAND_GOOD_FLOOR: f64 = 7.0;
pub const BAND_EXCELLENT_FLOOR: f64 = 8.5;

/// Total banding function over finite scores. Out-of-range inputs are clamped
/// to [0,10] before banding.
pub fn band_for_score(score: f64) -> Band {
    let score = score.clamp(0.0, 10.0);
    if score >= BAND_EXCELLENT_FLOOR {
        Band::Excellent
    } else if score >= BAND_GOOD_FLOOR {
        Band::Good
    } else if score >= BAND_FAIR_FLOOR {
        Band::Fair
    } else {
        Band::Poor
    }
}

/// The two shapes a metric can take. Normalized metrics live in [0,1] and
/// band through the common score table; raw-threshold metrics stay on their
/// open-ended native scale (texture variance depends on resolution and
/// lighting) and band through per-metric thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Normalized,
    RawThreshold,
}

/// Descending "lower raw value is better" thresholds for a raw metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DescendingBands {
    pub excellent_below: f64,
    pub good_below: f64,
    pub fair_below: f64,
}

impl DescendingBands {
    pub fn band(&self, raw: f64) -> Band {
        if raw < self.excellent_below {
            Band::Excellent
        } else if raw < self.good_below {
            Band::Good
        } else if raw < self.fair_below {
            Band::Fair
        } else {
            Band::Poor
        }
    }
}

/// One named measurement for a subject.
///
/// `normalized_value` doubles as the metric's aggregation contribution in
/// [0,1]; `None` marks the metric unavailable, excluding it from both the
/// numerator and denominator of the weighted category mean. `note` carries a
/// fixed advisory key for the external renderer, never prose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub name: String,
    pub kind: MetricKind,
    pub raw_value: Option<f64>,
    pub normalized_value: Option<f64>,
    pub band: Band,
    pub note: Option<String>,
}

impl MetricRecord {
    /// A normalized metric; the band follows directly from the value on the
    /// common 0-10 table.
    pub fn normalized(name: &str, raw_value: f64, value: f64) -> Self {
        let value = value.clamp(0.0, 1.0);
        MetricRecord {
            name: name.to_string(),
            kind: MetricKind::Normalized,
            raw_value: Some(raw_value),
            normalized_value: Some(value),
            band: band_for_score(value * 10.0),
            note: None,
        }
    }

    /// A raw-threshold metric with an explicit band and an explicit (possibly
    /// absent) aggregation contribution.
    pub fn raw_threshold(name: &str, raw_value: f64, contribution: Option<f64>, band: Band) -> Self {
        MetricRecord {
            name: name.to_string(),
            kind: MetricKind::RawThreshold,
            raw_value: Some(raw_value),
            normalized_value: contribution.map(|c| c.clamp(0.0, 1.0)),
            band,
            note: None,
        }
    }

    /// Marks a metric whose required inputs were absent. Not an error state;
    /// the record stays in the assessment so the renderer can report it.
    pub fn unavailable(name: &str) -> Self {
        MetricRecord {
            name: name.to_string(),
            kind: MetricKind::Normalized,
            raw_value: None,
            normalized_value: None,
            band: Band::Unavailable,
            note: None,
        }
    }

    pub fn with_note(mut self, key: &str) -> Self {
        self.note = Some(key.to_string());
        self
    }

    pub fn is_available(&self) -> bool {
        self.band != Band::Unavailable
    }
}
