use anyhow::Error;
use opencv::core::{Mat, MatTraitConst, MatTraitConstManual, Size, Vec3b, BORDER_DEFAULT, CV_64F};
use opencv::imgproc::{cvt_color, gaussian_blur, laplacian, resize, COLOR_BGR2HSV, INTER_AREA};

use crate::config::config::AnalysisConfig;
use crate::metrics::{Band, DescendingBands, MetricRecord};
use crate::utils::image::to_grayscale;

pub const SKIN_TEXTURE: &str = "skin_texture";
pub const SKIN_TONE: &str = "skin_tone";

pub const NOTE_TONE_NORMAL: &str = "tone_normal";
pub const NOTE_TONE_YELLOWISH: &str = "tone_yellowish";
pub const NOTE_TONE_PALE: &str = "tone_pale";
pub const NOTE_TONE_REDDISH: &str = "tone_reddish";
pub const NOTE_TEXTURE_HIGH: &str = "texture_high";

/// Minimum ROI side length for texture and tone sampling to be meaningful.
const MIN_ROI_SIDE: i32 = 10;

/// Mean HSV channel values sampled over a face region. Hue follows the
/// half-degree convention (0..180).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneStats {
    pub hue: f64,
    pub saturation: f64,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneClass {
    Normal,
    YellowishTint,
    OtherTint,
}

impl ToneClass {
    /// Aggregation contribution; any detected tint reads as a mild deficit
    /// rather than a failure.
    pub fn contribution(self) -> f64 {
        match self {
            ToneClass::Normal => 1.0,
            ToneClass::YellowishTint | ToneClass::OtherTint => 0.6,
        }
    }

    pub fn band(self) -> Band {
        match self {
            ToneClass::Normal => Band::Good,
            ToneClass::YellowishTint | ToneClass::OtherTint => Band::Fair,
        }
    }
}

/// Classifies mean skin tone into coarse advisory classes. The hue gates sit
/// on the sallow band (yellowish), low-saturation dark values (pale) and the
/// red wrap-around (flushed); everything else is normal.
pub fn classify_tone(stats: ToneStats) -> (ToneClass, &'static str) {
    if (20.0..=40.0).contains(&stats.hue) && stats.saturation > 100.0 {
        (ToneClass::YellowishTint, NOTE_TONE_YELLOWISH)
    } else if stats.value < 150.0 && stats.saturation < 50.0 {
        (ToneClass::OtherTint, NOTE_TONE_PALE)
    } else if (stats.hue <= 10.0 || stats.hue >= 170.0) && stats.saturation > 100.0 {
        (ToneClass::OtherTint, NOTE_TONE_REDDISH)
    } else {
        (ToneClass::Normal, NOTE_TONE_NORMAL)
    }
}

/// Samples mean HSV over the region on a sparse grid. Returns `None` when the
/// region is too small to sample.
pub fn tone_stats(roi: &Mat) -> Result<Option<ToneStats>, Error> {
    let rows = roi.rows();
    let cols = roi.cols();
    if rows < MIN_ROI_SIDE || cols < MIN_ROI_SIDE {
        return Ok(None);
    }
    let mut hsv = Mat::default();
    cvt_color(roi, &mut hsv, COLOR_BGR2HSV, 0)?;

    let step = (rows.min(cols) / 30).max(1);
    let mut sums = [0.0_f64; 3];
    let mut count = 0_u64;
    let mut y = 0;
    while y < rows {
        let mut x = 0;
        while x < cols {
            let px = hsv.at_2d::<Vec3b>(y, x)?;
            sums[0] += px[0] as f64;
            sums[1] += px[1] as f64;
            sums[2] += px[2] as f64;
            count += 1;
            x += step;
        }
        y += step;
    }
    if count == 0 {
        return Ok(None);
    }
    Ok(Some(ToneStats {
        hue: sums[0] / count as f64,
        saturation: sums[1] / count as f64,
        value: sums[2] / count as f64,
    }))
}

/// Laplacian variance of the half-scale, denoised grayscale region. Smooth
/// skin gives low variance; blemishes and strong texture push it up.
pub fn texture_variance(roi: &Mat) -> Result<Option<f64>, Error> {
    if roi.rows() < MIN_ROI_SIDE || roi.cols() < MIN_ROI_SIDE {
        return Ok(None);
    }
    let gray = to_grayscale(roi)?;

    let mut small = Mat::default();
    resize(&gray, &mut small, Size::new(0, 0), 0.5, 0.5, INTER_AREA)?;

    let mut blurred = Mat::default();
    gaussian_blur(
        &small,
        &mut blurred,
        Size::new(5, 5),
        0.0,
        0.0,
        BORDER_DEFAULT,
    )?;

    let mut lap = Mat::default();
    laplacian(&blurred, &mut lap, CV_64F, 1, 1.0, 0.0, BORDER_DEFAULT)?;

    let values = lap.data_typed::<f64>()?;
    if values.is_empty() {
        return Ok(None);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Ok(Some(variance))
}

/// Builds the texture record from a measured variance.
pub fn texture_record(variance: f64, cfg: &AnalysisConfig) -> MetricRecord {
    let band = DescendingBands {
        excellent_below: cfg.texture_smooth,
        good_below: cfg.texture_normal,
        fair_below: cfg.texture_high,
    }
    .band(variance);
    let contribution = (1.0 - variance / 100.0).max(0.0);
    let rec = MetricRecord::raw_threshold(SKIN_TEXTURE, variance, Some(contribution), band);
    if variance >= cfg.texture_high {
        rec.with_note(NOTE_TEXTURE_HIGH)
    } else {
        rec
    }
}

/// Builds the tone record from sampled stats.
pub fn tone_record(stats: ToneStats) -> MetricRecord {
    let (class, note) = classify_tone(stats);
    MetricRecord::raw_threshold(SKIN_TONE, stats.hue, Some(class.contribution()), class.band())
        .with_note(note)
}

/// Runs both skin metrics over a face region. `None` (no usable crop) yields
/// two unavailable records.
pub fn evaluate(roi: Option<&Mat>, cfg: &AnalysisConfig) -> Result<Vec<MetricRecord>, Error> {
    let Some(roi) = roi else {
        return Ok(vec![
            MetricRecord::unavailable(SKIN_TEXTURE),
            MetricRecord::unavailable(SKIN_TONE),
        ]);
    };

    let texture = match texture_variance(roi)? {
        Some(variance) => texture_record(variance, cfg),
        None => MetricRecord::unavailable(SKIN_TEXTURE),
    };
    let tone = match tone_stats(roi)? {
        Some(stats) => tone_record(stats),
        None => MetricRecord::unavailable(SKIN_TONE),
    };
    Ok(vec![texture, tone])
}
