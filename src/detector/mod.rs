use anyhow::Error;
use opencv::core::Mat;

use crate::config::config::{DetectionMethod, DetectorConfig};
use crate::error::BackendError;
use crate::utils::geometry::{BoundingBox, LandmarkSet};

pub mod cascade;
pub mod landmark;
pub mod multitask;
pub mod neural;
pub mod pose;

/// Capability-polymorphic face detection strategy.
///
/// `detect` never fails on "no face found"; it returns an empty sequence.
/// Construction is where availability is decided, so a successfully built
/// backend stays usable for the lifetime of the pipeline. Callers must check
/// `supports_landmarks` before asking for landmarks; invoking
/// `extract_landmarks` on an incapable backend surfaces
/// [`BackendError::UnsupportedOperation`] rather than silently returning
/// nothing.
pub trait FaceDetector: Send {
    fn detect(&self, image: &Mat) -> Result<Vec<BoundingBox>, Error>;

    fn supports_landmarks(&self) -> bool;

    fn extract_landmarks(&self, image: &Mat, bbox: &BoundingBox) -> Result<LandmarkSet, Error>;

    fn kind(&self) -> BackendKind;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    GpuMultitask,
    LandmarkClassical,
    NeuralNet,
    Cascade,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::GpuMultitask => "gpu_multitask",
            BackendKind::LandmarkClassical => "landmark_classical",
            BackendKind::NeuralNet => "neural_net",
            BackendKind::Cascade => "cascade",
        }
    }
}

/// The ordered fallback rungs evaluated for a requested method. Rung order is
/// fixed; requesting a lower rung simply starts the chain further down.
fn rungs_for(method: DetectionMethod, use_gpu: bool) -> Vec<BackendKind> {
    let mut rungs = Vec::with_capacity(4);
    match method {
        DetectionMethod::Auto | DetectionMethod::GpuMultitask => {
            if use_gpu {
                rungs.push(BackendKind::GpuMultitask);
            }
            rungs.push(BackendKind::LandmarkClassical);
            rungs.push(BackendKind::NeuralNet);
            rungs.push(BackendKind::Cascade);
        }
        DetectionMethod::LandmarkClassical => {
            rungs.push(BackendKind::LandmarkClassical);
            rungs.push(BackendKind::NeuralNet);
            rungs.push(BackendKind::Cascade);
        }
        DetectionMethod::NeuralNet => {
            rungs.push(BackendKind::NeuralNet);
            rungs.push(BackendKind::Cascade);
        }
        DetectionMethod::Cascade => {
            rungs.push(BackendKind::Cascade);
        }
    }
    rungs
}

/// Resolves the detection backend once at configuration time by walking the
/// fallback chain. Every unmet precondition is a non-fatal downgrade logged
/// as a single warning; construction only fails when the final cascade rung
/// is itself missing.
pub fn select_backend(config: &DetectorConfig) -> Result<Box<dyn FaceDetector>, Error> {
    if config.method == DetectionMethod::GpuMultitask && !config.use_gpu {
        log::warn!(
            "capability downgrade: '{}' requested with use_gpu disabled, starting at '{}'",
            BackendKind::GpuMultitask.as_str(),
            BackendKind::LandmarkClassical.as_str()
        );
    }
    let rungs = rungs_for(config.method, config.use_gpu);

    for kind in rungs {
        let attempt: Result<Box<dyn FaceDetector>, BackendError> = match kind {
            BackendKind::GpuMultitask => {
                multitask::GpuMultitaskDetector::new(&config.model_dir, config.confidence_threshold)
                    .map(|d| Box::new(d) as Box<dyn FaceDetector>)
            }
            BackendKind::LandmarkClassical => {
                landmark::LandmarkClassicalDetector::new(&config.model_dir, false)
                    .map(|d| Box::new(d) as Box<dyn FaceDetector>)
            }
            BackendKind::NeuralNet => {
                neural::NeuralNetDetector::new(&config.model_dir, config.confidence_threshold)
                    .map(|d| Box::new(d) as Box<dyn FaceDetector>)
            }
            BackendKind::Cascade => cascade::CascadeDetector::new(&config.model_dir)
                .map(|d| Box::new(d) as Box<dyn FaceDetector>),
        };

        match attempt {
            Ok(detector) => {
                log::info!("selected detection backend '{}'", kind.as_str());
                return Ok(detector);
            }
            Err(err) => {
                log::warn!("capability downgrade: {err}");
            }
        }
    }

    Err(Error::new(BackendError::NoBackend {
        model_dir: config.model_dir.clone(),
    }))
}
