use std::path::Path;
use std::sync::Mutex;

use anyhow::Error;
use opencv::core::Mat;
use opencv::dnn::Net;

use crate::detector::landmark::LandmarkClassicalDetector;
use crate::detector::neural::NeuralNetDetector;
use crate::detector::{BackendKind, FaceDetector};
use crate::error::BackendError;
use crate::utils::geometry::{BoundingBox, LandmarkSet};

/// GPU-accelerated multi-task variant: the DNN face detector plus the
/// landmark regression head, both dispatched to the CUDA backend. Only
/// constructible when a CUDA device is present and both model files are on
/// disk; inference remains a blocking call from the pipeline's perspective.
pub struct GpuMultitaskDetector {
    detection_net: Mutex<Net>,
    landmarks: LandmarkClassicalDetector,
    confidence_threshold: f32,
}

impl GpuMultitaskDetector {
    pub fn new(model_dir: &Path, confidence_threshold: f32) -> Result<Self, BackendError> {
        let devices = opencv::core::get_cuda_enabled_device_count().unwrap_or(0);
        if devices <= 0 {
            return Err(BackendError::BackendUnavailable {
                method: BackendKind::GpuMultitask.as_str().to_string(),
                reason: "no CUDA-enabled device available".to_string(),
            });
        }

        let detection_net = NeuralNetDetector::load_net(model_dir, true)?;
        let landmarks = LandmarkClassicalDetector::new(model_dir, true)?;

        Ok(GpuMultitaskDetector {
            detection_net: Mutex::new(detection_net),
            landmarks,
            confidence_threshold,
        })
    }
}

impl FaceDetector for GpuMultitaskDetector {
    fn detect(&self, image: &Mat) -> Result<Vec<BoundingBox>, Error> {
        NeuralNetDetector::detect_with(&self.detection_net, image, self.confidence_threshold)
    }

    fn supports_landmarks(&self) -> bool {
        true
    }

    fn extract_landmarks(&self, image: &Mat, bbox: &BoundingBox) -> Result<LandmarkSet, Error> {
        self.landmarks.extract_landmarks(image, bbox)
    }

    fn kind(&self) -> BackendKind {
        BackendKind::GpuMultitask
    }
}
