use std::path::Path;
use std::sync::Mutex;

use anyhow::Error;
use opencv::core::{Mat, MatTraitConst, MatTraitConstManual, Scalar, Size, CV_32F};
use opencv::dnn::{blob_from_image, read_net_from_onnx, Net, NetTrait};

use crate::detector::{cascade::CascadeDetector, BackendKind, FaceDetector};
use crate::error::BackendError;
use crate::utils::geometry::{BoundingBox, Coordinate2D, LandmarkSet, FACIAL_LANDMARK_COUNT};
use crate::utils::image::face_roi;

const LANDMARK_MODEL_FILE: &str = "face_landmarks_68.onnx";

/// The regression head consumes a square face crop and emits one (x, y) pair
/// per canonical landmark, normalized to the crop.
const LANDMARK_NET_INPUT: i32 = 112;
const LANDMARK_OUTPUT_LEN: usize = FACIAL_LANDMARK_COUNT * 2;

/// Classical detector paired with a 68-point landmark regression net. Face
/// boxes come from the Haar cascade; landmarks from the regression head run
/// over each face crop.
pub struct LandmarkClassicalDetector {
    faces: CascadeDetector,
    landmark_net: Mutex<Net>,
    kind: BackendKind,
}

impl LandmarkClassicalDetector {
    pub fn new(model_dir: &Path, use_cuda: bool) -> Result<Self, BackendError> {
        let kind = if use_cuda {
            BackendKind::GpuMultitask
        } else {
            BackendKind::LandmarkClassical
        };

        let model_path = model_dir.join(LANDMARK_MODEL_FILE);
        if !model_path.exists() {
            return Err(BackendError::BackendUnavailable {
                method: kind.as_str().to_string(),
                reason: format!("{LANDMARK_MODEL_FILE} not found in {}", model_dir.display()),
            });
        }

        let mut landmark_net = read_net_from_onnx(&model_path.to_string_lossy()).map_err(|e| {
            BackendError::BackendUnavailable {
                method: kind.as_str().to_string(),
                reason: e.to_string(),
            }
        })?;

        if use_cuda {
            landmark_net
                .set_preferable_backend(opencv::dnn::DNN_BACKEND_CUDA)
                .and_then(|_| landmark_net.set_preferable_target(opencv::dnn::DNN_TARGET_CUDA))
                .map_err(|e| BackendError::BackendUnavailable {
                    method: kind.as_str().to_string(),
                    reason: format!("CUDA backend selection failed: {e}"),
                })?;
        }

        let faces = CascadeDetector::new(model_dir)?;

        Ok(LandmarkClassicalDetector {
            faces,
            landmark_net: Mutex::new(landmark_net),
            kind,
        })
    }
}

impl FaceDetector for LandmarkClassicalDetector {
    fn detect(&self, image: &Mat) -> Result<Vec<BoundingBox>, Error> {
        self.faces.detect(image)
    }

    fn supports_landmarks(&self) -> bool {
        true
    }

    fn extract_landmarks(&self, image: &Mat, bbox: &BoundingBox) -> Result<LandmarkSet, Error> {
        let Some(roi) = face_roi(image, bbox)? else {
            return Ok(LandmarkSet::empty());
        };

        let blob = blob_from_image(
            &roi,
            1.0 / 255.0,
            Size::new(LANDMARK_NET_INPUT, LANDMARK_NET_INPUT),
            Scalar::default(),
            false,
            false,
            CV_32F,
        )?;

        let output = {
            let mut net = self
                .landmark_net
                .lock()
                .map_err(|_| Error::msg("landmark net mutex poisoned"))?;
            net.set_input(&blob, "", 1.0, Scalar::default())?;
            net.forward_single("")?
        };

        let data = output.data_typed::<f32>()?;
        if data.len() < LANDMARK_OUTPUT_LEN {
            return Err(Error::msg(format!(
                "landmark net produced {} values, expected {LANDMARK_OUTPUT_LEN}",
                data.len()
            )));
        }

        // Outputs are normalized to the crop; map back into image pixels.
        let points = (0..FACIAL_LANDMARK_COUNT)
            .map(|i| {
                Coordinate2D::new(
                    bbox.x as f32 + data[2 * i] * bbox.width as f32,
                    bbox.y as f32 + data[2 * i + 1] * bbox.height as f32,
                )
            })
            .collect();

        Ok(LandmarkSet::from_points(points))
    }

    fn kind(&self) -> BackendKind {
        self.kind
    }
}
