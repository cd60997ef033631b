use std::path::Path;
use std::sync::Mutex;

use anyhow::Error;
use ndarray::ArrayView2;
use opencv::core::{Mat, MatTraitConst, MatTraitConstManual, Scalar, Size, CV_32F};
use opencv::dnn::{blob_from_image, read_net_from_caffe, Net, NetTrait};

use crate::detector::{BackendKind, FaceDetector};
use crate::error::BackendError;
use crate::utils::geometry::{BoundingBox, LandmarkSet};

const PROTOTXT_FILE: &str = "opencv_face_detector.prototxt";
const CAFFEMODEL_FILE: &str = "opencv_face_detector.caffemodel";

/// Fixed input geometry and channel means of the SSD face detection net.
const NET_INPUT_SIZE: i32 = 300;
const NET_MEAN: (f64, f64, f64) = (104.0, 117.0, 123.0);

/// Fields per detection row: [image_id, label, confidence, x1, y1, x2, y2],
/// box corners normalized to [0,1].
const DETECTION_FIELDS: usize = 7;

/// SSD-style DNN face detector. Builds a normalized input tensor from the
/// image, runs inference, and emits a clamped box for each output row whose
/// confidence exceeds the configured threshold.
pub struct NeuralNetDetector {
    net: Mutex<Net>,
    confidence_threshold: f32,
}

impl NeuralNetDetector {
    pub fn new(model_dir: &Path, confidence_threshold: f32) -> Result<Self, BackendError> {
        let net = Self::load_net(model_dir, false)?;
        Ok(NeuralNetDetector {
            net: Mutex::new(net),
            confidence_threshold,
        })
    }

    pub(crate) fn load_net(model_dir: &Path, use_cuda: bool) -> Result<Net, BackendError> {
        let method = if use_cuda {
            BackendKind::GpuMultitask
        } else {
            BackendKind::NeuralNet
        };
        let prototxt = model_dir.join(PROTOTXT_FILE);
        let caffemodel = model_dir.join(CAFFEMODEL_FILE);
        if !prototxt.exists() || !caffemodel.exists() {
            return Err(BackendError::BackendUnavailable {
                method: method.as_str().to_string(),
                reason: format!("model files {PROTOTXT_FILE}/{CAFFEMODEL_FILE} not found in {}", model_dir.display()),
            });
        }

        let mut net = read_net_from_caffe(&prototxt.to_string_lossy(), &caffemodel.to_string_lossy())
            .map_err(|e| BackendError::BackendUnavailable {
                method: method.as_str().to_string(),
                reason: e.to_string(),
            })?;

        if use_cuda {
            net.set_preferable_backend(opencv::dnn::DNN_BACKEND_CUDA)
                .and_then(|_| net.set_preferable_target(opencv::dnn::DNN_TARGET_CUDA))
                .map_err(|e| BackendError::BackendUnavailable {
                    method: method.as_str().to_string(),
                    reason: format!("CUDA backend selection failed: {e}"),
                })?;
        }

        Ok(net)
    }

    pub(crate) fn detect_with(
        net: &Mutex<Net>,
        image: &Mat,
        confidence_threshold: f32,
    ) -> Result<Vec<BoundingBox>, Error> {
        let img_w = image.cols();
        let img_h = image.rows();
        if img_w == 0 || img_h == 0 {
            return Ok(Vec::new());
        }

        let blob = blob_from_image(
            image,
            1.0,
            Size::new(NET_INPUT_SIZE, NET_INPUT_SIZE),
            Scalar::new(NET_MEAN.0, NET_MEAN.1, NET_MEAN.2, 0.0),
            false,
            false,
            CV_32F,
        )?;

        let detections = {
            let mut net = net
                .lock()
                .map_err(|_| Error::msg("detection net mutex poisoned"))?;
            net.set_input(&blob, "", 1.0, Scalar::default())?;
            net.forward_single("")?
        };

        let data = detections.data_typed::<f32>()?;
        let rows = data.len() / DETECTION_FIELDS;
        let view = ArrayView2::from_shape((rows, DETECTION_FIELDS), &data[..rows * DETECTION_FIELDS])?;

        let mut faces = Vec::new();
        for row in view.rows() {
            let confidence = row[2];
            if confidence <= confidence_threshold {
                continue;
            }
            let x1 = (row[3] * img_w as f32) as i32;
            let y1 = (row[4] * img_h as f32) as i32;
            let x2 = (row[5] * img_w as f32) as i32;
            let y2 = (row[6] * img_h as f32) as i32;
            if let Some(bbox) = BoundingBox::from_corners_clamped(x1, y1, x2, y2, img_w, img_h) {
                faces.push(bbox);
            }
        }
        Ok(faces)
    }
}

impl FaceDetector for NeuralNetDetector {
    fn detect(&self, image: &Mat) -> Result<Vec<BoundingBox>, Error> {
        Self::detect_with(&self.net, image, self.confidence_threshold)
    }

    fn supports_landmarks(&self) -> bool {
        false
    }

    fn extract_landmarks(&self, _image: &Mat, _bbox: &BoundingBox) -> Result<LandmarkSet, Error> {
        Err(Error::new(BackendError::UnsupportedOperation {
            method: self.kind().as_str().to_string(),
            operation: "extract_landmarks",
        }))
    }

    fn kind(&self) -> BackendKind {
        BackendKind::NeuralNet
    }
}
