use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Error;
use opencv::core::{Mat, MatTraitConst, Rect, Size, Vector};
use opencv::objdetect::{CascadeClassifier, CascadeClassifierTrait};

use crate::detector::{BackendKind, FaceDetector};
use crate::error::BackendError;
use crate::utils::geometry::{BoundingBox, LandmarkSet};
use crate::utils::image::to_grayscale;

const CASCADE_FILE: &str = "haarcascade_frontalface_default.xml";

/// Paths probed after the configured model directory. The frontal-face
/// cascade ships with every OpenCV install, which is what makes this the
/// always-available final rung.
const SYSTEM_CASCADE_DIRS: [&str; 3] = [
    "/usr/share/opencv4/haarcascades",
    "/usr/local/share/opencv4/haarcascades",
    "/usr/share/opencv/haarcascades",
];

fn resolve_cascade_path(model_dir: &Path) -> Option<PathBuf> {
    let local = model_dir.join(CASCADE_FILE);
    if local.exists() {
        return Some(local);
    }
    SYSTEM_CASCADE_DIRS
        .iter()
        .map(|dir| Path::new(dir).join(CASCADE_FILE))
        .find(|p| p.exists())
}

/// Classical Haar-cascade face detector. Detection runs on a grayscale
/// conversion with fixed scale-factor/min-neighbor/min-size parameters; no
/// landmark capability.
pub struct CascadeDetector {
    classifier: Mutex<CascadeClassifier>,
}

impl CascadeDetector {
    pub fn new(model_dir: &Path) -> Result<Self, BackendError> {
        let path = resolve_cascade_path(model_dir).ok_or_else(|| BackendError::BackendUnavailable {
            method: BackendKind::Cascade.as_str().to_string(),
            reason: format!("{CASCADE_FILE} not found in model dir or system cascade dirs"),
        })?;

        let classifier = CascadeClassifier::new(&path.to_string_lossy()).map_err(|e| {
            BackendError::BackendUnavailable {
                method: BackendKind::Cascade.as_str().to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(CascadeDetector {
            classifier: Mutex::new(classifier),
        })
    }
}

impl FaceDetector for CascadeDetector {
    fn detect(&self, image: &Mat) -> Result<Vec<BoundingBox>, Error> {
        // Malformed bytes decode to an empty Mat, which cvt_color rejects.
        if image.cols() == 0 || image.rows() == 0 {
            return Ok(Vec::new());
        }
        let gray = to_grayscale(image)?;

        let mut faces = Vector::<Rect>::new();
        let mut classifier = self
            .classifier
            .lock()
            .map_err(|_| Error::msg("cascade classifier mutex poisoned"))?;
        classifier.detect_multi_scale(
            &gray,
            &mut faces,
            1.1,
            5,
            0,
            Size::new(30, 30),
            Size::new(0, 0),
        )?;

        Ok(faces
            .iter()
            .map(|r| BoundingBox::new(r.x, r.y, r.width, r.height))
            .collect())
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
        BackendKind::Cascade
    }
}
