use anyhow::Error;
use opencv::core::Mat;

use crate::config::config::{AnalysisConfig, BodyWeights, DetectorConfig, FacialWeights};
use crate::detector::pose::PoseEstimator;
use crate::detector::{select_backend, FaceDetector};
use crate::metrics::aggregate::{assess, CompleteAssessment, HealthAssessment, SubjectKind};
use crate::metrics::{body, facial, skin};
use crate::utils::geometry::{LandmarkSet, PoseKeypoints};
use crate::utils::image::face_roi;

/// Synchronous single-image assessment pipeline.
///
/// Backend selection happens once, at construction, by walking the fallback
/// chain; a built pipeline never changes capability afterwards. All analysis
/// entry points borrow the input frame and run on the caller's thread.
pub struct HealthPipeline {
    detector: Box<dyn FaceDetector>,
    pose: Option<PoseEstimator>,
    analysis: AnalysisConfig,
    facial_weights: FacialWeights,
    body_weights: BodyWeights,
}

impl HealthPipeline {
    /// Builds the pipeline from configuration. Fails only when no detection
    /// backend at all can be constructed; a missing pose model merely
    /// downgrades body analysis to caller-supplied keypoints.
    pub fn new(detector_config: &DetectorConfig, analysis: AnalysisConfig) -> Result<Self, Error> {
        let detector = select_backend(detector_config)?;
        let pose = PoseEstimator::new(&detector_config.model_dir)?;
        Ok(HealthPipeline {
            detector,
            pose,
            analysis,
            facial_weights: FacialWeights::new(),
            body_weights: BodyWeights::new(),
        })
    }

    pub fn backend_name(&self) -> &'static str {
        self.detector.kind().as_str()
    }

    pub fn has_pose_estimator(&self) -> bool {
        self.pose.is_some()
    }

    /// Detects and assesses every face in the frame. An image with no faces
    /// produces an empty sequence, not an error. Landmark extraction failures
    /// on an individual face degrade that face's landmark metrics to
    /// unavailable instead of aborting the frame.
    pub fn analyze_faces(&self, image: &Mat) -> Result<Vec<HealthAssessment>, Error> {
        let boxes = self.detector.detect(image)?;
        let mut assessments = Vec::with_capacity(boxes.len());

        for bbox in &boxes {
            let landmarks = if self.detector.supports_landmarks() {
                match self.detector.extract_landmarks(image, bbox) {
                    Ok(set) => set,
                    Err(err) => {
                        log::warn!("landmark extraction failed for face at {bbox:?}: {err}");
                        LandmarkSet::empty()
                    }
                }
            } else {
                LandmarkSet::empty()
            };

            let roi = face_roi(image, bbox)?;
            let mut records = facial::evaluate(&landmarks, &self.analysis);
            records.extend(skin::evaluate(roi.as_ref(), &self.analysis)?);

            assessments.push(assess(SubjectKind::Face, records, |m| {
                self.facial_weights.weight_for(m)
            }));
        }

        Ok(assessments)
    }

    /// Assesses body posture. Caller-supplied keypoints take precedence over
    /// the built-in estimator; with neither, no body assessment is produced.
    pub fn analyze_body(
        &self,
        image: &Mat,
        keypoints: Option<&PoseKeypoints>,
    ) -> Result<Option<HealthAssessment>, Error> {
        let pose = match keypoints {
            Some(kp) => kp.clone(),
            None => match &self.pose {
                Some(estimator) => estimator.estimate(image)?,
                None => return Ok(None),
            },
        };

        let records = body::evaluate(&pose, &self.analysis);
        Ok(Some(assess(SubjectKind::Body, records, |m| {
            self.body_weights.weight_for(m)
        })))
    }

    /// Runs both subjects over one frame and combines them into the final
    /// category-weighted assessment.
    pub fn analyze_complete(
        &self,
        image: &Mat,
        keypoints: Option<&PoseKeypoints>,
    ) -> Result<CompleteAssessment, Error> {
        let faces = self.analyze_faces(image)?;
        let body = self.analyze_body(image, keypoints)?;
        Ok(CompleteAssessment::combine(faces, body))
    }

    /// Decodes image bytes and runs the complete assessment.
    pub fn analyze_bytes(
        &self,
        im_bytes: &[u8],
        keypoints: Option<&PoseKeypoints>,
    ) -> Result<CompleteAssessment, Error> {
        let image = crate::utils::image::decode_image(im_bytes)?;
        self.analyze_complete(&image, keypoints)
    }
}
