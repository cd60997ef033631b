use std::path::Path;
use std::sync::Mutex;

use anyhow::Error;
use ndarray::ArrayView3;
use opencv::core::{Mat, MatTraitConst, MatTraitConstManual, Scalar, Size, CV_32F};
use opencv::dnn::{blob_from_image, read_net_from_tensorflow, Net, NetTrait};

use crate::utils::geometry::{Coordinate2D, PoseKeypoints};

const POSE_MODEL_FILE: &str = "pose_model.pb";
const POSE_CONFIG_FILE: &str = "pose_model.pbtxt";

const POSE_NET_INPUT: i32 = 368;
/// Minimum heatmap peak accepted as a detected joint.
const POSE_CONFIDENCE_THRESHOLD: f32 = 0.2;
/// COCO-layout part count emitted by the OpenPose-style net.
const POSE_PART_COUNT: usize = 18;

/// Optional body pose estimator. Absence of the model files is a capability
/// downgrade reported at construction; body metrics then depend entirely on
/// caller-provided keypoints.
pub struct PoseEstimator {
    net: Mutex<Net>,
}

impl PoseEstimator {
    /// Returns `Ok(None)` when the pose model is not on disk.
    pub fn new(model_dir: &Path) -> Result<Option<Self>, Error> {
        let model_path = model_dir.join(POSE_MODEL_FILE);
        let config_path = model_dir.join(POSE_CONFIG_FILE);
        if !model_path.exists() || !config_path.exists() {
            log::warn!(
                "capability downgrade: pose model not found in {}, body keypoints must be supplied by the caller",
                model_dir.display()
            );
            return Ok(None);
        }

        let net = match read_net_from_tensorflow(
            &model_path.to_string_lossy(),
            &config_path.to_string_lossy(),
        ) {
            Ok(net) => net,
            Err(err) => {
                log::warn!(
                    "capability downgrade: pose model in {} failed to load ({err}), body keypoints must be supplied by the caller",
                    model_dir.display()
                );
                return Ok(None);
            }
        };
        Ok(Some(PoseEstimator {
            net: Mutex::new(net),
        }))
    }

    /// Runs pose inference and collects named keypoints. Joints whose heatmap
    /// peak falls below the confidence threshold stay absent.
    pub fn estimate(&self, image: &Mat) -> Result<PoseKeypoints, Error> {
        let frame_w = image.cols();
        let frame_h = image.rows();
        if frame_w == 0 || frame_h == 0 {
            return Ok(PoseKeypoints::default());
        }

        let blob = blob_from_image(
            image,
            1.0 / 255.0,
            Size::new(POSE_NET_INPUT, POSE_NET_INPUT),
            Scalar::default(),
            true,
            false,
            CV_32F,
        )?;

        let output = {
            let mut net = self
                .net
                .lock()
                .map_err(|_| Error::msg("pose net mutex poisoned"))?;
            net.set_input(&blob, "", 1.0, Scalar::default())?;
            net.forward_single("")?
        };

        // Output layout: [1, parts, map_h, map_w] heatmaps.
        let sizes = output.mat_size();
        if sizes.len() < 4 {
            return Err(Error::msg("unexpected pose net output dimensionality"));
        }
        let parts = (sizes[1] as usize).min(POSE_PART_COUNT);
        let map_h = sizes[2] as usize;
        let map_w = sizes[3] as usize;

        let data = output.data_typed::<f32>()?;
        let maps = ArrayView3::from_shape((parts, map_h, map_w), &data[..parts * map_h * map_w])?;

        let mut joints: Vec<Option<Coordinate2D>> = Vec::with_capacity(parts);
        for part in 0..parts {
            let map = maps.index_axis(ndarray::Axis(0), part);
            let mut best = f32::MIN;
            let mut best_xy = (0usize, 0usize);
            for ((y, x), &v) in map.indexed_iter() {
                if v > best {
                    best = v;
                    best_xy = (x, y);
                }
            }
            if best > POSE_CONFIDENCE_THRESHOLD {
                joints.push(Some(Coordinate2D::new(
                    best_xy.0 as f32 * frame_w as f32 / map_w as f32,
                    best_xy.1 as f32 * frame_h as f32 / map_h as f32,
                )));
            } else {
                joints.push(None);
            }
        }

        Ok(keypoints_from_coco(&joints))
    }
}

/// Maps COCO part indices onto the named keypoint struct. In the COCO layout
/// indices 2-4 and 8-10 are the subject's right side, 5-7 and 11-13 the left.
fn keypoints_from_coco(joints: &[Option<Coordinate2D>]) -> PoseKeypoints {
    let at = |i: usize| joints.get(i).copied().flatten();
    PoseKeypoints {
        nose: at(0),
        neck: at(1),
        right_shoulder: at(2),
        left_shoulder: at(5),
        right_elbow: at(3),
        left_elbow: at(6),
        right_wrist: at(4),
        left_wrist: at(7),
        torso_mid: None,
        right_hip: at(8),
        left_hip: at(11),
        right_knee: at(9),
        left_knee: at(12),
        right_ankle: at(10),
        left_ankle: at(13),
    }
}
