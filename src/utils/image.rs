use anyhow::Error;
use opencv::core::{Mat, MatTraitConst, Rect, Vector};
use opencv::imgcodecs::{imdecode, IMREAD_COLOR};
use opencv::imgproc::{cvt_color, COLOR_BGR2GRAY};

use crate::utils::geometry::BoundingBox;

/// Decodes encoded image bytes into a BGR matrix.
pub fn decode_image(im_bytes: &[u8]) -> Result<Mat, Error> {
    let buf = Vector::<u8>::from_slice(im_bytes);
    let img = imdecode(&buf, IMREAD_COLOR)?;
    Ok(img)
}

pub fn to_grayscale(img: &Mat) -> Result<Mat, Error> {
    let mut gray = Mat::default();
    cvt_color(img, &mut gray, COLOR_BGR2GRAY, 0)?;
    Ok(gray)
}

/// Extracts the face region as an owned matrix. The box is re-clamped against
/// the actual matrix dimensions before cropping.
pub fn face_roi(img: &Mat, bbox: &BoundingBox) -> Result<Option<Mat>, Error> {
    let img_w = img.cols();
    let img_h = img.rows();
    let clamped = BoundingBox::from_corners_clamped(
        bbox.x,
        bbox.y,
        bbox.x + bbox.width,
        bbox.y + bbox.height,
        img_w,
        img_h,
    );
    let Some(b) = clamped else {
        return Ok(None);
    };
    let rect = Rect::new(b.x, b.y, b.width, b.height);
    let roi = Mat::roi(img, rect)?.try_clone()?;
    Ok(Some(roi))
}
