use anyhow::Result;
use ndarray as nd;
use opencv::{
    self as cv,
    core::{Point2f, Vector},
    prelude::*,
};

use crate::flow::Track;

/// Converts a camera frame to a single channel image.
///
/// Frames coming out of `VideoCapture` are BGR ordered, so that is what is
/// assumed for 3 and 4 channel input.
pub fn mat_to_grayscale(mat: &cv::core::Mat) -> Result<cv::core::Mat> {
    let channels = mat.channels();
    if channels == 1 {
        // Mat is already grayscale, no need to convert.
        return Ok(mat.clone());
    }

    let code = match channels {
        3 => cv::imgproc::COLOR_BGR2GRAY,
        4 => cv::imgproc::COLOR_BGRA2GRAY,
        _ => {
            return Err(anyhow::anyhow!("Unsupported number of channels: {channels}"));
        }
    };

    let mut res = cv::core::Mat::default();
    cv::imgproc::cvt_color(mat, &mut res, code, 0)?;
    Ok(res)
}

/// Brings gray or BGRA frames to 3 channel BGR so colored overlays show up.
pub fn mat_to_bgr(mat: &cv::core::Mat) -> Result<cv::core::Mat> {
    let code = match mat.channels() {
        3 => return Ok(mat.clone()),
        1 => cv::imgproc::COLOR_GRAY2BGR,
        4 => cv::imgproc::COLOR_BGRA2BGR,
        channels => {
            return Err(anyhow::anyhow!("Unsupported number of channels: {channels}"));
        }
    };

    let mut res = cv::core::Mat::default();
    cv::imgproc::cvt_color(mat, &mut res, code, 0)?;
    Ok(res)
}

pub fn points_to_vector(points: &[Point2f]) -> Vector<Point2f> {
    points.iter().copied().collect()
}

pub fn vector_to_points(vector: &Vector<Point2f>) -> Vec<Point2f> {
    vector.to_vec()
}

/// Lays out the motion of every track as an `N x 2` matrix of `(dx, dy)` rows.
pub fn displacement_matrix(tracks: &[Track]) -> nd::Array2<f32> {
    let mut arr = nd::Array2::<f32>::zeros((tracks.len(), 2));
    for (mut row, track) in arr.outer_iter_mut().zip(tracks) {
        let d = track.displacement();
        row[0] = d.x;
        row[1] = d.y;
    }
    arr
}
