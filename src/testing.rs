use anyhow::Result;
use opencv::{self as cv, prelude::*};

pub const WIDTH: i32 = 160;
pub const HEIGHT: i32 = 120;

/// A black single channel image with a filled 40x40 white square at `(x, y)`.
pub fn square_image(x: i32, y: i32) -> Result<cv::core::Mat> {
    let mut img = cv::core::Mat::new_rows_cols_with_default(
        HEIGHT,
        WIDTH,
        cv::core::CV_8UC1,
        cv::core::Scalar::all(0.0),
    )?;
    cv::imgproc::rectangle(
        &mut img,
        cv::core::Rect::new(x, y, 40, 40),
        cv::core::Scalar::all(255.0),
        -1,
        cv::imgproc::LINE_8,
        0,
    )?;
    Ok(img)
}

/// Same as [`square_image`] but as a 3 channel BGR frame, like a camera delivers.
pub fn square_frame(x: i32, y: i32) -> Result<cv::core::Mat> {
    let gray = square_image(x, y)?;
    let mut frame = cv::core::Mat::default();
    cv::imgproc::cvt_color(&gray, &mut frame, cv::imgproc::COLOR_GRAY2BGR, 0)?;
    Ok(frame)
}

pub fn black_frame() -> Result<cv::core::Mat> {
    Ok(cv::core::Mat::new_rows_cols_with_default(
        HEIGHT,
        WIDTH,
        cv::core::CV_8UC3,
        cv::core::Scalar::all(0.0),
    )?)
}

pub fn count_nonzero(mat: &cv::core::Mat) -> Result<i32> {
    let gray = crate::convert::mat_to_grayscale(mat)?;
    Ok(cv::core::count_non_zero(&gray)?)
}

pub fn pixel_bgr(mat: &cv::core::Mat, x: i32, y: i32) -> Result<[u8; 3]> {
    let px = mat.at_2d::<cv::core::Vec3b>(y, x)?;
    Ok([px[0], px[1], px[2]])
}
