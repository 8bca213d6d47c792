use anyhow::{ensure, Result};
use opencv::{
    self as cv,
    core::{Point2f, Vector},
    prelude::*,
};

#[derive(Debug, Clone, Copy)]
pub struct CornerConfig {
    pub max_corners: i32,
    /// Minimal accepted quality, relative to the best corner's eigenvalue.
    pub quality_level: f64,
    pub min_distance: f64,
    pub block_size: i32,
    /// Score with the Harris detector instead of the minimum eigenvalue.
    pub use_harris: bool,
    pub harris_k: f64,
}

impl Default for CornerConfig {
    fn default() -> Self {
        Self {
            max_corners: 100,
            quality_level: 0.3,
            min_distance: 7.0,
            block_size: 7,
            use_harris: false,
            harris_k: 0.04,
        }
    }
}

/// Finds Shi-Tomasi corners worth tracking in a grayscale image.
pub fn detect_corners(gray: &cv::core::Mat, config: &CornerConfig) -> Result<Vec<Point2f>> {
    ensure!(!gray.empty(), "input image is empty");
    ensure!(gray.channels() == 1, "input image must be grayscale");
    ensure!(config.max_corners >= 0, "max_corners must not be negative");

    let mut corners = Vector::<Point2f>::new();
    cv::imgproc::good_features_to_track(
        gray,
        &mut corners,
        config.max_corners,
        config.quality_level,
        config.min_distance,
        &cv::core::no_array(),
        config.block_size,
        config.use_harris,
        config.harris_k,
    )?;
    Ok(corners.to_vec())
}
