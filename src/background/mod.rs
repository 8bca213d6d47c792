use anyhow::{ensure, Result};
use log::debug;
use opencv::{
    self as cv,
    core::{Mat, Point, Ptr, Size, Vector},
    prelude::*,
    video::{BackgroundSubtractorMOG2, BackgroundSubtractorTrait},
};

mod blob;
pub use blob::*;

#[derive(Debug, Clone, Copy)]
pub struct BackgroundConfig {
    pub history: i32,
    /// Squared Mahalanobis distance above which a pixel is foreground.
    pub var_threshold: f64,
    /// Mark shadows (gray, 127) separately from foreground (white, 255).
    pub detect_shadows: bool,
    /// Model update rate, negative picks it from `history`.
    pub learning_rate: f64,
    /// Diameter of the elliptical kernel used to open the foreground mask.
    pub kernel_size: i32,
    /// Blobs with a smaller contour area are ignored.
    pub min_area: f64,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            history: 500,
            var_threshold: 16.0,
            detect_shadows: true,
            learning_rate: -1.0,
            kernel_size: 3,
            min_area: 500.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Detection {
    pub mask: Mat,
    pub blobs: Vec<Blob>,
}

/// Finds moving objects by subtracting an adaptive Gaussian mixture
/// background model from every frame.
pub struct MotionDetector {
    config: BackgroundConfig,
    subtractor: Ptr<BackgroundSubtractorMOG2>,
    kernel: Mat,
}

impl MotionDetector {
    pub fn new(config: BackgroundConfig) -> Result<Self> {
        ensure!(config.history > 0, "history must be positive");
        ensure!(config.kernel_size > 0, "kernel size must be positive");

        let subtractor = cv::video::create_background_subtractor_mog2(
            config.history,
            config.var_threshold,
            config.detect_shadows,
        )?;
        let kernel = cv::imgproc::get_structuring_element(
            cv::imgproc::MORPH_ELLIPSE,
            Size::new(config.kernel_size, config.kernel_size),
            Point::new(-1, -1),
        )?;
        Ok(Self {
            config,
            subtractor,
            kernel,
        })
    }

    pub fn config(&self) -> &BackgroundConfig {
        &self.config
    }

    /// Updates the background model with `frame` and returns the cleaned
    /// foreground mask together with the blobs large enough to report.
    pub fn apply(&mut self, frame: &Mat) -> Result<Detection> {
        ensure!(!frame.empty(), "input frame is empty");

        let mut raw = Mat::default();
        BackgroundSubtractorTrait::apply(
            &mut self.subtractor,
            frame,
            &mut raw,
            self.config.learning_rate,
        )?;

        let mut mask = Mat::default();
        cv::imgproc::morphology_ex(
            &raw,
            &mut mask,
            cv::imgproc::MORPH_OPEN,
            &self.kernel,
            Point::new(-1, -1),
            1,
            cv::core::BORDER_CONSTANT,
            cv::imgproc::morphology_default_border_value()?,
        )?;

        let contours = find_external_contours(&mask)?;
        let blobs = measure_contours(&contours, self.config.min_area)?;
        debug!("{} contours, {} blobs", contours.len(), blobs.len());

        Ok(Detection { mask, blobs })
    }
}

fn find_external_contours(mask: &Mat) -> Result<Vec<Vec<Point>>> {
    let mut contours = Vector::<Vector<Point>>::new();
    cv::imgproc::find_contours(
        mask,
        &mut contours,
        cv::imgproc::RETR_EXTERNAL,
        cv::imgproc::CHAIN_APPROX_SIMPLE,
        Point::new(0, 0),
    )?;
    Ok(contours.iter().map(|c| c.to_vec()).collect())
}
