use anyhow::Result;
use opencv::{
    self as cv,
    core::{Mat, Point, Point2f, Scalar, Size, VecN},
    prelude::*,
};

use super::Track;

const TRAIL_COLOR: Scalar = VecN([0.0, 255.0, 0.0, 0.0]);
const POINT_COLOR: Scalar = VecN([0.0, 0.0, 255.0, 0.0]);
const TRAIL_THICKNESS: i32 = 2;
const POINT_RADIUS: i32 = 5;

fn to_pixel(p: Point2f) -> Point {
    Point::new(p.x as i32, p.y as i32)
}

/// Persistent layer the tracked paths are drawn onto, added over every
/// displayed frame.
#[derive(Debug)]
pub struct TrailCanvas {
    mask: Mat,
}

impl TrailCanvas {
    pub fn new(size: Size) -> Result<Self> {
        let mask = Mat::new_size_with_default(size, cv::core::CV_8UC3, Scalar::all(0.0))?;
        Ok(Self { mask })
    }

    pub fn mat(&self) -> &Mat {
        &self.mask
    }

    pub fn draw_segment(&mut self, track: &Track) -> Result<()> {
        cv::imgproc::line(
            &mut self.mask,
            to_pixel(track.to),
            to_pixel(track.from),
            TRAIL_COLOR,
            TRAIL_THICKNESS,
            cv::imgproc::LINE_8,
            0,
        )?;
        Ok(())
    }

    /// Saturating `frame + trails`, `frame` must be 3 channel BGR.
    pub fn overlay(&self, frame: &Mat) -> Result<Mat> {
        let mut out = Mat::default();
        cv::core::add(frame, &self.mask, &mut out, &cv::core::no_array(), -1)?;
        Ok(out)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.mask = Mat::new_size_with_default(
            self.mask.size()?,
            cv::core::CV_8UC3,
            Scalar::all(0.0),
        )?;
        Ok(())
    }
}

pub fn draw_point(frame: &mut Mat, at: Point2f) -> Result<()> {
    cv::imgproc::circle(
        frame,
        to_pixel(at),
        POINT_RADIUS,
        POINT_COLOR,
        -1,
        cv::imgproc::LINE_8,
        0,
    )?;
    Ok(())
}
