use anyhow::{ensure, Result};
use log::{debug, info};
use ndarray as nd;
use opencv::{
    self as cv,
    core::{Mat, Point2f, Size, TermCriteria, Vector},
    prelude::*,
};

use crate::convert::{displacement_matrix, mat_to_bgr, mat_to_grayscale, points_to_vector};
use crate::features::{detect_corners, CornerConfig};

mod trails;
pub use trails::*;

#[derive(Debug, Clone, Copy)]
pub struct LkConfig {
    /// Search window at each pyramid level.
    pub win_size: Size,
    /// Highest pyramid level, 0 disables the pyramid.
    pub max_level: i32,
    /// Stop refining a point after this many iterations...
    pub max_iterations: i32,
    /// ...or once the search window moves less than this.
    pub epsilon: f64,
    /// Points whose spatial gradient matrix has a smaller minimal eigenvalue are dropped.
    pub min_eigen_threshold: f64,
}

impl Default for LkConfig {
    fn default() -> Self {
        Self {
            win_size: Size::new(15, 15),
            max_level: 2,
            max_iterations: 10,
            epsilon: 0.03,
            min_eigen_threshold: 1e-4,
        }
    }
}

impl LkConfig {
    pub fn criteria(&self) -> TermCriteria {
        TermCriteria {
            typ: cv::core::TermCriteria_COUNT + cv::core::TermCriteria_EPS,
            max_count: self.max_iterations,
            epsilon: self.epsilon,
        }
    }

    /// Runs pyramidal Lucas-Kanade on `points` and returns the pairs that were
    /// found in `next`. Lost points are simply left out.
    pub fn calc_tracks(&self, prev: &Mat, next: &Mat, points: &[Point2f]) -> Result<Vec<Track>> {
        if points.is_empty() {
            return Ok(Vec::new());
        }

        let prev_pts = points_to_vector(points);
        let mut next_pts = Vector::<Point2f>::new();
        let mut status = Vector::<u8>::new();
        let mut err = Vector::<f32>::new();
        cv::video::calc_optical_flow_pyr_lk(
            prev,
            next,
            &prev_pts,
            &mut next_pts,
            &mut status,
            &mut err,
            self.win_size,
            self.max_level,
            self.criteria(),
            0,
            self.min_eigen_threshold,
        )?;
        ensure!(
            next_pts.len() == points.len() && status.len() == points.len(),
            "optical flow returned {} points and {} statuses for {} inputs",
            next_pts.len(),
            status.len(),
            points.len()
        );

        Ok(points
            .iter()
            .zip(next_pts.iter())
            .zip(status.iter())
            .filter(|(_, found)| *found == 1)
            .map(|((&from, to), _)| Track::new(from, to))
            .collect())
    }
}

/// A point followed from one frame into the next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Track {
    pub from: Point2f,
    pub to: Point2f,
}

impl Track {
    pub fn new(from: Point2f, to: Point2f) -> Self {
        Self { from, to }
    }

    pub fn displacement(&self) -> Point2f {
        Point2f::new(self.to.x - self.from.x, self.to.y - self.from.y)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrackedFrame {
    pub tracks: Vec<Track>,
    pub lost: usize,
    pub reseeded: bool,
}

impl TrackedFrame {
    pub fn mean_motion(&self) -> Option<Point2f> {
        let mean = displacement_matrix(&self.tracks).mean_axis(nd::Axis(0))?;
        Some(Point2f::new(mean[0], mean[1]))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TrackerConfig {
    pub corners: CornerConfig,
    pub lk: LkConfig,
    /// Detect new corners once fewer points than this survive. Tracking always
    /// reseeds when nothing is left.
    pub min_tracked_points: usize,
}

/// Follows corners across consecutive frames and accumulates their paths.
pub struct PointTracker {
    config: TrackerConfig,
    previous_gray: Mat,
    points: Vec<Point2f>,
    trails: TrailCanvas,
}

impl PointTracker {
    pub fn new(first_frame: &Mat, config: TrackerConfig) -> Result<Self> {
        ensure!(!first_frame.empty(), "first frame is empty");
        let gray = mat_to_grayscale(first_frame)?;
        let points = detect_corners(&gray, &config.corners)?;
        info!("tracking {} initial corners", points.len());
        let trails = TrailCanvas::new(first_frame.size()?)?;
        Ok(Self {
            config,
            previous_gray: gray,
            points,
            trails,
        })
    }

    pub fn points(&self) -> &[Point2f] {
        &self.points
    }

    pub fn trails(&self) -> &Mat {
        self.trails.mat()
    }

    pub fn track(&mut self, frame: &Mat) -> Result<TrackedFrame> {
        let gray = mat_to_grayscale(frame)?;
        let (expected, actual) = (self.previous_gray.size()?, gray.size()?);
        ensure!(
            expected == actual,
            "frame size changed from {}x{} to {}x{}",
            expected.width,
            expected.height,
            actual.width,
            actual.height
        );

        let tracks = self
            .config
            .lk
            .calc_tracks(&self.previous_gray, &gray, &self.points)?;
        let lost = self.points.len() - tracks.len();
        self.points = tracks.iter().map(|t| t.to).collect();

        let mut reseeded = false;
        if self.points.len() < self.config.min_tracked_points.max(1) {
            self.points = detect_corners(&gray, &self.config.corners)?;
            reseeded = true;
            info!("reseeded tracker with {} corners", self.points.len());
        }
        debug!("{} tracks, {} lost", tracks.len(), lost);

        self.previous_gray = gray;
        Ok(TrackedFrame {
            tracks,
            lost,
            reseeded,
        })
    }

    /// Extends the trails with this frame's tracks and returns the frame, as
    /// BGR, with the trails and the current point positions drawn over it.
    pub fn render(&mut self, frame: &Mat, tracked: &TrackedFrame) -> Result<Mat> {
        let mut out = mat_to_bgr(frame)?;
        for track in &tracked.tracks {
            self.trails.draw_segment(track)?;
            draw_point(&mut out, track.to)?;
        }
        self.trails.overlay(&out)
    }

    pub fn clear_trails(&mut self) -> Result<()> {
        self.trails.clear()
    }
}
