use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use image::{GrayImage, RgbImage};
use log::{debug, info, warn};
use opencv::{self as cv, core::Mat, highgui, prelude::*};

const ESC: i32 = 27;

/// True when a `wait_key` result is the escape key.
pub fn is_escape(key: i32) -> bool {
    key & 0xFF == ESC
}

pub trait FrameSink {
    fn show(&mut self, name: &str, mat: &Mat) -> Result<()>;

    /// Called once per processed frame, returns true to end the run.
    fn poll_stop(&mut self) -> Result<bool>;
}

/// Displays frames in HighGUI windows, one per name.
pub struct Window {
    delay_ms: i32,
}

impl Window {
    pub fn new(delay_ms: i32) -> Self {
        Self { delay_ms }
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::new(30)
    }
}

impl FrameSink for Window {
    fn show(&mut self, name: &str, mat: &Mat) -> Result<()> {
        highgui::imshow(name, mat)?;
        Ok(())
    }

    fn poll_stop(&mut self) -> Result<bool> {
        Ok(is_escape(highgui::wait_key(self.delay_ms)?))
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        if let Err(e) = highgui::destroy_all_windows() {
            warn!("failed to close windows: {e}");
        }
    }
}

/// Writes every `every`-th frame of each stream as a PNG instead of showing it.
pub struct SnapshotSink {
    dir: PathBuf,
    every: usize,
    frame: usize,
}

impl SnapshotSink {
    pub fn new(dir: impl Into<PathBuf>, every: usize) -> Result<Self> {
        let dir = dir.into();
        if every == 0 {
            bail!("snapshot interval must be at least 1");
        }
        std::fs::create_dir_all(&dir)?;
        info!("writing snapshots to {}", dir.display());
        Ok(Self {
            dir,
            every,
            frame: 0,
        })
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        let stem: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect();
        self.dir.join(format!("{stem}-{:06}.png", self.frame))
    }
}

impl FrameSink for SnapshotSink {
    fn show(&mut self, name: &str, mat: &Mat) -> Result<()> {
        if self.frame % self.every != 0 {
            return Ok(());
        }
        let path = self.path_for(name);
        save_mat(mat, &path)?;
        debug!("saved {}", path.display());
        Ok(())
    }

    fn poll_stop(&mut self) -> Result<bool> {
        self.frame += 1;
        Ok(false)
    }
}

#[derive(Debug, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn show(&mut self, _name: &str, _mat: &Mat) -> Result<()> {
        Ok(())
    }

    fn poll_stop(&mut self) -> Result<bool> {
        Ok(false)
    }
}

/// Saves an 8-bit BGR frame or single channel mask through the `image` crate.
pub fn save_mat(mat: &Mat, path: &Path) -> Result<()> {
    let width = mat.cols() as u32;
    let height = mat.rows() as u32;
    match (mat.depth(), mat.channels()) {
        (cv::core::CV_8U, 1) => {
            let data = continuous_bytes(mat)?;
            GrayImage::from_raw(width, height, data)
                .ok_or_else(|| anyhow!("mask buffer does not match its size"))?
                .save(path)?;
        }
        (cv::core::CV_8U, 3) => {
            let mut rgb = Mat::default();
            cv::imgproc::cvt_color(mat, &mut rgb, cv::imgproc::COLOR_BGR2RGB, 0)?;
            let data = continuous_bytes(&rgb)?;
            RgbImage::from_raw(width, height, data)
                .ok_or_else(|| anyhow!("frame buffer does not match its size"))?
                .save(path)?;
        }
        (depth, channels) => bail!("cannot save Mat of depth {depth} with {channels} channels"),
    }
    Ok(())
}

fn continuous_bytes(mat: &Mat) -> Result<Vec<u8>> {
    if mat.is_continuous() {
        return Ok(mat.data_bytes()?.to_vec());
    }
    Ok(mat.try_clone()?.data_bytes()?.to_vec())
}
