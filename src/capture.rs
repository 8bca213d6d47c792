use std::{collections::VecDeque, fmt, str::FromStr};

use anyhow::{bail, Result};
use log::info;
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture},
};

/// Where frames come from: a camera index or anything `VideoCapture` can open
/// by name (file path, stream URL).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    Device(i32),
    Path(String),
}

impl Default for VideoSource {
    fn default() -> Self {
        Self::Device(1)
    }
}

impl FromStr for VideoSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            bail!("video source must not be empty");
        }
        if s.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(Self::Device(s.parse()?));
        }
        Ok(Self::Path(s.to_string()))
    }
}

impl fmt::Display for VideoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device(index) => write!(f, "device #{index}"),
            Self::Path(path) => write!(f, "{path}"),
        }
    }
}

/// Next frame, `None` once the stream is exhausted.
pub trait FrameReader {
    fn read_frame(&mut self) -> Result<Option<Mat>>;
}

/// Replays frames that are already in memory.
impl FrameReader for VecDeque<Mat> {
    fn read_frame(&mut self) -> Result<Option<Mat>> {
        Ok(self.pop_front())
    }
}

pub struct FrameSource {
    source: VideoSource,
    capture: VideoCapture,
}

impl FrameSource {
    pub fn open(source: VideoSource) -> Result<Self> {
        let capture = match &source {
            VideoSource::Device(index) => VideoCapture::new(*index, videoio::CAP_ANY)?,
            VideoSource::Path(path) => VideoCapture::from_file(path, videoio::CAP_ANY)?,
        };
        if !capture.is_opened()? {
            bail!("failed to open video source {source}");
        }
        info!("opened video source {source}");
        Ok(Self { source, capture })
    }

    pub fn source(&self) -> &VideoSource {
        &self.source
    }

    pub fn frame_rate(&self) -> Option<f64> {
        self.capture
            .get(videoio::CAP_PROP_FPS)
            .ok()
            .filter(|&fps| fps > 0.0)
    }
}

impl FrameReader for FrameSource {
    fn read_frame(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        if !self.capture.read(&mut frame)? || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        if let Err(e) = self.capture.release() {
            log::warn!("failed to release {}: {e}", self.source);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device() {
        assert_eq!("0".parse::<VideoSource>().unwrap(), VideoSource::Device(0));
        assert_eq!(" 1 ".parse::<VideoSource>().unwrap(), VideoSource::Device(1));
    }

    #[test]
    fn test_parse_path() {
        assert_eq!(
            "clips/walk.mp4".parse::<VideoSource>().unwrap(),
            VideoSource::Path("clips/walk.mp4".to_string())
        );
        assert_eq!(
            "rtsp://cam.local/1".parse::<VideoSource>().unwrap(),
            VideoSource::Path("rtsp://cam.local/1".to_string())
        );
    }

    #[test]
    fn test_parse_empty() {
        assert!("".parse::<VideoSource>().is_err());
        assert!("   ".parse::<VideoSource>().is_err());
    }

    #[test]
    fn test_default_is_second_camera() {
        assert_eq!(VideoSource::default(), VideoSource::Device(1));
        assert_eq!(VideoSource::default().to_string(), "device #1");
    }

    #[test]
    fn test_replay_in_order() -> Result<()> {
        let zero = opencv::core::Scalar::all(0.0);
        let mut frames: VecDeque<Mat> = (1..=3)
            .map(|rows| Mat::new_rows_cols_with_default(rows, 4, opencv::core::CV_8UC1, zero))
            .collect::<opencv::Result<_>>()?;
        for rows in 1..=3 {
            assert_eq!(frames.read_frame()?.map(|f| f.rows()), Some(rows));
        }
        assert!(frames.read_frame()?.is_none());
        Ok(())
    }

    #[test]
    fn test_file_ends_with_none() -> Result<()> {
        use crate::testing::{square_frame, HEIGHT, WIDTH};
        use opencv::{core::Size, videoio::VideoWriter};

        let dir = std::env::temp_dir().join(format!("opencv-motion-clip-{}", std::process::id()));
        std::fs::create_dir_all(&dir)?;
        let path = dir.join("square.avi").to_string_lossy().into_owned();

        let fourcc = VideoWriter::fourcc('M', 'J', 'P', 'G')?;
        let mut writer = VideoWriter::new(&path, fourcc, 10.0, Size::new(WIDTH, HEIGHT), true)?;
        assert!(writer.is_opened()?);
        for i in 0..5 {
            writer.write(&square_frame(20 + i * 4, 30)?)?;
        }
        writer.release()?;

        let mut source = FrameSource::open(VideoSource::Path(path))?;
        let mut frames = 0;
        while let Some(frame) = source.read_frame()? {
            assert_eq!(frame.cols(), WIDTH);
            assert_eq!(frame.rows(), HEIGHT);
            frames += 1;
        }
        assert_eq!(frames, 5);
        assert!(source.read_frame()?.is_none());

        drop(source);
        std::fs::remove_dir_all(&dir)?;
        Ok(())
    }

    #[test]
    fn test_open_missing_file() {
        let source = VideoSource::Path("/nonexistent/motion-clip.avi".to_string());
        assert!(FrameSource::open(source).is_err());
    }
}
