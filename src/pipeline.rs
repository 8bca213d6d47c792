use anyhow::{bail, Result};
use log::{debug, info};

use crate::background::{draw_blobs, BackgroundConfig, MotionDetector};
use crate::capture::FrameReader;
use crate::flow::{PointTracker, TrackerConfig};
use crate::sink::FrameSink;

pub const FLOW_WINDOW: &str = "Lucas-Kanade Optical Flow";
pub const FRAME_WINDOW: &str = "Frame";
pub const MASK_WINDOW: &str = "Foreground Mask";

#[derive(Debug, Clone, Copy, Default)]
pub struct RunLimits {
    pub max_frames: Option<usize>,
}

impl RunLimits {
    fn reached(&self, frames: usize) -> bool {
        self.max_frames.is_some_and(|max| frames >= max)
    }
}

/// `detections` counts tracks or blobs, depending on the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: usize,
    pub detections: usize,
}

/// Tracks corners of the first frame through the rest of the stream, drawing
/// their trails. The first frame only seeds the tracker and is not counted.
pub fn run_optical_flow<R, S>(
    reader: &mut R,
    config: TrackerConfig,
    sink: &mut S,
    limits: RunLimits,
) -> Result<RunSummary>
where
    R: FrameReader,
    S: FrameSink + ?Sized,
{
    let Some(first) = reader.read_frame()? else {
        bail!("failed to read the first frame");
    };
    let mut tracker = PointTracker::new(&first, config)?;

    let mut summary = RunSummary::default();
    while !limits.reached(summary.frames) {
        let Some(frame) = reader.read_frame()? else {
            info!("end of stream");
            break;
        };

        let tracked = tracker.track(&frame)?;
        if let Some(motion) = tracked.mean_motion() {
            debug!(
                "frame {}: mean motion ({:.2}, {:.2})",
                summary.frames, motion.x, motion.y
            );
        }
        let out = tracker.render(&frame, &tracked)?;
        sink.show(FLOW_WINDOW, &out)?;

        summary.frames += 1;
        summary.detections += tracked.tracks.len();
        if sink.poll_stop()? {
            info!("stopped after {} frames", summary.frames);
            break;
        }
    }
    Ok(summary)
}

/// Boxes moving objects found by background subtraction, showing both the
/// annotated frame and the cleaned foreground mask.
pub fn run_background_subtraction<R, S>(
    reader: &mut R,
    config: BackgroundConfig,
    sink: &mut S,
    limits: RunLimits,
) -> Result<RunSummary>
where
    R: FrameReader,
    S: FrameSink + ?Sized,
{
    let mut detector = MotionDetector::new(config)?;

    let mut summary = RunSummary::default();
    while !limits.reached(summary.frames) {
        let Some(mut frame) = reader.read_frame()? else {
            info!("end of stream");
            break;
        };

        let detection = detector.apply(&frame)?;
        draw_blobs(&mut frame, &detection.blobs)?;
        sink.show(FRAME_WINDOW, &frame)?;
        sink.show(MASK_WINDOW, &detection.mask)?;

        summary.frames += 1;
        summary.detections += detection.blobs.len();
        if sink.poll_stop()? {
            info!("stopped after {} frames", summary.frames);
            break;
        }
    }
    Ok(summary)
}
