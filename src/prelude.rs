pub use crate::background::{BackgroundConfig, Blob, Detection, MotionDetector};
pub use crate::capture::{FrameReader, FrameSource, VideoSource};
pub use crate::features::CornerConfig;
pub use crate::flow::{LkConfig, PointTracker, Track, TrackedFrame, TrackerConfig};
pub use crate::pipeline::{RunLimits, RunSummary};
pub use crate::sink::{FrameSink, NullSink, SnapshotSink, Window};
