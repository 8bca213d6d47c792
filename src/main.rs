//! Motion detection demos: Lucas-Kanade point tracking and MOG2 background subtraction.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use log::info;
use opencv::core::Size;
use opencv_motion::{
    pipeline::{run_background_subtraction, run_optical_flow},
    prelude::*,
};

#[derive(Parser, Debug)]
#[command(name = "opencv-motion", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Track Shi-Tomasi corners with pyramidal Lucas-Kanade optical flow.
    Lk(LkArgs),
    /// Box moving objects found by MOG2 background subtraction.
    Mog2(Mog2Args),
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Camera index or video file/stream to read.
    #[arg(long, short, default_value = "1")]
    source: VideoSource,
    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<usize>,
    /// Write frames as PNG files here instead of opening windows.
    #[arg(long, value_name = "DIR")]
    snapshot_dir: Option<PathBuf>,
    /// Neither show nor save frames, only log the summary.
    #[arg(long, conflicts_with = "snapshot_dir")]
    no_display: bool,
    /// Only keep every Nth frame when writing snapshots.
    #[arg(long, default_value_t = 1)]
    snapshot_every: usize,
    /// Milliseconds to wait for a key press between frames.
    #[arg(long, default_value_t = 30)]
    delay: i32,
}

#[derive(Args, Debug)]
struct LkArgs {
    #[command(flatten)]
    output: OutputArgs,
    #[arg(long, default_value_t = 100)]
    max_corners: i32,
    #[arg(long, default_value_t = 0.3)]
    quality_level: f64,
    #[arg(long, default_value_t = 7.0)]
    min_distance: f64,
    #[arg(long, default_value_t = 7)]
    block_size: i32,
    /// Side of the square search window.
    #[arg(long, default_value_t = 15)]
    win_size: i32,
    #[arg(long, default_value_t = 2)]
    max_level: i32,
    #[arg(long, default_value_t = 10)]
    max_iterations: i32,
    #[arg(long, default_value_t = 0.03)]
    epsilon: f64,
    /// Detect new corners when fewer points than this are left.
    #[arg(long, default_value_t = 0)]
    min_tracked_points: usize,
}

#[derive(Args, Debug)]
struct Mog2Args {
    #[command(flatten)]
    output: OutputArgs,
    #[arg(long, default_value_t = 500)]
    history: i32,
    #[arg(long, default_value_t = 16.0)]
    var_threshold: f64,
    /// Treat shadows as background noise instead of marking them.
    #[arg(long)]
    no_shadows: bool,
    /// Background update rate, negative for automatic.
    #[arg(long, default_value_t = -1.0, allow_negative_numbers = true)]
    learning_rate: f64,
    #[arg(long, default_value_t = 3)]
    kernel_size: i32,
    /// Ignore blobs smaller than this many pixels.
    #[arg(long, default_value_t = 500.0)]
    min_area: f64,
}

impl From<&LkArgs> for TrackerConfig {
    fn from(args: &LkArgs) -> Self {
        Self {
            corners: CornerConfig {
                max_corners: args.max_corners,
                quality_level: args.quality_level,
                min_distance: args.min_distance,
                block_size: args.block_size,
                ..Default::default()
            },
            lk: LkConfig {
                win_size: Size::new(args.win_size, args.win_size),
                max_level: args.max_level,
                max_iterations: args.max_iterations,
                epsilon: args.epsilon,
                ..Default::default()
            },
            min_tracked_points: args.min_tracked_points,
        }
    }
}

impl From<&Mog2Args> for BackgroundConfig {
    fn from(args: &Mog2Args) -> Self {
        Self {
            history: args.history,
            var_threshold: args.var_threshold,
            detect_shadows: !args.no_shadows,
            learning_rate: args.learning_rate,
            kernel_size: args.kernel_size,
            min_area: args.min_area,
        }
    }
}

impl OutputArgs {
    fn open(&self) -> Result<(FrameSource, Box<dyn FrameSink>, RunLimits)> {
        let source = FrameSource::open(self.source.clone())?;
        if let Some(fps) = source.frame_rate() {
            info!("source reports {fps:.1} fps");
        }
        let sink: Box<dyn FrameSink> = match &self.snapshot_dir {
            Some(dir) => Box::new(SnapshotSink::new(dir, self.snapshot_every)?),
            None if self.no_display => Box::new(NullSink),
            None => Box::new(Window::new(self.delay)),
        };
        let limits = RunLimits {
            max_frames: self.max_frames,
        };
        Ok((source, sink, limits))
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let summary: RunSummary = match &cli.command {
        Command::Lk(args) => {
            let (mut source, mut sink, limits) = args.output.open()?;
            run_optical_flow(&mut source, args.into(), sink.as_mut(), limits)?
        }
        Command::Mog2(args) => {
            let (mut source, mut sink, limits) = args.output.open()?;
            run_background_subtraction(&mut source, args.into(), sink.as_mut(), limits)?
        }
    };

    info!(
        "processed {} frames, {} detections",
        summary.frames, summary.detections
    );
    Ok(())
}
