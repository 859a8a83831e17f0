//! Collaborator seams: frame sources, illuminance sensors, channel-order
//! detection and the cooperative host loop.

use crate::pipeline::{FrameOutput, LanePipeline, PipelineError};
use crate::telemetry::TelemetryHub;
use lanesight_core::{ColorImage, ColorImageView};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[cfg(feature = "image")]
use std::path::{Path, PathBuf};

/// Lux used when no sensor is attached.
pub const DEFAULT_LUX: f64 = 500.0;

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error(transparent)]
    Buffer(#[from] lanesight_core::ImageError),
    #[cfg(feature = "image")]
    #[error("failed to read frame {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("frame source failed: {0}")]
    Device(String),
}

/// Produces RGB frames. `Ok(None)` means the source is exhausted.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<ColorImage>, SourceError>;
}

/// Ambient light in lux. `None` means the reading failed.
pub trait IlluminanceSensor {
    fn read_lux(&mut self) -> Option<f64>;
}

/// A sensor that always reports the same value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstantLux(pub f64);

impl IlluminanceSensor for ConstantLux {
    fn read_lux(&mut self) -> Option<f64> {
        Some(self.0)
    }
}

/// Wraps an optional sensor so a reading is always available.
///
/// Without a sensor the default is reported. A failed or invalid reading
/// repeats the last good one, or 0 lux when there has been none.
#[derive(Clone, Debug)]
pub struct FallbackSensor<S> {
    inner: Option<S>,
    default_lux: f64,
    last_good: Option<f64>,
}

impl<S: IlluminanceSensor> FallbackSensor<S> {
    pub fn new(inner: Option<S>, default_lux: f64) -> Self {
        if inner.is_none() {
            log::warn!("no illuminance sensor, using {default_lux} lux");
        }
        Self {
            inner,
            default_lux,
            last_good: None,
        }
    }

    pub fn has_sensor(&self) -> bool {
        self.inner.is_some()
    }
}

impl<S: IlluminanceSensor> IlluminanceSensor for FallbackSensor<S> {
    fn read_lux(&mut self) -> Option<f64> {
        let Some(sensor) = self.inner.as_mut() else {
            return Some(self.default_lux);
        };
        match sensor.read_lux() {
            Some(lux) if lux.is_finite() && lux >= 0.0 => {
                self.last_good = Some(lux);
                Some(lux)
            }
            other => {
                log::debug!("illuminance read failed ({other:?}), reusing last value");
                Some(self.last_good.unwrap_or(0.0))
            }
        }
    }
}

/// Loads a list of image files in order.
#[cfg(feature = "image")]
#[derive(Clone, Debug)]
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    next: usize,
}

#[cfg(feature = "image")]
impl ImageSequenceSource {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            paths: paths.into_iter().collect(),
            next: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Path of the frame most recently returned by `next_frame`.
    pub fn current_path(&self) -> Option<&Path> {
        self.next
            .checked_sub(1)
            .and_then(|i| self.paths.get(i))
            .map(PathBuf::as_path)
    }
}

#[cfg(feature = "image")]
impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Option<ColorImage>, SourceError> {
        let Some(path) = self.paths.get(self.next) else {
            return Ok(None);
        };
        self.next += 1;
        load_frame(path).map(Some)
    }
}

/// Decode an image file into an RGB frame.
#[cfg(feature = "image")]
pub fn load_frame(path: &Path) -> Result<ColorImage, SourceError> {
    let img = image::open(path)
        .map_err(|source| SourceError::Decode {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgb8();
    let (w, h) = (img.width() as usize, img.height() as usize);
    Ok(ColorImage::from_raw(w, h, img.into_raw())?)
}

/// Channel order of a producer's frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

impl ChannelOrder {
    /// Whether frames must be R/B swapped to reach RGB.
    pub fn swap_needed(&self) -> bool {
        matches!(self, ChannelOrder::Bgr)
    }
}

/// Guess the channel order from one sample frame: if the first channel is
/// brighter on average than the third, the frame is taken as RGB. Meant to
/// run once at startup, never per frame.
pub fn detect_channel_order(sample: &ColorImageView<'_>) -> ChannelOrder {
    let (mut first, mut third) = (0u64, 0u64);
    for px in sample.data.chunks_exact(3) {
        first += px[0] as u64;
        third += px[2] as u64;
    }
    let order = if first > third {
        ChannelOrder::Rgb
    } else {
        ChannelOrder::Bgr
    };
    log::info!("detected {order:?} channel order (ch0 sum {first}, ch2 sum {third})");
    order
}

/// Bounds on how long the host loop runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunLimit {
    pub max_frames: Option<u64>,
    pub max_duration: Option<Duration>,
}

impl RunLimit {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn frames(n: u64) -> Self {
        Self {
            max_frames: Some(n),
            max_duration: None,
        }
    }

    pub fn duration(d: Duration) -> Self {
        Self {
            max_frames: None,
            max_duration: Some(d),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    SourceExhausted,
    StopRequested,
    FrameLimit,
    TimeLimit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub elapsed: Duration,
    pub reason: StopReason,
}

/// Pull frames from `source`, process each with the current illuminance,
/// publish telemetry to `hub` and hand the output to `on_frame`.
///
/// The stop flag and the limit are checked between frames only.
pub fn run_host_loop<S, L, F>(
    pipeline: &mut LanePipeline,
    source: &mut S,
    sensor: &mut L,
    hub: &TelemetryHub,
    stop: &AtomicBool,
    limit: RunLimit,
    mut on_frame: F,
) -> Result<RunSummary, PipelineError>
where
    S: FrameSource + ?Sized,
    L: IlluminanceSensor + ?Sized,
    F: FnMut(&FrameOutput) -> Result<(), PipelineError>,
{
    let started = Instant::now();
    let mut frames = 0u64;

    let reason = loop {
        if stop.load(Ordering::Relaxed) {
            break StopReason::StopRequested;
        }
        if limit.max_frames.is_some_and(|max| frames >= max) {
            break StopReason::FrameLimit;
        }
        if limit
            .max_duration
            .is_some_and(|max| started.elapsed() >= max)
        {
            break StopReason::TimeLimit;
        }

        let Some(frame) = source.next_frame()? else {
            break StopReason::SourceExhausted;
        };
        let lux = sensor.read_lux().unwrap_or(0.0);
        let output = pipeline.process(&frame.view(), lux)?;
        hub.publish(output.telemetry);
        on_frame(&output)?;
        frames += 1;
    };

    let summary = RunSummary {
        frames,
        elapsed: started.elapsed(),
        reason,
    };
    log::info!(
        "host loop finished after {} frames in {:.2?} ({:?})",
        summary.frames,
        summary.elapsed,
        summary.reason
    );
    Ok(summary)
}
