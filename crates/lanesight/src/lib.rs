//! Illumination-adaptive lane offset estimation.
//!
//! This crate provides:
//! - re-exports of the stage crates (`core`, `exposure`, `lane`)
//! - [`LanePipeline`], which runs exposure normalization, bird's-eye
//!   rectification, lane segmentation and offset estimation on each frame
//! - JSON configuration, per-frame telemetry and a snapshot hub for readers on
//!   other threads
//! - collaborator traits for frame sources and light sensors, plus a
//!   cooperative host loop
//! - (feature `image`) overlay rendering and image-file frame sources
//!
//! ## Quickstart
//!
//! ```
//! use lanesight::{LanePipeline, PipelineConfig, ViewMode};
//! use lanesight::core::ColorImage;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig {
//!     view_mode: ViewMode::Normal,
//!     ..PipelineConfig::default()
//! };
//! let mut pipeline = LanePipeline::new(config)?;
//!
//! let frame = ColorImage::filled(640, 360, [60, 60, 60]);
//! let out = pipeline.process(&frame.view(), 500.0)?;
//! println!("{}", out.telemetry.to_json()?);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `lanesight::core`: image buffers, colour conversion, homography and the
//!   perspective rectifier.
//! - `lanesight::exposure`: fuzzy gamma controller and LUT corrector.
//! - `lanesight::lane`: HSV segmentation, ROI, regions, band clustering.
//! - `lanesight::pipeline`, `config`, `telemetry`, `source`: orchestration.

pub use lanesight_core as core;
pub use lanesight_exposure as exposure;
pub use lanesight_lane as lane;

pub mod config;
pub mod pipeline;
pub mod source;
pub mod telemetry;

#[cfg(feature = "image")]
pub mod annotate;

pub use config::{ConfigError, ConfigIoError, GammaPolicyConfig, PipelineConfig, ViewMode};
pub use lanesight_exposure::{GammaDecision, GammaPolicy, GammaPreset};
pub use lanesight_lane::{Direction, LaneEstimate};
pub use pipeline::{FrameOutput, LanePipeline, PipelineError};
pub use source::{
    detect_channel_order, run_host_loop, ChannelOrder, ConstantLux, FallbackSensor, FrameSource,
    IlluminanceSensor, RunLimit, RunSummary, SourceError, StopReason, DEFAULT_LUX,
};
pub use telemetry::{FpsMeter, FrameTelemetry, TelemetryHub, TelemetrySnapshot, FPS_WINDOW};

#[cfg(feature = "image")]
pub use source::{load_frame, ImageSequenceSource};
