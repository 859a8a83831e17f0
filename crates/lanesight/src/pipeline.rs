//! Per-frame orchestration: exposure, rectification, segmentation,
//! estimation, telemetry.

use crate::config::{ConfigError, PipelineConfig, ViewMode};
use crate::source::SourceError;
use crate::telemetry::{unix_timestamp, FpsMeter, FrameTelemetry};
use lanesight_core::{ColorImage, ColorImageView, GrayImage, RectifierCache, RectifyError};
use lanesight_exposure::{apply_gamma, decide, measure_brightness, GammaDecision, GammaPolicy};
use lanesight_lane::{
    estimate_from_regions, extract_regions, BandGroups, LaneEstimate, LaneSegmenter, RoiPolygon,
};
use std::time::{Duration, Instant};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("frame has no pixels ({width}x{height})")]
    EmptyFrame { width: usize, height: usize },
    #[error(transparent)]
    Rectify(#[from] RectifyError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("frame consumer failed")]
    Sink(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl PipelineError {
    /// Wrap an error raised by a per-frame consumer.
    pub fn sink(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Sink(err.into())
    }
}

/// Everything produced for one frame.
#[derive(Clone, Debug)]
pub struct FrameOutput {
    /// Overlay on the frame the mask was computed on; `None` when annotation
    /// is off.
    pub annotated: Option<ColorImage>,
    pub mask: GrayImage,
    pub estimate: LaneEstimate,
    pub groups: BandGroups,
    pub decision: GammaDecision,
    pub telemetry: FrameTelemetry,
    pub elapsed: Duration,
}

/// Runs the full per-frame pipeline with a fixed configuration.
#[derive(Debug)]
pub struct LanePipeline {
    config: PipelineConfig,
    policy: GammaPolicy,
    segmenter: LaneSegmenter,
    rectifiers: RectifierCache,
    fps: FpsMeter,
    budget: Duration,
    frames: u64,
}

impl LanePipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let budget = config.frame_budget()?;
        let policy = config.policy();
        let segmenter = LaneSegmenter::new(config.segmenter)?;
        log::debug!(
            "pipeline ready: view={:?} gamma bounds [{}, {}] swap={}",
            config.view_mode,
            policy.bounds.min,
            policy.bounds.max,
            config.channel_swap_needed
        );
        Ok(Self {
            config,
            policy,
            segmenter,
            rectifiers: RectifierCache::new(),
            fps: FpsMeter::default(),
            budget,
            frames: 0,
        })
    }

    #[inline]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[inline]
    pub fn policy(&self) -> &GammaPolicy {
        &self.policy
    }

    /// Frames processed so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Process one frame with the current illuminance reading.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, frame), fields(w = frame.width, h = frame.height))
    )]
    pub fn process(
        &mut self,
        frame: &ColorImageView<'_>,
        illuminance: f64,
    ) -> Result<FrameOutput, PipelineError> {
        let started = Instant::now();
        let (w, h) = (frame.width, frame.height);
        if w == 0 || h == 0 {
            return Err(PipelineError::EmptyFrame {
                width: w,
                height: h,
            });
        }

        let swapped;
        let frame = if self.config.channel_swap_needed {
            let mut owned = frame.to_owned();
            owned.swap_red_blue();
            swapped = owned;
            swapped.view()
        } else {
            *frame
        };

        // measured before correction
        let brightness = measure_brightness(&frame);
        let decision = decide(illuminance, brightness, &self.policy);
        let corrected = apply_gamma(&frame, decision.gamma);

        let (working, roi) = match self.config.view_mode {
            ViewMode::BirdEye => {
                let rectifier = self.rectifiers.get(w, h)?;
                (
                    rectifier.rectify(&corrected.view())?,
                    RoiPolygon::full_frame(w, h),
                )
            }
            ViewMode::Normal => (corrected, RoiPolygon::road_trapezoid(w, h)),
        };

        let mask = self.segmenter.segment(&working.view(), &roi);
        let (estimate, groups) = estimate_from_regions(extract_regions(&mask.view()), w);
        let fps = self.fps.tick(Instant::now());

        let telemetry = FrameTelemetry {
            timestamp: unix_timestamp(),
            illuminance: decision.illuminance,
            brightness,
            gamma: decision.gamma,
            offset_px: estimate.offset_px,
            direction: estimate.direction,
            fps,
        };

        let annotated = self
            .config
            .annotate
            .then(|| render_overlay(&working, &roi, &groups, &estimate))
            .flatten();

        self.frames += 1;
        let elapsed = started.elapsed();
        log::debug!(
            "frame {}: lux={:.1} brightness={:.1} gamma={:.3} offset={} {} in {:.2?}",
            self.frames,
            illuminance,
            brightness,
            decision.gamma,
            estimate.offset_px,
            estimate.direction,
            elapsed
        );
        if elapsed > self.budget {
            log::warn!(
                "frame {} took {:.2?}, over the {:.1} ms budget",
                self.frames,
                elapsed,
                self.config.frame_budget_ms
            );
        }

        Ok(FrameOutput {
            annotated,
            mask,
            estimate,
            groups,
            decision,
            telemetry,
            elapsed,
        })
    }
}

#[cfg(feature = "image")]
fn render_overlay(
    frame: &ColorImage,
    roi: &RoiPolygon,
    groups: &BandGroups,
    estimate: &LaneEstimate,
) -> Option<ColorImage> {
    Some(crate::annotate::annotate(frame, roi, groups, estimate))
}

#[cfg(not(feature = "image"))]
fn render_overlay(
    _frame: &ColorImage,
    _roi: &RoiPolygon,
    _groups: &BandGroups,
    _estimate: &LaneEstimate,
) -> Option<ColorImage> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanesight_lane::Direction;

    fn normal_config() -> PipelineConfig {
        PipelineConfig {
            view_mode: ViewMode::Normal,
            annotate: false,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let mut cfg = PipelineConfig::default();
        cfg.segmenter.opening_kernel = 0;
        assert!(LanePipeline::new(cfg).is_err());
    }

    #[test]
    fn oversized_frame_budget_is_rejected_up_front() {
        let cfg = PipelineConfig {
            frame_budget_ms: 1e30,
            ..normal_config()
        };
        assert_eq!(
            LanePipeline::new(cfg).unwrap_err(),
            ConfigError::InvalidFrameBudget(1e30)
        );
    }

    #[test]
    fn large_frame_budget_processes_frames() {
        let cfg = PipelineConfig {
            frame_budget_ms: 1e9,
            ..normal_config()
        };
        let mut p = LanePipeline::new(cfg).unwrap();
        let frame = ColorImage::filled(32, 24, [40, 40, 40]);
        assert!(p.process(&frame.view(), 100.0).is_ok());
    }

    #[test]
    fn empty_frame_is_an_error() {
        let mut p = LanePipeline::new(normal_config()).unwrap();
        let view = ColorImageView {
            width: 0,
            height: 0,
            data: &[],
        };
        assert!(matches!(
            p.process(&view, 100.0),
            Err(PipelineError::EmptyFrame { .. })
        ));
    }

    #[test]
    fn uniform_dark_frame_has_no_lane() {
        let mut p = LanePipeline::new(normal_config()).unwrap();
        let frame = ColorImage::filled(160, 90, [30, 30, 30]);
        let out = p.process(&frame.view(), 50.0).unwrap();
        assert_eq!(out.estimate.direction, Direction::None);
        assert_eq!(out.telemetry.offset_px, 0);
        assert_eq!(out.mask.count_nonzero(), 0);
        assert!(out.annotated.is_none());
        assert_eq!(p.frames(), 1);
    }

    #[test]
    fn telemetry_mirrors_the_decision() {
        let mut p = LanePipeline::new(normal_config()).unwrap();
        let frame = ColorImage::filled(64, 48, [80, 80, 80]);
        let out = p.process(&frame.view(), 700.0).unwrap();
        assert_eq!(out.telemetry.gamma, out.decision.gamma);
        assert_eq!(out.telemetry.illuminance, 700.0);
        assert_eq!(out.telemetry.brightness, 80.0);
        assert!(p.policy().bounds.contains(out.telemetry.gamma));
    }

    #[test]
    fn swap_is_applied_before_brightness() {
        let cfg = PipelineConfig {
            channel_swap_needed: true,
            ..normal_config()
        };
        let mut swapped = LanePipeline::new(cfg).unwrap();
        let mut plain = LanePipeline::new(normal_config()).unwrap();

        let bgr = ColorImage::filled(16, 16, [10, 60, 250]);
        let mut rgb = bgr.clone();
        rgb.swap_red_blue();

        let a = swapped.process(&bgr.view(), 300.0).unwrap();
        let b = plain.process(&rgb.view(), 300.0).unwrap();
        assert_eq!(a.telemetry.brightness, b.telemetry.brightness);
    }
}
