//! JSON configuration for the frame pipeline.

use lanesight_exposure::{GammaPolicy, GammaPreset, PolicyError};
use lanesight_lane::{SegmentError, SegmenterParams};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

#[derive(thiserror::Error, Debug)]
pub enum ConfigIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error(transparent)]
    Segmenter(#[from] SegmentError),
    #[error("frame budget must be a positive, representable number of milliseconds (got {0})")]
    InvalidFrameBudget(f64),
}

/// Either a named preset (`"linear"`, `"dark_emphasized"`) or a full policy.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GammaPolicyConfig {
    Preset(GammaPreset),
    Custom(GammaPolicy),
}

impl Default for GammaPolicyConfig {
    fn default() -> Self {
        Self::Preset(GammaPreset::default())
    }
}

impl GammaPolicyConfig {
    pub fn resolve(&self) -> GammaPolicy {
        match self {
            Self::Preset(p) => GammaPolicy::preset(*p),
            Self::Custom(policy) => *policy,
        }
    }
}

/// Which geometry the segmenter runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// Rectify to the bird's-eye view and segment the whole warped frame.
    #[default]
    BirdEye,
    /// Segment the camera frame inside the road trapezoid.
    Normal,
}

fn default_annotate() -> bool {
    true
}

fn default_frame_budget_ms() -> f64 {
    33.3
}

/// Full pipeline configuration. Every field has a default, so `{}` is a
/// valid config file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub gamma: GammaPolicyConfig,
    #[serde(default)]
    pub view_mode: ViewMode,
    #[serde(default)]
    pub segmenter: SegmenterParams,
    /// Swap R and B on every incoming frame (BGR producers).
    #[serde(default)]
    pub channel_swap_needed: bool,
    #[serde(default = "default_annotate")]
    pub annotate: bool,
    /// Processing time above which a warning is logged.
    #[serde(default = "default_frame_budget_ms")]
    pub frame_budget_ms: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            gamma: GammaPolicyConfig::default(),
            view_mode: ViewMode::default(),
            segmenter: SegmenterParams::default(),
            channel_swap_needed: false,
            annotate: default_annotate(),
            frame_budget_ms: default_frame_budget_ms(),
        }
    }
}

impl PipelineConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn policy(&self) -> GammaPolicy {
        self.gamma.resolve()
    }

    /// `frame_budget_ms` as a `Duration`.
    pub fn frame_budget(&self) -> Result<Duration, ConfigError> {
        let ms = self.frame_budget_ms;
        if !ms.is_finite() || ms <= 0.0 {
            return Err(ConfigError::InvalidFrameBudget(ms));
        }
        Duration::try_from_secs_f64(ms / 1000.0).map_err(|_| ConfigError::InvalidFrameBudget(ms))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.policy().validate()?;
        self.segmenter.validate()?;
        self.frame_budget()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_the_default_config() {
        let cfg: PipelineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, PipelineConfig::default());
        cfg.validate().unwrap();
    }

    #[test]
    fn gamma_accepts_a_preset_name() {
        let cfg: PipelineConfig =
            serde_json::from_str(r#"{"gamma": "linear", "view_mode": "normal"}"#).unwrap();
        assert_eq!(cfg.gamma, GammaPolicyConfig::Preset(GammaPreset::Linear));
        assert_eq!(cfg.policy(), GammaPolicy::linear());
        assert_eq!(cfg.view_mode, ViewMode::Normal);
    }

    #[test]
    fn gamma_accepts_a_full_policy() {
        let json = r#"{
            "gamma": {
                "darkness_exponent": 2.0,
                "weights": {"dark": 2.0, "normal": 1.0, "bright": 0.5},
                "bounds": {"min": 0.5, "max": 2.0}
            }
        }"#;
        let cfg: PipelineConfig = serde_json::from_str(json).unwrap();
        let policy = cfg.policy();
        assert_eq!(policy.darkness_exponent, 2.0);
        assert!(policy.low_light_boost.is_none());
        cfg.validate().unwrap();
    }

    #[test]
    fn invalid_parts_fail_validation() {
        let mut cfg = PipelineConfig::default();
        cfg.segmenter.opening_kernel = 2;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::Segmenter(SegmentError::InvalidKernel(2)))
        );

        let mut cfg = PipelineConfig::default();
        cfg.frame_budget_ms = 0.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidFrameBudget(_))
        ));

        let mut cfg = PipelineConfig::default();
        cfg.frame_budget_ms = 1e30;
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidFrameBudget(1e30)));

        let mut policy = GammaPolicy::linear();
        policy.darkness_exponent = -1.0;
        let cfg = PipelineConfig {
            gamma: GammaPolicyConfig::Custom(policy),
            ..PipelineConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Policy(_))));
    }

    #[test]
    fn json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        let cfg = PipelineConfig {
            view_mode: ViewMode::Normal,
            channel_swap_needed: true,
            frame_budget_ms: 50.0,
            ..PipelineConfig::default()
        };
        cfg.write_json(&path).unwrap();
        assert_eq!(PipelineConfig::load_json(&path).unwrap(), cfg);
    }
}
