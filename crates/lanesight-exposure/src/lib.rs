//! Illumination-adaptive exposure normalization.
//!
//! A fuzzy controller picks a gamma from an ambient-light reading and the
//! measured frame brightness; a 256-entry lookup table applies it.
//!
//! ```
//! use lanesight_core::ColorImage;
//! use lanesight_exposure::{apply_gamma, decide, measure_brightness, GammaPolicy};
//!
//! let policy = GammaPolicy::dark_emphasized();
//! let frame = ColorImage::filled(64, 48, [40, 40, 40]);
//!
//! let brightness = measure_brightness(&frame.view());
//! let decision = decide(120.0, brightness, &policy);
//! let corrected = apply_gamma(&frame.view(), decision.gamma);
//! assert!(corrected.pixel(0, 0)[0] >= 40);
//! ```

mod controller;
mod corrector;
mod policy;

pub use controller::{
    decide, GammaDecision, Memberships, BRIGHTNESS_FULL_SCALE, DEFUZZ_EPSILON, LUX_FULL_SCALE,
};
pub use corrector::{apply_gamma, measure_brightness, GammaLut};
pub use policy::{GammaBounds, GammaPolicy, GammaPreset, LowLightBoost, PolicyError, RuleWeights};
