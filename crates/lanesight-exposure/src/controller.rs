//! Fuzzy gamma controller.
//!
//! Three rules are evaluated on the normalized illuminance `L` and the
//! normalized frame brightness `B`:
//!
//! - *too dark*: `(1 - L)^p * (1 - B)`
//! - *too bright*: `L * B`
//! - *normal*: `1 - |L - B|`
//!
//! and defuzzified by a weighted average of the rule consequents.

use crate::policy::GammaPolicy;
use serde::{Deserialize, Serialize};

/// Illuminance (lux) that maps to `L = 1`.
pub const LUX_FULL_SCALE: f64 = 1500.0;
/// Brightness that maps to `B = 1`.
///
/// Brightness is an 8-bit mean (0..=255) but saturates at 100 here; every
/// frame with a mean above 100 counts as fully exposed. Kept as deployed.
pub const BRIGHTNESS_FULL_SCALE: f64 = 100.0;
/// Guards the defuzzification denominator when all memberships are zero.
pub const DEFUZZ_EPSILON: f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Memberships {
    pub too_dark: f64,
    pub normal: f64,
    pub too_bright: f64,
}

/// The gamma chosen for a frame together with the inputs it came from.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GammaDecision {
    pub illuminance: f64,
    pub brightness: f64,
    pub normalized_illuminance: f64,
    pub normalized_brightness: f64,
    pub memberships: Memberships,
    pub boosted: bool,
    pub gamma: f64,
}

#[inline]
fn normalize(value: f64, full_scale: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    (value / full_scale).clamp(0.0, 1.0)
}

/// Evaluate the controller. Out-of-range inputs are clamped, never rejected;
/// NaN reads as zero. For a policy that passes [`GammaPolicy::validate`] the
/// result always lies within `policy.bounds`; other policies still yield a
/// decision without panicking.
pub fn decide(illuminance: f64, brightness: f64, policy: &GammaPolicy) -> GammaDecision {
    let l = normalize(illuminance, LUX_FULL_SCALE);
    let b = normalize(brightness, BRIGHTNESS_FULL_SCALE);

    let too_dark = (1.0 - l).powf(policy.darkness_exponent) * (1.0 - b);
    let too_bright = l * b;
    let normal = 1.0 - (l - b).abs();

    let w = policy.weights;
    let mut gamma = (w.dark * too_dark + w.normal * normal + w.bright * too_bright)
        / (too_dark + normal + too_bright + DEFUZZ_EPSILON);

    let boosted = match policy.low_light_boost {
        Some(boost) if l < boost.threshold => {
            gamma *= boost.factor;
            true
        }
        _ => false,
    };

    GammaDecision {
        illuminance,
        brightness,
        normalized_illuminance: l,
        normalized_brightness: b,
        memberships: Memberships {
            too_dark,
            normal,
            too_bright,
        },
        boosted,
        gamma: policy.bounds.clamp(gamma),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn gamma_stays_within_bounds_on_a_grid() {
        for policy in [GammaPolicy::linear(), GammaPolicy::dark_emphasized()] {
            for lux in [0.0, 10.0, 100.0, 225.0, 500.0, 1499.0, 1500.0, 5000.0, 1e9] {
                for brightness in (0..=255).step_by(5) {
                    let d = decide(lux, brightness as f64, &policy);
                    assert!(
                        policy.bounds.contains(d.gamma),
                        "gamma {} out of bounds for lux={} brightness={}",
                        d.gamma,
                        lux,
                        brightness
                    );
                }
            }
        }
    }

    #[test]
    fn unvalidated_policy_does_not_panic() {
        let mut policy = GammaPolicy::linear();
        policy.bounds = crate::GammaBounds { min: 2.0, max: 1.0 };
        let d = decide(10.0, 10.0, &policy);
        assert_eq!(d.gamma, 1.0);

        policy.bounds.min = f64::NAN;
        let d = decide(10.0, 10.0, &policy);
        assert!(d.gamma <= 1.0);
    }

    #[test]
    fn darkest_input_pushes_gamma_up() {
        let linear = GammaPolicy::linear();
        let d = decide(0.0, 0.0, &linear);
        // (1.6 * 1 + 1.0 * 1) / 2
        assert_relative_eq!(d.gamma, 1.3, epsilon = 1e-5);
        assert!(d.gamma > linear.bounds.midpoint());

        let dark = GammaPolicy::dark_emphasized();
        let d = decide(0.0, 0.0, &dark);
        // (2.2 + 1.0) / 2, boosted by 1.3
        assert!(d.boosted);
        assert_relative_eq!(d.gamma, 2.08, epsilon = 1e-5);
        assert!(d.gamma > dark.bounds.midpoint());
    }

    #[test]
    fn fully_lit_input_pushes_gamma_down() {
        for policy in [GammaPolicy::linear(), GammaPolicy::dark_emphasized()] {
            let d = decide(1500.0, 100.0, &policy);
            assert!(!d.boosted);
            // (1.0 * 1 + 0.4 * 1) / 2
            assert_relative_eq!(d.gamma, 0.7, epsilon = 1e-5);
            assert!(d.gamma < 1.0);
        }
    }

    #[test]
    fn balanced_input_is_neutral_for_linear_policy() {
        let d = decide(750.0, 50.0, &GammaPolicy::linear());
        assert_relative_eq!(d.gamma, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn brightness_saturates_at_one_hundred() {
        // Brightness is normalized by 100, not 255: any mean above 100 is
        // indistinguishable from 100.
        let p = GammaPolicy::linear();
        let at_100 = decide(800.0, 100.0, &p);
        let at_255 = decide(800.0, 255.0, &p);
        assert_eq!(at_100.gamma, at_255.gamma);
        assert_eq!(at_255.normalized_brightness, 1.0);
    }

    #[test]
    fn all_zero_memberships_fall_to_lower_bound() {
        // L = 0, B = 1: every rule is zero, epsilon keeps the division finite
        let p = GammaPolicy::linear();
        let d = decide(0.0, 200.0, &p);
        assert_eq!(d.memberships.too_dark, 0.0);
        assert_eq!(d.memberships.normal, 0.0);
        assert_eq!(d.memberships.too_bright, 0.0);
        assert_eq!(d.gamma, p.bounds.min);
    }

    #[test]
    fn negative_and_nan_inputs_are_clamped() {
        let p = GammaPolicy::dark_emphasized();
        let neg = decide(-20.0, -5.0, &p);
        let zero = decide(0.0, 0.0, &p);
        assert_eq!(neg.gamma, zero.gamma);
        let nan = decide(f64::NAN, f64::NAN, &p);
        assert_eq!(nan.gamma, zero.gamma);
    }

    #[test]
    fn boost_only_fires_below_threshold() {
        let p = GammaPolicy::dark_emphasized();
        // L = 0.15 exactly: not below the threshold
        assert!(!decide(225.0, 50.0, &p).boosted);
        assert!(decide(224.0, 50.0, &p).boosted);
        assert!(!decide(0.0, 50.0, &GammaPolicy::linear()).boosted);
    }
}
