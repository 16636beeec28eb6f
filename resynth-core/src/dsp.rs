//! Math helpers for spectral resynthesis.
//!
//! Design goals:
//! - `no_std` ready (guarded by the crate feature `no-std`)
//! - Math backend selection that works in both `std` and `no_std` contexts
//! - Optional `fast-math` approximations for the per-bin phase trig
//! - Log-power reconstruction that can never emit NaN/Inf
//!
//! Conventions:
//! - All functions are `#[inline]` where useful to help the optimizer.
//! - Argument and return domains are documented per function.

#![allow(clippy::excessive_precision)]

use core::f32::consts::PI;

use cfg_if::cfg_if;

// ----------------------------- Math backend selection -----------------------------

cfg_if! {
    // micromath preferred if explicitly requested (works in no_std)
    if #[cfg(feature = "micromath")] {
        use micromath::F32Ext as _;
        #[inline] pub(crate) fn m_sin(x: f32) -> f32 { x.sin() }
        #[inline] pub(crate) fn m_cos(x: f32) -> f32 { x.cos() }
        #[inline] pub(crate) fn m_exp(x: f32) -> f32 { x.exp() }
    // libm (C math) in no_std
    } else if #[cfg(feature = "no-std")] {
        #[inline] pub(crate) fn m_sin(x: f32) -> f32 { libm::sinf(x) }
        #[inline] pub(crate) fn m_cos(x: f32) -> f32 { libm::cosf(x) }
        #[inline] pub(crate) fn m_exp(x: f32) -> f32 { libm::expf(x) }
    // std backend
    } else {
        #[inline] pub(crate) fn m_sin(x: f32) -> f32 { x.sin() }
        #[inline] pub(crate) fn m_cos(x: f32) -> f32 { x.cos() }
        #[inline] pub(crate) fn m_exp(x: f32) -> f32 { x.exp() }
    }
}

// --------------------------------- Constants -------------------------------------

/// 2π (phase range upper bound)
pub const TAU: f32 = 2.0 * PI;

/// A very small epsilon used in denormal handling.
pub const EPS_SMALL: f32 = 1.0e-20;

/// ln(10) / 2, so that `sqrt(10^p) == exp(p * HALF_LN_10)`.
pub const HALF_LN_10: f32 = 1.151_292_546_497_022_8;

/// Upper bound on the log-power exponent (`10^p`, i.e. 10·p dB).
///
/// Keeps `exp` far from f32 overflow even after summing every bin of a large
/// inverse transform.
pub const MAX_LOG_POWER: f32 = 24.0;

// --------------------------------- Utilities -------------------------------------

/// Kill denormal/subnormal values. Returns 0.0 if |x| < EPS_SMALL.
#[inline]
pub fn kill_denormals(x: f32) -> f32 {
    if x > -EPS_SMALL && x < EPS_SMALL { 0.0 } else { x }
}

/// Zero anything that is not a finite number.
#[inline]
pub fn finite_or_zero(x: f32) -> f32 {
    if x.is_finite() { x } else { 0.0 }
}

// --------------------------------- Log power -------------------------------------

/// Map a normalized model magnitude to a log-power exponent:
/// `(magnitude * x_max + s_clip) / 10`.
///
/// `x_max` is the dB span of the model's output range and `s_clip` the dB
/// floor, so the result is "bels". May be non-finite for malformed input.
#[inline]
pub fn log_power(magnitude: f32, x_max: f32, s_clip: f32) -> f32 {
    (magnitude * x_max + s_clip) / 10.0
}

/// Amplitude for a log-power exponent: `sqrt(10^power)`.
///
/// Domain: any f32. Range: finite, `>= 0`.
/// - non-finite `power` → 0.0
/// - `power` above [`MAX_LOG_POWER`] is clamped to it
/// - a non-finite exponentiation result → 0.0
#[inline]
pub fn power_to_amplitude(power: f32) -> f32 {
    if !power.is_finite() {
        return 0.0;
    }
    let p = if power > MAX_LOG_POWER { MAX_LOG_POWER } else { power };
    let a = m_exp(p * HALF_LN_10);
    if a.is_finite() && a >= 0.0 { a } else { 0.0 }
}

/// Full per-bin reconstruction: model magnitude → linear amplitude.
#[inline]
pub fn bin_amplitude(magnitude: f32, x_max: f32, s_clip: f32) -> f32 {
    power_to_amplitude(log_power(magnitude, x_max, s_clip))
}

// --------------------------------- Fast trig -------------------------------------

/// Round-half-away-from-zero without `f32::round` (unavailable in `core`).
#[cfg(feature = "fast-math")]
#[inline]
fn round_nostd(x: f32) -> f32 {
    (if x >= 0.0 { x + 0.5 } else { x - 0.5 }) as i32 as f32
}

/// Fast sine with range reduction into [-π, π] and 5th-order minimax-style poly.
/// Max abs error ~1e-3 when `fast-math` is enabled; falls back to exact otherwise.
#[inline]
pub fn fast_sin(x: f32) -> f32 {
    cfg_if! {
        if #[cfg(feature = "fast-math")] {
            let mut xr = x;
            xr -= round_nostd(xr / TAU) * TAU;

            // 5th-order odd polynomial: sin(x) ≈ x * (a + b x^2 + c x^4)
            let x2 = xr * xr;
            xr * (0.999_979_313_3 + x2 * (-0.166_624_432_0 + x2 * 0.008_308_978_98))
        } else {
            m_sin(x)
        }
    }
}

#[inline]
pub fn fast_cos(x: f32) -> f32 {
    cfg_if! {
        if #[cfg(feature = "fast-math")] {
            // cos(x) = sin(x + π/2)
            fast_sin(x + PI * 0.5)
        } else {
            m_cos(x)
        }
    }
}

/// Polar → rectangular: `(amp·cos φ, amp·sin φ)`.
#[inline]
pub fn polar(amp: f32, phase: f32) -> (f32, f32) {
    (amp * fast_cos(phase), amp * fast_sin(phase))
}

// --------------------------------- Tests (std only) ------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn zero_power_is_unit_amplitude() {
        assert_relative_eq!(power_to_amplitude(0.0), 1.0, epsilon = 1e-6);
        // 10 dB = 1 bel → sqrt(10)
        assert_relative_eq!(power_to_amplitude(1.0), 10f32.sqrt(), epsilon = 1e-4);
        assert_relative_eq!(bin_amplitude(0.0, 10.0, 0.0), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn floor_is_near_silent() {
        // the usual startup levels: x_max = 0, s_clip = -100 dB
        let a = bin_amplitude(0.7, 0.0, -100.0);
        assert!(a > 0.0 && a < 1e-4, "a={a}");
    }

    #[test]
    fn malformed_power_clamps_to_zero() {
        assert_eq!(power_to_amplitude(f32::NAN), 0.0);
        assert_eq!(power_to_amplitude(f32::INFINITY), 0.0);
        assert_eq!(power_to_amplitude(f32::NEG_INFINITY), 0.0);
        assert_eq!(bin_amplitude(f32::NAN, 80.0, -100.0), 0.0);
    }

    #[test]
    fn huge_power_is_capped() {
        let capped = power_to_amplitude(1.0e6);
        assert!(capped.is_finite());
        assert_relative_eq!(capped, power_to_amplitude(MAX_LOG_POWER));
    }

    #[test]
    fn polar_phase_zero_is_real() {
        let (re, im) = polar(2.0, 0.0);
        assert_relative_eq!(re, 2.0, epsilon = 1e-3);
        assert!(im.abs() < 1e-3);
    }

    #[test]
    fn denormals_are_flushed() {
        assert_eq!(kill_denormals(1.0e-30), 0.0);
        assert_eq!(kill_denormals(-1.0e-30), 0.0);
        assert_eq!(kill_denormals(0.5), 0.5);
        assert_eq!(finite_or_zero(f32::NAN), 0.0);
    }

    proptest! {
        #[test]
        fn amplitude_is_finite_and_non_negative(
            magnitude in proptest::num::f32::ANY,
            x_max in proptest::num::f32::ANY,
            s_clip in proptest::num::f32::ANY,
        ) {
            let a = bin_amplitude(magnitude, x_max, s_clip);
            prop_assert!(a.is_finite());
            prop_assert!(a >= 0.0);
        }
    }
}
