//! Precomputed Hann window.
//!
//! Uses the symmetric form `w[k] = 0.5 * (1 - cos(2π k / (N - 1)))`, so the first
//! and last taps are exactly zero and the frame edges never click.

use alloc::vec::Vec;

use crate::dsp::{m_cos, TAU};

/// One Hann tap for a window of `len` samples.
///
/// A single-tap window is defined as `1.0` (the symmetric formula divides by zero).
#[inline]
pub fn hann(k: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }
    0.5 * (1.0 - m_cos(TAU * k as f32 / (len - 1) as f32))
}

/// Hann coefficients computed once at construction.
#[derive(Clone, Debug, PartialEq)]
pub struct HannWindow {
    taps: Vec<f32>,
}

impl HannWindow {
    pub fn new(len: usize) -> Self {
        Self { taps: (0..len).map(|k| hann(k, len)).collect() }
    }

    #[inline] pub fn len(&self) -> usize { self.taps.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.taps.is_empty() }
    #[inline] pub fn taps(&self) -> &[f32] { &self.taps }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn edges_zero_center_one() {
        let w = HannWindow::new(1025);
        assert_relative_eq!(w.taps()[0], 0.0, epsilon = 1e-6);
        assert_relative_eq!(w.taps()[1024], 0.0, epsilon = 1e-6);
        assert_relative_eq!(w.taps()[512], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn four_tap_reference() {
        let w = HannWindow::new(4);
        let expect = [0.0, 0.75, 0.75, 0.0];
        for (a, b) in w.taps().iter().zip(expect.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-6);
        }
    }

    #[test]
    fn degenerate_lengths() {
        assert!(HannWindow::new(0).is_empty());
        assert_eq!(HannWindow::new(1).taps(), &[1.0]);
    }
}
