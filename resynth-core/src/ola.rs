//! Circular overlap-add accumulation buffer.
//!
//! Synthesized frames are windowed and **summed** into a ring of `win_length`
//! samples; the audio side reads blocks out of the same ring and zeroes every
//! slot right after reading it. Two cursors walk the ring independently:
//!
//! - `write_cursor`: where the next frame lands; advances by the hop size
//! - `read_cursor` : where the next output sample comes from; advances by the block size
//!
//! Both snap back to 0 once they reach `win_length`. Reset-after-read is what keeps
//! a fully consumed frame from being counted twice when the write cursor laps.
//!
//! No allocations after construction.

use alloc::vec;
use alloc::vec::Vec;

use crate::dsp::kill_denormals;
use crate::error::{OlaError, Result};
use crate::window::HannWindow;

#[derive(Clone, Debug)]
pub struct OverlapAddBuffer {
    ring: Vec<f32>,
    window: HannWindow,
    write_cursor: usize,
    read_cursor: usize,
}

impl OverlapAddBuffer {
    /// Ring of `win_length` zeroed samples with a matching Hann window.
    pub fn new(win_length: usize) -> Result<Self> {
        if win_length == 0 {
            return Err(OlaError::EmptyWindow);
        }
        Ok(Self {
            ring: vec![0.0; win_length],
            window: HannWindow::new(win_length),
            write_cursor: 0,
            read_cursor: 0,
        })
    }

    #[inline] pub fn win_length(&self) -> usize { self.ring.len() }

    /// `(write_cursor, read_cursor)`
    #[inline] pub fn cursors(&self) -> (usize, usize) { (self.write_cursor, self.read_cursor) }

    /// Window the first `win_length` samples of `frame`, accumulate them into the
    /// ring starting at the write cursor, then advance the write cursor by `hop`.
    ///
    /// A frame shorter than the window is rejected and leaves the ring untouched.
    pub fn deposit(&mut self, frame: &[f32], hop: usize) -> Result<()> {
        let len = self.ring.len();
        if frame.len() < len {
            return Err(OlaError::FrameTooShort { needed: len, got: frame.len() });
        }

        let start = self.write_cursor;
        for (k, (x, w)) in frame.iter().zip(self.window.taps()).enumerate() {
            let slot = &mut self.ring[(start + k) % len];
            *slot = kill_denormals(*slot + x * w);
        }

        self.write_cursor = advance(self.write_cursor, hop, len);
        Ok(())
    }

    /// Fill `out` from the ring starting at the read cursor, zeroing each slot
    /// after it is read, then advance the read cursor by `out.len()`.
    ///
    /// Slots nobody wrote to read back as silence.
    pub fn consume(&mut self, out: &mut [f32]) {
        let len = self.ring.len();
        let start = self.read_cursor;
        for (s, y) in out.iter_mut().enumerate() {
            let slot = &mut self.ring[(start + s) % len];
            *y = *slot;
            *slot = 0.0;
        }

        self.read_cursor = advance(self.read_cursor, out.len(), len);
    }

    /// Zero the ring and rewind both cursors.
    pub fn clear(&mut self) {
        self.ring.fill(0.0);
        self.write_cursor = 0;
        self.read_cursor = 0;
    }
}

/// Cursor step: add `step`, snap to 0 on reaching `len`.
#[inline]
fn advance(cursor: usize, step: usize, len: usize) -> usize {
    let next = cursor + step;
    if next >= len { 0 } else { next }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn rejects_empty_window() {
        assert_eq!(OverlapAddBuffer::new(0).unwrap_err(), OlaError::EmptyWindow);
    }

    #[test]
    fn rejects_short_frame() {
        let mut ola = OverlapAddBuffer::new(8).unwrap();
        let err = ola.deposit(&[1.0; 4], 4).unwrap_err();
        assert_eq!(err, OlaError::FrameTooShort { needed: 8, got: 4 });
        assert_eq!(ola.cursors(), (0, 0));
    }

    #[test]
    fn deposit_windows_and_consume_returns() {
        let mut ola = OverlapAddBuffer::new(4).unwrap();
        // longer frame: only the first win_length samples count
        ola.deposit(&[1.0, 1.0, 1.0, 1.0, 9.0, 9.0], 4).unwrap();
        let mut out = [0.0; 4];
        ola.consume(&mut out);
        let expect = [0.0, 0.75, 0.75, 0.0];
        for (a, b) in out.iter().zip(expect.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-6);
        }
        assert_eq!(ola.cursors(), (0, 0));
    }

    #[test]
    fn overlapping_frames_accumulate() {
        let mut ola = OverlapAddBuffer::new(4).unwrap();
        ola.deposit(&[1.0; 4], 2).unwrap();
        ola.deposit(&[1.0; 4], 2).unwrap();
        // first frame lands at 0, second at 2 and wraps; w = [0, .75, .75, 0]
        // slot 0 = w[0] + w'[2] = 0.75    slot 1 = w[1] + w'[3] = 0.75
        // slot 2 = w[2] + w'[0] = 0.75    slot 3 = w[3] + w'[1] = 0.75
        let mut out = [0.0; 4];
        ola.consume(&mut out);
        assert_relative_eq!(out[0], 0.75, epsilon = 1e-6);
        assert_relative_eq!(out[1], 0.75, epsilon = 1e-6);
        assert_relative_eq!(out[2], 0.75, epsilon = 1e-6);
        assert_relative_eq!(out[3], 0.75, epsilon = 1e-6);
    }

    #[test]
    fn second_consume_is_silent() {
        let mut ola = OverlapAddBuffer::new(8).unwrap();
        ola.deposit(&[0.5; 8], 8).unwrap();
        let mut first = [0.0; 8];
        ola.consume(&mut first);
        assert!(first.iter().any(|&s| s != 0.0));
        let mut second = [1.0; 8];
        ola.consume(&mut second);
        assert!(second.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn underrun_yields_silence() {
        let mut ola = OverlapAddBuffer::new(16).unwrap();
        let mut out = [7.0; 5];
        ola.consume(&mut out);
        assert_eq!(out, [0.0; 5]);
        assert_eq!(ola.cursors(), (0, 5));
    }

    #[test]
    fn cursors_snap_to_zero_not_remainder() {
        let mut ola = OverlapAddBuffer::new(10).unwrap();
        let frame = [0.0; 10];
        let mut out = [0.0; 4];
        for _ in 0..2 {
            ola.deposit(&frame, 4).unwrap();
            ola.consume(&mut out);
        }
        assert_eq!(ola.cursors(), (8, 8));
        ola.deposit(&frame, 4).unwrap();
        ola.consume(&mut out);
        assert_eq!(ola.cursors(), (0, 0));
    }

    #[test]
    fn clear_rewinds() {
        let mut ola = OverlapAddBuffer::new(4).unwrap();
        ola.deposit(&[1.0; 4], 1).unwrap();
        ola.clear();
        assert_eq!(ola.cursors(), (0, 0));
        let mut out = [1.0; 4];
        ola.consume(&mut out);
        assert_eq!(out, [0.0; 4]);
    }

    proptest! {
        #[test]
        fn cursors_return_home_after_one_cycle(win in 1usize..64, divisor_idx in 0usize..8) {
            let divisors: Vec<usize> = (1..=win).filter(|b| win % b == 0).collect();
            let b = divisors[divisor_idx % divisors.len()];
            let mut ola = OverlapAddBuffer::new(win).unwrap();
            let frame = vec![0.25f32; win];
            let mut out = vec![0.0f32; b];
            for _ in 0..(win / b) {
                ola.deposit(&frame, b).unwrap();
                ola.consume(&mut out);
            }
            prop_assert_eq!(ola.cursors(), (0, 0));
        }
    }
}
