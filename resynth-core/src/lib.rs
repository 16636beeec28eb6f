#![cfg_attr(not(feature = "std"), no_std)]
//! resynth core — no_std-ready DSP primitives for magnitude-only spectral resynthesis.
//!
//! Features
//! - `std`      : (default) use the Rust standard library
//! - `no-std`   : build with `#![no_std]` (+ `alloc`) and use `libm`/`micromath` math backends
//! - `fast-math`: polynomial approximations for the per-bin phase trig
//!
//! Modules
//! - [`dsp`]    : math backend, log-power → amplitude, denormal handling, fast trig
//! - [`window`] : precomputed Hann window
//! - [`ola`]    : circular overlap-add accumulation buffer
//! - [`error`]  : error types
//!
//! Design
//! - Allocation happens once at construction; per-block work is allocation free
//! - Nothing here can emit NaN/Inf into the output path

extern crate alloc;

pub mod dsp;
pub mod error;
pub mod ola;
pub mod window;

pub use error::OlaError;
pub use ola::OverlapAddBuffer;
pub use window::HannWindow;

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::dsp::{
        bin_amplitude, finite_or_zero, kill_denormals, log_power, polar, power_to_amplitude,
        MAX_LOG_POWER, TAU,
    };
    pub use crate::error::OlaError;
    pub use crate::ola::OverlapAddBuffer;
    pub use crate::window::{hann, HannWindow};
}
