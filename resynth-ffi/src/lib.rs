//! C ABI wrapper for the Resynth engine.
//!
//! Two opaque handles:
//! - `ResynthEngine`  : owned by the audio thread; renders interleaved f32
//! - `ResynthControl` : track selection, latent edits and levels; any thread
//!
//! ABI notes
//! - All functions are `extern "C"` and `#[no_mangle]`.
//! - Null handles are ignored; failures return 0, -1 or null.
//! - A settings file that fails to load still yields an engine. It renders
//!   silence and `resynth_control_create` returns null for it.
//!
//! Threading
//! - Call `resynth_control_create` before handing the engine to the audio thread.
//! - Control handles are independent and may live on any thread.

use std::ffi::{c_char, CStr};
use std::ptr;

use resynth_engine::control::ControlHandle;
use resynth_engine::graph::{Engine, EngineOptions};
use resynth_engine::synth::RandomPhase;

/// Opaque engine handle.
pub struct ResynthEngine {
    inner: Engine,
    control: Option<ControlHandle>,
}

/// Opaque control handle.
pub struct ResynthControl {
    inner: ControlHandle,
}

// --- Creation / destruction -------------------------------------------------------

/// Load `settings_path` (UTF-8, NUL-terminated). `seed == 0` draws phases from
/// OS entropy; any other value makes the phase stream reproducible.
///
/// Returns null only for a null or non-UTF-8 path.
#[no_mangle]
pub extern "C" fn resynth_create(settings_path: *const c_char, seed: u64) -> *mut ResynthEngine {
    if settings_path.is_null() {
        return ptr::null_mut();
    }
    let Ok(path) = unsafe { CStr::from_ptr(settings_path) }.to_str() else {
        tracing::warn!("settings path is not valid UTF-8");
        return ptr::null_mut();
    };
    let phases = if seed == 0 { RandomPhase::from_entropy() } else { RandomPhase::seeded(seed) };
    let (inner, control) = Engine::load_or_silence(path, phases, EngineOptions::default());
    Box::into_raw(Box::new(ResynthEngine { inner, control }))
}

/// Destroy an engine previously returned by `resynth_create`.
#[no_mangle]
pub extern "C" fn resynth_destroy(engine: *mut ResynthEngine) {
    if !engine.is_null() {
        unsafe { drop(Box::from_raw(engine)) };
    }
}

/// 1 while the engine produces audio, 0 when silent (load failure or fault).
#[no_mangle]
pub extern "C" fn resynth_is_active(engine: *const ResynthEngine) -> i32 {
    if engine.is_null() {
        return 0;
    }
    i32::from(unsafe { &*engine }.inner.is_active())
}

/// Drop accumulated audio (e.g. after a device restart).
#[no_mangle]
pub extern "C" fn resynth_reset(engine: *mut ResynthEngine) {
    if engine.is_null() {
        return;
    }
    unsafe { &mut *engine }.inner.reset();
}

// --- Rendering -------------------------------------------------------------------

/// Render `frames` of audio into an interleaved f32 buffer with `channels` channels.
/// The engine is mono; each sample is duplicated to all channels.
///
/// Returns the number of frames rendered (0 on bad arguments).
#[no_mangle]
pub extern "C" fn resynth_render_interleaved_f32(
    engine: *mut ResynthEngine,
    out_interleaved: *mut f32,
    frames: u32,
    channels: u32,
) -> u32 {
    if engine.is_null() || out_interleaved.is_null() || frames == 0 || channels == 0 {
        return 0;
    }
    let e = unsafe { &mut *engine };
    let ch = channels as usize;
    let out = unsafe { std::slice::from_raw_parts_mut(out_interleaved, frames as usize * ch) };
    e.inner.render_interleaved(out, ch);
    frames
}

// --- Control -----------------------------------------------------------------------

/// New control handle for `engine`; null if the engine runs silent from load.
#[no_mangle]
pub extern "C" fn resynth_control_create(engine: *const ResynthEngine) -> *mut ResynthControl {
    if engine.is_null() {
        return ptr::null_mut();
    }
    match unsafe { &*engine }.control.as_ref() {
        Some(c) => Box::into_raw(Box::new(ResynthControl { inner: c.clone() })),
        None => ptr::null_mut(),
    }
}

#[no_mangle]
pub extern "C" fn resynth_control_destroy(control: *mut ResynthControl) {
    if !control.is_null() {
        unsafe { drop(Box::from_raw(control)) };
    }
}

/// Switch to preset track `index`. If `out_latent` is non-null, up to `out_len`
/// components of the selected vector are written there.
///
/// Returns 0 on success, -1 for a bad handle or index.
#[no_mangle]
pub extern "C" fn resynth_select_track(
    control: *const ResynthControl,
    index: u32,
    out_latent: *mut f32,
    out_len: u32,
) -> i32 {
    if control.is_null() {
        return -1;
    }
    let c = unsafe { &*control };
    let Ok(latent) = c.inner.select_track(index as usize) else {
        return -1;
    };
    if !out_latent.is_null() {
        let out = unsafe { std::slice::from_raw_parts_mut(out_latent, out_len as usize) };
        for (o, v) in out.iter_mut().zip(latent.iter()) {
            *o = *v;
        }
    }
    0
}

/// Overwrite latent component `dim`. Returns 0, or -1 for a bad handle or dimension.
#[no_mangle]
pub extern "C" fn resynth_set_component(control: *const ResynthControl, dim: u32, value: f32) -> i32 {
    if control.is_null() {
        return -1;
    }
    match unsafe { &*control }.inner.set_component(dim as usize, value) {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

/// Magnitude scale (xMax). Non-finite values are ignored.
#[no_mangle]
pub extern "C" fn resynth_set_scale(control: *const ResynthControl, x_max: f32) {
    if control.is_null() || !x_max.is_finite() {
        return;
    }
    unsafe { &*control }.inner.set_scale(x_max);
}

/// Clip offset (sClip). Non-finite values are ignored.
#[no_mangle]
pub extern "C" fn resynth_set_clip(control: *const ResynthControl, s_clip: f32) {
    if control.is_null() || !s_clip.is_finite() {
        return;
    }
    unsafe { &*control }.inner.set_clip(s_clip);
}

/// Write the configured range of latent component `dim` to `min`/`max`.
/// Returns 0, or -1 for a bad handle, pointer or dimension.
#[no_mangle]
pub extern "C" fn resynth_get_range(control: *const ResynthControl, dim: u32, min: *mut f32, max: *mut f32) -> i32 {
    if control.is_null() || min.is_null() || max.is_null() {
        return -1;
    }
    let Some(r) = unsafe { &*control }.inner.get_range(dim as usize) else {
        return -1;
    };
    unsafe {
        *min = r.min;
        *max = r.max;
    }
    0
}

#[no_mangle]
pub extern "C" fn resynth_latent_dim(control: *const ResynthControl) -> u32 {
    if control.is_null() {
        return 0;
    }
    u32::try_from(unsafe { &*control }.inner.latent_dim()).unwrap_or(u32::MAX)
}

#[no_mangle]
pub extern "C" fn resynth_track_count(control: *const ResynthControl) -> u32 {
    if control.is_null() {
        return 0;
    }
    u32::try_from(unsafe { &*control }.inner.track_count()).unwrap_or(u32::MAX)
}
