//! Control-thread / audio-thread interaction through the public API.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use resynth_engine::prelude::*;
use resynth_engine::{Error, ModelError};

const DIM: usize = 4;

fn params() -> SynthesisParameters {
    SynthesisParameters {
        x_max: 80.0,
        s_clip: -100.0,
        win_length: 32,
        latent_dim: DIM,
        z_range: vec![ZRange::new(-1.0, 1.0); DIM],
        fft_size: 64,
    }
}

fn tracks() -> Trajectory {
    Trajectory::new(
        vec![LatentVector::from(vec![0.0; DIM]), LatentVector::from(vec![1.0; DIM])],
        DIM,
    )
    .unwrap()
}

#[test]
fn voice_never_sees_a_mixed_latent() {
    let mixed = Arc::new(AtomicUsize::new(0));
    let frames = Arc::new(AtomicUsize::new(0));
    let (m, f) = (Arc::clone(&mixed), Arc::clone(&frames));
    let model = move |z: &[f32], out: &mut Vec<f32>| {
        f.fetch_add(1, Ordering::Relaxed);
        let first = z[0];
        if z.iter().any(|&v| v != first) {
            m.fetch_add(1, Ordering::Relaxed);
        }
        out.clear();
        out.resize(33, 0.5);
    };

    let (mut engine, control) =
        Engine::build(params(), tracks(), model, RandomPhase::seeded(5), EngineOptions::default()).unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let writer = {
        let stop = Arc::clone(&stop);
        let control = control.clone();
        thread::spawn(move || {
            let mut i = 0usize;
            while !stop.load(Ordering::Acquire) {
                control.select_track(i % 2).unwrap();
                i += 1;
            }
        })
    };

    let mut out = [0.0f32; 8];
    for _ in 0..5_000 {
        engine.render(&mut out);
        assert!(out.iter().all(|x| x.is_finite()));
    }
    stop.store(true, Ordering::Release);
    writer.join().unwrap();

    assert!(engine.fault().is_none());
    assert!(frames.load(Ordering::Relaxed) > 5_000);
    assert_eq!(mixed.load(Ordering::Relaxed), 0);
}

#[test]
fn levels_change_mid_stream() {
    let model = |_: &[f32], out: &mut Vec<f32>| {
        out.clear();
        out.resize(33, 0.9);
    };
    let (mut engine, control) =
        Engine::build(params(), tracks(), model, FixedPhase(0.3), EngineOptions::default()).unwrap();

    let peak = |buf: &[f32]| buf.iter().fold(0.0f32, |m, x| m.max(x.abs()));

    // one full window per block, so every block is a fresh frame
    let mut out = [0.0f32; 32];
    engine.render(&mut out);
    let loud = peak(&out);
    assert!(loud > 0.0);

    let before = control.mute();
    assert_eq!(before, Gains { x_max: 80.0, s_clip: -100.0 });
    engine.render(&mut out);
    // amplitude drops from 10^-1.4 to 10^-5 per bin
    assert!(peak(&out) < loud * 1e-3);
}

#[test]
fn model_that_changes_size_goes_silent_without_panicking() {
    let calls = Arc::new(Mutex::new(0usize));
    let c = Arc::clone(&calls);
    let model = move |_: &[f32], out: &mut Vec<f32>| {
        let mut n = c.lock().unwrap();
        *n += 1;
        out.clear();
        out.resize(if *n > 3 { 7 } else { 33 }, 0.5);
    };
    let (mut engine, _control) =
        Engine::build(params(), tracks(), model, RandomPhase::seeded(8), EngineOptions::default()).unwrap();

    let mut out = [0.0f32; 16];
    engine.render_interleaved(&mut out, 2);
    engine.render_interleaved(&mut out, 2);
    assert!(engine.is_active());

    engine.render_interleaved(&mut out, 2);
    assert_eq!(out, [0.0; 16]);
    assert!(matches!(engine.fault(), Some(Error::SpectrumSize { expected: 33, got: 7 })));
}

#[test]
fn backend_errors_latch_too() {
    struct Broken;
    impl SpectrumModel for Broken {
        fn predict(&mut self, _: &[f32], out: &mut Vec<f32>) -> Result<(), ModelError> {
            if out.is_empty() {
                out.resize(33, 0.0);
                return Ok(());
            }
            Err(ModelError::Backend("device lost".into()))
        }
    }
    let (mut engine, _control) =
        Engine::build(params(), tracks(), Broken, FixedPhase(0.0), EngineOptions::default()).unwrap();
    let mut out = [1.0f32; 8];
    engine.render(&mut out);
    assert_eq!(out, [0.0; 8]);
    assert!(matches!(engine.fault(), Some(Error::Model(ModelError::Backend(_)))));
}
