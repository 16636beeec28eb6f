//! Resynth CLI: play a settings file through an output device, or render it to WAV.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use resynth_engine::control::{ControlHandle, TrackSequencer};
use resynth_engine::graph::{Engine, EngineOptions};
use resynth_engine::synth::RandomPhase;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "resynth", version, about = "Latent-space spectral resynthesis player")]
struct Args {
    /// Settings JSON (model reference, parameters, preset tracks)
    #[arg(short, long, required_unless_present = "list_devices")]
    config: Option<PathBuf>,

    /// List output devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Output device name (default device if omitted)
    #[arg(long)]
    device: Option<String>,

    #[arg(long)]
    sample_rate: Option<u32>,

    #[arg(long)]
    channels: Option<u16>,

    /// Stop after this many seconds (offline renders default to 10)
    #[arg(long)]
    duration: Option<f32>,

    /// Preset track to start on
    #[arg(short, long)]
    track: Option<usize>,

    /// Step through the preset tracks every N seconds
    #[arg(long)]
    track_interval: Option<f32>,

    /// Output gain applied before the hard clip
    #[arg(long, default_value_t = 0.8)]
    gain: f32,

    /// Block size in frames (device buffer and render chunk)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    block: Option<u32>,

    /// Fixed synthesis hop in samples; must divide the window (default: one frame per block)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    hop: Option<u32>,

    /// Seed for the phase generator (entropy if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Start at the silent levels instead of the loaded ones
    #[arg(long)]
    start_muted: bool,

    /// Render to a 32-bit float WAV instead of playing
    #[arg(long, value_name = "WAV")]
    render: Option<PathBuf>,
}

const DEFAULT_RENDER_SECS: f32 = 10.0;
const DEFAULT_RENDER_RATE: u32 = 48_000;
const DEFAULT_BLOCK: u32 = 512;

fn list_output_devices() -> Result<(), Box<dyn Error>> {
    let host = cpal::default_host();
    println!("Available output devices:");
    for dev in host.output_devices()? {
        println!("- {}", dev.name()?);
    }
    Ok(())
}

fn pick_device(name: Option<&str>) -> Result<cpal::Device, Box<dyn Error>> {
    let host = cpal::default_host();
    if let Some(name) = name {
        for d in host.output_devices()? {
            if d.name()? == name {
                return Ok(d);
            }
        }
        return Err(format!("requested device not found: {name}").into());
    }
    host.default_output_device().ok_or_else(|| "no default output device".into())
}

/// Closest supported config to the requested rate/channels, rate mismatches
/// weighted far above channel mismatches.
fn choose_config(
    device: &cpal::Device,
    req_sr: Option<u32>,
    req_ch: Option<u16>,
) -> Result<cpal::SupportedStreamConfig, Box<dyn Error>> {
    if req_sr.is_none() && req_ch.is_none() {
        return Ok(device.default_output_config()?);
    }

    let mut best: Option<(u64, cpal::SupportedStreamConfigRange)> = None;
    for range in device.supported_output_configs()? {
        let sr_min = range.min_sample_rate().0;
        let sr_max = range.max_sample_rate().0;
        let ch_pen = req_ch.map_or(0, |c| u64::from(range.channels().abs_diff(c)));
        let sr_pen = req_sr.map_or(0, |sr| {
            if (sr_min..=sr_max).contains(&sr) { 0 } else { u64::from(sr_min.abs_diff(sr).min(sr_max.abs_diff(sr))) }
        });
        let score = sr_pen.saturating_mul(1000) + ch_pen;
        if best.as_ref().map_or(true, |(s, _)| score < *s) {
            best = Some((score, range));
        }
    }

    let (_, range) = best.ok_or("no supported output configs")?;
    let rate = match req_sr {
        Some(sr) => cpal::SampleRate(sr.clamp(range.min_sample_rate().0, range.max_sample_rate().0)),
        None => range.max_sample_rate(),
    };
    Ok(range.with_sample_rate(rate))
}

fn phases(seed: Option<u64>) -> RandomPhase {
    seed.map_or_else(RandomPhase::from_entropy, RandomPhase::seeded)
}

fn engine_options(args: &Args) -> EngineOptions {
    EngineOptions {
        hop: args.hop.map(|h| h as usize),
        max_block: args.block.unwrap_or(DEFAULT_BLOCK) as usize,
        start_muted: args.start_muted,
    }
}

fn select_start_track(control: &ControlHandle, track: Option<usize>) {
    if let Some(t) = track {
        // an invalid index is logged by the handle and leaves the neutral vector
        let _ = control.select_track(t);
    }
}

#[inline]
fn shape(s: f32, gain: f32) -> f32 {
    (s * gain).clamp(-1.0, 1.0)
}

// ---- realtime ----

fn build_stream<T>(
    device: &cpal::Device,
    cfg: &cpal::StreamConfig,
    mut engine: Engine,
    gain: f32,
    block: usize,
    meter: Arc<AtomicU32>,
) -> Result<cpal::Stream, Box<dyn Error>>
where
    T: cpal::Sample + cpal::FromSample<f32> + cpal::SizedSample + Send + 'static,
{
    let channels = usize::from(cfg.channels);
    let mut scratch = vec![0.0f32; block.max(1) * channels];

    let stream = device.build_output_stream(
        cfg,
        move |output: &mut [T], _| {
            let mut peak = 0.0f32;
            for chunk in output.chunks_mut(scratch.len()) {
                let buf = &mut scratch[..chunk.len()];
                engine.render_interleaved(buf, channels);
                for (o, &s) in chunk.iter_mut().zip(buf.iter()) {
                    let s = shape(s, gain);
                    peak = peak.max(s.abs());
                    *o = T::from_sample(s);
                }
            }
            meter.fetch_max(peak.to_bits(), Ordering::Relaxed);
        },
        |e| tracing::error!(error = %e, "stream error"),
        None,
    )?;
    Ok(stream)
}

fn play(args: &Args, config: &Path) -> Result<(), Box<dyn Error>> {
    let device = pick_device(args.device.as_deref())?;
    let sup_cfg = choose_config(&device, args.sample_rate, args.channels)?;
    let sample_format = sup_cfg.sample_format();
    let mut cfg = sup_cfg.config();
    if let Some(sr) = args.sample_rate {
        cfg.sample_rate = cpal::SampleRate(sr);
    }
    if let Some(ch) = args.channels {
        cfg.channels = ch;
    }
    if let Some(b) = args.block {
        cfg.buffer_size = cpal::BufferSize::Fixed(b);
    }

    let opts = engine_options(args);
    let (engine, control) = Engine::load_or_silence(config, phases(args.seed), opts);

    let device_name = device.name()?;
    tracing::info!(device = %device_name, ?cfg, ?sample_format, gain = args.gain, "starting stream");

    let meter = Arc::new(AtomicU32::new(0));
    let block = opts.max_block;
    let m = Arc::clone(&meter);
    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &cfg, engine, args.gain, block, m)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &cfg, engine, args.gain, block, m)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &cfg, engine, args.gain, block, m)?,
        other => return Err(format!("unsupported device sample format: {other:?}").into()),
    };

    let stop = Arc::new(AtomicBool::new(false));
    let mut sequencer = None;
    if let Some(control) = &control {
        select_start_track(control, args.track);
        if let Some(secs) = args.track_interval.filter(|s| *s > 0.0) {
            let start = args.track.map_or(0, |t| t + 1);
            let seq = TrackSequencer::new(control.clone(), start);
            sequencer = Some(seq.spawn(Duration::from_secs_f32(secs), Arc::clone(&stop)));
        }
    }

    stream.play()?;
    println!("Press Ctrl+C to stop…");

    let mut elapsed = 0.0f32;
    loop {
        std::thread::sleep(Duration::from_secs(1));
        elapsed += 1.0;
        let peak = f32::from_bits(meter.swap(0, Ordering::Relaxed));
        tracing::debug!(peak, "meter");
        if args.duration.is_some_and(|d| elapsed >= d) {
            break;
        }
    }

    stop.store(true, Ordering::Release);
    if let Some(h) = sequencer {
        let _ = h.join();
    }
    Ok(())
}

// ---- offline ----

fn render(args: &Args, config: &Path, wav: &Path) -> Result<(), Box<dyn Error>> {
    let sample_rate = args.sample_rate.unwrap_or(DEFAULT_RENDER_RATE);
    let channels = args.channels.unwrap_or(2).max(1);
    let secs = args.duration.unwrap_or(DEFAULT_RENDER_SECS).max(0.0);
    let total_frames = (secs * sample_rate as f32) as usize;

    let opts = engine_options(args);
    let (mut engine, control) = Engine::load(config, phases(args.seed), opts)?;
    select_start_track(&control, args.track);

    let mut sequencer = args
        .track_interval
        .filter(|s| *s > 0.0)
        .map(|secs| {
            let every = ((secs * sample_rate as f32) as usize).max(1);
            (TrackSequencer::new(control.clone(), args.track.map_or(0, |t| t + 1)), every)
        });

    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(wav, spec)?;

    let ch = usize::from(channels);
    let mut buf = vec![0.0f32; opts.max_block * ch];
    let mut done = 0usize;
    let mut peak = 0.0f32;
    while done < total_frames {
        let frames = opts.max_block.min(total_frames - done);
        if let Some((seq, every)) = sequencer.as_mut() {
            if done > 0 && done % *every < frames {
                seq.step();
            }
        }
        let out = &mut buf[..frames * ch];
        engine.render_interleaved(out, ch);
        for &s in out.iter() {
            let s = shape(s, args.gain);
            peak = peak.max(s.abs());
            writer.write_sample(s)?;
        }
        done += frames;
    }
    writer.finalize()?;

    if let Some(e) = engine.fault() {
        tracing::warn!(error = %e, "render finished silent after a fault");
    }
    tracing::info!(path = %wav.display(), frames = total_frames, sample_rate, channels, peak, "wrote wav");
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    if args.list_devices {
        return list_output_devices();
    }
    let Some(config) = args.config.as_ref() else {
        return Err("--config is required".into());
    };

    match args.render.as_ref() {
        Some(wav) => render(&args, config, wav),
        None => play(&args, config),
    }
}
