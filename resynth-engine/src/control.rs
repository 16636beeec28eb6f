//! Control surface: track selection, latent edits and level changes.
//!
//! [`ControlHandle`] is cheap to clone and safe to use from any non-realtime
//! thread. Every change is published as a complete snapshot (see
//! [`crate::handoff`]), so the voice picks up whole latent vectors and whole
//! gain pairs at its next frame, never a half-updated mix.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::handoff::Snapshot;
use crate::params::{Gains, SynthesisParameters, ZRange, SILENT_GAINS};
use crate::trajectory::{LatentVector, Trajectory};

#[derive(Clone, Debug)]
pub struct ControlHandle {
    params: Arc<SynthesisParameters>,
    trajectory: Arc<Trajectory>,
    latent: Arc<Snapshot<LatentVector>>,
    gains: Arc<Snapshot<Gains>>,
}

impl ControlHandle {
    /// Starts from the neutral latent vector and the loaded levels.
    pub fn new(params: SynthesisParameters, trajectory: Trajectory) -> Self {
        let latent = Arc::new(Snapshot::new(LatentVector::neutral(params.latent_dim)));
        let gains = Arc::new(Snapshot::new(params.gains()));
        Self { params: Arc::new(params), trajectory: Arc::new(trajectory), latent, gains }
    }

    pub(crate) fn latent_cell(&self) -> Arc<Snapshot<LatentVector>> { Arc::clone(&self.latent) }
    pub(crate) fn gains_cell(&self) -> Arc<Snapshot<Gains>> { Arc::clone(&self.gains) }

    #[inline] pub fn params(&self) -> &SynthesisParameters { &self.params }
    #[inline] pub fn trajectory(&self) -> &Trajectory { &self.trajectory }
    #[inline] pub fn track_count(&self) -> usize { self.trajectory.len() }
    #[inline] pub fn latent_dim(&self) -> usize { self.params.latent_dim }

    /// Make track `index` the current latent vector and return it, so a UI can
    /// move its sliders to match. Out-of-range indices change nothing.
    pub fn select_track(&self, index: usize) -> Result<LatentVector> {
        let Some(track) = self.trajectory.get(index) else {
            let count = self.trajectory.len();
            tracing::warn!(index, count, "invalid track index");
            return Err(Error::InvalidTrack { index, count });
        };
        self.latent.publish(track.clone());
        tracing::debug!(index, "selected track");
        Ok(track.clone())
    }

    /// Overwrite one latent component. No clamping: consult [`Self::get_range`] first.
    pub fn set_component(&self, dim: usize, value: f32) -> Result<()> {
        let latent_dim = self.params.latent_dim;
        if dim >= latent_dim {
            tracing::warn!(dim, latent_dim, "invalid latent dimension");
            return Err(Error::InvalidDimension { dim, latent_dim });
        }
        self.latent.update(|cur| cur.with_component(dim, value).unwrap_or_else(|| cur.clone()));
        let in_range = self.params.range(dim).map_or(true, |r| r.contains(value));
        tracing::debug!(dim, value, in_range, "latent component");
        Ok(())
    }

    /// Set the magnitude scale (dB span of the model output).
    pub fn set_scale(&self, x_max: f32) {
        self.gains.update(|g| Gains { x_max, ..*g });
        tracing::debug!(x_max, "scale");
    }

    /// Set the clip offset (dB floor).
    pub fn set_clip(&self, s_clip: f32) {
        self.gains.update(|g| Gains { s_clip, ..*g });
        tracing::debug!(s_clip, "clip");
    }

    /// Set both levels in one snapshot.
    pub fn set_gains(&self, gains: Gains) {
        self.gains.publish(gains);
    }

    /// Drop to the silent levels; returns what was active so it can be restored.
    pub fn mute(&self) -> Gains {
        *self.gains.update(|_| SILENT_GAINS)
    }

    #[inline]
    pub fn get_range(&self, dim: usize) -> Option<ZRange> {
        self.params.range(dim)
    }

    #[inline]
    pub fn gains(&self) -> Gains {
        self.gains.get()
    }

    pub fn current_latent(&self) -> LatentVector {
        LatentVector::clone(&self.latent.load())
    }
}

/// Steps through the trajectory, one track per call, wrapping at the end.
#[derive(Debug)]
pub struct TrackSequencer {
    control: ControlHandle,
    next: usize,
}

impl TrackSequencer {
    pub fn new(control: ControlHandle, start: usize) -> Self {
        Self { control, next: start }
    }

    /// Select the next track. `None` if the trajectory is empty.
    pub fn step(&mut self) -> Option<usize> {
        let count = self.control.track_count();
        if count == 0 {
            return None;
        }
        let index = self.next % count;
        self.control.select_track(index).ok()?;
        self.next = (index + 1) % count;
        Some(index)
    }

    /// Step every `interval` on a background thread until `stop` is set.
    pub fn spawn(mut self, interval: Duration, stop: Arc<AtomicBool>) -> JoinHandle<()> {
        thread::spawn(move || {
            while !stop.load(Ordering::Acquire) {
                if self.step().is_none() {
                    break;
                }
                thread::sleep(interval);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::DEFAULT_FFT_SIZE;

    fn handle() -> ControlHandle {
        let params = SynthesisParameters {
            x_max: 80.0,
            s_clip: -100.0,
            win_length: 512,
            latent_dim: 3,
            z_range: vec![ZRange::new(-1.0, 1.0); 3],
            fft_size: DEFAULT_FFT_SIZE,
        };
        let tracks = vec![
            LatentVector::from(vec![0.1, 0.2, 0.3]),
            LatentVector::from(vec![-0.5, 0.0, 0.5]),
            LatentVector::from(vec![0.9, 0.8, 0.7]),
        ];
        let trajectory = Trajectory::new(tracks, 3).unwrap();
        ControlHandle::new(params, trajectory)
    }

    #[test]
    fn starts_neutral_with_loaded_levels() {
        let c = handle();
        assert_eq!(c.current_latent().as_slice(), &[1.0, 1.0, 1.0]);
        assert_eq!(c.gains(), Gains { x_max: 80.0, s_clip: -100.0 });
    }

    #[test]
    fn select_track_round_trips() {
        let c = handle();
        for i in 0..c.track_count() {
            let returned = c.select_track(i).unwrap();
            assert_eq!(returned, c.trajectory()[i]);
            assert_eq!(c.current_latent(), c.trajectory()[i]);
        }
    }

    #[test]
    fn select_out_of_range_leaves_latent_unchanged() {
        let c = handle();
        c.select_track(1).unwrap();
        let before = c.current_latent();
        assert!(matches!(c.select_track(5), Err(Error::InvalidTrack { index: 5, count: 3 })));
        assert_eq!(c.current_latent(), before);
    }

    #[test]
    fn set_component_is_unclamped() {
        let c = handle();
        c.set_component(2, 42.0).unwrap();
        assert_eq!(c.current_latent().as_slice(), &[1.0, 1.0, 42.0]);
        assert_eq!(c.get_range(2), Some(ZRange::new(-1.0, 1.0)));
        assert!(matches!(c.set_component(3, 0.0), Err(Error::InvalidDimension { dim: 3, latent_dim: 3 })));
        assert_eq!(c.get_range(3), None);
    }

    #[test]
    fn levels_update_independently() {
        let c = handle();
        c.set_scale(60.0);
        c.set_clip(-80.0);
        assert_eq!(c.gains(), Gains { x_max: 60.0, s_clip: -80.0 });
        let prev = c.mute();
        assert_eq!(prev, Gains { x_max: 60.0, s_clip: -80.0 });
        assert_eq!(c.gains(), SILENT_GAINS);
        c.set_gains(prev);
        assert_eq!(c.gains(), prev);
    }

    #[test]
    fn clones_share_state() {
        let a = handle();
        let b = a.clone();
        b.select_track(2).unwrap();
        assert_eq!(a.current_latent().as_slice(), &[0.9, 0.8, 0.7]);
    }

    #[test]
    fn sequencer_wraps() {
        let c = handle();
        let mut seq = TrackSequencer::new(c.clone(), 2);
        assert_eq!(seq.step(), Some(2));
        assert_eq!(seq.step(), Some(0));
        assert_eq!(c.current_latent(), c.trajectory()[0]);
    }

    #[test]
    fn sequencer_stops_on_flag() {
        let c = handle();
        let stop = Arc::new(AtomicBool::new(false));
        let h = TrackSequencer::new(c, 0).spawn(Duration::from_millis(1), Arc::clone(&stop));
        thread::sleep(Duration::from_millis(10));
        stop.store(true, Ordering::Release);
        h.join().unwrap();
    }
}
