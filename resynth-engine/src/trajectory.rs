//! Latent vectors and the precomputed track list.

use std::ops::{Deref, Index};

use crate::error::{Error, Result};

/// One point in the model's latent space.
///
/// Length is fixed at construction; components are never clamped here, the
/// per-dimension ranges are advisory.
#[derive(Clone, Debug, PartialEq)]
pub struct LatentVector(Box<[f32]>);

impl LatentVector {
    /// Neutral starting point: all ones, the vector the model is warmed up with.
    pub fn neutral(latent_dim: usize) -> Self {
        Self(vec![1.0; latent_dim].into_boxed_slice())
    }

    #[inline] pub fn as_slice(&self) -> &[f32] { &self.0 }

    /// Copy with `dim` replaced. `None` if `dim` is out of range.
    pub fn with_component(&self, dim: usize, value: f32) -> Option<Self> {
        if dim >= self.0.len() {
            return None;
        }
        let mut next = self.0.clone();
        next[dim] = value;
        Some(Self(next))
    }
}

impl From<Vec<f32>> for LatentVector {
    fn from(v: Vec<f32>) -> Self { Self(v.into_boxed_slice()) }
}

impl Deref for LatentVector {
    type Target = [f32];
    fn deref(&self) -> &[f32] { &self.0 }
}

/// Ordered, immutable list of preset latent vectors ("tracks").
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Trajectory {
    tracks: Vec<LatentVector>,
}

impl Trajectory {
    /// Build a trajectory, checking that every track has `latent_dim` components.
    pub fn new(tracks: Vec<LatentVector>, latent_dim: usize) -> Result<Self> {
        if let Some((i, t)) = tracks.iter().enumerate().find(|(_, t)| t.len() != latent_dim) {
            return Err(Error::InvalidConfig(format!(
                "track {i} has {} components, latent_dim is {latent_dim}",
                t.len()
            )));
        }
        Ok(Self { tracks })
    }

    #[inline] pub fn len(&self) -> usize { self.tracks.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.tracks.is_empty() }
    #[inline] pub fn get(&self, index: usize) -> Option<&LatentVector> { self.tracks.get(index) }
}

impl Index<usize> for Trajectory {
    type Output = LatentVector;
    fn index(&self, index: usize) -> &LatentVector { &self.tracks[index] }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_is_all_ones() {
        assert_eq!(LatentVector::neutral(3).as_slice(), &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn with_component_replaces_one_value() {
        let v = LatentVector::from(vec![0.0, 1.0, 2.0]);
        let w = v.with_component(1, 9.0).unwrap();
        assert_eq!(w.as_slice(), &[0.0, 9.0, 2.0]);
        assert_eq!(v.as_slice(), &[0.0, 1.0, 2.0]);
        assert!(v.with_component(3, 1.0).is_none());
    }

    #[test]
    fn mismatched_track_is_rejected() {
        let tracks = vec![LatentVector::from(vec![0.0, 1.0]), LatentVector::from(vec![0.0])];
        assert!(matches!(Trajectory::new(tracks, 2), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn index_and_get_agree() {
        let t = Trajectory::new(vec![LatentVector::from(vec![0.5, -0.5])], 2).unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.get(0), Some(&t[0]));
        assert!(t.get(1).is_none());
    }
}
