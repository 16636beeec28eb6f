//! JSON settings file: model reference, synthesis parameters and preset tracks.
//!
//! ```json
//! {
//!   "model_name": "decoder.json",
//!   "parameters": {
//!     "xMax": 80.0, "sClip": -100.0, "win_length": 2048, "latent_dim": 2,
//!     "zRange": [{ "min": -3.0, "max": 3.0 }, { "min": -3.0, "max": 3.0 }]
//!   },
//!   "ztrack": [[0.0, 0.0], [1.5, -0.5]]
//! }
//! ```
//!
//! `parameters.fft_size` is optional. `model_name` is resolved next to the
//! settings file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::params::{SynthesisParameters, ZRange, DEFAULT_FFT_SIZE};
use crate::trajectory::{LatentVector, Trajectory};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub model_name: String,
    pub parameters: ParameterSection,
    #[serde(default)]
    pub ztrack: Vec<Vec<f32>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterSection {
    #[serde(rename = "xMax")]
    pub x_max: f32,
    #[serde(rename = "sClip")]
    pub s_clip: f32,
    pub win_length: usize,
    pub latent_dim: usize,
    #[serde(rename = "zRange")]
    pub z_range: Vec<ZRange>,
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
}

fn default_fft_size() -> usize {
    DEFAULT_FFT_SIZE
}

impl Settings {
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings = Self::from_json_str(&fs::read_to_string(path)?)?;
        tracing::info!(
            path = %path.display(),
            model = %settings.model_name,
            latent_dim = settings.parameters.latent_dim,
            win_length = settings.parameters.win_length,
            tracks = settings.ztrack.len(),
            "loaded settings"
        );
        Ok(settings)
    }

    /// Validated synthesis parameters.
    pub fn synthesis_parameters(&self) -> Result<SynthesisParameters> {
        let p = &self.parameters;
        let params = SynthesisParameters {
            x_max: p.x_max,
            s_clip: p.s_clip,
            win_length: p.win_length,
            latent_dim: p.latent_dim,
            z_range: p.z_range.clone(),
            fft_size: p.fft_size,
        };
        params.validate()?;
        Ok(params)
    }

    /// Preset tracks, each checked against `latent_dim`.
    pub fn trajectory(&self) -> Result<Trajectory> {
        let tracks = self.ztrack.iter().cloned().map(LatentVector::from).collect();
        Trajectory::new(tracks, self.parameters.latent_dim)
    }

    /// Model file sitting next to `settings_path`.
    pub fn model_path(&self, settings_path: impl AsRef<Path>) -> PathBuf {
        settings_path.as_ref().with_file_name(&self.model_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const SAMPLE: &str = r#"{
        "model_name": "decoder.json",
        "parameters": {
            "xMax": 80.0, "sClip": -100.0, "win_length": 1024, "latent_dim": 2,
            "zRange": [{ "min": -3.0, "max": 3.0 }, { "min": 0.0, "max": 1.0 }]
        },
        "ztrack": [[0.0, 0.5], [1.5, 0.25], [-2.0, 1.0]]
    }"#;

    #[test]
    fn parses_the_settings_format() {
        let s = Settings::from_json_str(SAMPLE).unwrap();
        assert_eq!(s.model_name, "decoder.json");
        let p = s.synthesis_parameters().unwrap();
        assert_eq!(p.x_max, 80.0);
        assert_eq!(p.s_clip, -100.0);
        assert_eq!(p.win_length, 1024);
        assert_eq!(p.fft_size, DEFAULT_FFT_SIZE);
        assert_eq!(p.z_range[1], ZRange::new(0.0, 1.0));

        let t = s.trajectory().unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t[1].as_slice(), &[1.5, 0.25]);
    }

    #[test]
    fn model_path_is_a_sibling() {
        let s = Settings::from_json_str(SAMPLE).unwrap();
        let p = s.model_path("/presets/drone/settings.json");
        assert_eq!(p, PathBuf::from("/presets/drone/decoder.json"));
    }

    #[test]
    fn track_with_wrong_length_fails() {
        let mut s = Settings::from_json_str(SAMPLE).unwrap();
        s.ztrack.push(vec![1.0]);
        assert!(matches!(s.trajectory(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn missing_field_is_a_parse_error() {
        let broken = SAMPLE.replace("\"win_length\": 1024,", "");
        assert!(matches!(Settings::from_json_str(&broken), Err(Error::Json(_))));
    }

    #[test]
    fn from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, SAMPLE).unwrap();
        let s = Settings::from_path(&path).unwrap();
        assert_eq!(s.parameters.latent_dim, 2);

        assert!(matches!(Settings::from_path(dir.path().join("nope.json")), Err(Error::Io(_))));
    }
}
