// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::path::{Path, PathBuf};

use config::{Config, File};
use serde::Deserialize;

use super::audio::Audio;
use super::error::ConfigError;
use super::visualizer::Visualizer;

/// The top level sampler configuration.
#[derive(Deserialize, Clone, Debug)]
pub struct Sampler {
    /// Path to the bank file, relative to this file.
    bank: String,
    /// The audio output.
    audio: Audio,
    /// The waveform editor.
    #[serde(default)]
    visualizer: Visualizer,
    /// The directory the configuration was read from.
    #[serde(skip)]
    base_path: PathBuf,
}

impl Sampler {
    /// Parse a sampler configuration from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Sampler, ConfigError> {
        let mut sampler = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Sampler>()?;
        sampler.base_path = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        // Surface a bad interval at startup rather than when the loop starts.
        sampler.visualizer.refresh_interval()?;
        Ok(sampler)
    }

    /// The resolved path of the bank file.
    pub fn bank_path(&self) -> PathBuf {
        let bank = Path::new(&self.bank);
        if bank.is_absolute() {
            bank.to_path_buf()
        } else {
            self.base_path.join(bank)
        }
    }

    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    pub fn visualizer(&self) -> &Visualizer {
        &self.visualizer
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_parse_sampler() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("padtrim.yaml");
        std::fs::write(
            &path,
            r#"
bank: banks/808.yaml
audio:
  device: mock
  sample_rate: 48000
  master_volume: 0.8
visualizer:
  width: 640
  refresh_interval: 20ms
"#,
        )
        .expect("write config");

        let sampler = Sampler::deserialize(&path).expect("valid config");
        assert_eq!(sampler.bank_path(), dir.path().join("banks/808.yaml"));
        assert_eq!(sampler.audio().device(), "mock");
        assert_eq!(sampler.audio().sample_rate(), 48000);
        assert_eq!(sampler.audio().channels(), 2);
        assert_eq!(sampler.audio().master_volume(), 0.8);
        assert_eq!(sampler.visualizer().width(), 640);
        assert_eq!(sampler.visualizer().height(), 200);
        assert_eq!(
            sampler.visualizer().refresh_interval().expect("interval"),
            Duration::from_millis(20)
        );
    }

    #[test]
    fn test_visualizer_is_optional() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("padtrim.yaml");
        std::fs::write(&path, "bank: /banks/808.yaml\naudio:\n  device: default\n")
            .expect("write config");

        let sampler = Sampler::deserialize(&path).expect("valid config");
        assert_eq!(sampler.bank_path(), PathBuf::from("/banks/808.yaml"));
        assert_eq!(sampler.visualizer().width(), 800);
    }

    #[test]
    fn test_bad_refresh_interval() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("padtrim.yaml");
        std::fs::write(
            &path,
            "bank: 808.yaml\naudio:\n  device: mock\nvisualizer:\n  refresh_interval: often\n",
        )
        .expect("write config");

        assert!(matches!(
            Sampler::deserialize(&path),
            Err(ConfigError::InvalidDuration { .. })
        ));
    }
}
