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
use std::time::Duration;

use duration_string::DurationString;
use serde::Deserialize;

use super::error::ConfigError;
use crate::region::DEFAULT_HIT_DISTANCE;
use crate::waveform::peaks::DEFAULT_STRIDE_DIVISOR;

const DEFAULT_WIDTH: u32 = 800;
const DEFAULT_HEIGHT: u32 = 200;
const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(16);

/// A YAML representation of the waveform editor settings.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Visualizer {
    /// Canvas width in pixels (default: 800).
    width: Option<u32>,
    /// Canvas height in pixels (default: 200).
    height: Option<u32>,
    /// How often the marker layer is redrawn, e.g. "16ms" (default: 16ms).
    refresh_interval: Option<String>,
    /// How close the pointer must be to grab a marker (default: 10).
    hit_distance: Option<f64>,
    /// How many probes the peak reducer takes per pixel column (default: 10).
    stride_divisor: Option<usize>,
}

impl Visualizer {
    pub fn width(&self) -> u32 {
        self.width.unwrap_or(DEFAULT_WIDTH)
    }

    pub fn height(&self) -> u32 {
        self.height.unwrap_or(DEFAULT_HEIGHT)
    }

    /// Returns the refresh interval.
    pub fn refresh_interval(&self) -> Result<Duration, ConfigError> {
        match &self.refresh_interval {
            Some(value) => DurationString::from_string(value.clone())
                .map(Duration::from)
                .map_err(|e| ConfigError::InvalidDuration {
                    value: value.clone(),
                    reason: e.to_string(),
                }),
            None => Ok(DEFAULT_REFRESH_INTERVAL),
        }
    }

    pub fn hit_distance(&self) -> f64 {
        self.hit_distance.unwrap_or(DEFAULT_HIT_DISTANCE)
    }

    pub fn stride_divisor(&self) -> usize {
        self.stride_divisor.unwrap_or(DEFAULT_STRIDE_DIVISOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let visualizer = Visualizer::default();
        assert_eq!(visualizer.width(), 800);
        assert_eq!(visualizer.height(), 200);
        assert_eq!(
            visualizer.refresh_interval().expect("default interval"),
            Duration::from_millis(16)
        );
        assert_eq!(visualizer.hit_distance(), 10.0);
        assert_eq!(visualizer.stride_divisor(), 10);
    }

    #[test]
    fn test_refresh_interval() {
        let visualizer = Visualizer {
            refresh_interval: Some("33ms".to_string()),
            ..Default::default()
        };
        assert_eq!(
            visualizer.refresh_interval().expect("valid interval"),
            Duration::from_millis(33)
        );

        let visualizer = Visualizer {
            refresh_interval: Some("soon".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            visualizer.refresh_interval(),
            Err(ConfigError::InvalidDuration { .. })
        ));
    }
}
