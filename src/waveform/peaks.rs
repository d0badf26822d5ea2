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

//! Peak reduction for waveform display.
//!
//! The buffer is split into one segment per pixel column. Each segment is sampled at
//! a stride instead of frame by frame, so the result is a display approximation of the
//! envelope rather than the exact peak. It is deterministic for a given buffer and width.

use crate::sample::DecodedAudio;

/// Each segment is probed roughly this many times.
pub const DEFAULT_STRIDE_DIVISOR: usize = 10;

/// Reduces decoded audio to one peak magnitude per pixel column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeakReducer {
    stride_divisor: usize,
}

impl Default for PeakReducer {
    fn default() -> Self {
        PeakReducer::new()
    }
}

impl PeakReducer {
    /// Creates a reducer with the default stride divisor.
    pub fn new() -> PeakReducer {
        PeakReducer {
            stride_divisor: DEFAULT_STRIDE_DIVISOR,
        }
    }

    /// Creates a reducer probing each segment about `stride_divisor` times. A divisor of
    /// 1 or less reads every frame of segments up to one frame long, and larger divisors
    /// trade speed for fidelity.
    pub fn with_stride_divisor(stride_divisor: usize) -> PeakReducer {
        PeakReducer {
            stride_divisor: stride_divisor.max(1),
        }
    }

    pub fn stride_divisor(&self) -> usize {
        self.stride_divisor
    }

    /// Frames per pixel column.
    pub fn segment_size(total_frames: usize, target_width: usize) -> usize {
        if target_width == 0 {
            return 0;
        }
        total_frames.div_ceil(target_width)
    }

    /// Distance between probed frames within a segment.
    pub fn stride(&self, segment_size: usize) -> usize {
        (segment_size / self.stride_divisor).max(1)
    }

    /// Returns `target_width` non-negative peak magnitudes, averaged across channels.
    pub fn reduce(&self, audio: &DecodedAudio, target_width: usize) -> Vec<f32> {
        let mut peaks = vec![0.0f32; target_width];
        let total_frames = audio.frames();
        let channel_count = audio.channel_count();
        if target_width == 0 || total_frames == 0 || channel_count == 0 {
            return peaks;
        }

        let segment_size = Self::segment_size(total_frames, target_width);
        let stride = self.stride(segment_size);
        let channel_scale = 1.0 / channel_count as f32;

        for channel in audio.channels() {
            for (column, peak) in peaks.iter_mut().enumerate() {
                let start = column * segment_size;
                if start >= total_frames {
                    break;
                }
                let end = (start + segment_size).min(total_frames);
                let max = channel[start..end]
                    .iter()
                    .step_by(stride)
                    .fold(0.0f32, |max, sample| max.max(sample.abs()));
                *peak += max * channel_scale;
            }
        }

        peaks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_zero_buffer() {
        let audio = DecodedAudio::new(vec![vec![0.0; 44100], vec![0.0; 44100]], 44100);
        let peaks = PeakReducer::new().reduce(&audio, 800);
        assert_eq!(peaks.len(), 800);
        assert!(peaks.iter().all(|p| *p == 0.0));
    }

    #[test]
    fn test_empty_inputs() {
        let reducer = PeakReducer::new();
        let empty = DecodedAudio::new(vec![Vec::new()], 44100);
        assert_eq!(reducer.reduce(&empty, 16), vec![0.0; 16]);

        let no_channels = DecodedAudio::new(Vec::new(), 44100);
        assert_eq!(reducer.reduce(&no_channels, 4), vec![0.0; 4]);

        let audio = DecodedAudio::new(vec![vec![1.0; 10]], 44100);
        assert!(reducer.reduce(&audio, 0).is_empty());
    }

    #[test]
    fn test_peak_is_absolute() {
        let mut samples = vec![0.0; 100];
        samples[35] = -0.8;
        samples[71] = 0.3;
        let audio = DecodedAudio::new(vec![samples], 100);

        // 10 frames per segment, stride 1: every frame is examined.
        let peaks = PeakReducer::new().reduce(&audio, 10);
        assert_eq!(peaks[3], 0.8);
        assert_eq!(peaks[7], 0.3);
        assert_eq!(peaks.iter().filter(|p| **p > 0.0).count(), 2);
    }

    #[test]
    fn test_stride_skips_frames() {
        let mut samples = vec![0.0; 1000];
        samples[5] = 1.0; // between probes
        samples[110] = 0.5; // on a probe
        let audio = DecodedAudio::new(vec![samples], 1000);

        // 100 frames per segment, stride 10.
        let peaks = PeakReducer::new().reduce(&audio, 10);
        assert_eq!(peaks[0], 0.0);
        assert_eq!(peaks[1], 0.5);

        // A divisor equal to the segment size reads every frame.
        let peaks = PeakReducer::with_stride_divisor(100).reduce(&audio, 10);
        assert_eq!(peaks[0], 1.0);
    }

    #[test]
    fn test_channels_are_averaged() {
        let mut left = vec![0.0; 20];
        let mut right = vec![0.0; 20];
        left[0] = 1.0;
        right[1] = -0.5;
        right[15] = 0.4;
        let audio = DecodedAudio::new(vec![left, right], 20);

        let peaks = PeakReducer::new().reduce(&audio, 2);
        assert!((peaks[0] - 0.75).abs() < 1e-6);
        assert!((peaks[1] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_width_wider_than_buffer() {
        let audio = DecodedAudio::new(vec![vec![0.5; 3]], 3);
        let peaks = PeakReducer::new().reduce(&audio, 8);
        assert_eq!(peaks, vec![0.5, 0.5, 0.5, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_segment_size_rounds_up() {
        assert_eq!(PeakReducer::segment_size(1001, 10), 101);
        assert_eq!(PeakReducer::segment_size(1000, 10), 100);
        assert_eq!(PeakReducer::segment_size(5, 0), 0);
        assert_eq!(PeakReducer::new().stride(9), 1);
        assert_eq!(PeakReducer::new().stride(101), 10);
    }

    #[test]
    fn test_deterministic() {
        let samples: Vec<f32> = (0..10_000).map(|i| ((i * 7919) % 200) as f32 / 100.0 - 1.0).collect();
        let audio = DecodedAudio::new(vec![samples], 44100);
        let reducer = PeakReducer::new();
        assert_eq!(reducer.reduce(&audio, 333), reducer.reduce(&audio, 333));
    }
}
