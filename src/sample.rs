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

//! Pad samples and their trim regions.
//!
//! A trim region is stored once, in seconds. Pixel positions are a projection of
//! that region onto a canvas width and are only computed at the edges where the
//! visualizer draws or reads pointer input.

use std::fmt;
use std::sync::Arc;

use crate::samples::LoadError;

/// The number of pads in a bank.
pub const NUM_PADS: usize = 16;

/// Decoded audio held in planar form (one Vec per channel).
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl DecodedAudio {
    /// Creates decoded audio from planar channel data. Channels are truncated to the
    /// shortest channel so every channel has the same frame count.
    pub fn new(mut channels: Vec<Vec<f32>>, sample_rate: u32) -> DecodedAudio {
        let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
        for channel in channels.iter_mut() {
            channel.truncate(frames);
        }
        DecodedAudio {
            channels,
            sample_rate,
        }
    }

    /// Creates decoded audio from interleaved samples.
    pub fn from_interleaved(samples: &[f32], channel_count: u16, sample_rate: u32) -> DecodedAudio {
        let num_channels = channel_count as usize;
        if num_channels == 0 {
            return DecodedAudio::new(Vec::new(), sample_rate);
        }
        let frames = samples.len() / num_channels;
        let mut channels = vec![Vec::with_capacity(frames); num_channels];
        for frame in samples.chunks_exact(num_channels) {
            for (channel, sample) in channels.iter_mut().zip(frame) {
                channel.push(*sample);
            }
        }
        DecodedAudio::new(channels, sample_rate)
    }

    /// Returns the number of channels.
    pub fn channel_count(&self) -> u16 {
        self.channels.len() as u16
    }

    /// Returns the sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    /// Returns the samples of a single channel.
    pub fn channel(&self, channel: usize) -> &[f32] {
        self.channels.get(channel).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns all channels.
    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Returns the duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Converts a time offset into a frame index, clamped to the buffer.
    pub fn frame_at(&self, seconds: f64) -> usize {
        if !seconds.is_finite() || seconds <= 0.0 {
            return 0;
        }
        ((seconds * self.sample_rate as f64).round() as usize).min(self.frames())
    }

    /// Returns the memory size of the sample data in bytes.
    pub fn memory_size(&self) -> usize {
        self.channels.iter().map(Vec::len).sum::<usize>() * std::mem::size_of::<f32>()
    }
}

/// Clamps a value into [lo, hi], mapping NaN to lo.
pub(crate) fn clamp_finite(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_nan() {
        return lo;
    }
    value.clamp(lo, hi)
}

/// Converts a canvas pixel into seconds.
pub fn pixel_to_seconds(pixel: f64, width: f64, duration: f64) -> f64 {
    if width <= 0.0 || duration <= 0.0 {
        return 0.0;
    }
    clamp_finite(pixel, 0.0, width) / width * duration
}

/// Converts seconds into a canvas pixel.
pub fn seconds_to_pixel(seconds: f64, width: f64, duration: f64) -> f64 {
    if width <= 0.0 {
        return 0.0;
    }
    if duration <= 0.0 {
        return 0.0;
    }
    clamp_finite(seconds, 0.0, duration) / duration * width
}

/// The part of a sample that plays when its pad is triggered, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimRegion {
    start: f64,
    end: f64,
}

impl TrimRegion {
    /// A region covering the whole clip.
    pub fn full(duration: f64) -> TrimRegion {
        TrimRegion {
            start: 0.0,
            end: duration.max(0.0),
        }
    }

    /// Creates a region, clamping it so 0 <= start <= end <= duration.
    pub fn new(start: f64, end: f64, duration: f64) -> TrimRegion {
        let duration = duration.max(0.0);
        let start = clamp_finite(start, 0.0, duration);
        let end = clamp_finite(end, start, duration);
        TrimRegion { start, end }
    }

    /// Creates a region from a pair of canvas pixels. The right edge is never allowed to
    /// sit left of the left edge.
    pub fn from_pixels(left: f64, right: f64, width: f64, duration: f64) -> TrimRegion {
        if width <= 0.0 {
            return TrimRegion::full(duration);
        }
        let left = clamp_finite(left, 0.0, width);
        let right = clamp_finite(right, left, width);
        TrimRegion::new(
            pixel_to_seconds(left, width, duration),
            pixel_to_seconds(right, width, duration),
            duration,
        )
    }

    /// Projects the region onto a canvas of the given width. A clip with no duration
    /// projects onto the whole canvas.
    pub fn to_pixels(&self, width: f64, duration: f64) -> (f64, f64) {
        if duration <= 0.0 {
            return (0.0, width.max(0.0));
        }
        (
            seconds_to_pixel(self.start, width, duration),
            seconds_to_pixel(self.end, width, duration),
        )
    }

    /// Start of the region in seconds.
    pub fn start(&self) -> f64 {
        self.start
    }

    /// End of the region in seconds.
    pub fn end(&self) -> f64 {
        self.end
    }

    /// Length of the region in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

impl fmt::Display for TrimRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s..{:.3}s", self.start, self.end)
    }
}

/// One clip assigned to a pad.
#[derive(Debug, Clone)]
pub struct Sample {
    /// The pad slot, 0..NUM_PADS.
    index: usize,
    /// Where the audio was loaded from.
    source_locator: String,
    /// The name shown on the pad.
    display_name: String,
    /// The decoded audio, present once loading succeeded.
    audio: Option<Arc<DecodedAudio>>,
    /// The current trim region.
    region: TrimRegion,
}

impl Sample {
    /// Creates an unloaded sample.
    pub fn new(index: usize, source_locator: &str, display_name: &str) -> Sample {
        Sample {
            index,
            source_locator: source_locator.to_string(),
            display_name: display_name.to_string(),
            audio: None,
            region: TrimRegion::full(0.0),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn source_locator(&self) -> &str {
        &self.source_locator
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns true once the sample has been decoded.
    pub fn is_loaded(&self) -> bool {
        self.audio.is_some()
    }

    /// Returns the decoded audio, if loaded.
    pub fn audio(&self) -> Option<&Arc<DecodedAudio>> {
        self.audio.as_ref()
    }

    pub fn channel_count(&self) -> u16 {
        self.audio.as_ref().map(|a| a.channel_count()).unwrap_or(0)
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.audio.as_ref().map(|a| a.sample_rate()).unwrap_or(0)
    }

    pub fn duration_seconds(&self) -> f64 {
        self.audio
            .as_ref()
            .map(|a| a.duration_seconds())
            .unwrap_or(0.0)
    }

    /// Attaches decoded audio. A sample only ever loads once.
    pub fn mark_loaded(&mut self, audio: DecodedAudio) -> Result<(), LoadError> {
        if self.audio.is_some() {
            return Err(LoadError::AlreadyLoaded(self.index));
        }
        self.region = TrimRegion::full(audio.duration_seconds());
        self.audio = Some(Arc::new(audio));
        Ok(())
    }

    pub fn region(&self) -> TrimRegion {
        self.region
    }

    pub fn start_seconds(&self) -> f64 {
        self.region.start()
    }

    pub fn end_seconds(&self) -> f64 {
        self.region.end()
    }

    /// Length of the trim region in seconds.
    pub fn selection_duration(&self) -> f64 {
        self.region.duration()
    }

    /// Left marker position on a canvas of the given width.
    pub fn left_pixel(&self, width: f64) -> f64 {
        self.region.to_pixels(width, self.duration_seconds()).0
    }

    /// Right marker position on a canvas of the given width.
    pub fn right_pixel(&self, width: f64) -> f64 {
        self.region.to_pixels(width, self.duration_seconds()).1
    }

    /// Sets the region from marker pixels and returns the new region.
    pub fn set_region_pixels(&mut self, left: f64, right: f64, width: f64) -> TrimRegion {
        self.region = TrimRegion::from_pixels(left, right, width, self.duration_seconds());
        self.region
    }

    /// Sets the region in seconds and returns the (clamped) region.
    pub fn set_region(&mut self, start: f64, end: f64) -> TrimRegion {
        self.region = TrimRegion::new(start, end, self.duration_seconds());
        self.region
    }

    /// Resets the region to the full clip.
    pub fn reset_region(&mut self) -> TrimRegion {
        self.region = TrimRegion::full(self.duration_seconds());
        self.region
    }
}

/// The loaded/total tally of a bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankSummary {
    pub loaded: usize,
    pub total: usize,
}

impl fmt::Display for BankSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loaded {} of {}", self.loaded, self.total)
    }
}

/// A full set of pads.
#[derive(Debug)]
pub struct Bank {
    name: String,
    pads: [Option<Sample>; NUM_PADS],
}

impl Bank {
    /// Creates an empty bank.
    pub fn new(name: &str) -> Bank {
        Bank {
            name: name.to_string(),
            pads: std::array::from_fn(|_| None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Puts a sample into its pad slot, replacing any previous occupant. Returns false
    /// if the sample's index is not a valid pad.
    pub fn insert(&mut self, sample: Sample) -> bool {
        match self.pads.get_mut(sample.index()) {
            Some(slot) => {
                *slot = Some(sample);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, index: usize) -> Option<&Sample> {
        self.pads.get(index).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Sample> {
        self.pads.get_mut(index).and_then(Option::as_mut)
    }

    /// Iterates over the occupied pads in index order.
    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.pads.iter().flatten()
    }

    pub fn loaded_count(&self) -> usize {
        self.samples().filter(|s| s.is_loaded()).count()
    }

    pub fn total(&self) -> usize {
        self.samples().count()
    }

    pub fn summary(&self) -> BankSummary {
        BankSummary {
            loaded: self.loaded_count(),
            total: self.total(),
        }
    }
}

impl Default for Bank {
    fn default() -> Self {
        Bank::new("")
    }
}
