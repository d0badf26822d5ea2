// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
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
// Core voice mixing logic shared by the cpal and mock devices.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use atomic_float::AtomicF32;
use parking_lot::Mutex;

use crate::playsync::CancelHandle;
use crate::sample::DecodedAudio;

/// A voice handed to the mixer: a window of decoded audio to play once.
pub struct ActiveVoice {
    /// Unique ID for this voice.
    pub id: u64,
    /// The pad that triggered the voice.
    pub pad: usize,
    /// The audio being played. Shared with the sample it came from.
    pub audio: Arc<DecodedAudio>,
    /// The next frame to play.
    pub position: usize,
    /// One past the last frame to play.
    pub end: usize,
    /// Set by the owner to stop the voice early.
    pub cancel_handle: CancelHandle,
    /// Set by the mixer when the voice plays through to its end.
    pub is_finished: Arc<AtomicBool>,
}

impl ActiveVoice {
    /// Frames left to play.
    pub fn remaining(&self) -> usize {
        self.end.saturating_sub(self.position)
    }

    /// Marks the voice as done so its owner releases it.
    pub fn finish(&self) {
        self.is_finished.store(true, Ordering::Release);
    }
}

/// Core audio mixing logic that's independent of any audio backend
#[derive(Clone)]
pub struct AudioMixer {
    /// Voices currently playing.
    active_voices: Arc<Mutex<Vec<ActiveVoice>>>,
    /// Number of output channels.
    num_channels: u16,
    /// Sample rate.
    sample_rate: u32,
    /// Gain applied to the mixed output, 0.0 to 1.0.
    master_gain: Arc<AtomicF32>,
}

impl AudioMixer {
    /// Creates a new audio mixer
    pub fn new(num_channels: u16, sample_rate: u32) -> Self {
        Self {
            active_voices: Arc::new(Mutex::new(Vec::new())),
            num_channels,
            sample_rate,
            master_gain: Arc::new(AtomicF32::new(1.0)),
        }
    }

    /// Adds a voice to the mixer.
    pub fn add_voice(&self, voice: ActiveVoice) {
        self.active_voices.lock().push(voice);
    }

    /// Returns the number of voices still held by the mixer.
    pub fn active_count(&self) -> usize {
        self.active_voices.lock().len()
    }

    /// Drops every voice, marking each one finished.
    pub fn clear(&self) {
        for voice in self.active_voices.lock().drain(..) {
            voice.finish();
        }
    }

    pub fn set_master_gain(&self, gain: f32) {
        self.master_gain.store(gain, Ordering::Relaxed);
    }

    pub fn master_gain(&self) -> f32 {
        self.master_gain.load(Ordering::Relaxed)
    }

    /// Mixes `num_frames` interleaved frames into the output buffer, which is cleared
    /// first. Cancelled voices are dropped without being marked finished. Voices that
    /// reach their end are marked finished and dropped.
    pub fn process_into_output(&self, output: &mut [f32], num_frames: usize) {
        let num_channels = self.num_channels as usize;
        let num_frames = num_frames.min(output.len() / num_channels.max(1));
        output.fill(0.0);
        if num_channels == 0 {
            return;
        }

        let gain = self.master_gain();
        let mut voices = self.active_voices.lock();
        voices.retain_mut(|voice| {
            if voice.cancel_handle.is_cancelled() {
                return false;
            }

            let frames = voice.remaining().min(num_frames);
            let source_channels = voice.audio.channel_count() as usize;
            for output_channel in 0..num_channels {
                // Mono is sent to every output, otherwise channels map one to one.
                let source_channel = if source_channels == 1 {
                    0
                } else if output_channel < source_channels {
                    output_channel
                } else {
                    continue;
                };
                let source = voice.audio.channel(source_channel);
                let source = &source[voice.position.min(source.len())..];
                for (frame, sample) in source.iter().take(frames).enumerate() {
                    output[frame * num_channels + output_channel] += sample * gain;
                }
            }
            voice.position += frames;

            if voice.position >= voice.end {
                voice.finish();
                return false;
            }
            true
        });
    }

    /// Processes multiple frames of audio mixing
    pub fn process_frames(&self, num_frames: usize) -> Vec<f32> {
        let mut frames = vec![0.0; num_frames * self.num_channels as usize];
        self.process_into_output(&mut frames, num_frames);
        frames
    }

    /// Gets the number of output channels
    pub fn num_channels(&self) -> u16 {
        self.num_channels
    }

    /// Gets the sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(audio: DecodedAudio, position: usize, end: usize) -> ActiveVoice {
        ActiveVoice {
            id: 1,
            pad: 0,
            audio: Arc::new(audio),
            position,
            end,
            cancel_handle: CancelHandle::new(),
            is_finished: Arc::new(AtomicBool::new(false)),
        }
    }

    #[test]
    fn test_mono_goes_to_every_output() {
        let mixer = AudioMixer::new(2, 44100);
        mixer.add_voice(voice(DecodedAudio::new(vec![vec![0.5, 0.25]], 44100), 0, 2));

        let frames = mixer.process_frames(2);
        assert_eq!(frames, vec![0.5, 0.5, 0.25, 0.25]);
    }

    #[test]
    fn test_multiple_voice_mixing() {
        let mixer = AudioMixer::new(2, 44100);
        mixer.add_voice(voice(
            DecodedAudio::new(vec![vec![0.5], vec![0.25]], 44100),
            0,
            1,
        ));
        mixer.add_voice(voice(
            DecodedAudio::new(vec![vec![0.125], vec![0.0625]], 44100),
            0,
            1,
        ));

        let frames = mixer.process_frames(1);
        assert_eq!(frames, vec![0.625, 0.3125]);
    }

    #[test]
    fn test_window_and_completion() {
        let mixer = AudioMixer::new(1, 10);
        let active = voice(
            DecodedAudio::new(vec![vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5]], 10),
            2,
            5,
        );
        let finished = active.is_finished.clone();
        mixer.add_voice(active);

        assert_eq!(mixer.process_frames(2), vec![0.2, 0.3]);
        assert!(!finished.load(Ordering::Acquire));
        assert_eq!(mixer.active_count(), 1);

        assert_eq!(mixer.process_frames(2), vec![0.4, 0.0]);
        assert!(finished.load(Ordering::Acquire));
        assert_eq!(mixer.active_count(), 0);
    }

    #[test]
    fn test_cancelled_voice_is_not_finished() {
        let mixer = AudioMixer::new(1, 10);
        let active = voice(DecodedAudio::new(vec![vec![1.0; 10]], 10), 0, 10);
        let cancel_handle = active.cancel_handle.clone();
        let finished = active.is_finished.clone();
        mixer.add_voice(active);

        cancel_handle.cancel();
        assert_eq!(mixer.process_frames(4), vec![0.0; 4]);
        assert!(!finished.load(Ordering::Acquire));
        assert_eq!(mixer.active_count(), 0);
    }

    #[test]
    fn test_clear_finishes_voices() {
        let mixer = AudioMixer::new(1, 10);
        let active = voice(DecodedAudio::new(vec![vec![1.0; 10]], 10), 0, 10);
        let finished = active.is_finished.clone();
        mixer.add_voice(active);

        mixer.clear();
        assert!(finished.load(Ordering::Acquire));
        assert_eq!(mixer.active_count(), 0);
        assert_eq!(mixer.process_frames(2), vec![0.0, 0.0]);
    }

    #[test]
    fn test_master_gain() {
        let mixer = AudioMixer::new(1, 10);
        mixer.set_master_gain(0.5);
        mixer.add_voice(voice(DecodedAudio::new(vec![vec![0.5; 4]], 10), 0, 4));

        assert_eq!(mixer.process_frames(2), vec![0.25, 0.25]);
        mixer.set_master_gain(0.0);
        assert_eq!(mixer.process_frames(2), vec![0.0, 0.0]);
    }

    #[test]
    fn test_extra_source_channels_are_dropped() {
        let mixer = AudioMixer::new(1, 10);
        mixer.add_voice(voice(
            DecodedAudio::new(vec![vec![0.5], vec![0.25]], 10),
            0,
            1,
        ));
        assert_eq!(mixer.process_frames(1), vec![0.5]);
    }
}
