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
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

use tracing::{debug, info};

use crate::audio::{ActiveVoice, AudioError, AudioMixer, Device as _};

/// A mock device. Voices are mixed only when [Device::render] is called.
#[derive(Clone)]
pub struct Device {
    name: String,
    mixer: AudioMixer,
    suspended: Arc<AtomicBool>,
    fail_resume: Arc<AtomicBool>,
    fail_play: Arc<AtomicBool>,
    plays: Arc<AtomicUsize>,
}

impl Device {
    /// Gets the given mock device. It starts suspended.
    pub fn get(name: &str, sample_rate: u32, channels: u16) -> Device {
        Device {
            name: name.to_string(),
            mixer: AudioMixer::new(channels.max(1), sample_rate),
            suspended: Arc::new(AtomicBool::new(true)),
            fail_resume: Arc::new(AtomicBool::new(false)),
            fail_play: Arc::new(AtomicBool::new(false)),
            plays: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Mixes the given number of frames, advancing every voice.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        self.mixer.process_frames(frames)
    }

    /// Returns the number of voices the mixer still holds.
    pub fn active_voices(&self) -> usize {
        self.mixer.active_count()
    }

    /// Returns the number of voices handed to the device.
    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::Relaxed)
    }

    /// Makes resume fail until cleared.
    pub fn set_fail_resume(&self, fail: bool) {
        self.fail_resume.store(fail, Ordering::Relaxed);
    }

    /// Makes play fail until cleared.
    pub fn set_fail_play(&self, fail: bool) {
        self.fail_play.store(fail, Ordering::Relaxed);
    }
}

impl crate::audio::Device for Device {
    fn sample_rate(&self) -> u32 {
        self.mixer.sample_rate()
    }

    fn channel_count(&self) -> u16 {
        self.mixer.num_channels()
    }

    fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::Relaxed)
    }

    fn resume(&self) -> Result<(), AudioError> {
        if self.fail_resume.load(Ordering::Relaxed) {
            return Err(AudioError::Mock("resume refused".to_string()));
        }
        if self.suspended.swap(false, Ordering::Relaxed) {
            info!(device = self.name, "Mock device resumed");
        }
        Ok(())
    }

    fn set_master_gain(&self, gain: f32) {
        self.mixer.set_master_gain(gain);
    }

    fn master_gain(&self) -> f32 {
        self.mixer.master_gain()
    }

    fn play(&self, voice: ActiveVoice) -> Result<(), AudioError> {
        if self.is_suspended() {
            return Err(AudioError::Suspended);
        }
        if self.fail_play.load(Ordering::Relaxed) {
            return Err(AudioError::Mock("play refused".to_string()));
        }
        debug!(
            device = self.name,
            pad = voice.pad,
            frames = voice.remaining(),
            "Playing voice."
        );
        self.plays.fetch_add(1, Ordering::Relaxed);
        self.mixer.add_voice(voice);
        Ok(())
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name,)
    }
}
