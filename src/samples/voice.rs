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

//! Voice management for pad playback.
//!
//! Each pad owns at most one voice. Triggering a pad that is already sounding cuts
//! the old voice before the new one starts.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::audio::{ActiveVoice, Device};
use crate::playsync::CancelHandle;
use crate::sample::{clamp_finite, Bank, Sample, TrimRegion, NUM_PADS};

/// Global voice ID counter.
static NEXT_VOICE_ID: AtomicU64 = AtomicU64::new(1);

/// Represents an active voice playing a sample.
#[derive(Debug)]
pub struct Voice {
    /// Unique ID for this voice.
    id: u64,
    /// The pad that owns this voice.
    pad: usize,
    /// The window of the sample being played.
    region: TrimRegion,
    /// When this voice started playing.
    start_time: Instant,
    /// Cancel handle for stopping this voice without lock contention.
    cancel_handle: CancelHandle,
    /// Set by the mixer once the voice reaches the end of its window.
    is_finished: Arc<AtomicBool>,
}

impl Voice {
    fn new(pad: usize, region: TrimRegion) -> Voice {
        Voice {
            id: NEXT_VOICE_ID.fetch_add(1, Ordering::SeqCst),
            pad,
            region,
            start_time: Instant::now(),
            cancel_handle: CancelHandle::new(),
            is_finished: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn pad(&self) -> usize {
        self.pad
    }

    pub fn region(&self) -> TrimRegion {
        self.region
    }

    /// How long ago the voice was started.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Returns true once the voice has played through.
    pub fn is_finished(&self) -> bool {
        self.is_finished.load(Ordering::Acquire)
    }

    /// Returns true if the voice was cut before finishing.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_handle.is_cancelled()
    }

    fn cancel(&self) {
        self.cancel_handle.cancel();
    }
}

/// Manages the active voice of every pad.
pub struct VoiceManager {
    /// The device voices are played through. It also holds the master gain.
    device: Arc<dyn Device>,
    /// Active voices, indexed by pad.
    voices: [Option<Voice>; NUM_PADS],
}

impl VoiceManager {
    /// Creates a new voice manager.
    pub fn new(device: Arc<dyn Device>) -> Self {
        Self {
            device,
            voices: std::array::from_fn(|_| None),
        }
    }

    pub fn device(&self) -> &Arc<dyn Device> {
        &self.device
    }

    /// Starts the sample's trim region on its pad, cutting any voice already playing
    /// there. Returns false if the sample isn't loaded or the device can't take the
    /// voice. A refused trigger leaves the pad's current voice alone.
    pub fn trigger(&mut self, sample: &Sample) -> bool {
        let pad = sample.index();
        let Some(audio) = sample.audio() else {
            debug!(pad, "Ignoring trigger for unloaded pad");
            return false;
        };
        if pad >= NUM_PADS {
            return false;
        }

        if self.device.is_suspended() {
            if let Err(e) = self.device.resume() {
                warn!(pad, err = %e, "Unable to resume output device");
                return false;
            }
        }

        if let Some(previous) = self.voices[pad].take() {
            previous.cancel();
            debug!(pad, voice = previous.id, "Cut previous voice");
        }

        let region = sample.region();
        let voice = Voice::new(pad, region);
        let active = ActiveVoice {
            id: voice.id,
            pad,
            audio: audio.clone(),
            position: audio.frame_at(region.start()),
            end: audio.frame_at(region.end()),
            cancel_handle: voice.cancel_handle.clone(),
            is_finished: voice.is_finished.clone(),
        };

        match self.device.play(active) {
            Ok(()) => {
                info!(pad, voice = voice.id, region = %region, "Triggered pad");
                self.voices[pad] = Some(voice);
                true
            }
            Err(e) => {
                error!(pad, err = %e, "Unable to start voice");
                false
            }
        }
    }

    /// Triggers a pad of the bank. False if the pad is empty or unloaded.
    pub fn trigger_index(&mut self, bank: &Bank, index: usize) -> bool {
        match bank.get(index) {
            Some(sample) => self.trigger(sample),
            None => false,
        }
    }

    /// Stops the pad's voice immediately. Returns true if a voice was still sounding.
    /// Stopping an idle or unknown pad does nothing.
    pub fn stop(&mut self, index: usize) -> bool {
        let Some(voice) = self.voices.get_mut(index).and_then(Option::take) else {
            return false;
        };
        let was_playing = !voice.is_finished();
        voice.cancel();
        debug!(pad = index, voice = voice.id, "Stopped voice");
        was_playing
    }

    /// Stops every voice. Returns the pads that were still sounding.
    pub fn stop_all(&mut self) -> Vec<usize> {
        (0..NUM_PADS).filter(|pad| self.stop(*pad)).collect()
    }

    /// Sets the master volume, clamped to 0.0..=1.0. NaN is treated as silence.
    pub fn set_master_volume(&mut self, volume: f64) {
        let volume = clamp_finite(volume, 0.0, 1.0);
        self.device.set_master_gain(volume as f32);
    }

    pub fn master_volume(&self) -> f64 {
        self.device.master_gain() as f64
    }

    /// Returns true if the pad has a voice that hasn't finished.
    pub fn is_playing(&self, index: usize) -> bool {
        self.voices
            .get(index)
            .and_then(Option::as_ref)
            .is_some_and(|voice| !voice.is_finished())
    }

    /// Returns the current number of sounding voices.
    pub fn active_count(&self) -> usize {
        (0..NUM_PADS).filter(|pad| self.is_playing(*pad)).count()
    }

    /// Releases voices that played to the end of their region and returns their pads.
    pub fn reap_finished(&mut self) -> Vec<usize> {
        let mut finished = Vec::new();
        for (pad, slot) in self.voices.iter_mut().enumerate() {
            if slot.as_ref().is_some_and(Voice::is_finished) {
                *slot = None;
                finished.push(pad);
            }
        }
        finished
    }
}

impl std::fmt::Debug for VoiceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceManager")
            .field("device", &self.device.to_string())
            .field("active_voices", &self.active_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::mock;
    use crate::audio::Device as _;
    use crate::sample::DecodedAudio;
    use crate::testutil::loaded_sample;

    fn manager() -> (mock::Device, VoiceManager) {
        let device = mock::Device::get("mock", 10, 1);
        let manager = VoiceManager::new(Arc::new(device.clone()));
        (device, manager)
    }

    fn ramp_sample(index: usize) -> Sample {
        let mut sample = Sample::new(index, "ramp.wav", "Ramp");
        let ramp = (0..10).map(|i| i as f32 / 10.0).collect();
        sample
            .mark_loaded(DecodedAudio::new(vec![ramp], 10))
            .expect("first load");
        sample
    }

    #[test]
    fn test_trigger_unloaded_sample() {
        let (device, mut manager) = manager();
        let sample = Sample::new(0, "missing.wav", "Missing");

        assert!(!manager.trigger(&sample));
        assert_eq!(device.plays(), 0);
        assert!(device.is_suspended());
        assert!(!manager.is_playing(0));
    }

    #[test]
    fn test_trigger_resumes_device() {
        let (device, mut manager) = manager();
        assert!(device.is_suspended());

        assert!(manager.trigger(&loaded_sample(0, 1.0)));
        assert!(!device.is_suspended());
        assert!(manager.is_playing(0));
    }

    #[test]
    fn test_resume_failure_rejects_trigger() {
        let (device, mut manager) = manager();
        let sample = loaded_sample(0, 1.0);
        device.set_fail_resume(true);

        assert!(!manager.trigger(&sample));
        assert!(device.is_suspended());
        assert_eq!(device.plays(), 0);
        assert!(!manager.is_playing(0));
        assert!(manager.reap_finished().is_empty());

        // The next trigger tries again.
        device.set_fail_resume(false);
        assert!(manager.trigger(&sample));
        assert!(!device.is_suspended());
        assert!(manager.is_playing(0));
    }

    #[test]
    fn test_suspended_device_refuses_voices() {
        let (device, _) = manager();
        let sample = loaded_sample(0, 1.0);
        let Some(audio) = sample.audio() else {
            panic!("sample should be loaded");
        };
        let voice = ActiveVoice {
            id: 1,
            pad: 0,
            audio: audio.clone(),
            position: 0,
            end: audio.frames(),
            cancel_handle: CancelHandle::new(),
            is_finished: Arc::new(AtomicBool::new(false)),
        };

        assert!(device.play(voice).is_err());
        assert_eq!(device.plays(), 0);
        assert_eq!(device.active_voices(), 0);
    }

    #[test]
    fn test_trigger_plays_trim_region() {
        let (device, mut manager) = manager();
        let mut sample = ramp_sample(2);
        sample.set_region(0.2, 0.5);

        assert!(manager.trigger(&sample));
        let rendered = device.render(5);
        let expected = [0.2, 0.3, 0.4, 0.0, 0.0];
        for (got, want) in rendered.iter().zip(expected) {
            assert!((got - want).abs() < 1e-6, "{rendered:?}");
        }

        assert!(!manager.is_playing(2));
        assert_eq!(manager.reap_finished(), vec![2]);
        assert_eq!(manager.reap_finished(), Vec::<usize>::new());
    }

    #[test]
    fn test_retrigger_cuts_previous_voice() {
        let (device, mut manager) = manager();
        let sample = loaded_sample(5, 1.0);

        assert!(manager.trigger(&sample));
        assert!(manager.trigger(&sample));
        assert_eq!(device.plays(), 2);
        assert_eq!(manager.active_count(), 1);

        // The mixer drops the cut voice on its next pass.
        device.render(1);
        assert_eq!(device.active_voices(), 1);
        assert!(manager.is_playing(5));
    }

    #[test]
    fn test_stop() {
        let (device, mut manager) = manager();
        assert!(manager.trigger(&loaded_sample(1, 1.0)));

        assert!(manager.stop(1));
        assert!(!manager.is_playing(1));
        device.render(1);
        assert_eq!(device.active_voices(), 0);

        // Stopping again, an idle pad or a nonexistent pad does nothing.
        assert!(!manager.stop(1));
        assert!(!manager.stop(7));
        assert!(!manager.stop(NUM_PADS + 3));
        assert!(manager.reap_finished().is_empty());
    }

    #[test]
    fn test_stop_idle_pad_leaves_others_playing() {
        let (device, mut manager) = manager();
        assert!(manager.trigger(&loaded_sample(2, 1.0)));
        assert_eq!(manager.active_count(), 1);

        assert!(!manager.stop(9));
        assert!(!manager.stop(NUM_PADS));
        assert_eq!(manager.active_count(), 1);
        assert!(manager.is_playing(2));
        device.render(1);
        assert_eq!(device.active_voices(), 1);
    }

    #[test]
    fn test_stop_after_natural_completion() {
        let (device, mut manager) = manager();
        assert!(manager.trigger(&ramp_sample(0)));
        device.render(20);

        assert!(!manager.stop(0));
        assert!(manager.reap_finished().is_empty());
    }

    #[test]
    fn test_stop_all() {
        let (device, mut manager) = manager();
        for pad in [0, 3, 15] {
            assert!(manager.trigger(&loaded_sample(pad, 1.0)));
        }
        assert_eq!(manager.active_count(), 3);

        assert_eq!(manager.stop_all(), vec![0, 3, 15]);
        assert_eq!(manager.active_count(), 0);
        device.render(1);
        assert_eq!(device.active_voices(), 0);
    }

    #[test]
    fn test_trigger_index() {
        let (_, mut manager) = manager();
        let mut bank = Bank::new("test");
        bank.insert(loaded_sample(0, 1.0));
        bank.insert(Sample::new(1, "missing.wav", "Missing"));

        assert!(manager.trigger_index(&bank, 0));
        assert!(!manager.trigger_index(&bank, 1));
        assert!(!manager.trigger_index(&bank, 2));
        assert!(!manager.trigger_index(&bank, NUM_PADS));
    }

    #[test]
    fn test_device_failure() {
        let (device, mut manager) = manager();
        device.set_fail_play(true);

        assert!(!manager.trigger(&loaded_sample(4, 1.0)));
        assert!(!manager.is_playing(4));
        assert_eq!(manager.active_count(), 0);
    }

    #[test]
    fn test_master_volume_is_clamped() {
        let (device, mut manager) = manager();

        manager.set_master_volume(-5.0);
        assert_eq!(manager.master_volume(), 0.0);
        manager.set_master_volume(1.5);
        assert_eq!(manager.master_volume(), 1.0);
        manager.set_master_volume(f64::NAN);
        assert_eq!(manager.master_volume(), 0.0);
        manager.set_master_volume(0.5);
        assert_eq!(manager.master_volume(), 0.5);
        assert_eq!(device.master_gain(), 0.5);
    }
}
