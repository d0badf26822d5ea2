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
use std::fmt;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, info, span, warn, Instrument, Level};

use crate::audio::Device;
use crate::region::PointerEvent;
use crate::sample::{Bank, BankSummary, DecodedAudio, TrimRegion};
use crate::samples::{
    self, BankEntry, DecodeEvent, LoadError, LoadEvent, SampleLoader, VoiceManager,
};
use crate::visualizer::Visualizer;

/// Signals sent to everyone subscribed to the sampler.
#[derive(Debug, Clone, PartialEq)]
pub enum SamplerEvent {
    /// A new bank replaced the previous one.
    BankInstalled { name: String, summary: BankSummary },
    TrimRegionChanged { index: usize, region: TrimRegion },
    LoadProgress { index: usize, percent: u8 },
    LoadSettled {
        index: usize,
        loaded: bool,
        error: Option<String>,
    },
    VoiceStarted(usize),
    /// The pad was stopped before it played through.
    VoiceStopped(usize),
    /// The pad played to the end of its trim region.
    VoiceEnded(usize),
}

impl From<LoadEvent<'_>> for SamplerEvent {
    fn from(event: LoadEvent<'_>) -> Self {
        match event {
            LoadEvent::Progress { index, percent } => SamplerEvent::LoadProgress { index, percent },
            LoadEvent::Settled { sample, error } => SamplerEvent::LoadSettled {
                index: sample.index(),
                loaded: sample.is_loaded(),
                error: error.map(ToString::to_string),
            },
        }
    }
}

/// Fans events out to subscribers. Subscribers that have gone away are dropped on the
/// next publish.
#[derive(Clone, Default)]
pub struct EventPublisher {
    subscribers: Arc<Mutex<Vec<Sender<SamplerEvent>>>>,
}

impl EventPublisher {
    pub fn subscribe(&self) -> Receiver<SamplerEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn publish(&self, event: SamplerEvent) {
        self.subscribers
            .lock()
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}

/// A one line description of a pad.
#[derive(Debug, Clone, PartialEq)]
pub struct PadStatus {
    pub index: usize,
    pub name: String,
    pub loaded: bool,
    pub playing: bool,
    pub region: TrimRegion,
}

impl fmt::Display for PadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>2} {:<20} ", self.index, self.name)?;
        if !self.loaded {
            return write!(f, "not loaded");
        }
        write!(f, "{}", self.region)?;
        if self.playing {
            write!(f, " (playing)")?;
        }
        Ok(())
    }
}

/// The pad sampler. Owns the bank, the voices and the waveform editor.
pub struct Sampler {
    bank: Bank,
    voices: VoiceManager,
    visualizer: Visualizer,
    events: EventPublisher,
    /// Bumped on every install so late decode results for an old bank are dropped.
    generation: u64,
}

impl Sampler {
    pub fn new(device: Arc<dyn Device>, mut visualizer: Visualizer) -> Sampler {
        let events = EventPublisher::default();
        let publisher = events.clone();
        visualizer.subscribe(Box::new(move |sample| {
            publisher.publish(SamplerEvent::TrimRegionChanged {
                index: sample.index(),
                region: sample.region(),
            })
        }));

        Sampler {
            bank: Bank::default(),
            voices: VoiceManager::new(device),
            visualizer,
            events,
            generation: 0,
        }
    }

    /// Subscribes to sampler events.
    pub fn subscribe(&self) -> Receiver<SamplerEvent> {
        self.events.subscribe()
    }

    pub fn publisher(&self) -> EventPublisher {
        self.events.clone()
    }

    pub fn bank(&self) -> &Bank {
        &self.bank
    }

    pub fn voices(&self) -> &VoiceManager {
        &self.voices
    }

    pub fn visualizer(&self) -> &Visualizer {
        &self.visualizer
    }

    /// Replaces the bank. Everything still sounding is stopped and the editor is
    /// cleared.
    pub fn install_bank(&mut self, bank: Bank) {
        self.stop_all();
        self.visualizer.unload();
        let summary = bank.summary();
        info!(bank = bank.name(), summary = %summary, "Installing bank");
        let name = bank.name().to_string();
        self.bank = bank;
        self.generation += 1;
        self.events
            .publish(SamplerEvent::BankInstalled { name, summary });
    }

    /// Shows the pad in the waveform editor. False if the pad is empty.
    pub fn select_pad(&mut self, index: usize) -> bool {
        match self.bank.get(index) {
            Some(sample) => {
                self.visualizer.load(sample);
                true
            }
            None => {
                warn!(index, "No sample on pad");
                false
            }
        }
    }

    /// Sends a pointer event to the editor for the selected pad.
    pub fn pointer(&mut self, event: PointerEvent) -> bool {
        let Some(sample) = self
            .visualizer
            .selected()
            .and_then(|index| self.bank.get_mut(index))
        else {
            return false;
        };
        self.visualizer.handle_pointer(sample, event)
    }

    /// Resets the selected pad to its full length.
    pub fn reset_region(&mut self) -> Option<TrimRegion> {
        let sample = self
            .visualizer
            .selected()
            .and_then(|index| self.bank.get_mut(index))?;
        Some(self.visualizer.reset(sample))
    }

    pub fn trigger(&mut self, index: usize) -> bool {
        self.reap();
        let started = self.voices.trigger_index(&self.bank, index);
        if started {
            self.events.publish(SamplerEvent::VoiceStarted(index));
        }
        started
    }

    pub fn stop(&mut self, index: usize) -> bool {
        self.reap();
        let stopped = self.voices.stop(index);
        if stopped {
            self.events.publish(SamplerEvent::VoiceStopped(index));
        }
        stopped
    }

    pub fn stop_all(&mut self) -> Vec<usize> {
        self.reap();
        let stopped = self.voices.stop_all();
        for index in stopped.iter() {
            self.events.publish(SamplerEvent::VoiceStopped(*index));
        }
        stopped
    }

    pub fn set_master_volume(&mut self, volume: f64) {
        self.voices.set_master_volume(volume);
        info!(volume = self.voices.master_volume(), "Master volume set");
    }

    pub fn master_volume(&self) -> f64 {
        self.voices.master_volume()
    }

    pub fn is_playing(&self, index: usize) -> bool {
        self.voices.is_playing(index)
    }

    /// Reports voices that played through and redraws the editor markers.
    pub fn tick(&mut self) {
        self.reap();
        if let Some(sample) = self
            .visualizer
            .selected()
            .and_then(|index| self.bank.get(index))
        {
            self.visualizer.refresh(sample);
        }
    }

    fn reap(&mut self) {
        for index in self.voices.reap_finished() {
            self.events.publish(SamplerEvent::VoiceEnded(index));
        }
    }

    /// Stores a decode result on a pad of the bank installed as `generation`. Returns
    /// true if the pad is now loaded.
    fn settle(
        &mut self,
        generation: u64,
        index: usize,
        result: Result<DecodedAudio, LoadError>,
    ) -> bool {
        if generation != self.generation {
            debug!(index, "Bank replaced while loading, dropping result");
            return false;
        }
        let error = samples::settle(&mut self.bank, index, result);
        let Some(sample) = self.bank.get(index) else {
            return false;
        };
        self.events.publish(
            LoadEvent::Settled {
                sample,
                error: error.as_ref(),
            }
            .into(),
        );
        if self.visualizer.selected() == Some(index) {
            self.visualizer.load(sample);
        }
        sample.is_loaded()
    }

    /// The state of every occupied pad.
    pub fn status(&self) -> Vec<PadStatus> {
        self.bank
            .samples()
            .map(|sample| PadStatus {
                index: sample.index(),
                name: sample.display_name().to_string(),
                loaded: sample.is_loaded(),
                playing: self.voices.is_playing(sample.index()),
                region: sample.region(),
            })
            .collect()
    }
}

impl fmt::Debug for Sampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sampler")
            .field("bank", &self.bank.name())
            .field("voices", &self.voices)
            .field("selected", &self.visualizer.selected())
            .finish()
    }
}

/// Installs a bank of unloaded pads and decodes them concurrently. Each pad becomes
/// playable as soon as its own sample settles.
pub async fn load_bank(
    sampler: &Arc<Mutex<Sampler>>,
    loader: &SampleLoader,
    name: &str,
    entries: Vec<BankEntry>,
) -> BankSummary {
    let (bank, entries) = samples::new_bank(name, entries);
    let mut summary = bank.summary();
    let (generation, publisher) = {
        let mut sampler = sampler.lock();
        sampler.install_bank(bank);
        (sampler.generation, sampler.publisher())
    };

    loader
        .decode_entries(entries, |event| match event {
            DecodeEvent::Progress { index, percent } => {
                publisher.publish(SamplerEvent::LoadProgress { index, percent })
            }
            DecodeEvent::Decoded { index, result } => {
                if sampler.lock().settle(generation, index, result) {
                    summary.loaded += 1;
                }
            }
        })
        .instrument(span!(Level::INFO, "load bank", bank = name))
        .await;

    info!(bank = name, summary = %summary, "Bank loaded");
    summary
}
