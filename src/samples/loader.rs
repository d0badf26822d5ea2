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

//! Sample decoding and bank loading.
//!
//! Samples are decoded entirely into memory so that a trigger never waits on disk.
//! A bank's entries decode concurrently and settle independently: one bad file never
//! prevents the others from loading.

use std::collections::HashMap;
use std::fs::File;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Duration;

use symphonia::core::audio::{AudioBuffer, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::error::LoadError;
use crate::sample::{Bank, DecodedAudio, Sample};

const FILE_SCHEME: &str = "file://";

/// One requested pad assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankEntry {
    pub index: usize,
    pub source_locator: String,
    pub display_name: String,
}

impl BankEntry {
    pub fn new(index: usize, source_locator: &str, display_name: &str) -> BankEntry {
        BankEntry {
            index,
            source_locator: source_locator.to_string(),
            display_name: display_name.to_string(),
        }
    }
}

/// Reported while entries decode.
#[derive(Debug)]
pub enum DecodeEvent {
    /// Decoding of a pad has progressed to the given percentage.
    Progress { index: usize, percent: u8 },
    /// A pad finished decoding, successfully or not.
    Decoded {
        index: usize,
        result: Result<DecodedAudio, LoadError>,
    },
}

/// Reported while a bank loads.
#[derive(Debug)]
pub enum LoadEvent<'a> {
    /// Decoding of a pad has progressed to the given percentage.
    Progress { index: usize, percent: u8 },
    /// A pad finished loading, successfully or not.
    Settled {
        sample: &'a Sample,
        error: Option<&'a LoadError>,
    },
}

/// Decodes sample files into memory.
#[derive(Debug, Clone)]
pub struct SampleLoader {
    /// Sample rate to transcode to (matches audio output). None keeps the file's rate.
    target_sample_rate: Option<u32>,
    /// Relative paths are resolved against this directory.
    base_path: PathBuf,
}

impl SampleLoader {
    /// Creates a new sample loader.
    pub fn new(target_sample_rate: Option<u32>) -> Self {
        Self {
            target_sample_rate,
            base_path: PathBuf::from("."),
        }
    }

    /// Resolves relative locators against the given directory.
    pub fn with_base_path(mut self, base_path: &Path) -> Self {
        self.base_path = base_path.to_path_buf();
        self
    }

    /// Turns a source locator into a filesystem path. Plain paths and file:// URIs
    /// are accepted.
    pub fn resolve(&self, locator: &str) -> Result<PathBuf, LoadError> {
        let path = match locator.strip_prefix(FILE_SCHEME) {
            Some(path) => path,
            None if locator.contains("://") => {
                return Err(LoadError::UnsupportedLocator(locator.to_string()))
            }
            None => locator,
        };
        if path.is_empty() {
            return Err(LoadError::UnsupportedLocator(locator.to_string()));
        }

        let path = Path::new(path);
        Ok(if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        })
    }

    /// Loads a sample into memory. `progress` receives percentages as decoding proceeds
    /// when the length of the file is known up front.
    pub fn load<F>(&self, locator: &str, progress: F) -> Result<DecodedAudio, LoadError>
    where
        F: FnMut(u8),
    {
        let path = self.resolve(locator)?;
        info!(path = ?path, "Loading sample into memory");

        let decoded = decode_file(&path, progress)?;
        let audio = match self.target_sample_rate {
            Some(target_rate) if target_rate > 0 && decoded.sample_rate() != target_rate => {
                info!(
                    source_rate = decoded.sample_rate(),
                    target_rate, "Transcoding sample"
                );
                DecodedAudio::new(
                    transcode_samples(decoded.channels(), decoded.sample_rate(), target_rate),
                    target_rate,
                )
            }
            _ => decoded,
        };

        info!(
            path = ?path,
            channels = audio.channel_count(),
            sample_rate = audio.sample_rate(),
            duration_ms = Duration::from_secs_f64(audio.duration_seconds()).as_millis(),
            memory_kb = audio.memory_size() / 1024,
            "Sample loaded"
        );
        Ok(audio)
    }

    /// Loads every entry concurrently and returns the bank once all have settled.
    /// Entries with an index outside the pad range, or a repeated index, are skipped.
    pub async fn load_bank<F>(&self, name: &str, entries: Vec<BankEntry>, mut on_event: F) -> Bank
    where
        F: FnMut(LoadEvent<'_>),
    {
        let (mut bank, entries) = new_bank(name, entries);
        self.decode_entries(entries, |event| match event {
            DecodeEvent::Progress { index, percent } => {
                on_event(LoadEvent::Progress { index, percent })
            }
            DecodeEvent::Decoded { index, result } => {
                let error = settle(&mut bank, index, result);
                if let Some(sample) = bank.get(index) {
                    on_event(LoadEvent::Settled {
                        sample,
                        error: error.as_ref(),
                    });
                }
            }
        })
        .await;

        info!(bank = bank.name(), summary = %bank.summary(), "Bank loaded");
        bank
    }

    /// Decodes the entries concurrently. Each result is reported as soon as it is ready,
    /// so a slow entry never holds back the others.
    pub async fn decode_entries<F>(&self, entries: Vec<BankEntry>, mut on_event: F)
    where
        F: FnMut(DecodeEvent),
    {
        let mut pending = HashMap::new();
        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<(usize, u8)>();
        let mut join_set = JoinSet::new();

        for entry in entries {
            let loader = self.clone();
            let progress_tx = progress_tx.clone();
            let index = entry.index;
            let locator = entry.source_locator;
            pending.insert(index, locator.clone());
            join_set.spawn_blocking(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    loader.load(&locator, |percent| {
                        let _ = progress_tx.send((index, percent));
                    })
                }))
                .unwrap_or_else(|_| Err(LoadError::Panicked(locator.clone())));
                (index, result)
            });
        }
        drop(progress_tx);

        loop {
            tokio::select! {
                biased;
                Some((index, percent)) = progress_rx.recv() => {
                    if pending.contains_key(&index) {
                        on_event(DecodeEvent::Progress { index, percent });
                    }
                }
                joined = join_set.join_next() => match joined {
                    Some(Ok((index, result))) => {
                        pending.remove(&index);
                        on_event(DecodeEvent::Decoded { index, result });
                    }
                    Some(Err(e)) => error!(err = %e, "Sample load task failed"),
                    None => break,
                },
            }
        }

        // Tasks that never reported back (cancelled or aborted).
        let mut unsettled: Vec<(usize, String)> = pending.into_iter().collect();
        unsettled.sort_unstable();
        for (index, locator) in unsettled {
            on_event(DecodeEvent::Decoded {
                index,
                result: Err(LoadError::Panicked(locator)),
            });
        }
    }
}

/// Creates a bank of unloaded samples. Entries with an index outside the pad range, or
/// a repeated index, are skipped. Returns the bank and the entries that made it in.
pub fn new_bank(name: &str, entries: Vec<BankEntry>) -> (Bank, Vec<BankEntry>) {
    let mut bank = Bank::new(name);
    let mut accepted: Vec<BankEntry> = Vec::new();
    for entry in entries {
        if accepted.iter().any(|e| e.index == entry.index) {
            warn!(index = entry.index, "Duplicate pad in bank, skipping entry");
            continue;
        }
        let sample = Sample::new(entry.index, &entry.source_locator, &entry.display_name);
        if !bank.insert(sample) {
            warn!(index = entry.index, "Pad index out of range, skipping entry");
            continue;
        }
        accepted.push(entry);
    }
    (bank, accepted)
}

/// Stores a decode result on its pad. Returns the reason the pad failed to load, if it
/// did.
pub fn settle(
    bank: &mut Bank,
    index: usize,
    result: Result<DecodedAudio, LoadError>,
) -> Option<LoadError> {
    let Some(sample) = bank.get_mut(index) else {
        debug!(index, "Decoded sample has no pad, dropping");
        return None;
    };
    let error = match result {
        Ok(audio) => sample.mark_loaded(audio).err(),
        Err(e) => Some(e),
    };
    match &error {
        None => debug!(index, name = sample.display_name(), "Pad loaded"),
        Some(e) => warn!(index, name = sample.display_name(), err = %e, "Pad failed to load"),
    }
    error
}

/// Decodes the first audio track of a file into planar f32.
pub fn decode_file<F>(path: &Path, mut progress: F) -> Result<DecodedAudio, LoadError>
where
    F: FnMut(u8),
{
    let decode_err = |source| LoadError::Decode {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Create a hint to help the format registry guess the format
    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(decode_err)?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| LoadError::NoAudioTrack(path.to_path_buf()))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| LoadError::MissingSampleRate(path.to_path_buf()))?;
    let total_frames = track.codec_params.n_frames;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(decode_err)?;

    let mut channels: Vec<Vec<f32>> = Vec::new();
    let mut buffer: Option<AudioBuffer<f32>> = None;
    let mut last_percent = None;
    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(decode_err(e)),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // A corrupt packet is skipped rather than failing the whole sample.
            Err(SymphoniaError::DecodeError(e)) => {
                debug!(path = ?path, err = e, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(decode_err(e)),
        };

        let spec = *decoded.spec();
        let capacity = decoded.capacity() as u64;
        let reusable = matches!(
            &buffer,
            Some(buf) if buf.capacity() as u64 >= capacity && *buf.spec() == spec
        );
        if !reusable {
            buffer = Some(AudioBuffer::new(capacity, spec));
        }
        let Some(buf) = buffer.as_mut() else {
            continue;
        };
        decoded.convert(buf);

        let count = spec.channels.count();
        if channels.len() < count {
            channels.resize_with(count, Vec::new);
        }
        for (c, channel) in channels.iter_mut().enumerate().take(count) {
            channel.extend_from_slice(buf.chan(c));
        }

        if let Some(total) = total_frames.filter(|total| *total > 0) {
            let decoded_frames = channels.first().map(Vec::len).unwrap_or(0) as u64;
            let percent = (decoded_frames.saturating_mul(100) / total).min(99) as u8;
            if last_percent != Some(percent) {
                last_percent = Some(percent);
                progress(percent);
            }
        }
    }

    let audio = DecodedAudio::new(channels, sample_rate);
    if audio.frames() == 0 {
        return Err(LoadError::Empty(path.to_path_buf()));
    }
    progress(100);
    Ok(audio)
}

/// Transcodes planar samples from one sample rate to another using linear interpolation.
/// Linear interpolation is sufficient for drum hits and one-shots.
pub fn transcode_samples(channels: &[Vec<f32>], source_rate: u32, target_rate: u32) -> Vec<Vec<f32>> {
    if source_rate == 0 || source_rate == target_rate {
        return channels.to_vec();
    }
    let ratio = target_rate as f64 / source_rate as f64;

    channels
        .iter()
        .map(|samples| {
            let target_frames = (samples.len() as f64 * ratio).ceil() as usize;
            (0..target_frames)
                .map(|target_frame| {
                    let source_pos = target_frame as f64 / ratio;
                    let source_frame = source_pos.floor() as usize;
                    let frac = source_pos.fract() as f32;

                    let s0 = samples.get(source_frame).copied().unwrap_or(0.0);
                    let s1 = samples.get(source_frame + 1).copied().unwrap_or(s0);
                    s0 + (s1 - s0) * frac
                })
                .collect()
        })
        .collect()
}
