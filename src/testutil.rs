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
    f32::consts::PI,
    path::{Path, PathBuf},
};

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::sample::{DecodedAudio, Sample};

/// Creates a loaded sample of silence with the given duration, sampled at 1kHz.
pub fn loaded_sample(index: usize, duration_seconds: f64) -> Sample {
    let sample_rate = 1000;
    let frames = (duration_seconds * sample_rate as f64).round() as usize;
    let mut sample = Sample::new(index, "memory.wav", &format!("Pad {index}"));
    sample
        .mark_loaded(DecodedAudio::new(vec![vec![0.0; frames]], sample_rate))
        .expect("first load should succeed");
    sample
}

/// Writes a 16 bit WAV file containing a 440Hz tone to the given directory.
pub fn write_wav(dir: &Path, name: &str, channels: u16, sample_rate: u32, frames: usize) -> PathBuf {
    let path = dir.join(name);
    let mut writer = WavWriter::create(
        &path,
        WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        },
    )
    .expect("unable to create wav");

    for frame in 0..frames {
        let value = (2.0 * PI * 440.0 * frame as f32 / sample_rate as f32).sin() * 0.5;
        for _ in 0..channels {
            writer
                .write_sample((value * i16::MAX as f32) as i16)
                .expect("unable to write sample");
        }
    }
    writer.finalize().expect("unable to finalize wav");
    path
}
