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

//! Pad sample loading and playback.
//!
//! This module provides:
//! - Bank loading with per-pad progress and failure isolation
//! - Voice management with one voice per pad

mod error;
mod loader;
mod voice;

pub use error::LoadError;
pub use loader::{
    decode_file, new_bank, settle, transcode_samples, BankEntry, DecodeEvent, LoadEvent,
    SampleLoader,
};
pub use voice::{Voice, VoiceManager};
