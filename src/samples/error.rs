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
use std::path::PathBuf;

/// Why a sample could not be loaded. A failed sample stays unloaded for the session.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("unsupported source locator {0}")]
    UnsupportedLocator(String),

    #[error("unable to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: symphonia::core::errors::Error,
    },

    #[error("{0} has no audio track")]
    NoAudioTrack(PathBuf),

    #[error("{0} does not specify a sample rate")]
    MissingSampleRate(PathBuf),

    #[error("{0} contains no audio")]
    Empty(PathBuf),

    #[error("decoding {0} panicked")]
    Panicked(String),

    #[error("pad {0} is already loaded")]
    AlreadyLoaded(usize),
}
