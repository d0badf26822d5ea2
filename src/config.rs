// Copyright (C) 2024 Michael Wilson <mike@mdwn.dev>
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
mod audio;
mod bank;
mod error;
mod sampler;
mod visualizer;

pub use self::audio::{Audio, DEFAULT_SAMPLE_RATE};
pub use self::bank::{Bank, Pad};
pub use self::error::ConfigError;
pub use self::sampler::Sampler;
pub use self::visualizer::Visualizer;
