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

//! Waveform display: peak reduction and the two drawing layers.

pub mod peaks;
pub mod render;
pub mod surface;

pub use peaks::PeakReducer;
pub use render::{RegionRenderer, Theme};
pub use surface::{to_svg, Color, DisplayList, DrawOp, Point, Surface};
