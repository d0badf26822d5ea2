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
use crate::region::HoverState;

use super::surface::{Color, Point, Surface};

/// Colours and sizes used by the renderer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Theme {
    pub background: Color,
    pub waveform: Color,
    pub center_line: Color,
    /// Covers the parts of the clip outside the trim region.
    pub dim: Color,
    pub marker: Color,
    pub marker_selected: Color,
    pub marker_width: f32,
    /// Half the height of a marker handle.
    pub handle_size: f32,
    /// Distance from the top of the surface to the center of a handle.
    pub handle_y: f32,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            background: Color::rgb(24, 24, 24),
            waveform: Color::rgb(86, 182, 194),
            center_line: Color::rgba(255, 255, 255, 0.25),
            dim: Color::rgba(0, 0, 0, 0.55),
            marker: Color::rgb(200, 200, 200),
            marker_selected: Color::rgb(255, 196, 0),
            marker_width: 2.0,
            handle_size: 8.0,
            handle_y: 12.0,
        }
    }
}

/// Paints the waveform layer and the marker overlay layer.
#[derive(Clone, Debug, Default)]
pub struct RegionRenderer {
    theme: Theme,
}

impl RegionRenderer {
    pub fn new(theme: Theme) -> RegionRenderer {
        RegionRenderer { theme }
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Draws the peaks as a filled shape mirrored around the vertical center. The
    /// tallest peak reaches the top and bottom edges. Nothing but the clear happens
    /// if every peak is zero.
    pub fn draw_waveform(&self, surface: &mut dyn Surface, peaks: &[f32]) {
        surface.clear();
        let max = peaks.iter().copied().fold(0.0f32, f32::max);
        if peaks.is_empty() || max <= 0.0 {
            return;
        }

        let center = surface.height() / 2.0;
        let scale = center / max;
        // The first peak sits on the left edge and the last on the right edge. A lone
        // peak spans the whole width.
        let columns: Vec<(f32, f32)> = match peaks {
            [peak] => vec![(0.0, *peak), (surface.width(), *peak)],
            _ => {
                let step = surface.width() / (peaks.len() - 1) as f32;
                peaks
                    .iter()
                    .enumerate()
                    .map(|(i, peak)| (i as f32 * step, *peak))
                    .collect()
            }
        };

        let mut points = Vec::with_capacity(columns.len() * 2);
        points.extend(
            columns
                .iter()
                .map(|(x, peak)| Point::new(*x, center - peak * scale)),
        );
        points.extend(
            columns
                .iter()
                .rev()
                .map(|(x, peak)| Point::new(*x, center + peak * scale)),
        );
        surface.fill_polygon(&points, self.theme.waveform);
        surface.stroke_line(
            Point::new(0.0, center),
            Point::new(surface.width(), center),
            1.0,
            self.theme.center_line,
        );
    }

    /// Draws the trim region overlay: dimmed areas outside the region, plus a line and
    /// a triangular handle for each boundary.
    pub fn draw_region_markers(
        &self,
        surface: &mut dyn Surface,
        left: f64,
        right: f64,
        hover: &HoverState,
    ) {
        surface.clear();
        let width = surface.width();
        let height = surface.height();
        let left = (left as f32).clamp(0.0, width);
        let right = (right as f32).clamp(left, width);

        if left > 0.0 {
            surface.fill_rect(0.0, 0.0, left, height, self.theme.dim);
        }
        if right < width {
            surface.fill_rect(right, 0.0, width - right, height, self.theme.dim);
        }

        self.draw_marker(surface, left, 1.0, hover.left.selected);
        self.draw_marker(surface, right, -1.0, hover.right.selected);
    }

    /// `direction` is 1.0 for a handle pointing right and -1.0 for one pointing left.
    fn draw_marker(&self, surface: &mut dyn Surface, x: f32, direction: f32, selected: bool) {
        let color = if selected {
            self.theme.marker_selected
        } else {
            self.theme.marker
        };
        let height = surface.height();
        surface.stroke_line(
            Point::new(x, 0.0),
            Point::new(x, height),
            self.theme.marker_width,
            color,
        );

        let size = self.theme.handle_size;
        let y = self.theme.handle_y;
        surface.fill_polygon(
            &[
                Point::new(x, y - size),
                Point::new(x + direction * size, y),
                Point::new(x, y + size),
            ],
            color,
        );
    }
}
