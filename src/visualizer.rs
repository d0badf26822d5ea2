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
//! The waveform editor. Both layers share one canvas, so every pixel to time
//! conversion goes through the same width.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use crate::config;
use crate::region::{Cursor, HoverState, PointerEvent, RegionController, RegionObserver};
use crate::sample::{Sample, TrimRegion};
use crate::waveform::{to_svg, DisplayList, PeakReducer, RegionRenderer, Theme};

/// The shortest period a refresh loop will run at.
const MIN_REFRESH_PERIOD: Duration = Duration::from_millis(1);

/// Owns the canvas, the peaks of the selected pad and the two drawn layers.
#[derive(Debug)]
pub struct Visualizer {
    width: u32,
    height: u32,
    reducer: PeakReducer,
    renderer: RegionRenderer,
    controller: RegionController,
    peaks: Vec<f32>,
    waveform: DisplayList,
    overlay: DisplayList,
    selected: Option<usize>,
    frames: u64,
}

impl Visualizer {
    pub fn new(width: u32, height: u32, hit_distance: f64, reducer: PeakReducer) -> Visualizer {
        Visualizer {
            width,
            height,
            reducer,
            renderer: RegionRenderer::new(Theme::default()),
            controller: RegionController::new(width as f64, hit_distance),
            peaks: vec![0.0; width as usize],
            waveform: DisplayList::new(width as f32, height as f32),
            overlay: DisplayList::new(width as f32, height as f32),
            selected: None,
            frames: 0,
        }
    }

    /// Creates a visualizer from the waveform editor settings.
    pub fn from_config(config: &config::Visualizer) -> Visualizer {
        Visualizer::new(
            config.width(),
            config.height(),
            config.hit_distance(),
            PeakReducer::with_stride_divisor(config.stride_divisor()),
        )
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn peaks(&self) -> &[f32] {
        &self.peaks
    }

    pub fn waveform(&self) -> &DisplayList {
        &self.waveform
    }

    pub fn overlay(&self) -> &DisplayList {
        &self.overlay
    }

    /// The pad currently shown, if any.
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// The number of marker frames drawn so far.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    pub fn hover(&self) -> &HoverState {
        self.controller.hover()
    }

    pub fn cursor(&self) -> Cursor {
        self.controller.cursor()
    }

    /// Registers an observer of trim region changes.
    pub fn subscribe(&mut self, observer: RegionObserver) {
        self.controller.subscribe(observer);
    }

    /// Shows the given sample: rebuilds the peaks and redraws both layers. An unloaded
    /// sample shows a flat waveform.
    pub fn load(&mut self, sample: &Sample) {
        let width = self.width as usize;
        self.peaks = match sample.audio() {
            Some(audio) => self.reducer.reduce(audio, width),
            None => vec![0.0; width],
        };
        self.renderer.draw_waveform(&mut self.waveform, &self.peaks);
        self.controller.release_all();
        self.selected = Some(sample.index());
        debug!(
            index = sample.index(),
            loaded = sample.is_loaded(),
            width,
            "Loaded pad into visualizer"
        );
        self.refresh(sample);
    }

    /// Clears both layers and forgets the selected pad.
    pub fn unload(&mut self) {
        self.peaks = vec![0.0; self.width as usize];
        self.renderer.draw_waveform(&mut self.waveform, &self.peaks);
        self.renderer
            .draw_region_markers(&mut self.overlay, 0.0, self.width as f64, &HoverState::default());
        self.controller.release_all();
        self.selected = None;
    }

    /// Redraws the marker layer for the sample's current region.
    pub fn refresh(&mut self, sample: &Sample) {
        let width = self.width as f64;
        self.renderer.draw_region_markers(
            &mut self.overlay,
            sample.left_pixel(width),
            sample.right_pixel(width),
            self.controller.hover(),
        );
        self.frames += 1;
    }

    /// Feeds a pointer event to the marker controller. Returns true if the region
    /// changed.
    pub fn handle_pointer(&mut self, sample: &mut Sample, event: PointerEvent) -> bool {
        self.controller.handle(sample, event)
    }

    /// Resets the sample to its full length.
    pub fn reset(&mut self, sample: &mut Sample) -> TrimRegion {
        self.controller.reset(sample)
    }

    /// Renders both layers as a single SVG document.
    pub fn to_svg(&self) -> String {
        to_svg(
            &[&self.waveform, &self.overlay],
            self.renderer.theme().background,
        )
    }
}

/// Calls a tick function at a fixed period on the tokio runtime.
pub struct RefreshLoop {
    handle: JoinHandle<()>,
}

impl RefreshLoop {
    /// Spawns the loop. The first tick happens immediately.
    pub fn spawn<F>(period: Duration, mut tick: F) -> RefreshLoop
    where
        F: FnMut() + Send + 'static,
    {
        let period = period.max(MIN_REFRESH_PERIOD);
        info!(period_ms = period.as_millis(), "Starting refresh loop");
        let handle = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                tick();
            }
        });
        RefreshLoop { handle }
    }

    /// Stops the loop. No tick runs after this returns to the runtime.
    pub fn stop(&self) {
        self.handle.abort();
    }

    pub fn is_stopped(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for RefreshLoop {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
