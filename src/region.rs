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

//! Pointer handling for the trim markers.
//!
//! Each marker moves through idle, hovering and dragging. Only one marker can be
//! selected at a time and the left marker wins when both are within reach of the
//! pointer.

use std::fmt;

use tracing::debug;

use crate::sample::{clamp_finite, pixel_to_seconds, Sample, TrimRegion};

/// How close (in pixels) the pointer must be to grab a marker.
pub const DEFAULT_HIT_DISTANCE: f64 = 10.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// The interaction state of one marker. Dragging implies selected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrimbarState {
    pub selected: bool,
    pub dragging: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Hovering,
    Dragging,
}

impl TrimbarState {
    pub fn phase(&self) -> Phase {
        if self.dragging {
            Phase::Dragging
        } else if self.selected {
            Phase::Hovering
        } else {
            Phase::Idle
        }
    }
}

/// The state of both markers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HoverState {
    pub left: TrimbarState,
    pub right: TrimbarState,
}

impl HoverState {
    pub fn get(&self, side: Side) -> &TrimbarState {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    fn get_mut(&mut self, side: Side) -> &mut TrimbarState {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    /// The side currently being dragged, if any.
    pub fn dragging(&self) -> Option<Side> {
        if self.left.dragging {
            Some(Side::Left)
        } else if self.right.dragging {
            Some(Side::Right)
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cursor {
    Default,
    Resize,
}

/// Pointer input in canvas coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    Move(f64),
    Press,
    Release,
    Leave,
}

/// Called with the sample every time its trim region changes.
pub type RegionObserver = Box<dyn FnMut(&Sample) + Send>;

/// Turns pointer events into trim region updates.
pub struct RegionController {
    canvas_width: f64,
    hit_distance: f64,
    hover: HoverState,
    observers: Vec<RegionObserver>,
}

impl fmt::Debug for RegionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionController")
            .field("canvas_width", &self.canvas_width)
            .field("hit_distance", &self.hit_distance)
            .field("hover", &self.hover)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl RegionController {
    pub fn new(canvas_width: f64, hit_distance: f64) -> RegionController {
        RegionController {
            canvas_width: canvas_width.max(0.0),
            hit_distance: hit_distance.max(0.0),
            hover: HoverState::default(),
            observers: Vec::new(),
        }
    }

    pub fn canvas_width(&self) -> f64 {
        self.canvas_width
    }

    pub fn hover(&self) -> &HoverState {
        &self.hover
    }

    /// Registers an observer of region changes.
    pub fn subscribe(&mut self, observer: RegionObserver) {
        self.observers.push(observer);
    }

    pub fn cursor(&self) -> Cursor {
        let active = |state: &TrimbarState| state.selected || state.dragging;
        if active(&self.hover.left) || active(&self.hover.right) {
            Cursor::Resize
        } else {
            Cursor::Default
        }
    }

    /// Handles a pointer event against the given sample. Returns true if the sample's
    /// trim region changed.
    pub fn handle(&mut self, sample: &mut Sample, event: PointerEvent) -> bool {
        match event {
            PointerEvent::Move(x) => self.pointer_move(sample, x),
            PointerEvent::Press => {
                for side in [Side::Left, Side::Right] {
                    let state = self.hover.get_mut(side);
                    if state.selected {
                        state.dragging = true;
                        debug!(index = sample.index(), side = %side, "Started marker drag");
                        break;
                    }
                }
                false
            }
            PointerEvent::Release => {
                self.hover.left.dragging = false;
                self.hover.right.dragging = false;
                false
            }
            PointerEvent::Leave => {
                self.release_all();
                false
            }
        }
    }

    /// Drops any hover or drag in progress.
    pub fn release_all(&mut self) {
        self.hover = HoverState::default();
    }

    /// Resets the sample to its full clip and notifies observers.
    pub fn reset(&mut self, sample: &mut Sample) -> TrimRegion {
        let region = sample.reset_region();
        self.notify(sample);
        region
    }

    fn pointer_move(&mut self, sample: &mut Sample, x: f64) -> bool {
        let width = self.canvas_width;
        let x = clamp_finite(x, 0.0, width);
        let left = sample.left_pixel(width);
        let right = sample.right_pixel(width);

        match self.hover.dragging() {
            Some(side) => {
                if !sample.is_loaded() {
                    return false;
                }
                let duration = sample.duration_seconds();
                match side {
                    Side::Left => {
                        let left = x.clamp(0.0, right);
                        let end = sample.end_seconds();
                        sample.set_region(pixel_to_seconds(left, width, duration), end);
                    }
                    Side::Right => {
                        let right = x.clamp(left, width);
                        let start = sample.start_seconds();
                        sample.set_region(start, pixel_to_seconds(right, width, duration));
                    }
                }
                self.notify(sample);
                true
            }
            None => {
                let hit = self.hit_distance;
                self.hover.left.selected = (x - left).abs() < hit && !self.hover.right.selected;
                self.hover.right.selected = (x - right).abs() < hit && !self.hover.left.selected;
                false
            }
        }
    }

    fn notify(&mut self, sample: &Sample) {
        for observer in self.observers.iter_mut() {
            observer(sample);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::testutil::loaded_sample;

    const EPSILON: f64 = 1e-9;

    fn controller() -> RegionController {
        RegionController::new(800.0, DEFAULT_HIT_DISTANCE)
    }

    #[test]
    fn test_hover_selects_nearest_marker() {
        let mut controller = controller();
        let mut sample = loaded_sample(0, 4.0);
        sample.set_region_pixels(200.0, 600.0, 800.0);

        assert!(!controller.handle(&mut sample, PointerEvent::Move(205.0)));
        assert_eq!(controller.hover().left.phase(), Phase::Hovering);
        assert_eq!(controller.hover().right.phase(), Phase::Idle);
        assert_eq!(controller.cursor(), Cursor::Resize);

        controller.handle(&mut sample, PointerEvent::Move(400.0));
        assert_eq!(controller.hover(), &HoverState::default());
        assert_eq!(controller.cursor(), Cursor::Default);

        controller.handle(&mut sample, PointerEvent::Move(595.0));
        assert_eq!(controller.hover().right.phase(), Phase::Hovering);
        assert_eq!(controller.hover().left.phase(), Phase::Idle);
    }

    #[test]
    fn test_hit_distance_is_exclusive() {
        let mut controller = controller();
        let mut sample = loaded_sample(0, 4.0);
        sample.set_region_pixels(200.0, 600.0, 800.0);

        controller.handle(&mut sample, PointerEvent::Move(210.0));
        assert!(!controller.hover().left.selected);
        controller.handle(&mut sample, PointerEvent::Move(209.5));
        assert!(controller.hover().left.selected);
    }

    #[test]
    fn test_left_wins_when_both_in_reach() {
        let mut controller = controller();
        let mut sample = loaded_sample(0, 4.0);
        sample.set_region_pixels(400.0, 404.0, 800.0);

        controller.handle(&mut sample, PointerEvent::Move(402.0));
        assert!(controller.hover().left.selected);
        assert!(!controller.hover().right.selected);
    }

    #[test]
    fn test_drag_left_marker() {
        let mut controller = controller();
        let mut sample = loaded_sample(0, 4.0);

        controller.handle(&mut sample, PointerEvent::Move(3.0));
        controller.handle(&mut sample, PointerEvent::Press);
        assert_eq!(controller.hover().left.phase(), Phase::Dragging);

        assert!(controller.handle(&mut sample, PointerEvent::Move(200.0)));
        assert!((sample.start_seconds() - 1.0).abs() < EPSILON);
        assert!((sample.end_seconds() - 4.0).abs() < EPSILON);

        controller.handle(&mut sample, PointerEvent::Release);
        assert_eq!(controller.hover().left.phase(), Phase::Hovering);
        assert!(!controller.handle(&mut sample, PointerEvent::Move(300.0)));
        assert!((sample.start_seconds() - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_left_never_passes_right() {
        let mut controller = controller();
        let mut sample = loaded_sample(0, 4.0);
        sample.set_region_pixels(200.0, 600.0, 800.0);

        controller.handle(&mut sample, PointerEvent::Move(200.0));
        controller.handle(&mut sample, PointerEvent::Press);
        controller.handle(&mut sample, PointerEvent::Move(750.0));
        assert!((sample.left_pixel(800.0) - 600.0).abs() < 1e-6);
        assert!((sample.right_pixel(800.0) - 600.0).abs() < 1e-6);

        controller.handle(&mut sample, PointerEvent::Move(-50.0));
        assert_eq!(sample.start_seconds(), 0.0);
        assert!((sample.end_seconds() - 3.0).abs() < EPSILON);
    }

    #[test]
    fn test_right_never_passes_left() {
        let mut controller = controller();
        let mut sample = loaded_sample(0, 4.0);
        sample.set_region_pixels(200.0, 600.0, 800.0);

        controller.handle(&mut sample, PointerEvent::Move(600.0));
        controller.handle(&mut sample, PointerEvent::Press);
        assert_eq!(controller.hover().right.phase(), Phase::Dragging);

        controller.handle(&mut sample, PointerEvent::Move(10.0));
        assert!((sample.start_seconds() - 1.0).abs() < EPSILON);
        assert!((sample.end_seconds() - 1.0).abs() < EPSILON);

        controller.handle(&mut sample, PointerEvent::Move(f64::INFINITY));
        assert!((sample.end_seconds() - 4.0).abs() < EPSILON);
        assert!((sample.right_pixel(800.0) - 800.0).abs() < 1e-6);
    }

    #[test]
    fn test_nan_pointer_is_clamped() {
        let mut controller = controller();
        let mut sample = loaded_sample(0, 4.0);
        sample.set_region_pixels(200.0, 600.0, 800.0);

        controller.handle(&mut sample, PointerEvent::Move(200.0));
        controller.handle(&mut sample, PointerEvent::Press);
        assert!(controller.handle(&mut sample, PointerEvent::Move(f64::NAN)));
        assert_eq!(sample.start_seconds(), 0.0);
    }

    #[test]
    fn test_leave_ends_drag() {
        let mut controller = controller();
        let mut sample = loaded_sample(0, 4.0);

        controller.handle(&mut sample, PointerEvent::Move(0.0));
        controller.handle(&mut sample, PointerEvent::Press);
        controller.handle(&mut sample, PointerEvent::Leave);
        assert_eq!(controller.hover(), &HoverState::default());
        assert_eq!(controller.cursor(), Cursor::Default);

        assert!(!controller.handle(&mut sample, PointerEvent::Move(100.0)));
        assert_eq!(sample.start_seconds(), 0.0);
    }

    #[test]
    fn test_press_without_hover_does_nothing() {
        let mut controller = controller();
        let mut sample = loaded_sample(0, 4.0);

        controller.handle(&mut sample, PointerEvent::Move(400.0));
        controller.handle(&mut sample, PointerEvent::Press);
        assert_eq!(controller.hover().dragging(), None);
        assert!(!controller.handle(&mut sample, PointerEvent::Move(405.0)));
    }

    #[test]
    fn test_observers_see_every_update() {
        let mut controller = controller();
        let mut sample = loaded_sample(4, 4.0);
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = seen.clone();
            controller.subscribe(Box::new(move |sample: &Sample| {
                seen.lock()
                    .expect("poisoned")
                    .push((sample.index(), sample.region()));
            }));
        }

        controller.handle(&mut sample, PointerEvent::Move(800.0));
        controller.handle(&mut sample, PointerEvent::Press);
        controller.handle(&mut sample, PointerEvent::Move(600.0));
        controller.handle(&mut sample, PointerEvent::Move(400.0));
        controller.handle(&mut sample, PointerEvent::Release);
        let region = controller.reset(&mut sample);

        let seen = seen.lock().expect("poisoned");
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|(index, _)| *index == 4));
        assert!((seen[0].1.end() - 3.0).abs() < EPSILON);
        assert!((seen[1].1.end() - 2.0).abs() < EPSILON);
        assert_eq!(seen[2].1, region);
    }

    #[test]
    fn test_reset_restores_full_clip() {
        let mut controller = controller();
        let mut sample = loaded_sample(0, 4.0);
        sample.set_region_pixels(100.0, 300.0, 800.0);

        controller.reset(&mut sample);
        assert_eq!(sample.left_pixel(800.0), 0.0);
        assert_eq!(sample.right_pixel(800.0), 800.0);
        assert_eq!(sample.start_seconds(), 0.0);
        assert!((sample.end_seconds() - 4.0).abs() < EPSILON);
    }

    #[test]
    fn test_unloaded_sample_ignores_drags() {
        let mut controller = controller();
        let mut sample = Sample::new(0, "missing.wav", "Missing");
        let notified = Arc::new(Mutex::new(0));
        {
            let notified = notified.clone();
            controller.subscribe(Box::new(move |_: &Sample| {
                *notified.lock().expect("poisoned") += 1;
            }));
        }

        controller.handle(&mut sample, PointerEvent::Move(0.0));
        controller.handle(&mut sample, PointerEvent::Press);
        assert!(!controller.handle(&mut sample, PointerEvent::Move(300.0)));
        assert_eq!(*notified.lock().expect("poisoned"), 0);
    }
}
