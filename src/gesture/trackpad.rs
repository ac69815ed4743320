//! Trackpad gesture state machine
//!
//! The machine is keyed by the number of active touches:
//!
//! ```text
//!            start              start              start
//!   Idle ──────────► Pointer ──────────► Scroll ──────────► Tracking (≥3)
//!    ▲                  │                  │                   │
//!    └──── end/cancel ──┘                  │  end/cancel       │ end/cancel
//!    ▲                                     │  (partner         │ (back to 2 or 1
//!    └─────────────── orphans ◄────────────┘   orphaned)       │  with live positions)
//! ```
//!
//! - **Pointer**: every move emits a scaled `Move`, force drives the click
//! - **Scroll**: centroid motion emits `ScrollX`/`ScrollY`
//! - **Tracking**: positions are kept current, nothing is emitted
//!
//! Lifting one finger of a two-finger scroll ends the gesture. The remaining
//! finger becomes an orphan whose events are swallowed until it lifts; it never
//! falls back into pointer mode.

use std::collections::{BTreeMap, HashSet};
use std::mem;
use tracing::{debug, trace};

use super::error::GestureError;
use super::touch::{centroid, sanitize_force, TouchId, TouchPoint, TouchSample};
use super::{scale_move, scale_nonzero, GestureSettings};
use crate::protocol::ControlMessage;

/// Gesture classification by active touch count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureMode {
    Idle,
    Pointer,
    Scroll,
    Tracking,
}

#[derive(Debug, Clone, PartialEq)]
enum TouchState {
    Idle,
    Pointer(TouchPoint),
    Scroll([TouchPoint; 2]),
    Tracking(BTreeMap<TouchId, TouchPoint>),
}

impl TouchState {
    fn from_points(points: Vec<TouchPoint>) -> Self {
        match points.len() {
            0 => TouchState::Idle,
            1 => TouchState::Pointer(points[0]),
            2 => TouchState::Scroll([points[0], points[1]]),
            _ => TouchState::Tracking(points.into_iter().map(|point| (point.id, point)).collect()),
        }
    }

    fn into_points(self) -> Vec<TouchPoint> {
        match self {
            TouchState::Idle => Vec::new(),
            TouchState::Pointer(point) => vec![point],
            TouchState::Scroll(pair) => pair.to_vec(),
            TouchState::Tracking(points) => points.into_values().collect(),
        }
    }

    fn mode(&self) -> GestureMode {
        match self {
            TouchState::Idle => GestureMode::Idle,
            TouchState::Pointer(_) => GestureMode::Pointer,
            TouchState::Scroll(_) => GestureMode::Scroll,
            TouchState::Tracking(_) => GestureMode::Tracking,
        }
    }

    fn len(&self) -> usize {
        match self {
            TouchState::Idle => 0,
            TouchState::Pointer(_) => 1,
            TouchState::Scroll(_) => 2,
            TouchState::Tracking(points) => points.len(),
        }
    }

    fn contains(&self, id: TouchId) -> bool {
        match self {
            TouchState::Idle => false,
            TouchState::Pointer(point) => point.id == id,
            TouchState::Scroll(pair) => pair.iter().any(|point| point.id == id),
            TouchState::Tracking(points) => points.contains_key(&id),
        }
    }
}

/// Per-surface trackpad state
///
/// Every handler validates its whole batch first and returns the messages it
/// produced in order. On error nothing has been mutated.
#[derive(Debug, Clone)]
pub struct TrackpadGesture {
    settings: GestureSettings,
    state: TouchState,
    // Survivors of an ended scroll gesture, ignored until they lift
    orphans: HashSet<TouchId>,
    clicking: bool,
}

impl TrackpadGesture {
    pub fn new(settings: GestureSettings) -> Self {
        Self {
            settings,
            state: TouchState::Idle,
            orphans: HashSet::new(),
            clicking: false,
        }
    }

    pub fn mode(&self) -> GestureMode {
        self.state.mode()
    }

    #[cfg(test)]
    pub fn active_touches(&self) -> usize {
        self.state.len()
    }

    pub fn is_clicking(&self) -> bool {
        self.clicking
    }

    #[cfg(test)]
    pub fn is_orphan(&self, id: TouchId) -> bool {
        self.orphans.contains(&id)
    }

    /// Snapshot of the active touches, for drawing
    pub fn points(&self) -> Vec<TouchPoint> {
        self.state.clone().into_points()
    }

    pub fn touch_start(
        &mut self,
        samples: &[TouchSample],
    ) -> Result<Vec<ControlMessage>, GestureError> {
        let mut seen = HashSet::with_capacity(samples.len());
        for sample in samples {
            if self.state.contains(sample.id) || !seen.insert(sample.id) {
                return Err(GestureError::DuplicateTouch(sample.id));
            }
        }

        let mut points = mem::replace(&mut self.state, TouchState::Idle).into_points();
        for sample in samples {
            if self.orphans.remove(&sample.id) {
                debug!("Touch {} reuses an orphaned identifier", sample.id);
            }
            points.push(TouchPoint::from_sample(sample));
        }
        self.state = TouchState::from_points(points);
        debug!(
            "Touch start ({} new), now {:?} with {} touches",
            samples.len(),
            self.state.mode(),
            self.state.len()
        );
        Ok(Vec::new())
    }

    pub fn touch_move(
        &mut self,
        samples: &[TouchSample],
    ) -> Result<Vec<ControlMessage>, GestureError> {
        let live = self.live_samples(samples)?;
        let settings = self.settings;
        let mut messages = Vec::new();

        match &mut self.state {
            TouchState::Idle => {}
            TouchState::Pointer(point) => {
                // Zero deltas are sent as well
                for sample in live {
                    let (dx, dy) = point.delta_to(sample);
                    messages.push(ControlMessage::Move {
                        dx: scale_move(dx, settings.move_scale),
                        dy: scale_move(dy, settings.move_scale),
                    });
                    point.update_position(sample);
                }
            }
            TouchState::Scroll(pair) => {
                let (before_x, before_y) = centroid(pair.iter());
                for sample in live {
                    if let Some(point) = pair.iter_mut().find(|point| point.id == sample.id) {
                        point.update_position(sample);
                    }
                }
                let (after_x, after_y) = centroid(pair.iter());
                messages.extend(scroll_messages(
                    before_x - after_x,
                    before_y - after_y,
                    settings.scroll_scale,
                ));
            }
            TouchState::Tracking(points) => {
                for sample in live {
                    if let Some(point) = points.get_mut(&sample.id) {
                        point.update_position(sample);
                    }
                }
            }
        }

        trace!("Touch move produced {} messages", messages.len());
        Ok(messages)
    }

    pub fn touch_end(
        &mut self,
        samples: &[TouchSample],
    ) -> Result<Vec<ControlMessage>, GestureError> {
        let live = self.live_samples(samples)?;
        self.forget_orphans(samples);
        let Some(&lifted) = live.first() else {
            return Ok(Vec::new());
        };

        if let TouchState::Pointer(point) = &self.state {
            // The final delta before lift-off still reaches the cursor
            let (dx, dy) = point.delta_to(lifted);
            let mut messages = vec![ControlMessage::Move {
                dx: scale_move(dx, self.settings.move_scale),
                dy: scale_move(dy, self.settings.move_scale),
            }];
            self.state = TouchState::Idle;
            if self.clicking {
                messages.push(self.release_click());
            }
            debug!("Pointer touch {} ended", lifted.id);
            return Ok(messages);
        }

        Ok(self.drop_touches(&live))
    }

    pub fn touch_cancel(
        &mut self,
        samples: &[TouchSample],
    ) -> Result<Vec<ControlMessage>, GestureError> {
        let live = self.live_samples(samples)?;
        self.forget_orphans(samples);
        if live.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.drop_touches(&live))
    }

    /// Force readings only matter while exactly one touch is active
    pub fn force_change(
        &mut self,
        samples: &[TouchSample],
    ) -> Result<Vec<ControlMessage>, GestureError> {
        if self.state.mode() != GestureMode::Pointer {
            trace!("Ignoring force change in {:?} mode", self.state.mode());
            return Ok(Vec::new());
        }
        let live = self.live_samples(samples)?;
        let Some(force) = live
            .iter()
            .rev()
            .find_map(|sample| sample.force)
            .and_then(sanitize_force)
        else {
            return Ok(Vec::new());
        };

        let threshold = self.settings.force_threshold;
        if let TouchState::Pointer(point) = &mut self.state {
            point.force = force;
        }

        if self.clicking {
            if force < threshold {
                return Ok(vec![self.release_click()]);
            }
        } else if force >= threshold {
            self.clicking = true;
            debug!("Force {:.3} crossed {:.3}, pressing", force, threshold);
            return Ok(vec![ControlMessage::ButtonDown]);
        }
        Ok(Vec::new())
    }

    // Splits a batch into active samples, skipping orphans and failing on unknown ids
    fn live_samples<'a>(
        &self,
        samples: &'a [TouchSample],
    ) -> Result<Vec<&'a TouchSample>, GestureError> {
        let mut live = Vec::with_capacity(samples.len());
        for sample in samples {
            if self.state.contains(sample.id) {
                live.push(sample);
            } else if !self.orphans.contains(&sample.id) {
                return Err(GestureError::UnknownTouch(sample.id));
            }
        }
        Ok(live)
    }

    fn forget_orphans(&mut self, samples: &[TouchSample]) {
        for sample in samples {
            if self.orphans.remove(&sample.id) {
                debug!("Orphaned touch {} lifted", sample.id);
            }
        }
    }

    // Shared end/cancel path for everything but a single pointer lift
    fn drop_touches(&mut self, removed: &[&TouchSample]) -> Vec<ControlMessage> {
        let ending_scroll = self.state.mode() == GestureMode::Scroll;
        let mut points = mem::replace(&mut self.state, TouchState::Idle).into_points();
        points.retain(|point| !removed.iter().any(|sample| sample.id == point.id));

        if ending_scroll && points.len() == 1 {
            for point in points.drain(..) {
                debug!("Scroll ended, orphaning partner touch {}", point.id);
                self.orphans.insert(point.id);
            }
        }
        self.state = TouchState::from_points(points);
        debug!(
            "Dropped {} touches, now {:?}",
            removed.len(),
            self.state.mode()
        );

        let mut messages = Vec::new();
        if self.clicking {
            messages.push(self.release_click());
        }
        messages
    }

    fn release_click(&mut self) -> ControlMessage {
        self.clicking = false;
        debug!("Releasing click");
        ControlMessage::ButtonUp
    }
}

fn scroll_messages(dx: f32, dy: f32, scale: f32) -> Vec<ControlMessage> {
    let moved = |distance: f32| distance.is_finite() && distance != 0.0;
    let mut messages = Vec::with_capacity(2);
    if moved(dx) {
        messages.push(ControlMessage::ScrollX(scale_nonzero(dx, scale)));
    }
    if moved(dy) {
        messages.push(ControlMessage::ScrollY(scale_nonzero(dy, scale)));
    }
    messages
}
