//! Adapter from egui input events to [`TouchSample`] batches
//!
//! egui delivers one `Event::Touch` per finger. Consecutive events sharing a
//! phase are grouped into one batch, which is what the gesture machines expect
//! as "changed touches" of a single input event. Positions are made relative
//! to the surface rectangle.
//!
//! A touch is only followed if it started inside the surface. On devices
//! without a touch screen the primary mouse button acts as a single finger;
//! once any real touch has been seen, mouse events are ignored because egui
//! mirrors the first finger as pointer events.

use eframe::egui::{Event, PointerButton, Pos2, Rect, TouchPhase as EguiPhase};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::{debug, trace};

use crate::controller::trackpad::TouchPhase;
use crate::gesture::TouchSample;

/// Reserved identifier for the emulated mouse finger
pub const MOUSE_TOUCH_ID: u64 = u64::MAX;

#[derive(Debug, Clone, PartialEq)]
pub struct TouchBatch {
    pub phase: TouchPhase,
    pub samples: Vec<TouchSample>,
}

#[derive(Debug, Default)]
pub struct TouchCollector {
    // Last surface-relative position of every followed touch
    tracked: HashMap<u64, (f32, f32)>,
    touch_seen: bool,
    mouse_down: bool,
}

impl TouchCollector {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn active(&self) -> usize {
        self.tracked.len()
    }

    /// Cancels every followed touch at its last position
    ///
    /// Used when the surface stops receiving input while fingers are still
    /// down, so their end events would otherwise never arrive.
    pub fn cancel_all(&mut self) -> Option<TouchBatch> {
        self.mouse_down = false;
        if self.tracked.is_empty() {
            return None;
        }
        let mut samples: Vec<TouchSample> = self
            .tracked
            .drain()
            .map(|(id, (x, y))| TouchSample::new(id, x, y))
            .collect();
        samples.sort_by_key(|sample| sample.id);
        debug!("Cancelling {} stranded touches", samples.len());
        Some(TouchBatch {
            phase: TouchPhase::Cancel,
            samples,
        })
    }

    /// Converts one frame's events into ordered batches for `surface`
    pub fn collect(&mut self, events: &[Event], surface: Rect) -> Vec<TouchBatch> {
        let mut batches: Vec<TouchBatch> = Vec::new();
        for event in events {
            let Some((phase, sample)) = self.convert(event, surface) else {
                continue;
            };
            match batches.last_mut() {
                Some(batch) if batch.phase == phase => batch.samples.push(sample),
                _ => batches.push(TouchBatch {
                    phase,
                    samples: vec![sample],
                }),
            }
        }
        if !batches.is_empty() {
            trace!("Collected {} touch batches", batches.len());
        }
        batches
    }

    fn convert(&mut self, event: &Event, surface: Rect) -> Option<(TouchPhase, TouchSample)> {
        match event {
            Event::Touch {
                id, phase, pos, force, ..
            } => {
                self.touch_seen = true;
                let phase = match phase {
                    EguiPhase::Start => TouchPhase::Start,
                    EguiPhase::Move => TouchPhase::Move,
                    EguiPhase::End => TouchPhase::End,
                    EguiPhase::Cancel => TouchPhase::Cancel,
                };
                self.track(id.0, phase, *pos, *force, surface)
            }
            Event::PointerButton {
                pos,
                button: PointerButton::Primary,
                pressed,
                ..
            } if !self.touch_seen => {
                let phase = if *pressed {
                    TouchPhase::Start
                } else {
                    TouchPhase::End
                };
                let converted = self.track(MOUSE_TOUCH_ID, phase, *pos, None, surface);
                self.mouse_down = self.tracked.contains_key(&MOUSE_TOUCH_ID);
                converted
            }
            Event::PointerMoved(pos) if !self.touch_seen && self.mouse_down => {
                self.track(MOUSE_TOUCH_ID, TouchPhase::Move, *pos, None, surface)
            }
            _ => None,
        }
    }

    fn track(
        &mut self,
        id: u64,
        phase: TouchPhase,
        pos: Pos2,
        force: Option<f32>,
        surface: Rect,
    ) -> Option<(TouchPhase, TouchSample)> {
        let local = pos - surface.min;
        let accepted = match phase {
            TouchPhase::Start if surface.contains(pos) => match self.tracked.entry(id) {
                Entry::Vacant(slot) => {
                    slot.insert((local.x, local.y));
                    true
                }
                Entry::Occupied(_) => false,
            },
            TouchPhase::Start => false,
            TouchPhase::Move => match self.tracked.get_mut(&id) {
                Some(last) => {
                    *last = (local.x, local.y);
                    true
                }
                None => false,
            },
            TouchPhase::End | TouchPhase::Cancel => self.tracked.remove(&id).is_some(),
        };
        if !accepted {
            return None;
        }
        let mut sample = TouchSample::new(id, local.x, local.y);
        sample.force = force;
        Some((phase, sample))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::{pos2, Modifiers, TouchDeviceId, TouchId};

    fn touch(id: u64, phase: EguiPhase, x: f32, y: f32) -> Event {
        Event::Touch {
            device_id: TouchDeviceId(0),
            id: TouchId(id),
            phase,
            pos: pos2(x, y),
            force: None,
        }
    }

    fn surface() -> Rect {
        Rect::from_min_max(pos2(100.0, 100.0), pos2(300.0, 300.0))
    }

    #[test]
    fn same_phase_events_share_a_batch() {
        let mut collector = TouchCollector::new();
        let batches = collector.collect(
            &[
                touch(1, EguiPhase::Start, 110.0, 120.0),
                touch(2, EguiPhase::Start, 150.0, 150.0),
                touch(1, EguiPhase::Move, 115.0, 120.0),
            ],
            surface(),
        );
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].phase, TouchPhase::Start);
        assert_eq!(
            batches[0].samples,
            vec![
                TouchSample::new(1, 10.0, 20.0),
                TouchSample::new(2, 50.0, 50.0)
            ]
        );
        assert_eq!(batches[1].samples, vec![TouchSample::new(1, 15.0, 20.0)]);
        assert_eq!(collector.active(), 2);
    }

    #[test]
    fn touches_starting_outside_are_ignored() {
        let mut collector = TouchCollector::new();
        let batches = collector.collect(
            &[
                touch(1, EguiPhase::Start, 10.0, 10.0),
                touch(1, EguiPhase::Move, 150.0, 150.0),
                touch(1, EguiPhase::End, 150.0, 150.0),
            ],
            surface(),
        );
        assert!(batches.is_empty());
    }

    #[test]
    fn cancel_all_flushes_held_touches_at_last_position() {
        let mut collector = TouchCollector::new();
        collector.collect(
            &[
                touch(4, EguiPhase::Start, 110.0, 110.0),
                touch(2, EguiPhase::Start, 200.0, 200.0),
                touch(4, EguiPhase::Move, 140.0, 125.0),
            ],
            surface(),
        );

        let batch = collector.cancel_all().expect("two touches held");
        assert_eq!(batch.phase, TouchPhase::Cancel);
        assert_eq!(
            batch.samples,
            vec![
                TouchSample::new(2, 100.0, 100.0),
                TouchSample::new(4, 40.0, 25.0)
            ]
        );
        assert_eq!(collector.active(), 0);
        assert_eq!(collector.cancel_all(), None);

        // The flushed identifier is accepted again
        let batches = collector.collect(&[touch(4, EguiPhase::Start, 150.0, 150.0)], surface());
        assert_eq!(batches.len(), 1);
    }

    #[test]
    fn mouse_acts_as_one_finger_until_touch_is_seen() {
        let mut collector = TouchCollector::new();
        let press = Event::PointerButton {
            pos: pos2(120.0, 120.0),
            button: PointerButton::Primary,
            pressed: true,
            modifiers: Modifiers::default(),
        };
        let batches = collector.collect(
            &[press.clone(), Event::PointerMoved(pos2(130.0, 120.0))],
            surface(),
        );
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].samples[0].id.0, MOUSE_TOUCH_ID);

        let mut collector = TouchCollector::new();
        let batches =
            collector.collect(&[touch(7, EguiPhase::Start, 120.0, 120.0), press], surface());
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].samples[0].id.0, 7);
    }
}
