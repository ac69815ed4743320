//! Gesture subsystem turning touch and pressure input into control messages
//!
//! Two independent state machines live here:
//!
//! 1. [`trackpad`] - multi-touch pointer/scroll gestures keyed by touch count
//! 2. [`pressure`] - single-threshold pressure button
//!
//! # Architecture
//!
//! ```text
//! TouchSample batch ──► TrackpadGesture ──► Vec<ControlMessage>
//! force reading     ──► PressureButton  ──► Option<ButtonTransition>
//! ```
//!
//! Both machines are plain owned values without I/O. They know nothing about
//! the UI toolkit or the socket, which keeps them testable in isolation.

pub mod error;
pub mod pressure;
pub mod touch;
pub mod trackpad;

pub use error::GestureError;
pub use pressure::{ButtonTransition, PressureButton};
pub use touch::{TouchId, TouchPoint, TouchSample};
pub use trackpad::{GestureMode, TrackpadGesture};

/// Tuning shared by both gesture machines
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureSettings {
    /// Multiplier from screen distance to cursor motion
    pub move_scale: f32,
    /// Multiplier from centroid distance to scroll ticks
    pub scroll_scale: f32,
    /// Force at or above which a touch counts as pressed
    pub force_threshold: f32,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            move_scale: 1.8,
            scroll_scale: 0.5,
            force_threshold: 0.25,
        }
    }
}

/// Rounds half-way values towards positive infinity, so `-2.5` becomes `-2`
pub fn round_half_up(value: f32) -> f32 {
    (value + 0.5).floor()
}

/// Scales a cursor delta and rounds it to the wire type
pub fn scale_move(distance: f32, scale: f32) -> i16 {
    // float to int `as` casts saturate
    round_half_up(distance * scale) as i16
}

/// Scales a scroll delta without ever collapsing real motion to zero
///
/// A nonzero distance yields at least one tick in its direction; a zero
/// distance yields zero.
pub fn scale_nonzero(distance: f32, scale: f32) -> i16 {
    let scaled = distance * scale;
    if distance > 0.0 {
        round_half_up(scaled.max(1.0)) as i16
    } else if distance < 0.0 {
        round_half_up(scaled.min(-1.0)) as i16
    } else {
        0
    }
}
