//! Error definitions for the gesture state machines

use thiserror::Error;

use super::touch::TouchId;

/// Contract violations in the touch event stream
///
/// Handlers validate a whole batch before mutating anything, so the gesture
/// state is unchanged when one of these is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GestureError {
    /// The event names a touch that was never started or already ended
    #[error("Unknown touch identifier: {0}")]
    UnknownTouch(TouchId),

    /// A touch-start for an identifier that is already active
    #[error("Touch {0} started twice")]
    DuplicateTouch(TouchId),
}
