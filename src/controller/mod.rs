//! Controller subsystem binding gesture state to a transport
//!
//! 1. [`trackpad`] - multi-touch trackpad surface
//! 2. [`press`] - pressure button surface
//!
//! # Architecture
//!
//! ```text
//! TouchSample batch ──► Controller ──► gesture machine ──► ControlMessage ──► MessageSink
//!                                                                            (TransportHandle)
//! ```
//!
//! Controllers are driven from the UI thread and never block: handing a
//! message to the sink is a non-blocking channel push.

pub mod press;
pub mod trackpad;

pub use press::PressController;
pub use trackpad::TrackpadController;

use crate::protocol::ControlMessage;
use crate::transport::{LinkStatus, TransportHandle};

/// Destination of encoded control messages
pub trait MessageSink {
    /// Returns whether the message was accepted
    fn send(&self, message: ControlMessage) -> bool;

    fn status(&self) -> LinkStatus;
}

impl MessageSink for TransportHandle {
    fn send(&self, message: ControlMessage) -> bool {
        TransportHandle::send(self, message)
    }

    fn status(&self) -> LinkStatus {
        TransportHandle::status(self)
    }
}
