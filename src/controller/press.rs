use tracing::debug;

use super::MessageSink;
use crate::gesture::{ButtonTransition, PressureButton};
use crate::protocol::ControlMessage;
use crate::transport::LinkStatus;

/// Pressure button surface with its own socket
pub struct PressController<S: MessageSink> {
    button: PressureButton,
    sink: S,
}

impl<S: MessageSink> PressController<S> {
    pub fn new(threshold: f32, sink: S) -> Self {
        debug!("Creating press controller with threshold {:.3}", threshold);
        Self {
            button: PressureButton::new(threshold),
            sink,
        }
    }

    /// Drives the highlight of the button surface
    pub fn is_down(&self) -> bool {
        self.button.is_down()
    }

    pub fn link_status(&self) -> LinkStatus {
        self.sink.status()
    }

    pub fn pressure_change(&mut self, force: f32) {
        if let Some(transition) = self.button.pressure_change(force) {
            self.emit(transition);
        }
    }

    /// Touch end or cancel on the button
    pub fn release(&mut self) {
        if let Some(transition) = self.button.release() {
            self.emit(transition);
        }
    }

    fn emit(&self, transition: ButtonTransition) {
        let message = match transition {
            ButtonTransition::Down => ControlMessage::ButtonDown,
            ButtonTransition::Up => ControlMessage::ButtonUp,
        };
        if !self.sink.send(message) {
            debug!("Press {:?} not delivered", transition);
        }
    }
}
