//! Pressure button with a single force threshold
//!
//! There is no hysteresis band: the same threshold is used for pressing and
//! releasing. Lifting the finger always releases.

use tracing::debug;

use super::touch::sanitize_force;

/// Edge produced by the pressure button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonTransition {
    Down,
    Up,
}

#[derive(Debug, Clone)]
pub struct PressureButton {
    threshold: f32,
    down: bool,
}

impl PressureButton {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            down: false,
        }
    }

    pub fn is_down(&self) -> bool {
        self.down
    }

    /// Feeds one force reading, returning the edge it caused if any
    pub fn pressure_change(&mut self, force: f32) -> Option<ButtonTransition> {
        let force = sanitize_force(force)?;
        if self.down && force < self.threshold {
            debug!("Pressure {:.3} fell below {:.3}", force, self.threshold);
            self.down = false;
            Some(ButtonTransition::Up)
        } else if !self.down && force >= self.threshold {
            debug!("Pressure {:.3} reached {:.3}", force, self.threshold);
            self.down = true;
            Some(ButtonTransition::Down)
        } else {
            None
        }
    }

    /// Touch end or cancel on the button surface
    pub fn release(&mut self) -> Option<ButtonTransition> {
        if self.down {
            self.down = false;
            Some(ButtonTransition::Up)
        } else {
            None
        }
    }
}
