//! Shared UI types, colors and frame helpers

use eframe::egui::{Color32, Frame, Stroke};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::transport::LinkStatus;

/// Surface shown in the central panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    #[default]
    Trackpad,
    Press,
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Page::Trackpad => write!(f, "Trackpad"),
            Page::Press => write!(f, "Press"),
        }
    }
}

pub fn create_frame(bg_color: Color32, border_color: Color32) -> Frame {
    Frame::new()
        .stroke(Stroke::new(1.0, border_color))
        .fill(bg_color)
        .inner_margin(4)
        .outer_margin(2)
}

/// Status dot color for a link
pub fn status_color(status: &LinkStatus) -> Color32 {
    match status {
        LinkStatus::Online { .. } => UiColors::ACTIVE,
        LinkStatus::Connecting => UiColors::PENDING,
        LinkStatus::Offline { .. } | LinkStatus::Closed => UiColors::INACTIVE,
    }
}

pub struct UiColors;

impl UiColors {
    pub const MAIN_BG: Color32 = Color32::from_rgb(30, 30, 30);

    /// Idle touch surface
    pub const INNER_BG: Color32 = Color32::from_rgb(25, 25, 25);

    /// Surface while its link is down
    pub const OFFLINE_BG: Color32 = Color32::from_rgb(45, 22, 18);

    pub const BORDER: Color32 = Color32::from_rgb(60, 60, 60);

    /// Touch markers
    pub const TOUCH: Color32 = Color32::from_rgb(120, 160, 220);

    pub const ACTIVE: Color32 = Color32::from_rgb(50, 200, 20);

    pub const PENDING: Color32 = Color32::from_rgb(220, 170, 30);

    pub const INACTIVE: Color32 = Color32::from_rgb(200, 50, 20);
}
