use eframe::egui::{self, Align2, Event, FontId, Rect, Sense, Stroke};

use super::common::UiColors;
use super::touch_input::TouchCollector;
use crate::controller::{MessageSink, TrackpadController};
use crate::gesture::GestureMode;

pub struct TrackpadView<S: MessageSink> {
    controller: TrackpadController<S>,
    input: TouchCollector,
}

impl<S: MessageSink> TrackpadView<S> {
    pub fn new(controller: TrackpadController<S>) -> Self {
        Self {
            controller,
            input: TouchCollector::new(),
        }
    }

    pub fn controller(&self) -> &TrackpadController<S> {
        &self.controller
    }

    /// Feeds one frame of input events hitting `surface`
    pub fn feed(&mut self, events: &[Event], surface: Rect) {
        for batch in self.input.collect(events, surface) {
            self.controller.handle(batch.phase, &batch.samples);
        }
    }

    /// The surface is hidden: fingers still down are cancelled
    pub fn leave(&mut self) {
        if let Some(batch) = self.input.cancel_all() {
            self.controller.handle(batch.phase, &batch.samples);
        }
    }

    pub fn render(&mut self, ui: &mut egui::Ui) {
        let (rect, _response) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());

        let events = ui.input(|i| i.events.clone());
        self.feed(&events, rect);

        let online = self.controller.link_status().is_online();
        let painter = ui.painter_at(rect);
        let fill = if online {
            UiColors::INNER_BG
        } else {
            UiColors::OFFLINE_BG
        };
        let border = if self.controller.is_clicking() {
            Stroke::new(3.0, UiColors::ACTIVE)
        } else {
            Stroke::new(1.0, UiColors::BORDER)
        };
        painter.rect_filled(rect, 8.0, fill);
        painter.rect_stroke(rect, 8.0, border, egui::StrokeKind::Inside);

        for point in self.controller.points() {
            let center = rect.min + egui::vec2(point.x, point.y);
            painter.circle_filled(center, 18.0 + 12.0 * point.force, UiColors::TOUCH);
        }

        let hint = match self.controller.mode() {
            GestureMode::Idle if !online => "offline",
            GestureMode::Idle => "",
            GestureMode::Pointer => "pointer",
            GestureMode::Scroll => "scroll",
            GestureMode::Tracking => "tracking",
        };
        painter.text(
            rect.center_bottom() - egui::vec2(0.0, 16.0),
            Align2::CENTER_CENTER,
            hint,
            FontId::proportional(14.0),
            UiColors::BORDER,
        );
    }
}
