use eframe::egui::{self, Align2, Event, FontId, Rect, Sense, Stroke};

use super::common::UiColors;
use super::touch_input::TouchCollector;
use crate::controller::trackpad::TouchPhase;
use crate::controller::{MessageSink, PressController};

// Touch screens without pressure sensing report no force
const DEFAULT_FORCE: f32 = 1.0;

pub struct PressView<S: MessageSink> {
    controller: PressController<S>,
    input: TouchCollector,
}

impl<S: MessageSink> PressView<S> {
    pub fn new(controller: PressController<S>) -> Self {
        Self {
            controller,
            input: TouchCollector::new(),
        }
    }

    pub fn controller(&self) -> &PressController<S> {
        &self.controller
    }

    /// Feeds one frame of input events hitting the button rectangle
    pub fn feed(&mut self, events: &[Event], button: Rect) {
        for batch in self.input.collect(events, button) {
            match batch.phase {
                TouchPhase::Start | TouchPhase::Move => {
                    for sample in &batch.samples {
                        self.controller
                            .pressure_change(sample.force.unwrap_or(DEFAULT_FORCE));
                    }
                }
                TouchPhase::End | TouchPhase::Cancel => self.controller.release(),
            }
        }
    }

    /// The button is hidden: a held press is released
    pub fn leave(&mut self) {
        if self.input.cancel_all().is_some() || self.controller.is_down() {
            self.controller.release();
        }
    }

    pub fn render(&mut self, ui: &mut egui::Ui) {
        let size = ui.available_size();
        let side = size.x.min(size.y) * 0.8;
        let (outer, _response) = ui.allocate_exact_size(size, Sense::click_and_drag());
        let rect = Rect::from_center_size(outer.center(), egui::vec2(side, side));

        let events = ui.input(|i| i.events.clone());
        self.feed(&events, rect);

        let painter = ui.painter_at(outer);
        let fill = if self.controller.is_down() {
            UiColors::ACTIVE
        } else if self.controller.link_status().is_online() {
            UiColors::INNER_BG
        } else {
            UiColors::OFFLINE_BG
        };
        painter.rect_filled(rect, side / 2.0, fill);
        painter.rect_stroke(
            rect,
            side / 2.0,
            Stroke::new(2.0, UiColors::BORDER),
            egui::StrokeKind::Inside,
        );
        painter.text(
            rect.center(),
            Align2::CENTER_CENTER,
            "PRESS",
            FontId::proportional(24.0),
            UiColors::BORDER,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::testing::RecordingSink;
    use crate::protocol::ControlMessage;
    use eframe::egui::{pos2, TouchDeviceId, TouchId, TouchPhase as EguiPhase};

    fn touch(id: u64, phase: EguiPhase, force: Option<f32>) -> Event {
        Event::Touch {
            device_id: TouchDeviceId(0),
            id: TouchId(id),
            phase,
            pos: pos2(50.0, 50.0),
            force,
        }
    }

    fn button() -> Rect {
        Rect::from_min_max(pos2(0.0, 0.0), pos2(100.0, 100.0))
    }

    #[test]
    fn leaving_releases_a_held_press() {
        let sink = RecordingSink::online();
        let mut view = PressView::new(PressController::new(0.25, sink.clone()));

        view.feed(&[touch(3, EguiPhase::Start, Some(0.9))], button());
        assert!(view.controller().is_down());

        view.leave();
        assert!(!view.controller().is_down());

        // The stranded identifier can press again
        view.feed(&[touch(3, EguiPhase::Start, None)], button());
        assert_eq!(
            sink.take(),
            vec![
                ControlMessage::ButtonDown,
                ControlMessage::ButtonUp,
                ControlMessage::ButtonDown,
            ]
        );
    }
}
