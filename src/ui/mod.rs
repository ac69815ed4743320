//! # OpenTouchpad User Interface
//!
//! Hosts both touch surfaces in a single eframe window:
//!
//! - **Top panel**: page selection (Trackpad / Press)
//! - **Central panel**: the active touch surface
//! - **Bottom panel**: link status of both sockets with the time of the
//!   last change
//!
//! Gesture handling runs inside `update`: every frame the active surface
//! drains egui's touch events, feeds its controller and repaints. The inactive
//! surface receives no input; switching pages cancels the touches still held
//! on the page being left and releases its button.

pub mod common;
pub mod press_view;
pub mod touch_input;
pub mod trackpad_view;

use eframe::egui::{self, RichText};
use std::time::Duration;
use tracing::info;

use crate::controller::{PressController, TrackpadController};
use crate::transport::{LinkStatus, TransportHandle};

use self::common::{create_frame, status_color, Page, UiColors};
use self::press_view::PressView;
use self::trackpad_view::TrackpadView;

pub struct TouchpadUI {
    page: Page,
    trackpad: TrackpadView<TransportHandle>,
    press: PressView<TransportHandle>,
}

impl TouchpadUI {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        start_page: Page,
        trackpad: TrackpadController<TransportHandle>,
        press: PressController<TransportHandle>,
    ) -> Self {
        cc.egui_ctx.set_theme(egui::Theme::Dark);
        info!("Starting UI on the {} page", start_page);
        Self {
            page: start_page,
            trackpad: TrackpadView::new(trackpad),
            press: PressView::new(press),
        }
    }

    fn status_label(ui: &mut egui::Ui, name: &str, status: &LinkStatus) {
        ui.label(RichText::new("●").color(status_color(status)));
        ui.label(format!("{}: {}", name, status));
    }

    // The hidden surface gets no further input, so its touches end here
    fn leave(&mut self, page: Page) {
        match page {
            Page::Trackpad => self.trackpad.leave(),
            Page::Press => self.press.leave(),
        }
    }
}

impl eframe::App for TouchpadUI {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default()
            .frame(create_frame(UiColors::MAIN_BG, UiColors::MAIN_BG))
            .show(ctx, |ui| {
                ui.ctx().request_repaint_after(Duration::from_millis(33));

                egui::TopBottomPanel::top("top_panel")
                    .show_separator_line(false)
                    .show_inside(ui, |ui| {
                        let previous = self.page;
                        ui.horizontal_centered(|ui| {
                            for page in [Page::Trackpad, Page::Press] {
                                if ui
                                    .selectable_value(&mut self.page, page, page.to_string())
                                    .changed()
                                {
                                    info!("Switched to the {} page", page);
                                }
                            }
                        });
                        if self.page != previous {
                            self.leave(previous);
                        }
                    });

                egui::TopBottomPanel::bottom("bottom_panel")
                    .show_separator_line(false)
                    .show_inside(ui, |ui| {
                        ui.horizontal_centered(|ui| {
                            let trackpad = self.trackpad.controller();
                            Self::status_label(ui, "Trackpad", &trackpad.link_status());
                            let (sent, dropped) = trackpad.counters();
                            ui.label(format!("sent {} / dropped {}", sent, dropped));
                            ui.separator();
                            Self::status_label(ui, "Press", &self.press.controller().link_status());
                        });
                    });

                egui::CentralPanel::default().show_inside(ui, |ui| match self.page {
                    Page::Trackpad => self.trackpad.render(ui),
                    Page::Press => self.press.render(ui),
                });
            });
    }
}
