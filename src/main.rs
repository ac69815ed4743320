pub mod config;
pub mod controller;
pub mod gesture;
pub mod persistence;
pub mod protocol;
pub mod transport;
pub mod ui;

use crate::config::AppConfig;
use crate::controller::{PressController, TrackpadController};
use crate::persistence::ConfigStore;
use crate::transport::{endpoint_url, TransportHandle};
use crate::ui::TouchpadUI;
use color_eyre::{eyre::eyre, Result};
use eframe::egui;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let store = ConfigStore::default_location();
    let config = store.load_or_init().await?;
    info!("Using config file {}", store.path().display());

    let shutdown = CancellationToken::new();
    let (trackpad_link, press_link) = spawn_transports(&config, &shutdown)?;

    let trackpad = TrackpadController::new(config.gesture_settings(), trackpad_link);
    let press = PressController::new(config.gesture.force_threshold, press_link);

    info!("Starting UI");
    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport = egui::ViewportBuilder::default()
        .with_inner_size([800.0, 480.0])
        .with_fullscreen(config.ui.fullscreen);

    let start_page = config.ui.start_page;
    let result = eframe::run_native(
        "OpenTouchpad",
        native_options,
        Box::new(move |cc| Ok(Box::new(TouchpadUI::new(cc, start_page, trackpad, press)))),
    );

    // Closes both sockets with a normal closure
    shutdown.cancel();
    tokio::time::sleep(Duration::from_millis(100)).await;

    result.map_err(|e| eyre!("UI terminated with error: {}", e))?;
    info!("Shut down cleanly");
    Ok(())
}

fn spawn_transports(
    config: &AppConfig,
    shutdown: &CancellationToken,
) -> Result<(TransportHandle, TransportHandle)> {
    let settings = config.transport_settings();

    let trackpad_url = endpoint_url(&config.server.host, &config.server.trackpad_path)?;
    let trackpad = TransportHandle::spawn("trackpad", trackpad_url, settings, shutdown.clone())
        .map_err(|e| eyre!("Failed to spawn trackpad transport: {}", e))?;

    let press_url = endpoint_url(&config.server.host, &config.server.press_path)?;
    let press = TransportHandle::spawn("press", press_url, settings, shutdown.clone())
        .map_err(|e| eyre!("Failed to spawn press transport: {}", e))?;

    Ok((trackpad, press))
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
