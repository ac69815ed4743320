use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::gesture::GestureSettings;
use crate::transport::TransportSettings;
use crate::ui::common::Page;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete application configuration, one TOML table per section
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub transport: TransportConfig,
    pub gesture: GestureConfig,
    pub ui: UiConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// `host[:port]` of the control server
    pub host: String,
    pub trackpad_path: String,
    pub press_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1:8080".to_string(),
            trackpad_path: "/socket".to_string(),
            press_path: "/socket".to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct TransportConfig {
    pub retry_delay_ms: u64,
    pub keepalive_interval_ms: u64,
    pub channel_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: 1000,
            keepalive_interval_ms: 50,
            channel_capacity: 256,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct GestureConfig {
    pub move_scale: f32,
    pub scroll_scale: f32,
    pub force_threshold: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        let defaults = GestureSettings::default();
        Self {
            move_scale: defaults.move_scale,
            scroll_scale: defaults.scroll_scale,
            force_threshold: defaults.force_threshold,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct UiConfig {
    pub fullscreen: bool,
    pub start_page: Page,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::Invalid("server.host is empty".to_string()));
        }

        let transport = &self.transport;
        if transport.retry_delay_ms == 0 {
            return Err(ConfigError::Invalid(
                "transport.retry_delay_ms must be positive".to_string(),
            ));
        }
        if transport.keepalive_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "transport.keepalive_interval_ms must be positive".to_string(),
            ));
        }
        if transport.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "transport.channel_capacity must be positive".to_string(),
            ));
        }

        let gesture = &self.gesture;
        // NaN fails every comparison, so test for the valid range
        if !(gesture.move_scale > 0.0 && gesture.move_scale.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "gesture.move_scale must be positive, got {}",
                gesture.move_scale
            )));
        }
        if !(gesture.scroll_scale > 0.0 && gesture.scroll_scale.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "gesture.scroll_scale must be positive, got {}",
                gesture.scroll_scale
            )));
        }
        if !(gesture.force_threshold > 0.0 && gesture.force_threshold <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "gesture.force_threshold must be in (0, 1], got {}",
                gesture.force_threshold
            )));
        }

        debug!("Configuration validated");
        Ok(())
    }

    pub fn transport_settings(&self) -> TransportSettings {
        TransportSettings {
            retry_delay: Duration::from_millis(self.transport.retry_delay_ms),
            keepalive_interval: Duration::from_millis(self.transport.keepalive_interval_ms),
            channel_capacity: self.transport.channel_capacity,
        }
    }

    pub fn gesture_settings(&self) -> GestureSettings {
        GestureSettings {
            move_scale: self.gesture.move_scale,
            scroll_scale: self.gesture.scroll_scale,
            force_threshold: self.gesture.force_threshold,
        }
    }
}
