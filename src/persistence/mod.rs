//! # Persistence Module
//!
//! Loads and stores the application configuration as a single TOML file.
//! A missing file is not an error: the defaults are written on first run so
//! the user has a complete file to edit. A file that exists but fails to
//! parse or validate stops startup with a `color_eyre` report naming the path.

pub mod config_store;

pub use config_store::ConfigStore;
