use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::AppConfig;

const APP_DIR: &str = "opentouchpad";
const CONFIG_FILE: &str = "config.toml";
const CONFIG_ENV: &str = "OPENTOUCHPAD_CONFIG";

/// Location of the TOML configuration file
#[derive(Clone, Debug)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$OPENTOUCHPAD_CONFIG`, else `<config_dir>/opentouchpad/config.toml`
    pub fn default_location() -> Self {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            debug!("Using config path from {}", CONFIG_ENV);
            return Self::new(path);
        }
        let mut path = get_config_dir();
        path.push(APP_DIR);
        path.push(CONFIG_FILE);
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the file, writing the defaults first if it does not exist yet
    pub async fn load_or_init(&self) -> Result<AppConfig> {
        if !tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| eyre!("Failed to check if config file exists: {}", e))?
        {
            info!("No config at {}, writing defaults", self.path.display());
            let config = AppConfig::default();
            self.save(&config).await?;
            return Ok(config);
        }

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| eyre!("Failed to read config file {}: {}", self.path.display(), e))?;
        let config: AppConfig = toml::from_str(&content)
            .map_err(|e| eyre!("Failed to parse config file {}: {}", self.path.display(), e))?;
        config.validate()?;

        info!("Loaded config from {}", self.path.display());
        Ok(config)
    }

    pub async fn save(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty()
                && !tokio::fs::try_exists(parent)
                    .await
                    .map_err(|e| eyre!("Failed to check if config directory exists: {}", e))?
            {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
            }
        }

        let content = toml::to_string_pretty(config)
            .map_err(|e| eyre!("Failed to serialize config: {}", e))?;
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| eyre!("Failed to write config file: {}", e))?;

        debug!("Config written to {}", self.path.display());
        Ok(())
    }
}

fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .unwrap_or_else(|| {
            warn!("Could not determine config directory, using current directory");
            PathBuf::from(".")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::common::Page;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "opentouchpad-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[tokio::test]
    async fn first_run_writes_defaults() {
        let dir = scratch_dir("first-run");
        let store = ConfigStore::new(dir.join("nested").join(CONFIG_FILE));

        let config = store.load_or_init().await.unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(store.path().exists());

        let reloaded = store.load_or_init().await.unwrap();
        assert_eq!(reloaded, config);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn saved_changes_are_loaded_back() {
        let dir = scratch_dir("round-trip");
        let store = ConfigStore::new(dir.join(CONFIG_FILE));

        let mut config = AppConfig::default();
        config.server.host = "10.0.0.2:8080".to_string();
        config.ui.start_page = Page::Press;
        store.save(&config).await.unwrap();

        assert_eq!(store.load_or_init().await.unwrap(), config);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn invalid_file_is_an_error() {
        let dir = scratch_dir("invalid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(CONFIG_FILE);

        std::fs::write(&path, "[gesture]\nforce_threshold = 3.0\n").unwrap();
        assert!(ConfigStore::new(&path).load_or_init().await.is_err());

        std::fs::write(&path, "not toml at all [").unwrap();
        assert!(ConfigStore::new(&path).load_or_init().await.is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
