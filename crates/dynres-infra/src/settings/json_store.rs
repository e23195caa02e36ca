// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Controller settings stored as a JSON document.

use std::fs;
use std::path::{Path, PathBuf};

use dynres_core::{ConfigError, ControllerConfig};

/// Default name of the settings file.
pub const DEFAULT_SETTINGS_FILE: &str = "dynres-settings.json";

/// Loads and saves a [`ControllerConfig`] as pretty-printed JSON.
#[derive(Debug, Clone)]
pub struct JsonConfigStore {
    path: PathBuf,
}

impl JsonConfigStore {
    /// Creates a store for the file at `path`. Nothing is read yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the settings file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and sanitizes the settings.
    pub fn load(&self) -> Result<ControllerConfig, ConfigError> {
        let json = fs::read_to_string(&self.path).map_err(|source| self.io_error(source))?;
        Ok(ControllerConfig::from_json(&json)?.sanitized())
    }

    /// Reads the settings, falling back to the defaults if the file is missing or invalid.
    ///
    /// On fallback the defaults are written back so the next start finds a valid file.
    /// A failure to write them is logged and otherwise ignored.
    pub fn load_or_default(&self) -> ControllerConfig {
        match self.load() {
            Ok(config) => {
                log::info!("JsonConfigStore: loaded '{}'.", self.path.display());
                config
            }
            Err(err) => {
                log::warn!("JsonConfigStore: {}, using default settings.", err);
                let config = ControllerConfig::default();
                if let Err(err) = self.save(&config) {
                    log::warn!("JsonConfigStore: could not write defaults: {}", err);
                }
                config
            }
        }
    }

    /// Writes the settings, creating parent directories as needed.
    pub fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        let json = config.to_json()?;
        fs::write(&self.path, json).map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: std::io::Error) -> ConfigError {
        ConfigError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempdir().unwrap();
        let store = JsonConfigStore::new(dir.path().join("nested").join(DEFAULT_SETTINGS_FILE));

        let config = store.load_or_default();
        assert_eq!(config, ControllerConfig::default());
        assert!(store.path().exists());
        assert_eq!(store.load().unwrap(), ControllerConfig::default());
    }

    #[test]
    fn test_save_then_load_keeps_changes() {
        let dir = tempdir().unwrap();
        let store = JsonConfigStore::new(dir.path().join(DEFAULT_SETTINGS_FILE));
        let mut config = ControllerConfig {
            res_change_delay_ms: 1500,
            vram_only_mode: true,
            ..Default::default()
        };
        config.set_disabled_applications_from_text("steam.app.1 steam.app.2");

        store.save(&config).unwrap();
        assert_eq!(store.load().unwrap(), config);
    }

    #[test]
    fn test_partial_file_takes_defaults_and_is_sanitized() {
        let dir = tempdir().unwrap();
        let store = JsonConfigStore::new(dir.path().join(DEFAULT_SETTINGS_FILE));
        fs::write(store.path(), r#"{ "max_res": 900, "res_change_delay_ms": 10 }"#).unwrap();

        let config = store.load().unwrap();
        assert_eq!(config.max_res, 500);
        assert_eq!(config.res_change_delay_ms, 100);
        assert_eq!(config.min_res, 70);
    }

    #[test]
    fn test_invalid_file_is_replaced_by_defaults() {
        let dir = tempdir().unwrap();
        let store = JsonConfigStore::new(dir.path().join(DEFAULT_SETTINGS_FILE));
        fs::write(store.path(), "not json").unwrap();

        assert!(matches!(store.load(), Err(ConfigError::Parse(_))));
        assert_eq!(store.load_or_default(), ControllerConfig::default());
        assert!(store.load().is_ok());
    }

    #[test]
    fn test_unreadable_path_is_an_io_error() {
        let dir = tempdir().unwrap();
        let store = JsonConfigStore::new(dir.path());
        assert!(matches!(store.load(), Err(ConfigError::Io { .. })));
    }
}
