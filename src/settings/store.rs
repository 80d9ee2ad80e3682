use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::settings::types::PipelineSettings;

/// Environment variable naming the settings file used by the runner.
pub const SETTINGS_PATH_ENV: &str = "DEPTHVIEW_SETTINGS";

/// Settings persistence errors.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// JSON-file-backed pipeline settings.
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store at the path named by `DEPTHVIEW_SETTINGS`, if set.
    pub fn from_env() -> Option<Self> {
        std::env::var_os(SETTINGS_PATH_ENV).map(|p| Self::new(PathBuf::from(p)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings from a JSON file, returning default on missing file.
    pub fn load(path: &Path) -> Result<PipelineSettings, SettingsError> {
        if !path.exists() {
            return Ok(PipelineSettings::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load settings from this store's file.
    pub fn read(&self) -> Result<PipelineSettings, SettingsError> {
        Self::load(&self.path)
    }

    /// Load settings from this store's file, writing the defaults out first
    /// when the file does not exist yet so they can be edited.
    pub fn read_or_init(&self) -> Result<PipelineSettings, SettingsError> {
        if self.path.exists() {
            return self.read();
        }
        let settings = PipelineSettings::default();
        self.save(&settings)?;
        tracing::info!("wrote default settings to {}", self.path.display());
        Ok(settings)
    }

    /// Save settings to disk atomically (write .tmp then rename).
    pub fn save(&self, settings: &PipelineSettings) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: self.path.clone(),
            source,
        };
        let json = serde_json::to_string_pretty(settings).map_err(|source| SettingsError::Parse {
            path: self.path.clone(),
            source,
        })?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json).map_err(io_err)?;
        std::fs::rename(&tmp_path, &self.path).map_err(io_err)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depth::mapper::OverflowPolicy;
    use crate::settings::types::DepthRangePolicy;
    use tempfile::TempDir;

    fn temp_store() -> (SettingsStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path().join("depthview.json"));
        (store, dir)
    }

    #[test]
    fn load_returns_default_when_file_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nonexistent.json");
        let result = SettingsStore::load(&path).unwrap();
        assert_eq!(result, PipelineSettings::default());
    }

    #[test]
    fn load_parses_valid_json_file() {
        let (store, _dir) = temp_store();
        let json = r#"{"rangePolicy":"sensor_reliable","status":{"running":"Streaming"}}"#;
        std::fs::write(store.path(), json).unwrap();

        let settings = store.read().unwrap();
        assert_eq!(settings.range_policy, DepthRangePolicy::SensorReliable);
        assert_eq!(settings.status.running, "Streaming");
    }

    #[test]
    fn load_returns_error_for_invalid_json() {
        let (store, _dir) = temp_store();
        std::fs::write(store.path(), "not valid json!!!").unwrap();

        let result = store.read();
        assert!(matches!(result, Err(SettingsError::Parse { .. })));
    }

    #[test]
    fn save_round_trips_through_load() {
        let (store, _dir) = temp_store();
        let mut settings = PipelineSettings::default();
        settings.overflow = OverflowPolicy::Saturate;
        settings.dummy_sensor.drop_every = 7;
        store.save(&settings).unwrap();

        assert_eq!(store.read().unwrap(), settings);
    }

    #[test]
    fn read_or_init_writes_defaults_for_missing_file() {
        let (store, _dir) = temp_store();
        assert!(!store.path().exists());

        let settings = store.read_or_init().unwrap();
        assert_eq!(settings, PipelineSettings::default());
        assert!(store.path().exists());
        assert_eq!(store.read().unwrap(), settings);
    }

    #[test]
    fn read_or_init_keeps_existing_file() {
        let (store, _dir) = temp_store();
        std::fs::write(store.path(), r#"{"overflow":"saturate"}"#).unwrap();

        let settings = store.read_or_init().unwrap();
        assert_eq!(settings.overflow, OverflowPolicy::Saturate);
        let contents = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(contents, r#"{"overflow":"saturate"}"#);
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deep").join("depthview.json");
        let store = SettingsStore::new(path.clone());
        store.save(&PipelineSettings::default()).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn save_is_atomic() {
        let (store, dir) = temp_store();
        store.save(&PipelineSettings::default()).unwrap();

        let tmp_path = dir.path().join("depthview.json.tmp");
        assert!(
            !tmp_path.exists(),
            ".tmp file should be cleaned up after rename"
        );
    }
}
