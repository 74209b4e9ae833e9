//! Settings persistence
//!
//! The engine delegates storage to whatever the embedding provides: the
//! extension runtime's sync area in production, a JSON file for standalone
//! embeddings, plain memory in tests. The store contract is a flat
//! key-value record plus an optional stream of externally-made changes
//! (another tab or the popup writing the same area); the [`Settings`] hub
//! converts those into the exact change events local mutation produces.
//!
//! [`Settings`]: super::Settings

use crate::settings::PlaybackSettings;
use crate::utils::{FeedbarError, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::debug;
use std::path::PathBuf;

/// Storage backend for the settings record
pub trait SettingsStore {
    /// Load the whole record
    fn load(&mut self) -> Result<PlaybackSettings>;

    /// Persist the whole record
    fn save(&mut self, settings: &PlaybackSettings) -> Result<()>;

    /// Changes made to the same storage area by someone else, if the
    /// backend can observe them
    fn external_changes(&self) -> Option<&Receiver<PlaybackSettings>> {
        None
    }
}

/// Volatile in-memory store
pub struct MemoryStore {
    data: Option<PlaybackSettings>,
    external: Option<Receiver<PlaybackSettings>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: None,
            external: None,
        }
    }

    /// A store plus a sender that simulates another writer of the area
    pub fn with_external_changes() -> (Self, Sender<PlaybackSettings>) {
        let (tx, rx) = unbounded();
        let store = Self {
            data: None,
            external: Some(rx),
        };
        (store, tx)
    }

    /// The last saved record, if any
    pub fn saved(&self) -> Option<&PlaybackSettings> {
        self.data.as_ref()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for MemoryStore {
    fn load(&mut self) -> Result<PlaybackSettings> {
        self.data
            .clone()
            .ok_or_else(|| FeedbarError::Storage("no stored settings".to_string()))
    }

    fn save(&mut self, settings: &PlaybackSettings) -> Result<()> {
        self.data = Some(settings.clone());
        Ok(())
    }

    fn external_changes(&self) -> Option<&Receiver<PlaybackSettings>> {
        self.external.as_ref()
    }
}

/// JSON-file store under the user's config directory
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store at an explicit path
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store at the default per-user location
    pub fn at_default_path() -> Result<Self> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| FeedbarError::Config("cannot determine user config path".to_string()))?;
        path.push("feedbar");
        path.push("settings.json");
        Ok(Self { path })
    }

    /// The file this store reads and writes
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&mut self) -> Result<PlaybackSettings> {
        let contents = std::fs::read_to_string(&self.path)?;
        let settings = serde_json::from_str(&contents)?;
        debug!("Loaded settings from {:?}", self.path);
        Ok(settings)
    }

    fn save(&mut self, settings: &PlaybackSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ControlMode;

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemoryStore::new();
        assert!(store.load().is_err());

        let mut settings = PlaybackSettings::default();
        settings.last_playback_volume = 0.8;
        store.save(&settings).unwrap();

        assert_eq!(store.load().unwrap().last_playback_volume, 0.8);
    }

    #[test]
    fn test_json_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("nested").join("settings.json"));

        assert!(store.load().is_err());

        let mut settings = PlaybackSettings::default();
        settings.video_control_mode = ControlMode::Native;
        settings.last_playback_speed = 1.5;
        store.save(&settings).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.video_control_mode, ControlMode::Native);
        assert_eq!(loaded.last_playback_speed, 1.5);
    }

    #[test]
    fn test_json_file_store_keys_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("settings.json"));
        store.save(&PlaybackSettings::default()).unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"videoControlMode\""));
        assert!(raw.contains("\"lastPlaybackVolume\""));
        assert!(!raw.contains("lastPlaybackMuted"));
    }
}
