use tracing::warn;

use crate::storage::{LocalStorage, StorageError};

pub const VOLUME_KEY: &str = "lofi_player_volume_v1";
pub const MUTED_KEY: &str = "lofi_player_muted_v1";
pub const DEFAULT_VOLUME: f32 = 0.5;

/// Volume and mute state of the focus-music player. Each value lives under
/// its own key so one bad entry does not reset the other.
pub struct PlayerPreferences {
    storage: LocalStorage,
    volume: f32,
    muted: bool,
}

impl PlayerPreferences {
    pub fn load(storage: LocalStorage) -> Self {
        let volume = match storage.read::<f32>(VOLUME_KEY) {
            Ok(Some(volume)) => sanitize_volume(volume),
            Ok(None) => DEFAULT_VOLUME,
            Err(err) => {
                warn!(error = %err, "stored volume is unreadable; using default");
                DEFAULT_VOLUME
            }
        };
        let muted = match storage.read::<bool>(MUTED_KEY) {
            Ok(value) => value.unwrap_or(false),
            Err(err) => {
                warn!(error = %err, "stored mute flag is unreadable; using default");
                false
            }
        };
        Self {
            storage,
            volume,
            muted,
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    pub fn effective_volume(&self) -> f32 {
        if self.muted { 0.0 } else { self.volume }
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<(), StorageError> {
        let volume = sanitize_volume(volume);
        self.storage.write(VOLUME_KEY, &volume)?;
        self.volume = volume;
        Ok(())
    }

    pub fn set_muted(&mut self, muted: bool) -> Result<(), StorageError> {
        self.storage.write(MUTED_KEY, &muted)?;
        self.muted = muted;
        Ok(())
    }
}

fn sanitize_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        DEFAULT_VOLUME
    } else {
        volume.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn storage(dir: &TempDir) -> LocalStorage {
        LocalStorage::at(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn defaults_when_nothing_saved() {
        let dir = TempDir::new().unwrap();
        let prefs = PlayerPreferences::load(storage(&dir));
        assert_eq!(prefs.volume(), DEFAULT_VOLUME);
        assert!(!prefs.muted());
    }

    #[test]
    fn values_survive_reload() {
        let dir = TempDir::new().unwrap();
        let mut prefs = PlayerPreferences::load(storage(&dir));
        prefs.set_volume(0.8).unwrap();
        prefs.set_muted(true).unwrap();

        let reloaded = PlayerPreferences::load(storage(&dir));
        assert_eq!(reloaded.volume(), 0.8);
        assert!(reloaded.muted());
        assert_eq!(reloaded.effective_volume(), 0.0);
    }

    #[test]
    fn volume_is_clamped() {
        let dir = TempDir::new().unwrap();
        let mut prefs = PlayerPreferences::load(storage(&dir));
        prefs.set_volume(3.0).unwrap();
        assert_eq!(prefs.volume(), 1.0);
        prefs.set_volume(-1.0).unwrap();
        assert_eq!(prefs.volume(), 0.0);
    }

    #[test]
    fn garbage_values_fall_back_independently() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("lofi_player_volume_v1.json"), "\"loud\"").unwrap();
        fs::write(dir.path().join("lofi_player_muted_v1.json"), "true").unwrap();
        let prefs = PlayerPreferences::load(storage(&dir));
        assert_eq!(prefs.volume(), DEFAULT_VOLUME);
        assert!(prefs.muted());
    }
}
