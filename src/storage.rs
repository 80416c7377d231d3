use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

pub const STORAGE_DIR_NAME: &str = ".workday";

/// Flat key-value persistence: every key is a JSON document named
/// `<key>.json` inside one directory.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Opens `dir` when given, otherwise `~/.workday`.
    pub fn initialize(dir: Option<&Path>) -> Result<Self, StorageError> {
        match dir {
            Some(dir) => Self::at(dir.to_path_buf()),
            None => Self::at(default_storage_dir()?),
        }
    }

    pub fn at(root: PathBuf) -> Result<Self, StorageError> {
        if !root.exists() {
            fs::create_dir_all(&root)?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns `Ok(None)` when the key has never been written.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let data = serde_json::to_string_pretty(value)?;
        let target = self.path_for(key);
        let staging = self.root.join(format!("{key}.json.tmp"));
        fs::write(&staging, data)?;
        fs::rename(&staging, &target)?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

pub fn default_storage_dir() -> Result<PathBuf, StorageError> {
    let home = env::var("HOME").map_err(|_| StorageError::HomeDirMissing)?;
    Ok(PathBuf::from(home).join(STORAGE_DIR_NAME))
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("HOME environment variable is not set; cannot persist state under ~/.workday")]
    HomeDirMissing,
    #[error("I/O error while handling local storage: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to (de)serialize stored value: {0}")]
    Serialization(#[from] serde_json::Error),
}
