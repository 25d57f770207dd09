use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::sensing::{EventLayout, SyntheticConfig};

pub const DATA_DIR_ENV: &str = "BRUXLOG_DATA_DIR";
pub const DEBUG_ENV: &str = "BRUXLOG_DEBUG";

const SETTINGS_FILE: &str = "settings.json";
const DATABASE_FILE: &str = "bruxlog.sqlite3";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Overrides `<data dir>/bruxlog.sqlite3`.
    pub database_path: Option<PathBuf>,
    /// Samples returned per live read.
    pub window_size: usize,
    pub event_layout: EventLayout,
    pub synthetic: SyntheticConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: None,
            window_size: 200,
            event_layout: EventLayout::default(),
            synthetic: SyntheticConfig::default(),
        }
    }
}

/// `BRUXLOG_DATA_DIR`, else `$HOME/.bruxlog`, else `./.bruxlog`.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = env::var_os(DATA_DIR_ENV).filter(|value| !value.is_empty()) {
        return PathBuf::from(dir);
    }

    env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".bruxlog")
}

pub fn debug_enabled() -> bool {
    env::var(DEBUG_ENV)
        .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true"))
        .unwrap_or(false)
}

pub struct SettingsStore {
    path: PathBuf,
    data_dir: PathBuf,
    data: RwLock<Settings>,
}

impl SettingsStore {
    /// Loads `settings.json` from `data_dir`. A missing file yields defaults;
    /// a malformed one is logged and replaced by defaults.
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        let path = data_dir.join(SETTINGS_FILE);
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring malformed settings in {}: {err}", path.display());
                Settings::default()
            })
        } else {
            Settings::default()
        };

        Ok(Self {
            path,
            data_dir,
            data: RwLock::new(data),
        })
    }

    pub fn get(&self) -> Settings {
        self.read().clone()
    }

    pub fn database_path(&self) -> PathBuf {
        self.read()
            .database_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join(DATABASE_FILE))
    }

    /// Applies `change` and writes the result to disk.
    pub fn update<F>(&self, change: F) -> Result<Settings>
    where
        F: FnOnce(&mut Settings),
    {
        let mut guard = self.write();
        let mut next = guard.clone();
        change(&mut next);
        self.persist(&next)?;
        *guard = next.clone();
        Ok(next)
    }

    fn persist(&self, data: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, Settings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Settings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
