/// User settings, persisted as JSON in the platform config directory
///
/// Missing fields fall back to their defaults so older settings files keep
/// loading after new options are added.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CatalogError, Result};
use crate::state::data::SortKey;
use crate::state::library;

/// Rows revealed per fetch-more call
pub const DEFAULT_FETCH_BATCH_SIZE: usize = 5;

/// Edge length (pixels) thumbnails are scaled down to
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 48;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub fetch_batch_size: usize,
    pub thumbnail_size: u32,
    /// Overrides the default catalog database location
    pub database_path: Option<PathBuf>,
    pub sort_by: SortKey,
    pub ascending: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fetch_batch_size: DEFAULT_FETCH_BATCH_SIZE,
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
            database_path: None,
            sort_by: SortKey::Unsorted,
            ascending: true,
        }
    }
}

impl Settings {
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load settings from `path`
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&json)?)
    }

    /// Load settings from the default location, falling back to defaults
    pub fn load_or_default() -> Self {
        let path = match settings_path() {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("{}, using default settings", e);
                return Self::default();
            }
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Ignoring settings at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Batch size with a floor of one row
    pub fn batch_size(&self) -> usize {
        self.fetch_batch_size.max(1)
    }

    /// Catalog database location: the override if set, otherwise the data directory
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => library::default_db_path(),
        }
    }
}

/// ~/.config/zim-catalog/settings.json on Linux
pub fn settings_path() -> Result<PathBuf> {
    let mut path = dirs::config_dir()
        .or_else(dirs::home_dir)
        .ok_or(CatalogError::NoDataDir)?;
    path.push("zim-catalog");
    path.push("settings.json");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.fetch_batch_size, 5);
        assert_eq!(settings.sort_by, SortKey::Unsorted);
        assert!(settings.ascending);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = Settings::from_json(r#"{"thumbnail_size": 64, "sort_by": "size"}"#).unwrap();

        assert_eq!(settings.thumbnail_size, 64);
        assert_eq!(settings.sort_by, SortKey::Size);
        assert_eq!(settings.fetch_batch_size, DEFAULT_FETCH_BATCH_SIZE);
    }

    #[test]
    fn test_zero_batch_size_is_clamped() {
        let settings = Settings { fetch_batch_size: 0, ..Settings::default() };
        assert_eq!(settings.batch_size(), 1);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir()
            .join(format!("zim-catalog-settings-{}", std::process::id()))
            .join("settings.json");
        let settings = Settings {
            database_path: Some(PathBuf::from("/tmp/books.db")),
            ascending: false,
            ..Settings::default()
        };

        settings.save(&path).unwrap();
        let loaded = Settings::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, settings);
        assert_eq!(loaded.database_path().unwrap(), PathBuf::from("/tmp/books.db"));
    }
}
