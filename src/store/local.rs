use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

/// Base URL used until an admin points the kiosk somewhere else.
pub const DEFAULT_STORE_BASE_URL: &str = "https://store.lumabooth.app/api";

/// Machine-local preferences, persisted across restarts separately from the
/// remote `KioskSettings`. Currently just the store base URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalPrefs {
    store_base_url: String,
}

impl Default for LocalPrefs {
    fn default() -> Self {
        Self {
            store_base_url: DEFAULT_STORE_BASE_URL.into(),
        }
    }
}

pub struct PrefsStore {
    path: PathBuf,
    data: RwLock<LocalPrefs>,
}

impl PrefsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read prefs from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            LocalPrefs::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn store_base_url(&self) -> String {
        self.data.read().unwrap().store_base_url.clone()
    }

    pub fn set_store_base_url(&self, url: String) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        guard.store_base_url = url.trim_end_matches('/').to_string();
        self.persist(&guard)
    }

    fn persist(&self, data: &LocalPrefs) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write prefs to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = PrefsStore::new(dir.path().join("prefs.json")).unwrap();
        assert_eq!(prefs.store_base_url(), DEFAULT_STORE_BASE_URL);
    }

    #[test]
    fn base_url_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let prefs = PrefsStore::new(path.clone()).unwrap();
        prefs
            .set_store_base_url("https://store.example.com/api/".into())
            .unwrap();

        let reopened = PrefsStore::new(path).unwrap();
        assert_eq!(reopened.store_base_url(), "https://store.example.com/api");
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "{not json").unwrap();

        let prefs = PrefsStore::new(path).unwrap();
        assert_eq!(prefs.store_base_url(), DEFAULT_STORE_BASE_URL);
    }
}
