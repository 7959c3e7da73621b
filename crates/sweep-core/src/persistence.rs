use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use super::error::PreferenceError;
use super::state::ActiveFilters;
use super::state::Preferences;

pub const CUSTOM_LABELS_KEY: &str = "customLabels";
pub const DASHBOARD_TITLE_KEY: &str = "dashboardTitle";
pub const ACTIVE_FILTERS_KEY: &str = "activeFilters";
pub const SHOW_COMPLETED_KEY: &str = "showCompleted";
pub const SHOW_HIDDEN_KEY: &str = "showHidden";

/// Per-client string key/value store. Values are opaque strings (JSON for
/// structured entries); the whole map is rewritten atomically on flush.
#[derive(Debug)]
pub struct PreferenceStore {
    path: Option<PathBuf>,
    entries: BTreeMap<String, String>,
}

impl PreferenceStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PreferenceError> {
        let path = path.as_ref().to_path_buf();
        let io_err = |source: std::io::Error| PreferenceError::Io {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let entries = if path.exists() {
            let bytes = std::fs::read(&path).map_err(io_err)?;
            if bytes.iter().all(u8::is_ascii_whitespace) {
                BTreeMap::new()
            } else {
                serde_json::from_slice(&bytes).map_err(|source| PreferenceError::Parse {
                    path: path.clone(),
                    source,
                })?
            }
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path: Some(path),
            entries,
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.entries.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    pub fn flush(&self) -> Result<(), PreferenceError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        let io_err = |source: std::io::Error| PreferenceError::Io {
            path: path.to_path_buf(),
            source,
        };
        let encoded = serde_json::to_vec_pretty(&self.entries)
            .map_err(|err| io_err(std::io::Error::other(format!("serialize: {err}"))))?;
        let tmp = path.with_extension("json.tmp");
        write_private(&tmp, &encoded).map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(io_err)
    }
}

fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.create(true).write(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

impl Preferences {
    /// Reads every key; absent or unreadable entries fall back to defaults.
    pub fn load(store: &PreferenceStore) -> Self {
        let custom_labels = store
            .get(CUSTOM_LABELS_KEY)
            .and_then(|raw| serde_json::from_str::<BTreeMap<String, String>>(raw).ok())
            .unwrap_or_default();
        let active_filters = store
            .get(ACTIVE_FILTERS_KEY)
            .and_then(|raw| serde_json::from_str::<Vec<String>>(raw).ok())
            .map(ActiveFilters::from_keys)
            .unwrap_or_default();
        let dashboard_title = store
            .get(DASHBOARD_TITLE_KEY)
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .map(str::to_string);
        Self {
            custom_labels,
            dashboard_title,
            active_filters,
            show_completed: store.get(SHOW_COMPLETED_KEY) == Some("true"),
            show_hidden: store.get(SHOW_HIDDEN_KEY) == Some("true"),
        }
    }

    pub fn save(&self, store: &mut PreferenceStore) -> Result<(), PreferenceError> {
        if self.custom_labels.is_empty() {
            store.remove(CUSTOM_LABELS_KEY);
        } else {
            store.set(CUSTOM_LABELS_KEY, encode(&self.custom_labels));
        }
        match &self.dashboard_title {
            Some(title) => store.set(DASHBOARD_TITLE_KEY, title.as_str()),
            None => store.remove(DASHBOARD_TITLE_KEY),
        }
        store.set(ACTIVE_FILTERS_KEY, encode(&self.active_filters.to_keys()));
        store.set(SHOW_COMPLETED_KEY, self.show_completed.to_string());
        store.set(SHOW_HIDDEN_KEY, self.show_hidden.to_string());
        store.flush()
    }
}

fn encode<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}
