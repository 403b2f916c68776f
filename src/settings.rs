/// Persisted popup selections (deck, model, front/back field)

use crate::error::ExporterError;
use serde::{Deserialize, Serialize};

/// Last choices made in the popup; every field is absent until first save
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub deck: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub front_field: Option<String>,
    #[serde(default)]
    pub back_field: Option<String>,
}

/// String key-value backend
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, ExporterError>;
    fn set(&self, key: &str, value: &str) -> Result<(), ExporterError>;
}

/// `window.localStorage` of the extension popup
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

impl LocalStorage {
    fn storage() -> Result<web_sys::Storage, ExporterError> {
        let window = web_sys::window()
            .ok_or_else(|| ExporterError::Storage("no window".to_string()))?;
        window
            .local_storage()
            .map_err(ExporterError::storage)?
            .ok_or_else(|| ExporterError::Storage("localStorage unavailable".to_string()))
    }
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, ExporterError> {
        Self::storage()?.get_item(key).map_err(ExporterError::storage)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ExporterError> {
        Self::storage()?.set_item(key, value).map_err(ExporterError::storage)
    }
}

/// In-memory backend for tests
#[cfg(test)]
#[derive(Default)]
pub(crate) struct MemoryStore {
    items: std::cell::RefCell<std::collections::HashMap<String, String>>,
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, ExporterError> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ExporterError> {
        self.items.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Reads and writes one `Settings` record under a fixed key
#[derive(Debug, Clone)]
pub struct SettingsStore<S> {
    backend: S,
    key: String,
}

impl<S: KeyValueStore> SettingsStore<S> {
    pub fn new(backend: S, key: impl Into<String>) -> Self {
        SettingsStore {
            backend,
            key: key.into(),
        }
    }

    pub fn save(&self, settings: &Settings) -> Result<(), ExporterError> {
        let json = serde_json::to_string(settings)
            .map_err(|e| ExporterError::Storage(e.to_string()))?;
        self.backend.set(&self.key, &json)
    }

    /// Missing, unreadable and corrupt records all come back as `None`
    pub fn load(&self) -> Option<Settings> {
        let raw = match self.backend.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Could not read saved settings: {}", e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(settings) => Some(settings),
            Err(e) => {
                log::warn!("Ignoring corrupt saved settings: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_settings() -> Settings {
        Settings {
            deck: Some("D1".to_string()),
            model: Some("M1".to_string()),
            front_field: Some("Front".to_string()),
            back_field: Some("Back".to_string()),
        }
    }

    #[test]
    fn test_round_trip() {
        let store = SettingsStore::new(MemoryStore::default(), "ankiExporterSettings");

        store.save(&full_settings()).unwrap();

        assert_eq!(store.load(), Some(full_settings()));
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let store = SettingsStore::new(MemoryStore::default(), "k");
        store.save(&full_settings()).unwrap();

        let raw = store.backend.items.borrow().get("k").cloned().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(json["frontField"], "Front");
        assert_eq!(json["backField"], "Back");
        assert_eq!(json["deck"], "D1");
    }

    #[test]
    fn test_load_missing() {
        let store = SettingsStore::new(MemoryStore::default(), "k");
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_load_corrupt_returns_none() {
        let backend = MemoryStore::default();
        backend.set("k", "{not json").unwrap();
        let store = SettingsStore::new(backend, "k");

        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_load_partial_record() {
        let backend = MemoryStore::default();
        backend.set("k", r#"{"deck":"D1","frontField":null}"#).unwrap();
        let store = SettingsStore::new(backend, "k");

        let settings = store.load().unwrap();

        assert_eq!(settings.deck.as_deref(), Some("D1"));
        assert_eq!(settings.model, None);
        assert_eq!(settings.front_field, None);
    }
}
