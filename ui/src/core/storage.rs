//! Local persistence: a small key/value port with browser, file and memory
//! backends, plus the tolerant codec for the saved view state.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::catalog::{Catalog, Conference, Division, DivisionKey};
use crate::core::color::{self, ColorPair};
use crate::core::config::SETTINGS_STORAGE_KEY;
use crate::core::state::{DivisionOverride, ViewState};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage write failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not encode value: {0}")]
    Encode(#[from] serde_json::Error),
}

/// String values under string keys. Every `set` replaces the whole value.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Rc<RefCell<HashMap<String, String>>>,
    fail_writes: Rc<Cell<bool>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `set` fail, as a full quota would.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes.get() {
            return Err(StorageError::Unavailable("quota exceeded".into()));
        }
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::BrowserStore;

#[cfg(target_arch = "wasm32")]
mod browser {
    use super::{KeyValueStore, StorageError};

    /// `window.localStorage`.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct BrowserStore;

    impl BrowserStore {
        fn storage() -> Result<web_sys::Storage, StorageError> {
            web_sys::window()
                .ok_or_else(|| StorageError::Unavailable("window missing".into()))?
                .local_storage()
                .map_err(|_| StorageError::Unavailable("localStorage blocked".into()))?
                .ok_or_else(|| StorageError::Unavailable("localStorage missing".into()))
        }
    }

    impl KeyValueStore for BrowserStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            Self::storage()?
                .get_item(key)
                .map_err(|_| StorageError::Unavailable(format!("read of {key} rejected")))
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            Self::storage()?
                .set_item(key, value)
                .map_err(|_| StorageError::Unavailable(format!("write of {key} rejected")))
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            Self::storage()?
                .remove_item(key)
                .map_err(|_| StorageError::Unavailable(format!("remove of {key} rejected")))
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStore;

#[cfg(not(target_arch = "wasm32"))]
mod file {
    use std::fs;
    use std::io::Write;
    use std::path::{Path, PathBuf};

    use super::{KeyValueStore, StorageError};

    /// One JSON file per key. Writes go to a sibling temp file that is then
    /// renamed over the old value.
    #[derive(Debug, Clone)]
    pub struct FileStore {
        root: PathBuf,
    }

    impl FileStore {
        pub fn new(root: impl Into<PathBuf>) -> Self {
            Self { root: root.into() }
        }

        /// `<data dir>/storage`, next to the `exports` folder.
        pub fn open_default() -> Result<Self, StorageError> {
            let dirs = directories::ProjectDirs::from("app", "Rprtd", "MemeWar").ok_or_else(
                || StorageError::Unavailable("unable to determine data directory".into()),
            )?;
            Ok(Self::new(dirs.data_dir().join("storage")))
        }

        pub fn root(&self) -> &Path {
            &self.root
        }

        fn path_for(&self, key: &str) -> PathBuf {
            let name: String = key
                .chars()
                .map(|ch| if ch.is_ascii_alphanumeric() || ch == '.' { ch } else { '_' })
                .collect();
            self.root.join(format!("{name}.json"))
        }
    }

    impl KeyValueStore for FileStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            match fs::read_to_string(self.path_for(key)) {
                Ok(text) => Ok(Some(text)),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(err) => Err(err.into()),
            }
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            fs::create_dir_all(&self.root)?;
            let target = self.path_for(key);
            let staging = target.with_extension("json.tmp");
            let mut file = fs::File::create(&staging)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
            drop(file);
            fs::rename(&staging, &target)?;
            Ok(())
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            match fs::remove_file(self.path_for(key)) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(err.into()),
            }
        }
    }
}

/// Store for the running platform: `localStorage` on the web, files under
/// the user data directory on desktop (memory if that cannot be resolved).
pub fn default_store() -> Box<dyn KeyValueStore> {
    #[cfg(target_arch = "wasm32")]
    {
        Box::new(BrowserStore)
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        match FileStore::open_default() {
            Ok(store) => Box::new(store),
            Err(err) => {
                tracing::warn!("[storage] {err}; falling back to memory");
                Box::new(MemoryStore::new())
            }
        }
    }
}

/// Persisted form of [`ViewState`]; also embedded in every snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSettings {
    pub selected_conference: Conference,
    pub selected_division: Division,
    pub division_states: BTreeMap<DivisionKey, DivisionOverride>,
    pub selected_logo_url: String,
    pub selected_header_colors: ColorPair,
    pub custom_logo_input: String,
}

impl Default for StoredSettings {
    fn default() -> Self {
        Self::capture(&ViewState::default())
    }
}

impl StoredSettings {
    /// Persisted fields of `state`. Callers flush the working copy first.
    pub fn capture(state: &ViewState) -> Self {
        Self {
            selected_conference: state.conference,
            selected_division: state.division,
            division_states: state.overrides.clone(),
            selected_logo_url: state.selected_logo_url.clone(),
            selected_header_colors: state.header_colors.clone(),
            custom_logo_input: state.custom_logo_input.clone(),
        }
    }

    /// Replaces `state` with these settings and rebuilds the working copy.
    pub fn apply_to(&self, state: &mut ViewState, catalog: &Catalog) {
        state.conference = self.selected_conference;
        state.division = self.selected_division;
        state.overrides = self.division_states.clone();
        state.selected_logo_url = self.selected_logo_url.clone();
        state.header_colors = self.selected_header_colors.clone();
        state.custom_logo_input = self.custom_logo_input.clone();
        state.load_division(catalog);
    }

    pub fn key(&self) -> DivisionKey {
        DivisionKey::new(self.selected_conference, self.selected_division)
    }

    pub fn to_json(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Field-by-field decode: anything missing or of the wrong shape takes
    /// that field's default.
    pub fn from_value(value: &Value) -> Self {
        let defaults = Self::default();
        let Some(obj) = value.as_object() else {
            return defaults;
        };
        Self {
            selected_conference: obj
                .get("selectedConference")
                .and_then(Value::as_str)
                .and_then(Conference::parse)
                .unwrap_or(defaults.selected_conference),
            selected_division: obj
                .get("selectedDivision")
                .and_then(Value::as_str)
                .and_then(Division::parse)
                .unwrap_or(defaults.selected_division),
            division_states: obj
                .get("divisionStates")
                .and_then(Value::as_object)
                .map(decode_division_states)
                .unwrap_or_default(),
            selected_logo_url: string_field(obj, "selectedLogoUrl")
                .unwrap_or(defaults.selected_logo_url),
            selected_header_colors: obj
                .get("selectedHeaderColors")
                .and_then(decode_color_pair)
                .unwrap_or(defaults.selected_header_colors),
            custom_logo_input: string_field(obj, "customLogoInput")
                .unwrap_or(defaults.custom_logo_input),
        }
    }
}

fn string_field(obj: &Map<String, Value>, name: &str) -> Option<String> {
    obj.get(name).and_then(Value::as_str).map(str::to_string)
}

fn decode_color_pair(value: &Value) -> Option<ColorPair> {
    match value {
        Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            (parts.len() >= 2).then(|| [parts[0].to_string(), parts[1].to_string()])
        }
        Value::String(csv) if !csv.trim().is_empty() => Some(color::parse_color_csv(csv)),
        _ => None,
    }
}

fn decode_division_states(map: &Map<String, Value>) -> BTreeMap<DivisionKey, DivisionOverride> {
    let mut states = BTreeMap::new();
    for (raw_key, entry) in map {
        let Ok(key) = raw_key.parse::<DivisionKey>() else {
            tracing::warn!("[storage] dropping override for unknown division `{raw_key}`");
            continue;
        };
        let Some(obj) = entry.as_object() else {
            continue;
        };
        states.insert(key, decode_override(obj));
    }
    states
}

fn decode_override(obj: &Map<String, Value>) -> DivisionOverride {
    let team_order = obj
        .get("order")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let team_values = obj
        .get("values")
        .and_then(Value::as_object)
        .map(|values| {
            values
                .iter()
                .filter_map(|(team, value)| {
                    let text = match value {
                        Value::String(text) => text.clone(),
                        Value::Number(number) => number.to_string(),
                        _ => return None,
                    };
                    Some((team.clone(), text))
                })
                .collect()
        })
        .unwrap_or_default();

    DivisionOverride {
        title: string_field(obj, "title").unwrap_or_default(),
        subtitle: string_field(obj, "subtitle").unwrap_or_default(),
        team_order,
        team_values,
        logo_url: string_field(obj, "logoUrl").unwrap_or_default(),
        colors: obj
            .get("colors")
            .and_then(decode_color_pair)
            .unwrap_or_else(color::default_header_colors),
    }
}

/// Saved settings, or `None` when nothing usable is stored.
pub fn load_settings(store: &dyn KeyValueStore) -> Option<StoredSettings> {
    let raw = match store.get(SETTINGS_STORAGE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            tracing::warn!("[storage] failed to read settings: {err}");
            return None;
        }
    };
    match serde_json::from_str::<Value>(&raw) {
        Ok(value) if value.is_object() => Some(StoredSettings::from_value(&value)),
        Ok(_) => {
            tracing::warn!("[storage] saved settings are not an object, ignoring");
            None
        }
        Err(err) => {
            tracing::warn!("[storage] saved settings are corrupt, ignoring: {err}");
            None
        }
    }
}

/// Writes the full settings record. Failures are logged and swallowed.
pub fn save_settings(store: &dyn KeyValueStore, settings: &StoredSettings) -> bool {
    let result = settings
        .to_json()
        .and_then(|json| store.set(SETTINGS_STORAGE_KEY, &json));
    match result {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!("[storage] failed to save settings: {err}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_settings() -> StoredSettings {
        let mut states = BTreeMap::new();
        states.insert(
            DivisionKey::new(Conference::Afc, Division::East),
            DivisionOverride {
                title: "Who runs the East".into(),
                subtitle: "Week 6".into(),
                team_order: vec!["Bills".into(), "Jets".into()],
                team_values: BTreeMap::from([("Bills".into(), "5-1".into())]),
                logo_url: "/logos/wivb.svg".into(),
                colors: ["#002244".into(), "#c60c30".into()],
            },
        );
        StoredSettings {
            selected_conference: Conference::Afc,
            selected_division: Division::East,
            division_states: states,
            selected_logo_url: "/logos/wivb.svg".into(),
            selected_header_colors: ["#002244".into(), "#c60c30".into()],
            custom_logo_input: String::new(),
        }
    }

    #[test]
    fn settings_round_trip_through_json() {
        let settings = sample_settings();
        let json = settings.to_json().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(StoredSettings::from_value(&value), settings);
        assert!(json.contains("\"divisionStates\":{\"afc_east\""));
        assert!(json.contains("\"logoUrl\""));
    }

    #[test]
    fn partial_records_default_field_by_field() {
        let value = json!({
            "selectedConference": "AFC",
            "selectedDivision": 42,
            "divisionStates": {
                "afc_west": { "title": "Chaos", "order": ["Chiefs", 7], "values": { "Chiefs": 9 }, "colors": "oops" },
                "mystery": { "title": "skip me" },
                "nfc_north": "not an object"
            },
            "selectedHeaderColors": ["#111111"],
            "customLogoInput": null
        });
        let settings = StoredSettings::from_value(&value);
        assert_eq!(settings.selected_conference, Conference::Afc);
        assert_eq!(settings.selected_division, Division::East);
        assert_eq!(settings.selected_header_colors, color::default_header_colors());
        assert_eq!(settings.custom_logo_input, "");
        assert_eq!(settings.division_states.len(), 1);

        let west = &settings.division_states[&DivisionKey::new(Conference::Afc, Division::West)];
        assert_eq!(west.title, "Chaos");
        assert_eq!(west.team_order, vec!["Chiefs".to_string()]);
        assert_eq!(west.team_values["Chiefs"], "9");
        assert_eq!(west.colors, ["oops".to_string(), "#3b82f6".to_string()]);
    }

    #[test]
    fn corrupt_or_missing_settings_load_as_none() {
        let store = MemoryStore::new();
        assert!(load_settings(&store).is_none());
        store.set(SETTINGS_STORAGE_KEY, "{broken").unwrap();
        assert!(load_settings(&store).is_none());
        store.set(SETTINGS_STORAGE_KEY, "[1,2]").unwrap();
        assert!(load_settings(&store).is_none());
    }

    #[test]
    fn failed_write_keeps_previous_value() {
        let store = MemoryStore::new();
        let settings = sample_settings();
        assert!(save_settings(&store, &settings));
        store.set_fail_writes(true);
        assert!(!save_settings(&store, &StoredSettings::default()));
        assert_eq!(load_settings(&store), Some(settings));
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn file_store_replaces_values_atomically() {
        let root = std::env::temp_dir().join(format!(
            "memewar-storage-{}-{:?}",
            std::process::id(),
            std::thread::current().id()
        ));
        let _ = std::fs::remove_dir_all(&root);
        let store = FileStore::new(&root);

        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "first").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("first"));

        // A directory squatting on the staging path makes the write fail.
        std::fs::create_dir_all(root.join("k.json.tmp")).unwrap();
        assert!(store.set("k", "second").is_err());
        assert_eq!(store.get("k").unwrap().as_deref(), Some("first"));

        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        let _ = std::fs::remove_dir_all(&root);
    }
}
