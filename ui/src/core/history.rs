//! Bounded, content-addressed snapshot log (most recent first).

use serde::Serialize;
use serde_json::Value;

use crate::core::catalog::{Conference, Division, DivisionKey};
use crate::core::config::{DEFAULT_TITLE, HISTORY_LIMIT, HISTORY_STORAGE_KEY};
use crate::core::dedup::dedup_key;
use crate::core::format;
use crate::core::storage::{KeyValueStore, StorageError, StoredSettings};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: String,
    pub created_at: String,
    pub conference: Conference,
    pub division: Division,
    pub station_label: String,
    pub station_logo_url: String,
    pub title: String,
    pub subtitle: String,
    pub auto: bool,
    pub state: StoredSettings,
    pub unique_key: String,
}

/// Display fields captured alongside the state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SnapshotMeta {
    pub station_label: String,
    pub station_logo_url: String,
    pub title: String,
    pub subtitle: String,
}

impl Snapshot {
    pub fn key(&self) -> DivisionKey {
        DivisionKey::new(self.conference, self.division)
    }

    /// Badge text, e.g. `AFC EAST`.
    pub fn badge(&self) -> String {
        self.key().label()
    }

    pub fn display_time(&self) -> String {
        format::short_timestamp(&self.created_at)
    }

    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let state = StoredSettings::from_value(obj.get("state")?);
        let text = |name: &str| {
            obj.get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_default()
        };
        let unique_key = obj
            .get("uniqueKey")
            .and_then(Value::as_str)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| dedup_key(&state));
        let id = obj
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("snap_{unique_key}"));

        Some(Self {
            id,
            created_at: text("createdAt"),
            conference: obj
                .get("conference")
                .and_then(Value::as_str)
                .and_then(Conference::parse)
                .unwrap_or(state.selected_conference),
            division: obj
                .get("division")
                .and_then(Value::as_str)
                .and_then(Division::parse)
                .unwrap_or(state.selected_division),
            station_label: text("stationLabel"),
            station_logo_url: text("stationLogoUrl"),
            title: text("title"),
            subtitle: text("subtitle"),
            auto: obj.get("auto").and_then(Value::as_bool).unwrap_or(false),
            state,
            unique_key,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Same state as the newest entry; nothing changed.
    Unchanged,
    Inserted,
    /// An older entry with the same state moved to the front.
    Refreshed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryLog {
    entries: Vec<Snapshot>,
    limit: usize,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::with_limit(HISTORY_LIMIT)
    }
}

impl HistoryLog {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            limit: limit.max(1),
        }
    }

    pub fn entries(&self) -> &[Snapshot] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Snapshot> {
        self.entries.iter().find(|snap| snap.id == id)
    }

    /// Reads the stored log. Anything unreadable yields an empty log;
    /// individual malformed entries are skipped.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let mut log = Self::default();
        let raw = match store.get(HISTORY_STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return log,
            Err(err) => {
                tracing::warn!("[history] failed to read history: {err}");
                return log;
            }
        };
        let items = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(items)) => items,
            Ok(_) => {
                tracing::warn!("[history] stored history is not a list, ignoring");
                return log;
            }
            Err(err) => {
                tracing::warn!("[history] stored history is corrupt, ignoring: {err}");
                return log;
            }
        };
        for item in &items {
            match Snapshot::from_value(item) {
                Some(snap) if !log.entries.iter().any(|s| s.unique_key == snap.unique_key) => {
                    log.entries.push(snap)
                }
                Some(_) => {}
                None => tracing::debug!("[history] skipping malformed entry"),
            }
        }
        log.entries.truncate(log.limit);
        log
    }

    /// Writes the whole log. Failures are logged and swallowed.
    pub fn save(&self, store: &dyn KeyValueStore) -> bool {
        let result = serde_json::to_string(&self.entries)
            .map_err(StorageError::from)
            .and_then(|json| store.set(HISTORY_STORAGE_KEY, &json));
        match result {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("[history] failed to save history: {err}");
                false
            }
        }
    }

    pub fn capture(
        &mut self,
        state: StoredSettings,
        meta: SnapshotMeta,
        auto: bool,
        created_at: String,
    ) -> CaptureOutcome {
        let unique_key = dedup_key(&state);
        if self
            .entries
            .first()
            .is_some_and(|head| head.unique_key == unique_key)
        {
            return CaptureOutcome::Unchanged;
        }

        let previous = self
            .entries
            .iter()
            .position(|snap| snap.unique_key == unique_key);
        if let Some(idx) = previous {
            self.entries.remove(idx);
        }

        let key = state.key();
        let title = if meta.title.trim().is_empty() {
            DEFAULT_TITLE.to_string()
        } else {
            meta.title
        };
        let subtitle = if meta.subtitle.trim().is_empty() {
            format!("In the {}", key.label())
        } else {
            meta.subtitle
        };
        self.entries.insert(
            0,
            Snapshot {
                id: format!("snap_{unique_key}"),
                created_at,
                conference: key.conference,
                division: key.division,
                station_label: meta.station_label,
                station_logo_url: meta.station_logo_url,
                title,
                subtitle,
                auto,
                state,
                unique_key,
            },
        );
        if self.entries.len() > self.limit {
            let evicted = self.entries.len() - self.limit;
            tracing::debug!("[history] evicting {evicted} oldest snapshot(s)");
            self.entries.truncate(self.limit);
        }

        if previous.is_some() {
            CaptureOutcome::Refreshed
        } else {
            CaptureOutcome::Inserted
        }
    }

    /// Re-stamps the entry, moves it to the front and returns its state.
    pub fn restore(&mut self, id: &str, now: String) -> Option<StoredSettings> {
        let idx = self.entries.iter().position(|snap| snap.id == id)?;
        let mut snap = self.entries.remove(idx);
        snap.created_at = now;
        let state = snap.state.clone();
        self.entries.insert(0, snap);
        Some(state)
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|snap| snap.id != id);
        self.entries.len() != before
    }
}
