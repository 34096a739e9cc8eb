//! User-level operations over catalog, view state, history and storage.
//!
//! The dashboard view owns one `MemeSession` inside a signal and routes every
//! interaction through [`MemeSession::apply`]. Each applied edit saves the
//! settings record and hands back a debounce ticket for the automatic
//! snapshot; the view sleeps for the debounce window and then calls
//! [`MemeSession::auto_capture_due`] with that ticket.

use crate::core::catalog::{Catalog, Conference, Division, DivisionKey};
use crate::core::format;
use crate::core::history::{CaptureOutcome, HistoryLog, SnapshotMeta};
use crate::core::projection::{self, BoardView};
use crate::core::state::{StationChoice, ViewState};
use crate::core::storage::{self, KeyValueStore, StoredSettings};
use crate::core::timing::{AutoCapture, CaptureTicket};

#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    SelectConference(Conference),
    SelectDivision(Division),
    Title(String),
    Subtitle(String),
    TeamValue { team: String, value: String },
    CustomLogoInput(String),
    Reorder { from: usize, to: usize },
    Sort { ascending: bool },
    Station(StationChoice),
}

pub struct MemeSession {
    catalog: Catalog,
    state: ViewState,
    history: HistoryLog,
    store: Box<dyn KeyValueStore>,
    auto_capture: AutoCapture,
}

impl MemeSession {
    /// Restores saved settings and history, or starts from catalog defaults.
    pub fn boot(catalog: Catalog, store: Box<dyn KeyValueStore>) -> Self {
        let mut state = ViewState::default();
        match storage::load_settings(store.as_ref()) {
            Some(saved) => saved.apply_to(&mut state, &catalog),
            None => state.load_division(&catalog),
        }
        let history = HistoryLog::load(store.as_ref());
        tracing::info!(
            "[session] booted on {} with {} snapshot(s)",
            state.key(),
            history.len()
        );
        Self {
            catalog,
            state,
            history,
            store,
            auto_capture: AutoCapture::default(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn key(&self) -> DivisionKey {
        self.state.key()
    }

    pub fn view(&self) -> BoardView {
        projection::project(&self.state, &self.catalog)
    }

    pub fn settings(&self) -> StoredSettings {
        StoredSettings::capture(&self.state)
    }

    /// Applies one edit. Returns the auto-snapshot ticket when something
    /// changed, `None` for no-ops.
    pub fn apply(&mut self, edit: Edit) -> Option<CaptureTicket> {
        let catalog = &self.catalog;
        let state = &mut self.state;
        let changed = match edit {
            Edit::SelectConference(conference) => state.select_conference(conference, catalog),
            Edit::SelectDivision(division) => state.select_division(division, catalog),
            Edit::Title(text) => {
                state.set_title(text, catalog);
                true
            }
            Edit::Subtitle(text) => {
                state.set_subtitle(text, catalog);
                true
            }
            Edit::TeamValue { team, value } => {
                state.set_team_value(&team, value, catalog);
                true
            }
            Edit::CustomLogoInput(text) => {
                state.set_custom_logo_input(text, catalog);
                true
            }
            Edit::Reorder { from, to } => state.reorder_teams(from, to, catalog),
            Edit::Sort { ascending } => {
                state.sort_teams(ascending, catalog);
                true
            }
            Edit::Station(choice) => state.select_station(choice, catalog),
        };
        if !changed {
            return None;
        }
        self.persist();
        Some(self.auto_capture.schedule())
    }

    /// Hover preview of a station. Touches neither storage nor history.
    pub fn preview_station(&mut self, url: Option<String>) -> bool {
        self.state.preview_station(url.as_deref(), &self.catalog)
    }

    /// Flushes the working copy and saves the settings record.
    pub fn persist(&mut self) -> bool {
        self.state.flush(&self.catalog);
        storage::save_settings(self.store.as_ref(), &self.settings())
    }

    fn snapshot_meta(&self) -> SnapshotMeta {
        let station_label = self
            .state
            .selected_station(&self.catalog)
            .map(|station| station.label.clone())
            .unwrap_or_else(|| "Custom".to_string());
        SnapshotMeta {
            station_label,
            station_logo_url: self.state.effective_logo_url().to_string(),
            title: self.state.working.title.clone(),
            subtitle: self.state.working.subtitle.clone(),
        }
    }

    pub fn take_snapshot(&mut self, auto: bool) -> CaptureOutcome {
        self.state.flush(&self.catalog);
        let meta = self.snapshot_meta();
        let outcome = self
            .history
            .capture(self.settings(), meta, auto, format::now_rfc3339());
        if outcome != CaptureOutcome::Unchanged {
            self.history.save(self.store.as_ref());
        }
        tracing::debug!("[history] capture (auto={auto}) -> {outcome:?}");
        outcome
    }

    /// Runs the debounced capture if `ticket` is still the newest one.
    pub fn auto_capture_due(&mut self, ticket: CaptureTicket) -> Option<CaptureOutcome> {
        if !self.auto_capture.is_current(ticket) {
            return None;
        }
        Some(self.take_snapshot(true))
    }

    /// Applies a stored snapshot without scheduling a new capture.
    pub fn restore_snapshot(&mut self, id: &str) -> bool {
        let Some(settings) = self.history.restore(id, format::now_rfc3339()) else {
            tracing::warn!("[history] snapshot {id} not found");
            return false;
        };
        self.auto_capture.cancel();
        settings.apply_to(&mut self.state, &self.catalog);
        self.history.save(self.store.as_ref());
        self.persist();
        true
    }

    pub fn delete_snapshot(&mut self, id: &str) -> bool {
        let removed = self.history.delete(id);
        if removed {
            self.history.save(self.store.as_ref());
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{Station, StationTint, Team};
    use crate::core::config::SETTINGS_STORAGE_KEY;
    use crate::core::storage::MemoryStore;

    fn catalog() -> Catalog {
        let team = |name: &str| Team {
            name: name.into(),
            color: "#000000".into(),
            logo_url: String::new(),
        };
        Catalog::default().with_division(
            DivisionKey::new(Conference::Afc, Division::East),
            vec![team("Bills"), team("Jets")],
            vec![
                Station {
                    label: "CBS 4".into(),
                    url: "/logos/cbs4.svg".into(),
                    colors: ["#000000".into(), "#333333".into()],
                    tint: StationTint::Unset,
                },
                Station {
                    label: "WGRZ 2".into(),
                    url: "/logos/wgrz.svg".into(),
                    colors: ["#7a0019".into(), "#2b0008".into()],
                    tint: StationTint::Unset,
                },
            ],
        )
    }

    #[test]
    fn edits_persist_and_survive_reboot() {
        let store = MemoryStore::new();
        let mut session = MemeSession::boot(catalog(), Box::new(store.clone()));
        assert!(session.apply(Edit::SelectConference(Conference::Afc)).is_some());
        session.apply(Edit::TeamValue {
            team: "Jets".into(),
            value: "0-6".into(),
        });
        assert!(store.raw(SETTINGS_STORAGE_KEY).is_some());

        let rebooted = MemeSession::boot(catalog(), Box::new(store));
        assert_eq!(rebooted.key(), DivisionKey::new(Conference::Afc, Division::East));
        assert_eq!(rebooted.state().working.team_values["Jets"], "0-6");
    }

    #[test]
    fn only_latest_ticket_captures() {
        let mut session = MemeSession::boot(catalog(), Box::new(MemoryStore::new()));
        let first = session.apply(Edit::Title("one".into())).unwrap();
        let second = session.apply(Edit::Title("two".into())).unwrap();
        assert_eq!(session.auto_capture_due(first), None);
        assert_eq!(session.auto_capture_due(second), Some(CaptureOutcome::Inserted));
        assert!(session.history().entries()[0].auto);
    }

    #[test]
    fn no_op_edits_do_not_schedule() {
        let mut session = MemeSession::boot(catalog(), Box::new(MemoryStore::new()));
        assert!(session.apply(Edit::SelectConference(Conference::Nfc)).is_none());
        assert!(session.apply(Edit::Reorder { from: 0, to: 0 }).is_none());
    }

    #[test]
    fn restore_brings_back_state_without_duplicating() {
        let mut session = MemeSession::boot(catalog(), Box::new(MemoryStore::new()));
        session.apply(Edit::SelectConference(Conference::Afc));
        session.apply(Edit::Title("before".into()));
        session.take_snapshot(false);
        let id = session.history().entries()[0].id.clone();

        session.apply(Edit::Title("after".into()));
        session.take_snapshot(false);
        assert_eq!(session.history().len(), 2);

        assert!(session.restore_snapshot(&id));
        assert_eq!(session.state().working.title, "before");
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history().entries()[0].id, id);
        assert_eq!(session.take_snapshot(false), CaptureOutcome::Unchanged);
    }

    #[test]
    fn station_preview_leaves_storage_and_history_alone() {
        let store = MemoryStore::new();
        let mut session = MemeSession::boot(catalog(), Box::new(store.clone()));
        session.apply(Edit::SelectConference(Conference::Afc));
        let saved = store.raw(SETTINGS_STORAGE_KEY);

        assert!(session.preview_station(Some("/logos/wgrz.svg".into())));
        assert_eq!(session.view().logo_url, "/logos/wgrz.svg");
        assert_eq!(store.raw(SETTINGS_STORAGE_KEY), saved);
        assert!(session.history().is_empty());

        assert!(session.preview_station(None));
        assert_eq!(session.view().logo_url, "/logos/cbs4.svg");
        assert_eq!(store.raw(SETTINGS_STORAGE_KEY), saved);
    }
}
