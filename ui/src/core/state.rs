//! The session's single authoritative view state and its transitions.
//!
//! `ViewState` keeps a *working copy* of the active division (title,
//! subtitle, team order and values, chosen logo and colors). Every edit is
//! flushed into that division's [`DivisionOverride`]; switching divisions
//! flushes first and then reloads the working copy from the target
//! division's override, or from catalog defaults when none exists yet.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::catalog::{Catalog, Conference, Division, DivisionKey, Station};
use crate::core::color::{default_header_colors, ColorPair};
use crate::core::config::EMPTY_SVG_DATA_URL;

/// Per-division customization, persisted as `divisionStates[afc_east]`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DivisionOverride {
    pub title: String,
    pub subtitle: String,
    #[serde(rename = "order")]
    pub team_order: Vec<String>,
    #[serde(rename = "values")]
    pub team_values: BTreeMap<String, String>,
    #[serde(rename = "logoUrl")]
    pub logo_url: String,
    pub colors: ColorPair,
}

/// Which logo picker entry is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogoMode {
    #[default]
    Station,
    /// Free-text URL typed by the user.
    Custom,
}

/// Target of a logo picker click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationChoice {
    Station(String),
    Custom,
}

/// Editable fields of the active division.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkingCopy {
    pub title: String,
    pub subtitle: String,
    pub team_order: Vec<String>,
    pub team_values: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub conference: Conference,
    pub division: Division,
    pub overrides: BTreeMap<DivisionKey, DivisionOverride>,
    pub selected_logo_url: String,
    pub header_colors: ColorPair,
    pub custom_logo_input: String,
    pub working: WorkingCopy,
    pub logo_mode: LogoMode,
    /// Station under the pointer in the picker. Shown on the board but
    /// never flushed or saved.
    pub preview_station: Option<String>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            conference: Conference::Nfc,
            division: Division::East,
            overrides: BTreeMap::new(),
            selected_logo_url: EMPTY_SVG_DATA_URL.to_string(),
            header_colors: default_header_colors(),
            custom_logo_input: String::new(),
            working: WorkingCopy::default(),
            logo_mode: LogoMode::Station,
            preview_station: None,
        }
    }
}

/// Station used when a division has no override or a stale one: the first
/// catalog station, or an empty logo with the default colors.
fn fallback_station(catalog: &Catalog, key: DivisionKey) -> (String, ColorPair) {
    catalog
        .default_station(key)
        .map(|station| (station.url.clone(), station.colors.clone()))
        .unwrap_or_else(|| (EMPTY_SVG_DATA_URL.to_string(), default_header_colors()))
}

pub fn default_subtitle(key: DivisionKey) -> String {
    format!("In the {}", key.label())
}

/// Drops names that are not in `catalog_names` (or repeated) and appends
/// missing names in catalog order.
pub fn reconcile_order(saved: &[String], catalog_names: &[String]) -> Vec<String> {
    let mut order: Vec<String> = Vec::with_capacity(catalog_names.len());
    for name in saved {
        if catalog_names.contains(name) && !order.contains(name) {
            order.push(name.clone());
        }
    }
    for name in catalog_names {
        if !order.contains(name) {
            order.push(name.clone());
        }
    }
    order
}

/// `parseFloat`-style leading number: optional sign, digits, fraction, exponent.
pub fn parse_leading_number(raw: &str) -> Option<f64> {
    let text = raw.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if frac_end > frac_start || digits > 0 {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    text[..end].parse::<f64>().ok()
}

/// Numeric when both sides parse as numbers, otherwise a case-folded
/// lexicographic comparison.
fn compare_values(a: &str, b: &str) -> Ordering {
    match (parse_leading_number(a), parse_leading_number(b)) {
        (Some(na), Some(nb)) => na.partial_cmp(&nb).unwrap_or(Ordering::Equal),
        _ => a
            .to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b)),
    }
}

impl ViewState {
    pub fn key(&self) -> DivisionKey {
        DivisionKey::new(self.conference, self.division)
    }

    /// Station entry matching the selected logo, if the picker is on a station.
    pub fn selected_station<'a>(&self, catalog: &'a Catalog) -> Option<&'a Station> {
        match self.logo_mode {
            LogoMode::Custom => None,
            LogoMode::Station => catalog.station_by_url(self.key(), &self.selected_logo_url),
        }
    }

    /// The hovered station, when it belongs to the active division.
    pub fn previewed_station<'a>(&self, catalog: &'a Catalog) -> Option<&'a Station> {
        let url = self.preview_station.as_deref()?;
        catalog.station_by_url(self.key(), url)
    }

    /// Starts or ends a hover preview. Unknown URLs end it. Returns whether
    /// the preview changed.
    pub fn preview_station(&mut self, url: Option<&str>, catalog: &Catalog) -> bool {
        let next = url
            .and_then(|url| catalog.station_by_url(self.key(), url))
            .map(|station| station.url.clone());
        if next == self.preview_station {
            return false;
        }
        self.preview_station = next;
        true
    }

    /// Logo actually displayed: in custom mode the typed URL wins when present.
    pub fn effective_logo_url(&self) -> &str {
        let typed = self.custom_logo_input.trim();
        if self.logo_mode == LogoMode::Custom && !typed.is_empty() {
            typed
        } else {
            &self.selected_logo_url
        }
    }

    /// Writes the working copy into the active division's override.
    /// Divisions without teams keep no override.
    pub fn flush(&mut self, catalog: &Catalog) {
        let key = self.key();
        if catalog.teams(key).map_or(true, <[_]>::is_empty) {
            return;
        }
        self.overrides.insert(
            key,
            DivisionOverride {
                title: self.working.title.clone(),
                subtitle: self.working.subtitle.clone(),
                team_order: self.working.team_order.clone(),
                team_values: self.working.team_values.clone(),
                logo_url: self.selected_logo_url.clone(),
                colors: self.header_colors.clone(),
            },
        );
    }

    /// Rebuilds the working copy for the active division.
    pub fn load_division(&mut self, catalog: &Catalog) {
        let key = self.key();
        self.preview_station = None;
        let names = catalog.team_names(key);
        let (default_url, default_colors) = fallback_station(catalog, key);

        self.working = WorkingCopy {
            title: String::new(),
            subtitle: default_subtitle(key),
            team_order: names.clone(),
            team_values: BTreeMap::new(),
        };
        self.selected_logo_url = default_url.clone();
        self.header_colors = default_colors.clone();

        if let Some(saved) = self.overrides.get(&key).cloned() {
            self.working.title = saved.title;
            if !saved.subtitle.is_empty() {
                self.working.subtitle = saved.subtitle;
            }
            if !saved.team_order.is_empty() {
                self.working.team_order = reconcile_order(&saved.team_order, &names);
            }
            self.working.team_values = saved.team_values;
            if !saved.logo_url.is_empty() {
                self.selected_logo_url = saved.logo_url;
            }
            self.header_colors = saved.colors;

            let is_station = catalog.station_by_url(key, &self.selected_logo_url).is_some();
            let typed = self.custom_logo_input.trim();
            let is_custom = !typed.is_empty() && typed == self.selected_logo_url;
            if !is_station && !is_custom {
                tracing::debug!(
                    "[state] stale logo for {key}, resetting to {}",
                    default_url
                );
                self.selected_logo_url = default_url;
                self.header_colors = default_colors;
                if let Some(entry) = self.overrides.get_mut(&key) {
                    entry.logo_url = self.selected_logo_url.clone();
                    entry.colors = self.header_colors.clone();
                }
            }
        }

        self.logo_mode = if catalog
            .station_by_url(key, &self.selected_logo_url)
            .is_some()
        {
            LogoMode::Station
        } else {
            LogoMode::Custom
        };
    }

    pub fn select_conference(&mut self, conference: Conference, catalog: &Catalog) -> bool {
        if conference == self.conference {
            return false;
        }
        self.flush(catalog);
        self.conference = conference;
        self.load_division(catalog);
        true
    }

    pub fn select_division(&mut self, division: Division, catalog: &Catalog) -> bool {
        if division == self.division {
            return false;
        }
        self.flush(catalog);
        self.division = division;
        self.load_division(catalog);
        true
    }

    pub fn set_title(&mut self, title: impl Into<String>, catalog: &Catalog) {
        self.working.title = title.into();
        self.flush(catalog);
    }

    pub fn set_subtitle(&mut self, subtitle: impl Into<String>, catalog: &Catalog) {
        self.working.subtitle = subtitle.into();
        self.flush(catalog);
    }

    pub fn set_team_value(&mut self, team: &str, value: impl Into<String>, catalog: &Catalog) {
        self.working
            .team_values
            .insert(team.to_string(), value.into());
        self.flush(catalog);
    }

    /// Stores the typed URL; in custom mode a non-empty value also becomes
    /// the selected logo.
    pub fn set_custom_logo_input(&mut self, text: impl Into<String>, catalog: &Catalog) {
        self.custom_logo_input = text.into();
        if self.logo_mode == LogoMode::Custom {
            let typed = self.custom_logo_input.trim();
            if !typed.is_empty() {
                self.selected_logo_url = typed.to_string();
            }
            self.flush(catalog);
        }
    }

    /// Moves one team; every other team keeps its relative position.
    pub fn reorder_teams(&mut self, from: usize, to: usize, catalog: &Catalog) -> bool {
        let order = &mut self.working.team_order;
        if from == to || from >= order.len() || to >= order.len() {
            return false;
        }
        let item = order.remove(from);
        order.insert(to, item);
        self.flush(catalog);
        true
    }

    /// Stable sort of the team order by each team's value.
    pub fn sort_teams(&mut self, ascending: bool, catalog: &Catalog) {
        let values = &self.working.team_values;
        let value_of = |name: &String| values.get(name).cloned().unwrap_or_default();
        let order = &mut self.working.team_order;

        // Insertion sort: stable, and never trips over the mixed numeric /
        // lexicographic comparator not being a strict total order.
        for i in 1..order.len() {
            let mut j = i;
            while j > 0 {
                let ord = compare_values(&value_of(&order[j - 1]), &value_of(&order[j]));
                let out_of_place = if ascending {
                    ord == Ordering::Greater
                } else {
                    ord == Ordering::Less
                };
                if !out_of_place {
                    break;
                }
                order.swap(j - 1, j);
                j -= 1;
            }
        }
        self.flush(catalog);
    }

    /// Picker click. Unknown station URLs are ignored.
    pub fn select_station(&mut self, choice: StationChoice, catalog: &Catalog) -> bool {
        self.preview_station = None;
        match choice {
            StationChoice::Station(url) => {
                let Some(station) = catalog.station_by_url(self.key(), &url) else {
                    tracing::warn!("[state] station {url} is not listed for {}", self.key());
                    return false;
                };
                self.logo_mode = LogoMode::Station;
                self.selected_logo_url = station.url.clone();
                self.header_colors = station.colors.clone();
            }
            StationChoice::Custom => {
                // The selected URL only changes once input text arrives.
                self.logo_mode = LogoMode::Custom;
                self.header_colors = default_header_colors();
            }
        }
        self.flush(catalog);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{StationTint, Team};

    fn team(name: &str) -> Team {
        Team {
            name: name.into(),
            color: "#123456".into(),
            logo_url: format!("/logos/{name}.svg"),
        }
    }

    fn station(label: &str, url: &str, colors: [&str; 2]) -> Station {
        Station {
            label: label.into(),
            url: url.into(),
            colors: [colors[0].into(), colors[1].into()],
            tint: StationTint::Unset,
        }
    }

    fn catalog() -> Catalog {
        Catalog::default()
            .with_division(
                DivisionKey::new(Conference::Nfc, Division::East),
                vec![team("Eagles"), team("Cowboys"), team("Giants"), team("Commanders")],
                vec![
                    station("CBS 3", "cbs3.svg", ["#000000", "#333333"]),
                    station("NBC 10", "nbc10.svg", ["#111111", "#444444"]),
                ],
            )
            .with_division(
                DivisionKey::new(Conference::Afc, Division::East),
                vec![team("Bills"), team("Dolphins"), team("Jets"), team("Patriots")],
                vec![station("WIVB 4", "wivb.svg", ["#002244", "#c60c30"])],
            )
    }

    fn booted() -> (ViewState, Catalog) {
        let catalog = catalog();
        let mut state = ViewState::default();
        state.load_division(&catalog);
        (state, catalog)
    }

    #[test]
    fn defaults_come_from_catalog() {
        let (state, _) = booted();
        assert_eq!(state.working.team_order[0], "Eagles");
        assert_eq!(state.selected_logo_url, "cbs3.svg");
        assert_eq!(state.working.subtitle, "In the NFC EAST");
        assert_eq!(state.logo_mode, LogoMode::Station);
    }

    #[test]
    fn switching_divisions_round_trips_working_copy() {
        let (mut state, catalog) = booted();
        state.set_title("Rivalry", &catalog);
        state.set_team_value("Eagles", "14", &catalog);
        assert!(state.select_station(StationChoice::Station("nbc10.svg".into()), &catalog));

        assert!(state.select_conference(Conference::Afc, &catalog));
        assert_eq!(state.working.title, "");
        assert_eq!(state.selected_logo_url, "wivb.svg");

        assert!(state.select_conference(Conference::Nfc, &catalog));
        assert_eq!(state.working.title, "Rivalry");
        assert_eq!(state.working.team_values["Eagles"], "14");
        assert_eq!(state.selected_logo_url, "nbc10.svg");
        assert_eq!(state.header_colors, ["#111111".to_string(), "#444444".to_string()]);
    }

    #[test]
    fn selecting_current_conference_is_a_no_op() {
        let (mut state, catalog) = booted();
        let before = state.clone();
        assert!(!state.select_conference(Conference::Nfc, &catalog));
        assert!(!state.select_division(Division::East, &catalog));
        assert_eq!(state, before);
    }

    #[test]
    fn numeric_values_sort_numerically() {
        let (mut state, catalog) = booted();
        for (team, value) in [("Eagles", "10"), ("Cowboys", "2"), ("Giants", "7"), ("Commanders", "")] {
            state.set_team_value(team, value, &catalog);
        }
        state.working.team_order = vec!["Eagles".into(), "Cowboys".into(), "Giants".into()];
        state.sort_teams(true, &catalog);
        assert_eq!(state.working.team_order, vec!["Cowboys", "Giants", "Eagles"]);
        state.sort_teams(false, &catalog);
        assert_eq!(state.working.team_order, vec!["Eagles", "Giants", "Cowboys"]);
    }

    #[test]
    fn text_values_sort_lexicographically_and_stably() {
        let (mut state, catalog) = booted();
        state.working.team_order = vec![
            "Eagles".into(),
            "Cowboys".into(),
            "Giants".into(),
            "Commanders".into(),
        ];
        for (team, value) in [("Eagles", "b"), ("Cowboys", "a"), ("Giants", "c"), ("Commanders", "a")] {
            state.set_team_value(team, value, &catalog);
        }
        state.sort_teams(true, &catalog);
        assert_eq!(
            state.working.team_order,
            vec!["Cowboys", "Commanders", "Eagles", "Giants"]
        );
    }

    #[test]
    fn reorder_moves_a_single_team() {
        let (mut state, catalog) = booted();
        assert!(state.reorder_teams(3, 0, &catalog));
        assert_eq!(
            state.working.team_order,
            vec!["Commanders", "Eagles", "Cowboys", "Giants"]
        );
        assert!(!state.reorder_teams(0, 9, &catalog));
        assert!(!state.reorder_teams(1, 1, &catalog));
    }

    #[test]
    fn stale_logo_resets_to_first_station() {
        let (mut state, catalog) = booted();
        let key = state.key();
        state.overrides.insert(
            key,
            DivisionOverride {
                logo_url: "gone.svg".into(),
                colors: ["#ffffff".into(), "#ffffff".into()],
                team_order: vec!["Ghosts".into(), "Giants".into()],
                ..DivisionOverride::default()
            },
        );
        state.load_division(&catalog);
        assert_eq!(state.selected_logo_url, "cbs3.svg");
        assert_eq!(state.header_colors, ["#000000".to_string(), "#333333".to_string()]);
        assert_eq!(state.overrides[&key].logo_url, "cbs3.svg");
        assert_eq!(
            state.working.team_order,
            vec!["Giants", "Eagles", "Cowboys", "Commanders"]
        );
    }

    #[test]
    fn custom_logo_survives_reload_when_input_matches() {
        let (mut state, catalog) = booted();
        assert!(state.select_station(StationChoice::Custom, &catalog));
        state.set_custom_logo_input(" https://example.invalid/mine.svg ", &catalog);
        assert_eq!(state.selected_logo_url, "https://example.invalid/mine.svg");
        state.load_division(&catalog);
        assert_eq!(state.logo_mode, LogoMode::Custom);
        assert_eq!(state.effective_logo_url(), "https://example.invalid/mine.svg");
    }

    #[test]
    fn leading_number_parse_matches_parse_float() {
        assert_eq!(parse_leading_number("10"), Some(10.0));
        assert_eq!(parse_leading_number(" -2.5pts"), Some(-2.5));
        assert_eq!(parse_leading_number(".5"), Some(0.5));
        assert_eq!(parse_leading_number("7-3"), Some(7.0));
        assert_eq!(parse_leading_number("1e3x"), Some(1000.0));
        assert_eq!(parse_leading_number("abc"), None);
        assert_eq!(parse_leading_number(""), None);
        assert_eq!(parse_leading_number("-"), None);
    }

    #[test]
    fn preview_is_transient() {
        let (mut state, catalog) = booted();
        let committed = state.clone();

        assert!(state.preview_station(Some("nbc10.svg"), &catalog));
        assert_eq!(state.previewed_station(&catalog).map(|s| s.label.as_str()), Some("NBC 10"));
        assert!(!state.preview_station(Some("nbc10.svg"), &catalog));
        assert_eq!(state.selected_logo_url, "cbs3.svg");
        assert_eq!(state.overrides, committed.overrides);

        // Unknown stations end the preview.
        assert!(state.preview_station(Some("elsewhere.svg"), &catalog));
        assert!(state.preview_station.is_none());
        state.preview_station(Some("nbc10.svg"), &catalog);
        assert!(state.select_conference(Conference::Afc, &catalog));
        assert!(state.preview_station.is_none());
    }
}
