//! Pure projection of the view state into what the board renders.

use crate::core::catalog::{Catalog, DivisionKey};
use crate::core::color::{gradient_css, readable_header_gradient, ColorPair};
use crate::core::config::DEFAULT_TITLE;
use crate::core::contrast::{fox_pop, LogoTreatment};
use crate::core::state::{default_subtitle, reconcile_order, LogoMode, ViewState};

#[derive(Debug, Clone, PartialEq)]
pub struct TeamRowView {
    pub name: String,
    pub color: String,
    pub logo_url: String,
    pub value: String,
    /// Shrunk font for long values; `None` keeps the stylesheet size.
    pub font_px: Option<u32>,
    pub z_index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StationOptionView {
    pub label: String,
    pub url: String,
    pub colors: ColorPair,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoardView {
    pub key: DivisionKey,
    pub title: String,
    pub subtitle: String,
    pub division_label: String,
    pub logo_url: String,
    pub logo_alt: String,
    pub header_gradient: ColorPair,
    /// First source header color, before the readability pass. Logo
    /// contrast is judged against it.
    pub logo_backdrop: String,
    pub logo_treatment: LogoTreatment,
    pub fox_pop: bool,
    pub teams: Vec<TeamRowView>,
    pub stations: Vec<StationOptionView>,
    pub custom_active: bool,
    pub custom_logo_input: String,
    pub empty_message: Option<String>,
}

impl BoardView {
    pub fn header_css(&self) -> String {
        gradient_css(&self.header_gradient)
    }
}

pub fn value_font_px(value: &str) -> Option<u32> {
    let len = value.chars().count();
    if len > 10 {
        Some(60)
    } else if len > 6 {
        Some(80)
    } else {
        None
    }
}

pub fn project(state: &ViewState, catalog: &Catalog) -> BoardView {
    let key = state.key();
    let preview = state.previewed_station(catalog);
    let station = preview.or_else(|| state.selected_station(catalog));
    let header_colors = preview.map_or(&state.header_colors, |p| &p.colors);
    let custom_active = state.logo_mode == LogoMode::Custom;

    let names = catalog.team_names(key);
    let order = reconcile_order(&state.working.team_order, &names);
    let total = order.len();
    let teams = order
        .iter()
        .enumerate()
        .filter_map(|(idx, name)| {
            let team = catalog.team(key, name)?;
            let value = state
                .working
                .team_values
                .get(name)
                .cloned()
                .unwrap_or_default();
            Some(TeamRowView {
                name: team.name.clone(),
                color: team.color.clone(),
                logo_url: team.logo_url.clone(),
                font_px: value_font_px(&value),
                value,
                z_index: total - idx,
            })
        })
        .collect();

    let stations = catalog
        .stations(key)
        .unwrap_or_default()
        .iter()
        .map(|option| StationOptionView {
            label: option.label.clone(),
            url: option.url.clone(),
            colors: option.colors.clone(),
            active: !custom_active && option.url == state.selected_logo_url,
        })
        .collect();

    let label = station.map(|s| s.label.as_str()).unwrap_or("Custom");
    let title = if state.working.title.trim().is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        state.working.title.clone()
    };
    let subtitle = if state.working.subtitle.trim().is_empty() {
        default_subtitle(key)
    } else {
        state.working.subtitle.clone()
    };

    BoardView {
        key,
        title,
        subtitle,
        division_label: key.label(),
        logo_url: preview.map_or_else(|| state.effective_logo_url(), |p| p.url.as_str()).to_string(),
        logo_alt: format!("{label} Network Logo"),
        header_gradient: readable_header_gradient(header_colors, station),
        logo_backdrop: header_colors[0].clone(),
        logo_treatment: LogoTreatment::for_station(station),
        fox_pop: fox_pop(station),
        teams,
        stations,
        custom_active,
        custom_logo_input: state.custom_logo_input.clone(),
        empty_message: (total == 0).then(|| format!("No teams found for {}.", key.label())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{Conference, Division, Station, StationTint, Team};

    fn catalog() -> Catalog {
        let team = |name: &str| Team {
            name: name.into(),
            color: "#000000".into(),
            logo_url: format!("/logos/{name}.svg"),
        };
        Catalog::default().with_division(
            DivisionKey::new(Conference::Nfc, Division::East),
            vec![team("Eagles"), team("Cowboys"), team("Giants")],
            vec![Station {
                label: "FOX 5".into(),
                url: "/logos/fox5.svg".into(),
                colors: ["#ffffff".into(), "#eeeeee".into()],
                tint: StationTint::Unset,
            }],
        )
    }

    #[test]
    fn projection_is_idempotent() {
        let catalog = catalog();
        let mut state = ViewState::default();
        state.load_division(&catalog);
        state.set_team_value("Giants", "Superbowl bound", &catalog);
        assert_eq!(project(&state, &catalog), project(&state, &catalog));
    }

    #[test]
    fn rows_carry_font_and_stacking() {
        let catalog = catalog();
        let mut state = ViewState::default();
        state.load_division(&catalog);
        state.set_team_value("Eagles", "1234567", &catalog);
        state.set_team_value("Cowboys", "12345678901", &catalog);
        let view = project(&state, &catalog);

        assert_eq!(view.teams[0].font_px, Some(80));
        assert_eq!(view.teams[1].font_px, Some(60));
        assert_eq!(view.teams[2].font_px, None);
        let z: Vec<usize> = view.teams.iter().map(|row| row.z_index).collect();
        assert_eq!(z, vec![3, 2, 1]);
    }

    #[test]
    fn header_and_logo_follow_station() {
        let catalog = catalog();
        let mut state = ViewState::default();
        state.load_division(&catalog);
        let view = project(&state, &catalog);

        assert_eq!(view.title, "NFL Meme War");
        assert_eq!(view.logo_alt, "FOX 5 Network Logo");
        assert_eq!(view.logo_treatment, LogoTreatment::ForceWhite);
        assert!(view.fox_pop);
        assert!(view.stations[0].active);
        assert!(view.empty_message.is_none());
    }

    #[test]
    fn blank_subtitle_falls_back_to_division() {
        let catalog = catalog();
        let mut state = ViewState::default();
        state.load_division(&catalog);
        state.set_subtitle("   ", &catalog);
        assert_eq!(project(&state, &catalog).subtitle, "In the NFC EAST");
        state.set_subtitle("Birds up", &catalog);
        assert_eq!(project(&state, &catalog).subtitle, "Birds up");
    }

    #[test]
    fn empty_division_reports_message() {
        let catalog = catalog();
        let mut state = ViewState::default();
        state.select_conference(Conference::Afc, &catalog);
        let view = project(&state, &catalog);
        assert!(view.teams.is_empty());
        assert_eq!(view.empty_message.as_deref(), Some("No teams found for AFC EAST."));
        assert_eq!(view.logo_alt, "Custom Network Logo");
    }

    #[test]
    fn hover_preview_shows_station_without_committing() {
        let catalog = Catalog::default().with_division(
            DivisionKey::new(Conference::Nfc, Division::East),
            vec![Team {
                name: "Eagles".into(),
                color: "#004c54".into(),
                logo_url: String::new(),
            }],
            vec![
                Station {
                    label: "CBS 3".into(),
                    url: "/logos/cbs3.svg".into(),
                    colors: ["#000000".into(), "#222222".into()],
                    tint: StationTint::Disabled,
                },
                Station {
                    label: "FOX 29".into(),
                    url: "/logos/fox29.svg".into(),
                    colors: ["#8a0000".into(), "#3d0000".into()],
                    tint: StationTint::Unset,
                },
            ],
        );
        let mut state = ViewState::default();
        state.load_division(&catalog);
        let committed = project(&state, &catalog);
        assert_eq!(committed.logo_url, "/logos/cbs3.svg");

        state.preview_station(Some("/logos/fox29.svg"), &catalog);
        let hovered = project(&state, &catalog);
        assert_eq!(hovered.logo_url, "/logos/fox29.svg");
        assert_eq!(hovered.logo_alt, "FOX 29 Network Logo");
        assert_eq!(hovered.logo_backdrop, "#8a0000");
        assert_ne!(hovered.header_gradient, committed.header_gradient);
        assert!(hovered.stations[0].active, "picker still marks the committed station");

        state.preview_station(None, &catalog);
        assert_eq!(project(&state, &catalog), committed);
    }
}
