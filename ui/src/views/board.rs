use dioxus::prelude::*;

use crate::core::contrast::LogoAppearance;
use crate::core::projection::BoardView;

/// Header (station logo, title, subtitle) and the stacked team rows.
#[component]
pub fn Board(view: BoardView, appearance: LogoAppearance) -> Element {
    let mut header_class = String::from("header");
    if view.fox_pop {
        header_class.push_str(" fox-pop-header");
    }
    if appearance.light_backdrop {
        header_class.push_str(" dark-logo-bg");
    }

    let mut logo_class = String::from("network-logo");
    if view.fox_pop {
        logo_class.push_str(" fox-pop-logo");
    }
    if appearance.white_invert {
        logo_class.push_str(" logo-white-invert");
    }
    if appearance.black_invert {
        logo_class.push_str(" logo-black-invert");
    }

    let header_style = format!("background: {};", view.header_css());

    rsx! {
        div { class: "{header_class}", style: "{header_style}",
            img {
                id: "network-logo",
                class: "{logo_class}",
                crossorigin: "anonymous",
                src: "{view.logo_url}",
                alt: "{view.logo_alt}",
            }
            h1 { id: "page-title", class: "header__title", "{view.title}" }
            p { id: "page-subtitle", class: "header__subtitle", "{view.subtitle}" }
        }

        div { id: "teams-container", class: "teams",
            if let Some(message) = view.empty_message.clone() {
                div { class: "teams__empty", "{message}" }
            }
            for row in view.teams.iter() {
                div {
                    key: "{row.name}",
                    class: "team-row",
                    style: "background-color: {row.color}; z-index: {row.z_index};",
                    img {
                        class: "team-logo",
                        crossorigin: "anonymous",
                        src: "{row.logo_url}",
                        alt: "{row.name} Logo",
                    }
                    div {
                        class: "points",
                        style: row.font_px.map(|px| format!("font-size: {px}px;")).unwrap_or_default(),
                        "{row.value}"
                    }
                }
            }
        }
    }
}
