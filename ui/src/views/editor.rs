use dioxus::prelude::*;

use crate::core::projection::BoardView;
use crate::core::session::Edit;
use crate::core::state::StationChoice;

/// Slide-in customization panel: title, subtitle, station logo and the
/// per-team values with drag reordering. Hovering a station button
/// previews it on the board until the pointer leaves.
#[component]
pub fn EditorPanel(
    view: BoardView,
    title_input: String,
    subtitle_input: String,
    open: bool,
    on_edit: EventHandler<Edit>,
    on_preview: EventHandler<Option<String>>,
    on_close: EventHandler<()>,
) -> Element {
    let mut drag_from = use_signal(|| Option::<usize>::None);
    let mut drag_over = use_signal(|| Option::<usize>::None);

    let team_count = view.teams.len();
    let division_label = view.division_label.clone();

    rsx! {
        div {
            id: "custom-overlay",
            class: if open { "custom-overlay visible" } else { "custom-overlay" },
            onclick: move |_| on_close.call(()),
        }
        aside {
            id: "custom-panel",
            class: if open { "custom-panel visible" } else { "custom-panel" },

            h2 { class: "custom-panel__title", "Customize" }

            label { class: "field",
                span { class: "field__label", "Title" }
                input {
                    id: "custom-title",
                    r#type: "text",
                    placeholder: "NFL Meme War",
                    value: "{title_input}",
                    oninput: move |evt: FormEvent| on_edit.call(Edit::Title(evt.value())),
                }
            }
            label { class: "field",
                span { class: "field__label", "Subtitle" }
                input {
                    id: "custom-subtitle",
                    r#type: "text",
                    placeholder: "In the {division_label}",
                    value: "{subtitle_input}",
                    oninput: move |evt: FormEvent| on_edit.call(Edit::Subtitle(evt.value())),
                }
            }

            div { id: "division-station-options", class: "logo-group",
                div { class: "logo-group-label", "{division_label} Top Stations" }
                div { class: "logo-group-buttons",
                    for station in view.stations.iter().cloned() {
                        button {
                            key: "{station.url}",
                            r#type: "button",
                            class: if station.active { "logo-toggle active" } else { "logo-toggle" },
                            "data-url": "{station.url}",
                            onclick: {
                                let url = station.url.clone();
                                move |_| on_edit.call(Edit::Station(StationChoice::Station(url.clone())))
                            },
                            onmouseenter: {
                                let url = station.url.clone();
                                move |_| on_preview.call(Some(url.clone()))
                            },
                            onmouseleave: move |_| on_preview.call(None),
                            "{station.label}"
                        }
                    }
                    button {
                        r#type: "button",
                        class: if view.custom_active { "logo-toggle active" } else { "logo-toggle" },
                        "data-url": "custom",
                        onclick: move |_| on_edit.call(Edit::Station(StationChoice::Custom)),
                        "Custom"
                    }
                }
                input {
                    id: "custom-logo-url",
                    r#type: "url",
                    class: if view.custom_active { "custom-logo-url visible" } else { "custom-logo-url" },
                    placeholder: "https://example.com/logo.svg",
                    value: "{view.custom_logo_input}",
                    oninput: move |evt: FormEvent| on_edit.call(Edit::CustomLogoInput(evt.value())),
                }
            }

            div { class: "sort-buttons",
                button {
                    id: "sort-asc-btn",
                    r#type: "button",
                    class: "button",
                    onclick: move |_| on_edit.call(Edit::Sort { ascending: true }),
                    "Sort ↑"
                }
                button {
                    id: "sort-desc-btn",
                    r#type: "button",
                    class: "button",
                    onclick: move |_| on_edit.call(Edit::Sort { ascending: false }),
                    "Sort ↓"
                }
            }

            div { id: "custom-team-inputs",
                for (idx, row) in view.teams.iter().cloned().enumerate() {
                    div {
                        key: "{row.name}",
                        class: if drag_over() == Some(idx) { "custom-team-row drag-over" } else { "custom-team-row" },
                        style: "background: {row.color};",
                        draggable: "true",
                        ondragstart: move |_| drag_from.set(Some(idx)),
                        ondragover: move |evt: DragEvent| {
                            evt.prevent_default();
                            drag_over.set(Some(idx));
                        },
                        ondragend: move |_| {
                            drag_from.set(None);
                            drag_over.set(None);
                        },
                        ondrop: move |evt: DragEvent| {
                            evt.prevent_default();
                            if let Some(from) = drag_from() {
                                on_edit.call(Edit::Reorder { from, to: idx });
                            }
                            drag_from.set(None);
                            drag_over.set(None);
                        },
                        span { class: "drag-handle", "☰" }
                        span { class: "team-name", "{row.name}" }
                        input {
                            r#type: "text",
                            placeholder: "Value",
                            value: "{row.value}",
                            oninput: {
                                let team = row.name.clone();
                                move |evt: FormEvent| {
                                    on_edit.call(Edit::TeamValue {
                                        team: team.clone(),
                                        value: evt.value(),
                                    })
                                }
                            },
                        }
                        div { class: "move-buttons",
                            button {
                                r#type: "button",
                                class: "move-btn",
                                aria_label: "Move up",
                                disabled: idx == 0,
                                onclick: move |_| on_edit.call(Edit::Reorder { from: idx, to: idx.saturating_sub(1) }),
                                "▲"
                            }
                            button {
                                r#type: "button",
                                class: "move-btn",
                                aria_label: "Move down",
                                disabled: idx + 1 >= team_count,
                                onclick: move |_| on_edit.call(Edit::Reorder { from: idx, to: idx + 1 }),
                                "▼"
                            }
                        }
                    }
                }
            }

            button {
                id: "custom-apply-btn",
                r#type: "button",
                class: "button button--primary",
                onclick: move |_| on_close.call(()),
                "Done"
            }
        }
    }
}
