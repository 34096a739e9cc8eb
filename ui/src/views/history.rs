use dioxus::prelude::*;

use crate::core::history::Snapshot;

/// The popover closes once its last entry is gone.
pub(crate) fn popover_stays_open(open: bool, remaining: usize) -> bool {
    open && remaining > 0
}

/// Snapshot toggle plus the popover listing saved boards, newest first.
#[component]
pub fn HistoryPanel(
    entries: Vec<Snapshot>,
    open: bool,
    on_toggle: EventHandler<()>,
    on_save: EventHandler<()>,
    on_restore: EventHandler<String>,
    on_delete: EventHandler<String>,
) -> Element {
    let toggle_label = if entries.is_empty() {
        "Snapshots".to_string()
    } else {
        format!("Previous {}", entries.len())
    };

    rsx! {
        div { id: "history-controls", class: "history-controls",
            button {
                id: "history-toggle-btn",
                r#type: "button",
                class: "button",
                disabled: entries.is_empty(),
                onclick: move |evt: MouseEvent| {
                    evt.stop_propagation();
                    on_toggle.call(());
                },
                "{toggle_label}"
            }
            button {
                id: "history-save-btn",
                r#type: "button",
                class: "button",
                onclick: move |_| on_save.call(()),
                "Save snapshot"
            }
        }

        div {
            id: "history-popover",
            class: if open { "history-popover visible" } else { "history-popover" },
            // Clicks anywhere else close the popover.
            onclick: move |evt: MouseEvent| evt.stop_propagation(),
            for item in entries.iter().cloned() {
                div {
                    key: "{item.id}",
                    class: if item.auto { "history-item auto" } else { "history-item" },
                    onclick: {
                        let id = item.id.clone();
                        move |_| on_restore.call(id.clone())
                    },
                    div { class: "history-item-top",
                        div { class: "history-item-logos",
                            if !item.station_logo_url.is_empty() {
                                img {
                                    class: "history-station-logo",
                                    loading: "lazy",
                                    decoding: "async",
                                    src: "{item.station_logo_url}",
                                    alt: "{item.station_label}",
                                }
                            }
                            span { class: "history-division-badge", "{item.badge()}" }
                        }
                        button {
                            r#type: "button",
                            class: "history-delete-btn",
                            aria_label: "Delete snapshot",
                            onclick: {
                                let id = item.id.clone();
                                move |evt: MouseEvent| {
                                    evt.stop_propagation();
                                    on_delete.call(id.clone());
                                }
                            },
                            "×"
                        }
                    }
                    div { class: "history-item-title", "{item.title}" }
                    div { class: "history-item-subtitle", "{item.subtitle}" }
                    div { class: "history-item-date", "{item.display_time()}" }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::popover_stays_open;

    #[test]
    fn popover_closes_when_history_empties() {
        assert!(popover_stays_open(true, 2));
        assert!(!popover_stays_open(true, 0));
        assert!(!popover_stays_open(false, 3));
    }
}
