use dioxus::prelude::*;

use crate::core::catalog::{Conference, Division, DivisionKey};
use crate::core::session::Edit;

/// Status line under the export button: `(css class, message)`.
pub type Feedback = Option<(String, String)>;

#[component]
pub fn Controls(
    active: DivisionKey,
    busy: bool,
    feedback: Feedback,
    on_edit: EventHandler<Edit>,
    on_customize: EventHandler<()>,
    on_export: EventHandler<()>,
) -> Element {
    rsx! {
        div { class: "controls",
            div { class: "controls__row conference-toggles",
                for conference in Conference::ALL {
                    button {
                        key: "{conference.as_str()}",
                        r#type: "button",
                        class: if conference == active.conference { "conference-toggle active" } else { "conference-toggle" },
                        onclick: move |_| on_edit.call(Edit::SelectConference(conference)),
                        "{conference.as_str()}"
                    }
                }
            }
            div { class: "controls__row division-toggles",
                for division in Division::ALL {
                    button {
                        key: "{division.as_str()}",
                        r#type: "button",
                        class: if division == active.division { "division-toggle-btn active" } else { "division-toggle-btn" },
                        onclick: move |_| on_edit.call(Edit::SelectDivision(division)),
                        "{division.as_str()}"
                    }
                }
            }
            div { class: "controls__row",
                button {
                    id: "edit-btn",
                    r#type: "button",
                    class: "button",
                    onclick: move |_| on_customize.call(()),
                    "Customize"
                }
                button {
                    id: "export-btn",
                    r#type: "button",
                    class: "button button--primary",
                    disabled: busy,
                    onclick: move |_| on_export.call(()),
                    if busy { "Exporting..." } else { "Export PNG" }
                }
            }
            if let Some((class, message)) = feedback {
                p { class: "{class}", "{message}" }
            }
        }
    }
}
