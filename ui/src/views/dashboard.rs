use std::cell::RefCell;
use std::rc::Rc;

use dioxus::prelude::*;
use futures_channel::mpsc::UnboundedSender;
use futures_util::StreamExt;

use crate::core::catalog::{Catalog, CatalogError};
use crate::core::config::{ExportSettings, AUTO_SNAPSHOT_DEBOUNCE_MS};
use crate::core::contrast::{
    classify_logo, ContrastTicket, ContrastTracker, LogoAppearance, LogoProfile, LogoTreatment,
};
use crate::core::history::CaptureOutcome;
use crate::core::projection::BoardView;
use crate::core::session::{Edit, MemeSession};
use crate::core::timing::{CaptureTicket, PlatformSleeper};
use crate::core::{format, platform, storage, timing};
use crate::export::{download_bytes, ExportError, ExportPipeline, ExportRequest, ExportSurface};

use super::board::Board;
use super::controls::{Controls, Feedback};
use super::editor::EditorPanel;
use super::history::{popover_stays_open, HistoryPanel};

const EXPORT_FAILED_NOTICE: &str = "Error exporting image. Please try again.";

#[derive(Debug, Clone, PartialEq)]
enum ExportStatus {
    Idle,
    Working(&'static str),
    Done(String),
    Error(String),
}

/// Logo inputs that decide whether a new contrast pass is needed.
#[derive(Debug, Clone, PartialEq)]
struct LogoRequest {
    url: String,
    background: String,
    treatment: LogoTreatment,
}

#[derive(Debug, Clone)]
enum DashboardEvent {
    Edit(Edit),
    Preview(Option<String>),
    AutoCaptureDue(CaptureTicket),
    SaveSnapshot,
    Restore(String),
    Delete(String),
    LogoSampled {
        ticket: ContrastTicket,
        profile: LogoProfile,
    },
    Export,
    ExportFinished(Result<String, String>),
}

#[component]
pub fn Dashboard() -> Element {
    let session = use_signal(|| Option::<MemeSession>::None);
    let load_error = use_signal(|| Option::<String>::None);
    let appearance = use_signal(LogoAppearance::default);
    let mut panel_open = use_signal(|| false);
    let mut popover_open = use_signal(|| false);
    let status = use_signal(|| ExportStatus::Idle);
    let busy = use_signal(|| false);

    let tracker = use_hook(ContrastTracker::default);
    let pipeline =
        use_hook(|| ExportPipeline::new(ExportSettings::default(), Rc::new(PlatformSleeper)));

    let sender_slot: Rc<RefCell<Option<UnboundedSender<DashboardEvent>>>> =
        Rc::new(RefCell::new(None));
    let sender_slot_for_loop = sender_slot.clone();

    let coroutine = use_coroutine(move |mut rx: UnboundedReceiver<DashboardEvent>| {
        let sender_slot = sender_slot_for_loop.clone();
        let tracker = tracker.clone();
        let pipeline = pipeline.clone();
        let mut session_signal = session;
        let mut error_signal = load_error;
        let mut appearance_signal = appearance;
        let mut popover_signal = popover_open;
        let mut status_signal = status;
        let mut busy_signal = busy;

        async move {
            let catalog = match load_catalog().await {
                Ok(catalog) => catalog,
                Err(err) => {
                    tracing::error!("[catalog] {err}");
                    error_signal.set(Some(err.to_string()));
                    Catalog::default()
                }
            };
            session_signal.set(Some(MemeSession::boot(catalog, storage::default_store())));

            let mut last_request: Option<LogoRequest> = None;
            refresh_logo(
                &session_signal,
                &tracker,
                &mut appearance_signal,
                &mut last_request,
                &sender_slot,
            );

            while let Some(event) = rx.next().await {
                match event {
                    DashboardEvent::Edit(edit) => {
                        let ticket =
                            session_signal.with_mut(|s| s.as_mut().and_then(|s| s.apply(edit)));
                        if let Some(ticket) = ticket {
                            queue_auto_capture(sender_slot.clone(), ticket);
                            refresh_logo(
                                &session_signal,
                                &tracker,
                                &mut appearance_signal,
                                &mut last_request,
                                &sender_slot,
                            );
                        }
                    }
                    DashboardEvent::Preview(url) => {
                        let changed = session_signal
                            .with_mut(|s| s.as_mut().is_some_and(|s| s.preview_station(url)));
                        if changed {
                            refresh_logo(
                                &session_signal,
                                &tracker,
                                &mut appearance_signal,
                                &mut last_request,
                                &sender_slot,
                            );
                        }
                    }
                    DashboardEvent::AutoCaptureDue(ticket) => {
                        let outcome = session_signal
                            .with_mut(|s| s.as_mut().and_then(|s| s.auto_capture_due(ticket)));
                        if outcome.is_none() {
                            tracing::debug!("[history] superseded auto-capture dropped");
                        }
                    }
                    DashboardEvent::SaveSnapshot => {
                        let outcome = session_signal
                            .with_mut(|s| s.as_mut().map(|s| s.take_snapshot(false)));
                        if outcome == Some(CaptureOutcome::Unchanged) {
                            tracing::debug!("[history] board unchanged since last snapshot");
                        }
                    }
                    DashboardEvent::Restore(id) => {
                        let restored = session_signal
                            .with_mut(|s| s.as_mut().is_some_and(|s| s.restore_snapshot(&id)));
                        if restored {
                            popover_signal.set(false);
                            refresh_logo(
                                &session_signal,
                                &tracker,
                                &mut appearance_signal,
                                &mut last_request,
                                &sender_slot,
                            );
                        }
                    }
                    DashboardEvent::Delete(id) => {
                        let remaining = session_signal.with_mut(|s| {
                            s.as_mut().map_or(0, |s| {
                                s.delete_snapshot(&id);
                                s.history().len()
                            })
                        });
                        if !popover_stays_open(popover_signal(), remaining) {
                            popover_signal.set(false);
                        }
                    }
                    DashboardEvent::LogoSampled { ticket, profile } => {
                        if tracker.accept(ticket) {
                            tracing::debug!("[contrast] profile {profile:?}");
                            appearance_signal
                                .set(LogoAppearance::settle(LogoTreatment::Analyze, Some(profile)));
                        }
                    }
                    DashboardEvent::Export => {
                        if busy_signal() {
                            continue;
                        }
                        let Some((request, view)) = session_signal.with(|s| {
                            s.as_ref().map(|s| {
                                let request = ExportRequest {
                                    key: s.key(),
                                    date: format::local_today(),
                                    badge_text: platform::page_badge_url(),
                                };
                                (request, s.view())
                            })
                        }) else {
                            continue;
                        };
                        let surface = match board_surface(view, appearance_signal(), popover_signal())
                        {
                            Ok(surface) => surface,
                            Err(err) => {
                                tracing::error!("[export] {err}");
                                platform::alert(EXPORT_FAILED_NOTICE);
                                status_signal.set(ExportStatus::Error(err.to_string()));
                                continue;
                            }
                        };
                        busy_signal.set(true);
                        status_signal.set(ExportStatus::Working("Exporting"));
                        queue_export(sender_slot.clone(), pipeline.clone(), request, surface);
                    }
                    DashboardEvent::ExportFinished(outcome) => {
                        match outcome {
                            Ok(message) => status_signal.set(ExportStatus::Done(message)),
                            Err(err) => status_signal.set(ExportStatus::Error(err)),
                        }
                        busy_signal.set(false);
                    }
                }
            }
        }
    });

    sender_slot.borrow_mut().replace(coroutine.tx());

    let send_event = move |event: DashboardEvent| coroutine.send(event);

    let feedback: Feedback = match &status() {
        ExportStatus::Idle => None,
        ExportStatus::Working(label) => Some(("controls__status".to_string(), format!("{label}…"))),
        ExportStatus::Done(message) => Some((
            "controls__status controls__status--success".to_string(),
            format!("✅ {message}"),
        )),
        ExportStatus::Error(err) => Some((
            "controls__status controls__status--error".to_string(),
            format!("⚠️ {err}"),
        )),
    };

    let loaded = session.with(|s| {
        s.as_ref().map(|s| {
            (
                s.view(),
                s.state().working.title.clone(),
                s.state().working.subtitle.clone(),
                s.history().entries().to_vec(),
            )
        })
    });

    let Some((view, title_input, subtitle_input, entries)) = loaded else {
        return rsx! {
            div { class: "container container--loading",
                p { class: "loading", "Loading divisions…" }
            }
        };
    };

    rsx! {
        div { class: "dashboard",
            onclick: move |_| {
                if popover_open() {
                    popover_open.set(false);
                }
            },
            if let Some(err) = load_error() {
                div { class: "load-error", "⚠️ Could not load division data: {err}" }
            }

            div { class: "container",
                Board { view: view.clone(), appearance: appearance() }

                Controls {
                    active: view.key,
                    busy: busy(),
                    feedback,
                    on_edit: move |edit: Edit| send_event(DashboardEvent::Edit(edit)),
                    on_customize: move |_| panel_open.set(true),
                    on_export: move |_| send_event(DashboardEvent::Export),
                }

                HistoryPanel {
                    entries,
                    open: popover_open(),
                    on_toggle: move |_| {
                        let next = !popover_open();
                        popover_open.set(next);
                    },
                    on_save: move |_| send_event(DashboardEvent::SaveSnapshot),
                    on_restore: move |id: String| send_event(DashboardEvent::Restore(id)),
                    on_delete: move |id: String| send_event(DashboardEvent::Delete(id)),
                }
            }

            EditorPanel {
                view,
                title_input,
                subtitle_input,
                open: panel_open(),
                on_edit: move |edit: Edit| send_event(DashboardEvent::Edit(edit)),
                on_preview: move |url: Option<String>| send_event(DashboardEvent::Preview(url)),
                on_close: move |_| panel_open.set(false),
            }
        }
    }
}

async fn load_catalog() -> Result<Catalog, CatalogError> {
    let raw = platform::read_dashboard_payload().await?;
    Catalog::from_json(&raw)
}

/// Re-derives the logo appearance when the logo, its background or its
/// treatment changed. Analyzed logos are sampled off the event loop and
/// come back as `LogoSampled`.
fn refresh_logo(
    session: &Signal<Option<MemeSession>>,
    tracker: &ContrastTracker,
    appearance: &mut Signal<LogoAppearance>,
    last_request: &mut Option<LogoRequest>,
    sender_slot: &Rc<RefCell<Option<UnboundedSender<DashboardEvent>>>>,
) {
    let request = session.with(|s| {
        s.as_ref().map(|s| {
            let view = s.view();
            LogoRequest {
                url: view.logo_url,
                background: view.logo_backdrop,
                treatment: view.logo_treatment,
            }
        })
    });
    let Some(request) = request else {
        return;
    };
    if last_request.as_ref() == Some(&request) {
        return;
    }
    *last_request = Some(request.clone());

    let ticket = tracker.begin();
    appearance.set(LogoAppearance::settle(request.treatment, None));
    if request.treatment == LogoTreatment::Analyze {
        queue_logo_sample(sender_slot.clone(), ticket, request);
    }
}

fn queue_logo_sample(
    sender_slot: Rc<RefCell<Option<UnboundedSender<DashboardEvent>>>>,
    ticket: ContrastTicket,
    request: LogoRequest,
) {
    if let Some(sender) = sender_slot.borrow().as_ref().cloned() {
        platform::spawn_future(async move {
            let profile = match platform::sample_logo(request.url).await {
                Some(rgba) => classify_logo(&rgba, &request.background),
                None => LogoProfile::FAIL_SAFE,
            };
            let _ = sender.unbounded_send(DashboardEvent::LogoSampled { ticket, profile });
        });
    }
}

fn queue_auto_capture(
    sender_slot: Rc<RefCell<Option<UnboundedSender<DashboardEvent>>>>,
    ticket: CaptureTicket,
) {
    if let Some(sender) = sender_slot.borrow().as_ref().cloned() {
        platform::spawn_future(async move {
            timing::sleep_ms(AUTO_SNAPSHOT_DEBOUNCE_MS).await;
            let _ = sender.unbounded_send(DashboardEvent::AutoCaptureDue(ticket));
        });
    }
}

fn queue_export(
    sender_slot: Rc<RefCell<Option<UnboundedSender<DashboardEvent>>>>,
    pipeline: ExportPipeline,
    request: ExportRequest,
    mut surface: Box<dyn ExportSurface>,
) {
    let Some(sender) = sender_slot.borrow().as_ref().cloned() else {
        return;
    };
    platform::spawn_future(async move {
        let outcome = match export_board(&pipeline, &request, surface.as_mut()).await {
            Ok(message) => Ok(message),
            Err(err) => {
                if !matches!(err, ExportError::AlreadyRunning) {
                    platform::alert(EXPORT_FAILED_NOTICE);
                }
                Err(err.to_string())
            }
        };
        let _ = sender.unbounded_send(DashboardEvent::ExportFinished(outcome));
    });
}

async fn export_board(
    pipeline: &ExportPipeline,
    request: &ExportRequest,
    surface: &mut dyn ExportSurface,
) -> Result<String, ExportError> {
    let artifact = pipeline.run(surface, request).await?;
    let saved = download_bytes(&artifact.filename, "image/png", artifact.bytes).await?;
    Ok(match saved {
        Some(path) => format!("Saved to {path}"),
        None => format!("Downloaded {}", artifact.filename),
    })
}

/// The live DOM on the web; an SVG scene mirroring the board on desktop.
fn board_surface(
    view: BoardView,
    appearance: LogoAppearance,
    popover_open: bool,
) -> Result<Box<dyn ExportSurface>, ExportError> {
    #[cfg(target_arch = "wasm32")]
    {
        let _ = (view, appearance, popover_open);
        let surface = crate::export::web::DomSurface::attach()?;
        Ok(Box::new(surface))
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let surface = crate::export::scene::SceneSurface::new(view, appearance, popover_open);
        Ok(Box::new(surface))
    }
}
