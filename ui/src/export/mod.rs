//! PNG export of the board.
//!
//! [`ExportPipeline`] drives a platform [`ExportSurface`] through
//! `Preparing -> Rasterizing -> Succeeded | Failed -> Idle`. The surface is
//! restored exactly once per attempt, whatever happened before.

use std::cell::Cell;
use std::rc::Rc;

use async_trait::async_trait;
use base64::Engine as _;
use futures::future::join_all;
use thiserror::Error;
use time::Date;

use crate::core::catalog::DivisionKey;
use crate::core::config::ExportSettings;
use crate::core::format;
use crate::core::timing::{self, Sleeper};

mod download;
#[cfg(not(target_arch = "wasm32"))]
pub mod scene;
#[cfg(not(target_arch = "wasm32"))]
pub mod svg;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use download::download_bytes;

/// Element ids excluded from exports, together with everything inside them.
pub const NON_EXPORTABLE_IDS: [&str; 4] = [
    "history-controls",
    "history-popover",
    "custom-panel",
    "custom-overlay",
];
/// Classes excluded from exports, together with everything inside them.
pub const NON_EXPORTABLE_CLASSES: [&str; 1] = ["controls"];

pub const BADGE_ID: &str = "export-url-badge";

/// True when a node with this id and class list is itself non-exportable.
pub fn is_non_exportable(id: Option<&str>, classes: &[&str]) -> bool {
    id.is_some_and(|id| NON_EXPORTABLE_IDS.contains(&id))
        || classes
            .iter()
            .any(|class| NON_EXPORTABLE_CLASSES.contains(class))
}

/// CSS selector matching the same regions, for `Element::closest`.
pub fn non_exportable_selector() -> String {
    NON_EXPORTABLE_IDS
        .iter()
        .map(|id| format!("#{id}"))
        .chain(NON_EXPORTABLE_CLASSES.iter().map(|class| format!(".{class}")))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportPhase {
    #[default]
    Idle,
    Preparing,
    Rasterizing,
    Succeeded,
    Failed,
}

impl ExportPhase {
    pub fn is_busy(self) -> bool {
        matches!(self, ExportPhase::Preparing | ExportPhase::Rasterizing)
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("an export is already running")]
    AlreadyRunning,
    #[error("export target `{0}` is missing")]
    MissingElement(String),
    #[error("rasterization failed: {0}")]
    Rasterize(String),
    #[error("PNG encoding failed: {0}")]
    Encode(String),
    #[error("could not save export: {0}")]
    Delivery(String),
}

/// What one export is about.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    pub key: DivisionKey,
    pub date: Date,
    pub badge_text: String,
}

impl ExportRequest {
    pub fn filename(&self) -> String {
        format::export_filename(self.key, self.date)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// A rendered board that can be frozen, cleaned up and rasterized.
#[async_trait(?Send)]
pub trait ExportSurface {
    /// Hide non-exportable regions, overlay the attribution badge and pin
    /// the layout. May fail part-way; `restore` undoes whatever was done.
    async fn prepare(&mut self, badge_text: &str) -> Result<(), ExportError>;

    /// Current `src` of every image on the board, in document order.
    fn image_sources(&self) -> Vec<String>;

    fn set_image_source(&mut self, index: usize, src: &str);

    /// Resolves to `true` once the image is decodable, `false` on error.
    /// May never resolve; the pipeline bounds it with a timeout.
    async fn await_image(&self, index: usize) -> bool;

    async fn rasterize(&mut self, settings: &ExportSettings) -> Result<Vec<u8>, ExportError>;

    fn restore(&mut self);
}

/// Original `src` of every image rewritten during an export, so the live
/// board can be put back afterwards. Only the first rewrite of an image is
/// recorded.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SourceLedger {
    originals: Vec<(usize, String)>,
}

impl SourceLedger {
    pub fn record(&mut self, index: usize, original: &str) {
        if !self.originals.iter().any(|(seen, _)| *seen == index) {
            self.originals.push((index, original.to_string()));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }

    /// Hands back every recorded original and forgets them.
    pub fn drain(&mut self) -> Vec<(usize, String)> {
        std::mem::take(&mut self.originals)
    }
}

/// Gives untyped `data:;base64,` sources a MIME type the rasterizer accepts.
pub fn normalize_data_url(src: &str) -> Option<String> {
    let payload = src.strip_prefix("data:;base64,")?;
    let mime = if payload.starts_with("PHN2Zy") || payload.starts_with("PD94bWwg") {
        "image/svg+xml"
    } else {
        "image/png"
    };
    Some(format!("data:{mime};base64,{payload}"))
}

/// MIME type and bytes of a `data:` URL (base64 or percent-encoded).
pub fn decode_data_url(src: &str) -> Option<(String, Vec<u8>)> {
    let rest = src.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let (mime, is_base64) = match header.strip_suffix(";base64") {
        Some(mime) => (mime, true),
        None => (header, false),
    };
    let mime = mime.split(';').next().unwrap_or_default().to_string();
    let bytes = if is_base64 {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .ok()?
    } else {
        urlencoding::decode_binary(payload.as_bytes()).into_owned()
    };
    Some((mime, bytes))
}

/// Shared handle on the export state machine. Clones observe the same phase.
#[derive(Clone)]
pub struct ExportPipeline {
    phase: Rc<Cell<ExportPhase>>,
    settings: ExportSettings,
    sleeper: Rc<dyn Sleeper>,
}

impl ExportPipeline {
    pub fn new(settings: ExportSettings, sleeper: Rc<dyn Sleeper>) -> Self {
        Self {
            phase: Rc::new(Cell::new(ExportPhase::Idle)),
            settings,
            sleeper,
        }
    }

    pub fn phase(&self) -> ExportPhase {
        self.phase.get()
    }

    pub fn is_busy(&self) -> bool {
        self.phase.get().is_busy()
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// One export attempt. A trigger while another attempt is in flight is
    /// rejected without touching the surface.
    pub async fn run<S>(
        &self,
        surface: &mut S,
        request: &ExportRequest,
    ) -> Result<ExportArtifact, ExportError>
    where
        S: ExportSurface + ?Sized,
    {
        if self.is_busy() {
            tracing::warn!("[export] trigger ignored, export already running");
            return Err(ExportError::AlreadyRunning);
        }
        self.phase.set(ExportPhase::Preparing);
        tracing::info!("[export] starting {}", request.filename());

        let outcome = self.prepare_and_rasterize(surface, request).await;
        surface.restore();

        let result = match outcome {
            Ok(bytes) => {
                self.phase.set(ExportPhase::Succeeded);
                tracing::info!("[export] produced {} bytes", bytes.len());
                Ok(ExportArtifact {
                    filename: request.filename(),
                    bytes,
                })
            }
            Err(err) => {
                self.phase.set(ExportPhase::Failed);
                tracing::error!("[export] failed: {err}");
                Err(err)
            }
        };
        self.phase.set(ExportPhase::Idle);
        result
    }

    async fn prepare_and_rasterize<S>(
        &self,
        surface: &mut S,
        request: &ExportRequest,
    ) -> Result<Vec<u8>, ExportError>
    where
        S: ExportSurface + ?Sized,
    {
        self.sleeper.sleep(self.settings.settle_delay_ms).await;
        surface.prepare(&request.badge_text).await?;

        for (index, src) in surface.image_sources().iter().enumerate() {
            if let Some(fixed) = normalize_data_url(src) {
                surface.set_image_source(index, &fixed);
            }
        }

        let count = surface.image_sources().len();
        let failed: Vec<usize> = {
            let view: &S = &*surface;
            let sleeper = self.sleeper.as_ref();
            let timeout_ms = self.settings.decode_timeout_ms;
            let checks = (0..count).map(move |index| async move {
                let ready = timing::with_timeout(sleeper, timeout_ms, view.await_image(index)).await;
                (index, ready == Some(true))
            });
            join_all(checks)
                .await
                .into_iter()
                .filter_map(|(index, ok)| (!ok).then_some(index))
                .collect()
        };
        for index in failed {
            tracing::warn!("[export] image {index} did not resolve, using placeholder");
            surface.set_image_source(index, self.settings.image_placeholder);
        }

        self.phase.set(ExportPhase::Rasterizing);
        surface.rasterize(&self.settings).await
    }
}
