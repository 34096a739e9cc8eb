//! Fixed knobs shared by the board, persistence and export paths.

/// `localStorage` / file-store key holding the serialized view state.
pub const SETTINGS_STORAGE_KEY: &str = "nflDivisionDashboard.settings.v1";
/// Key holding the serialized snapshot history.
pub const HISTORY_STORAGE_KEY: &str = "nflDivisionDashboard.history.v1";
/// Maximum number of snapshots kept in the history log.
pub const HISTORY_LIMIT: usize = 20;
/// Quiet period before an automatic snapshot is captured.
pub const AUTO_SNAPSHOT_DEBOUNCE_MS: u64 = 1_200;

/// Payload produced by `memewar-datagen build`.
pub const DASHBOARD_DATA_PATH: &str = "data.json";

pub const EMPTY_SVG_DATA_URL: &str =
    "data:image/svg+xml,%3Csvg xmlns='http://www.w3.org/2000/svg'/%3E";

pub const DEFAULT_HEADER_COLORS: [&str; 2] = ["#1e3a8a", "#3b82f6"];
pub const FOX_BASE_GRADIENT: [&str; 2] = ["#04133b", "#0b2a6e"];

pub const DEFAULT_TITLE: &str = "NFL Meme War";

/// Public address stamped on exports when the page URL is not meaningful
/// (local development server, desktop shell).
pub const PUBLIC_SITE_URL: &str = "https://nfl.rprtd.app";

/// Parameters of one PNG export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSettings {
    pub width: u32,
    pub height: u32,
    /// Per-image decode budget during preflight.
    pub decode_timeout_ms: u64,
    /// Pause after locking the UI so the "Exporting..." state paints first.
    pub settle_delay_ms: u64,
    pub image_placeholder: &'static str,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            decode_timeout_ms: 900,
            settle_delay_ms: 300,
            image_placeholder: EMPTY_SVG_DATA_URL,
        }
    }
}
