//! Desktop export surface: the board rebuilt from its projection as SVG and
//! rasterized natively.
//!
//! The scene also carries the UI-only regions around the board (control
//! bar, history controls, popover, custom panel). Visible regions are drawn
//! over the board, so they only stay out of the PNG because `prepare` hides
//! them, as on the web.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use base64::Engine as _;

use super::{decode_data_url, is_non_exportable, svg, ExportError, ExportSurface};
use crate::core::config::ExportSettings;
use crate::core::contrast::LogoAppearance;
use crate::core::platform;
use crate::core::projection::BoardView;

const HEADER_HEIGHT: f32 = 560.0;
const ROW_TOP: f32 = 620.0;
const ROW_GAP: f32 = 24.0;
const MAX_ROW_HEIGHT: f32 = 300.0;
const BOTTOM_MARGIN: f32 = 90.0;
const DEFAULT_VALUE_PX: u32 = 110;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRole {
    StationLogo,
    TeamLogo(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneImage {
    pub role: ImageRole,
    pub src: String,
}

/// A UI-only region around the board. `parent` indexes into the same list.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneRegion {
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub parent: Option<usize>,
    pub visible: bool,
}

impl SceneRegion {
    fn new(id: Option<&str>, classes: &[&str], parent: Option<usize>, visible: bool) -> Self {
        Self {
            id: id.map(str::to_string),
            classes: classes.iter().map(|c| c.to_string()).collect(),
            parent,
            visible,
        }
    }
}

pub struct SceneSurface {
    view: BoardView,
    appearance: LogoAppearance,
    resource_dir: Option<PathBuf>,
    images: Vec<SceneImage>,
    regions: Vec<SceneRegion>,
    saved_visibility: Option<Vec<bool>>,
    badge: Option<String>,
    layout_pinned: bool,
}

impl SceneSurface {
    /// Mirrors the dashboard: the control panel (with the custom logo panel
    /// inside it), the history controls and, when open, the history popover.
    pub fn new(view: BoardView, appearance: LogoAppearance, popover_open: bool) -> Self {
        let mut images = vec![SceneImage {
            role: ImageRole::StationLogo,
            src: view.logo_url.clone(),
        }];
        images.extend(view.teams.iter().enumerate().map(|(idx, row)| SceneImage {
            role: ImageRole::TeamLogo(idx),
            src: row.logo_url.clone(),
        }));
        let regions = vec![
            SceneRegion::new(None, &["controls"], None, true),
            SceneRegion::new(Some("custom-panel"), &[], Some(0), view.custom_active),
            SceneRegion::new(Some("history-controls"), &[], None, true),
            SceneRegion::new(Some("history-popover"), &[], None, popover_open),
            SceneRegion::new(Some("board"), &["container"], None, true),
        ];
        Self {
            view,
            appearance,
            resource_dir: platform::resource_dir().map(Path::to_path_buf),
            images,
            regions,
            saved_visibility: None,
            badge: None,
            layout_pinned: false,
        }
    }

    pub fn with_resource_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.resource_dir = Some(dir.into());
        self
    }

    pub fn regions(&self) -> &[SceneRegion] {
        &self.regions
    }

    pub fn badge(&self) -> Option<&str> {
        self.badge.as_deref()
    }

    pub fn layout_pinned(&self) -> bool {
        self.layout_pinned
    }

    /// Is the region, or any region containing it, non-exportable?
    fn excluded(&self, mut index: usize) -> bool {
        loop {
            let region = &self.regions[index];
            let classes: Vec<&str> = region.classes.iter().map(String::as_str).collect();
            if is_non_exportable(region.id.as_deref(), &classes) {
                return true;
            }
            match region.parent {
                Some(parent) => index = parent,
                None => return false,
            }
        }
    }

    /// Current markup of the scene, UI regions included.
    pub fn markup(&self, settings: &ExportSettings) -> String {
        board_svg(
            &self.view,
            self.appearance,
            &self.images,
            &self.regions,
            self.badge.as_deref(),
            settings,
        )
    }

    /// Reads `/logos/...` style sources from the resource dir into data URLs.
    fn inline_local_images(&mut self) {
        let Some(root) = self.resource_dir.clone() else {
            return;
        };
        for image in &mut self.images {
            let Some(path) = platform::local_asset_path(&root, &image.src) else {
                continue;
            };
            match std::fs::read(&path) {
                Ok(bytes) => image.src = to_data_url(&path, &bytes),
                Err(err) => tracing::debug!("[export] {}: {err}", path.display()),
            }
        }
    }
}

fn to_data_url(path: &Path, bytes: &[u8]) -> String {
    let mime = match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("svg") => "image/svg+xml",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/png",
    };
    format!(
        "data:{mime};base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Where a UI region sits over the board, as `(x, y, width, height)`.
/// The board container itself has no overlay.
fn region_frame(region: &SceneRegion, width: f32, height: f32) -> Option<(f32, f32, f32, f32)> {
    match region.id.as_deref() {
        Some("history-controls") => Some((width - 340.0, 24.0, 316.0, 64.0)),
        Some("history-popover") => Some((width - 520.0, 100.0, 496.0, 720.0)),
        Some("custom-panel") => Some((width - 560.0, 0.0, 560.0, height)),
        _ if region.classes.iter().any(|class| class == "controls") => {
            Some((0.0, height - 150.0, width, 150.0))
        }
        _ => None,
    }
}

fn push_regions(out: &mut String, regions: &[SceneRegion], width: f32, height: f32) {
    for region in regions.iter().filter(|region| region.visible) {
        let Some((x, y, w, h)) = region_frame(region, width, height) else {
            continue;
        };
        let id = region
            .id
            .as_deref()
            .map(|id| format!(" id='{}'", xml_escape(id)))
            .unwrap_or_default();
        let class = if region.classes.is_empty() {
            String::new()
        } else {
            format!(" class='{}'", xml_escape(&region.classes.join(" ")))
        };
        out.push_str(&format!(
            "<g{id}{class}><rect x='{x}' y='{y}' width='{w}' height='{h}' rx='16'              fill='rgba(15,23,42,0.92)' stroke='rgba(148,163,184,0.6)'/></g>"
        ));
    }
}

/// SVG markup for the board at the export size, with any visible UI
/// regions drawn on top.
pub fn board_svg(
    view: &BoardView,
    appearance: LogoAppearance,
    images: &[SceneImage],
    regions: &[SceneRegion],
    badge: Option<&str>,
    settings: &ExportSettings,
) -> String {
    let width = settings.width as f32;
    let height = settings.height as f32;
    let src_for = |role: ImageRole| {
        images
            .iter()
            .find(|image| image.role == role)
            .map(|image| xml_escape(&image.src))
            .unwrap_or_else(|| xml_escape(settings.image_placeholder))
    };

    let mut out = String::new();
    out.push_str(&format!(
        "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink' \
         width='{width}' height='{height}' viewBox='0 0 {width} {height}'>"
    ));
    out.push_str(&format!(
        "<defs><linearGradient id='header' x1='0' y1='0' x2='1' y2='1'>\
         <stop offset='0%' stop-color='{}'/><stop offset='100%' stop-color='{}'/></linearGradient>\
         <filter id='to-white'><feColorMatrix type='matrix' \
         values='0 0 0 0 1 0 0 0 0 1 0 0 0 0 1 0 0 0 1 0'/></filter>\
         <filter id='to-black'><feColorMatrix type='matrix' \
         values='0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 1 0'/></filter></defs>",
        xml_escape(&view.header_gradient[0]),
        xml_escape(&view.header_gradient[1])
    ));
    out.push_str(&format!(
        "<rect width='{width}' height='{height}' fill='#0b1020'/>\
         <rect width='{width}' height='{HEADER_HEIGHT}' fill='url(#header)'/>"
    ));

    let logo_box = (width / 2.0 - 200.0, 40.0, 400.0, 240.0);
    if appearance.light_backdrop {
        out.push_str(&format!(
            "<rect x='{}' y='{}' width='{}' height='{}' rx='24' fill='rgba(255,255,255,0.92)'/>",
            logo_box.0 - 12.0,
            logo_box.1 - 12.0,
            logo_box.2 + 24.0,
            logo_box.3 + 24.0
        ));
    }
    let logo_filter = if appearance.white_invert {
        " filter='url(#to-white)'"
    } else if appearance.black_invert {
        " filter='url(#to-black)'"
    } else {
        ""
    };
    out.push_str(&format!(
        "<image x='{}' y='{}' width='{}' height='{}' preserveAspectRatio='xMidYMid meet'{logo_filter} \
         xlink:href='{}'/>",
        logo_box.0,
        logo_box.1,
        logo_box.2,
        logo_box.3,
        src_for(ImageRole::StationLogo)
    ));
    out.push_str(&format!(
        "<text x='{}' y='390' text-anchor='middle' font-family='Arial Black, Arial, sans-serif' \
         font-size='84' font-weight='900' fill='#ffffff'>{}</text>",
        width / 2.0,
        xml_escape(&view.title)
    ));
    out.push_str(&format!(
        "<text x='{}' y='470' text-anchor='middle' font-family='Arial, sans-serif' \
         font-size='44' font-weight='700' fill='rgba(255,255,255,0.9)'>{}</text>",
        width / 2.0,
        xml_escape(&view.subtitle)
    ));

    if let Some(message) = &view.empty_message {
        out.push_str(&format!(
            "<text x='{}' y='{}' text-anchor='middle' font-family='Arial, sans-serif' \
             font-size='40' fill='#cbd5f5'>{}</text>",
            width / 2.0,
            ROW_TOP + 120.0,
            xml_escape(message)
        ));
    }

    let rows = view.teams.len().max(1) as f32;
    let row_height =
        ((height - ROW_TOP - BOTTOM_MARGIN - ROW_GAP * (rows - 1.0)) / rows).min(MAX_ROW_HEIGHT);
    for (idx, row) in view.teams.iter().enumerate() {
        let top = ROW_TOP + idx as f32 * (row_height + ROW_GAP);
        let logo_size = row_height - 40.0;
        let value_px = row.font_px.unwrap_or(DEFAULT_VALUE_PX) as f32;
        out.push_str(&format!(
            "<rect x='60' y='{top}' width='{}' height='{row_height}' rx='28' fill='{}'/>",
            width - 120.0,
            xml_escape(&row.color)
        ));
        out.push_str(&format!(
            "<image x='90' y='{}' width='{logo_size}' height='{logo_size}' \
             preserveAspectRatio='xMidYMid meet' xlink:href='{}'/>",
            top + 20.0,
            src_for(ImageRole::TeamLogo(idx))
        ));
        out.push_str(&format!(
            "<text x='{}' y='{}' text-anchor='end' font-family='Arial Black, Arial, sans-serif' \
             font-size='{value_px}' font-weight='900' fill='#ffffff'>{}</text>",
            width - 100.0,
            top + row_height / 2.0 + value_px * 0.35,
            xml_escape(&row.value)
        ));
    }

    push_regions(&mut out, regions, width, height);

    if let Some(text) = badge {
        out.push_str(&format!(
            "<text x='{}' y='{}' text-anchor='middle' font-family='Arial Black, Arial, sans-serif' \
             font-size='24' fill='rgba(255,255,255,0.75)'>{}</text>",
            width / 2.0,
            height - 18.0,
            xml_escape(text)
        ));
    }
    out.push_str("</svg>");
    out
}

#[async_trait(?Send)]
impl ExportSurface for SceneSurface {
    async fn prepare(&mut self, badge_text: &str) -> Result<(), ExportError> {
        self.saved_visibility = Some(self.regions.iter().map(|r| r.visible).collect());
        for index in 0..self.regions.len() {
            if self.excluded(index) {
                self.regions[index].visible = false;
            }
        }
        self.layout_pinned = true;
        self.badge = Some(badge_text.to_string());
        self.inline_local_images();
        Ok(())
    }

    fn image_sources(&self) -> Vec<String> {
        self.images.iter().map(|image| image.src.clone()).collect()
    }

    fn set_image_source(&mut self, index: usize, src: &str) {
        if let Some(image) = self.images.get_mut(index) {
            image.src = src.to_string();
        }
    }

    /// Only embedded data can be resolved without a network stack.
    async fn await_image(&self, index: usize) -> bool {
        self.images
            .get(index)
            .and_then(|image| decode_data_url(&image.src))
            .is_some_and(|(_, bytes)| !bytes.is_empty())
    }

    async fn rasterize(&mut self, settings: &ExportSettings) -> Result<Vec<u8>, ExportError> {
        let markup = self.markup(settings);
        svg::render_png(&markup, settings.width, settings.height)
    }

    fn restore(&mut self) {
        if let Some(saved) = self.saved_visibility.take() {
            for (region, visible) in self.regions.iter_mut().zip(saved) {
                region.visible = visible;
            }
        }
        self.badge = None;
        self.layout_pinned = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{Conference, Division, DivisionKey};
    use crate::core::contrast::LogoTreatment;
    use crate::core::projection::TeamRowView;
    use crate::core::timing::testing::InstantSleeper;
    use crate::export::{ExportPipeline, ExportRequest};
    use futures::executor::block_on;
    use std::rc::Rc;
    use time::{Date, Month};

    const TEAM_SVG: &str = "<svg xmlns='http://www.w3.org/2000/svg' width='4' height='4'>\
        <rect width='4' height='4' fill='#00ff00'/></svg>";

    fn view() -> BoardView {
        let key = DivisionKey::new(Conference::Afc, Division::East);
        BoardView {
            key,
            title: "Tom & Jerry <3".into(),
            subtitle: "In the AFC EAST".into(),
            division_label: key.label(),
            logo_url: "https://cdn.invalid/station.svg".into(),
            logo_alt: "WIVB Network Logo".into(),
            header_gradient: ["#1e3a8a".into(), "#172554".into()],
            logo_backdrop: "#1e3a8a".into(),
            logo_treatment: LogoTreatment::Analyze,
            fox_pop: false,
            teams: vec![
                TeamRowView {
                    name: "Bills".into(),
                    color: "#00338d".into(),
                    logo_url: "/logos/Bills%20Logo.svg".into(),
                    value: "7".into(),
                    font_px: None,
                    z_index: 2,
                },
                TeamRowView {
                    name: "Jets".into(),
                    color: "#125740".into(),
                    logo_url: "/logos/missing.svg".into(),
                    value: "3".into(),
                    font_px: None,
                    z_index: 1,
                },
            ],
            stations: Vec::new(),
            custom_active: true,
            custom_logo_input: String::new(),
            empty_message: None,
        }
    }

    fn resource_dir() -> PathBuf {
        let root = std::env::temp_dir().join(format!("memewar-scene-{}", std::process::id()));
        std::fs::create_dir_all(root.join("logos")).unwrap();
        std::fs::write(root.join("logos").join("Bills Logo.svg"), TEAM_SVG).unwrap();
        root
    }

    #[test]
    fn markup_escapes_text_and_draws_badge() {
        let images = vec![SceneImage {
            role: ImageRole::StationLogo,
            src: "a.svg?x=1&y=2".into(),
        }];
        let markup = board_svg(
            &view(),
            LogoAppearance::default(),
            &images,
            &[],
            Some("https://nfl.rprtd.app"),
            &ExportSettings::default(),
        );
        assert!(markup.contains("Tom &amp; Jerry &lt;3"));
        assert!(markup.contains("a.svg?x=1&amp;y=2"));
        assert!(markup.contains(">https://nfl.rprtd.app</text>"));
        assert!(!markup.contains("url(#to-white)'"));
    }

    #[test]
    fn export_hides_regions_then_restores_them() {
        let pipeline = ExportPipeline::new(ExportSettings::default(), Rc::new(InstantSleeper));
        let mut surface =
            SceneSurface::new(view(), LogoAppearance::default(), true).with_resource_dir(resource_dir());
        let request = ExportRequest {
            key: DivisionKey::new(Conference::Afc, Division::East),
            date: Date::from_calendar_date(2025, Month::October, 5).unwrap(),
            badge_text: "https://nfl.rprtd.app".into(),
        };
        let before = surface.regions().to_vec();

        let artifact = block_on(pipeline.run(&mut surface, &request)).unwrap();

        assert_eq!(artifact.filename, "AFCEASTMeme-10-05-25.png");
        assert_eq!(&artifact.bytes[1..4], b"PNG");
        assert_eq!(surface.regions(), before.as_slice());
        assert!(surface.badge().is_none());
        assert!(!surface.layout_pinned());

        let sources = surface.image_sources();
        assert!(sources[0].starts_with("data:image/svg+xml,"), "remote logo -> placeholder");
        assert!(sources[1].starts_with("data:image/svg+xml;base64,"), "local logo inlined");
        assert!(sources[2].starts_with("data:image/svg+xml,"), "missing file -> placeholder");
    }

    #[test]
    fn prepare_hides_nested_regions() {
        let mut surface = SceneSurface::new(view(), LogoAppearance::default(), true);
        block_on(surface.prepare("badge")).unwrap();
        let visible: Vec<bool> = surface.regions().iter().map(|r| r.visible).collect();
        assert_eq!(visible, vec![false, false, false, false, true]);
        assert_eq!(surface.badge(), Some("badge"));
        surface.restore();
        let visible: Vec<bool> = surface.regions().iter().map(|r| r.visible).collect();
        assert_eq!(visible, vec![true, true, true, true, true]);
    }

    #[test]
    fn ui_regions_are_drawn_until_hidden() {
        let settings = ExportSettings::default();
        let mut surface = SceneSurface::new(view(), LogoAppearance::default(), true);
        let live = surface.markup(&settings);
        assert!(live.contains("<g id='history-popover'>"));
        assert!(live.contains("<g class='controls'>"));
        assert!(live.contains("<g id='custom-panel'>"));

        block_on(surface.prepare("badge")).unwrap();
        let frozen = surface.markup(&settings);
        assert!(!frozen.contains("<g id="));
        assert!(!frozen.contains("<g class="));

        surface.restore();
        assert_eq!(surface.markup(&settings), live);
    }
}
