//! Platform glue: task spawning, bundled resources, page details and logo
//! sampling. Each function has a wasm and a native body.

use std::future::Future;
#[cfg(not(target_arch = "wasm32"))]
use std::path::{Path, PathBuf};

#[cfg(not(target_arch = "wasm32"))]
use once_cell::sync::OnceCell;

use crate::core::catalog::CatalogError;
use crate::core::config::PUBLIC_SITE_URL;

pub fn spawn_future<F>(future: F)
where
    F: Future<Output = ()> + 'static,
{
    #[cfg(target_arch = "wasm32")]
    {
        wasm_bindgen_futures::spawn_local(future);
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        dioxus::prelude::spawn(future);
    }
}

#[cfg(not(target_arch = "wasm32"))]
static RESOURCE_DIR: OnceCell<PathBuf> = OnceCell::new();

/// Directory holding `data.json` and `logos/`. Set once by the desktop shell.
#[cfg(not(target_arch = "wasm32"))]
pub fn register_resource_dir(dir: impl Into<PathBuf>) {
    let dir = dir.into();
    if RESOURCE_DIR.set(dir.clone()).is_err() {
        tracing::debug!("[platform] resource dir already registered, ignoring {dir:?}");
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn resource_dir() -> Option<&'static Path> {
    RESOURCE_DIR.get().map(PathBuf::as_path)
}

/// Maps a site-relative URL such as `/logos/Fox-5.svg` onto `root`.
/// Remote and data URLs have no local file.
#[cfg(not(target_arch = "wasm32"))]
pub fn local_asset_path(root: &Path, url: &str) -> Option<PathBuf> {
    if url.starts_with("data:") || url.contains("://") || url.starts_with("//") {
        return None;
    }
    let relative = url.trim_start_matches('/');
    if relative.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(relative).ok()?;
    let mut path = root.to_path_buf();
    for part in decoded.split('/') {
        if part.is_empty() || part == "." || part == ".." {
            return None;
        }
        path.push(part);
    }
    Some(path)
}

/// Raw text of the dashboard payload.
pub async fn read_dashboard_payload() -> Result<String, CatalogError> {
    #[cfg(target_arch = "wasm32")]
    {
        use wasm_bindgen::JsCast;
        use wasm_bindgen_futures::JsFuture;
        use web_sys::Response;

        use crate::core::config::DASHBOARD_DATA_PATH;

        let window =
            web_sys::window().ok_or_else(|| CatalogError::Unavailable("no window".into()))?;
        let response = JsFuture::from(window.fetch_with_str(DASHBOARD_DATA_PATH))
            .await
            .map_err(|_| CatalogError::Unavailable("request failed".into()))?;
        let response: Response = response
            .dyn_into()
            .map_err(|_| CatalogError::Unavailable("unexpected fetch result".into()))?;
        if !response.ok() {
            return Err(CatalogError::Unavailable(format!(
                "HTTP {} for {DASHBOARD_DATA_PATH}",
                response.status()
            )));
        }
        let text = response
            .text()
            .map_err(|_| CatalogError::Unavailable("body unreadable".into()))?;
        let text = JsFuture::from(text)
            .await
            .map_err(|_| CatalogError::Unavailable("body unreadable".into()))?;
        text.as_string()
            .ok_or_else(|| CatalogError::Unavailable("body is not text".into()))
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        use crate::core::config::DASHBOARD_DATA_PATH;

        let root = resource_dir()
            .ok_or_else(|| CatalogError::Unavailable("resource directory not registered".into()))?;
        let path = root.join(DASHBOARD_DATA_PATH);
        std::fs::read_to_string(&path)
            .map_err(|err| CatalogError::Unavailable(format!("{}: {err}", path.display())))
    }
}

/// Attribution text stamped on exports: the page address, or the public
/// site when served from a development host.
pub fn badge_url_for(protocol: &str, host: &str, hostname: &str, pathname: &str) -> String {
    let local = matches!(hostname, "localhost" | "127.0.0.1" | "0.0.0.0" | "[::1]" | "");
    if local {
        PUBLIC_SITE_URL.to_string()
    } else {
        format!("{protocol}//{host}{pathname}")
    }
}

pub fn page_badge_url() -> String {
    #[cfg(target_arch = "wasm32")]
    {
        let Some(location) = web_sys::window().map(|w| w.location()) else {
            return PUBLIC_SITE_URL.to_string();
        };
        badge_url_for(
            &location.protocol().unwrap_or_default(),
            &location.host().unwrap_or_default(),
            &location.hostname().unwrap_or_default(),
            &location.pathname().unwrap_or_default(),
        )
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        PUBLIC_SITE_URL.to_string()
    }
}

/// Blocking notice. Desktop has no modal, so the message is logged.
pub fn alert(message: &str) {
    #[cfg(target_arch = "wasm32")]
    {
        if let Some(window) = web_sys::window() {
            if window.alert_with_message(message).is_err() {
                tracing::error!("[platform] alert blocked: {message}");
            }
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        tracing::error!("[platform] {message}");
    }
}

/// RGBA samples of the logo on a `SAMPLE_GRID` square, or `None` when the
/// image cannot be loaded or read back.
pub async fn sample_logo(url: String) -> Option<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    {
        use wasm_bindgen::JsCast;
        use wasm_bindgen_futures::JsFuture;
        use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement};

        use crate::core::contrast::SAMPLE_GRID;

        let document = web_sys::window()?.document()?;
        let image = HtmlImageElement::new().ok()?;
        image.set_cross_origin(Some("anonymous"));
        image.set_src(&url);
        if JsFuture::from(image.decode()).await.is_err() {
            tracing::debug!("[contrast] logo failed to decode: {url}");
            return None;
        }

        let canvas: HtmlCanvasElement = document.create_element("canvas").ok()?.dyn_into().ok()?;
        canvas.set_width(SAMPLE_GRID);
        canvas.set_height(SAMPLE_GRID);
        let context: CanvasRenderingContext2d =
            canvas.get_context("2d").ok()??.dyn_into().ok()?;
        let side = f64::from(SAMPLE_GRID);
        context
            .draw_image_with_html_image_element_and_dw_and_dh(&image, 0.0, 0.0, side, side)
            .ok()?;
        // Cross-origin artwork without CORS headers taints the canvas.
        let data = context.get_image_data(0.0, 0.0, side, side).ok()?;
        Some(data.data().0)
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        use crate::export::{decode_data_url, svg};

        if let Some((mime, bytes)) = decode_data_url(&url) {
            return svg::sample_rgba(&bytes, mime.contains("svg"));
        }
        let path = local_asset_path(resource_dir()?, &url)?;
        let bytes = std::fs::read(&path).ok()?;
        let is_svg = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
        svg::sample_rgba(&bytes, is_svg)
    }
}
