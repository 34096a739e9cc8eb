#![cfg_attr(all(windows, not(debug_assertions)), windows_subsystem = "windows")]

use std::path::PathBuf;

use dioxus::desktop::{tao::window::WindowBuilder, Config, LogicalSize};
use dioxus::logger::tracing::Level;
use dioxus::prelude::*;

use ui::core::{format, platform};
use ui::views::Dashboard;

const MAIN_CSS_INLINE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../ui/assets/theme/main.css"
)); // Embedded shared theme; the desktop shell ships no stylesheet of its own.

fn main() {
    // Must run while the process is still single-threaded.
    let local_offset = format::capture_local_offset();
    dioxus::logger::init(Level::INFO).expect("failed to init logger");
    if local_offset.is_none() {
        dioxus::logger::tracing::warn!("export file names will be dated in UTC");
    }

    let resource_dir = resolve_resource_dir();
    // data.json and /logos are read from here by both the webview and the
    // export scene.
    platform::register_resource_dir(resource_dir.clone());

    LaunchBuilder::desktop()
        .with_cfg(
            Config::new()
                .with_window(
                    WindowBuilder::new()
                        .with_title(format!("NFL Meme War – v{}", env!("CARGO_PKG_VERSION")))
                        .with_inner_size(LogicalSize::new(720.0, 1100.0)),
                )
                .with_resource_directory(resource_dir),
        )
        .launch(App);
}

#[component]
fn App() -> Element {
    rsx! {
        document::Style { "{MAIN_CSS_INLINE}" }
        Dashboard {}
    }
}

fn resolve_resource_dir() -> PathBuf {
    #[cfg(debug_assertions)]
    {
        // During `cargo run` / `dx serve` share the web crate's public dir.
        PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../web/public"))
    }

    #[cfg(not(debug_assertions))]
    {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join("assets")))
            .unwrap_or_else(|| PathBuf::from("assets"))
    }
}
