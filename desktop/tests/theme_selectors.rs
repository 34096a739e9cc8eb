#![cfg(test)]
/*!
Theme selector lint for the desktop build.

Purpose:
- Ensure the classes and ids the dashboard components and the export
  pipeline rely on stay present in the shared theme `ui/assets/theme/main.css`.
- The export pipeline hides `.controls`, `#history-controls` and the popover
  by id/class, and the logo contrast pass toggles the invert classes; a
  renamed selector here would silently break the exported image.

If you intentionally rename a selector, update the component markup and
REQUIRED_SELECTORS together.
*/

const THEME_CSS: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../ui/assets/theme/main.css"
));

const REQUIRED_SELECTORS: &[&str] = &[
    // Global / layout
    ":root",
    "body {",
    ".dashboard {",
    ".container {",
    // Board
    ".header {",
    ".header.dark-logo-bg",
    ".network-logo.logo-white-invert",
    ".network-logo.logo-black-invert",
    ".network-logo.fox-pop-logo",
    ".team-row {",
    ".team-logo {",
    ".points {",
    ".teams__empty",
    // Controls
    ".controls {",
    ".conference-toggle.active",
    ".division-toggle-btn.active",
    ".controls__status--error",
    // History
    ".history-popover.visible",
    ".history-item.auto",
    ".history-division-badge",
    // Customize panel
    ".custom-panel.visible",
    ".custom-overlay.visible",
    ".custom-logo-url.visible",
    ".custom-team-row.drag-over",
    // Media query token (sanity check responsive block exists)
    "@media (max-width: 720px)",
];

#[test]
fn unified_theme_contains_required_selectors() {
    let mut missing = Vec::new();
    for sel in REQUIRED_SELECTORS {
        if !THEME_CSS.contains(sel) {
            missing.push(*sel);
        }
    }

    if !missing.is_empty() {
        panic!(
            "Missing {} required CSS selectors/tokens in unified theme:\n{}",
            missing.len(),
            missing.join("\n")
        );
    }
}

#[test]
fn unified_theme_not_trivially_empty() {
    let non_ws_len = THEME_CSS.chars().filter(|c| !c.is_whitespace()).count();
    assert!(
        non_ws_len > 3_000,
        "Embedded theme appears unexpectedly small ({} non-whitespace chars) – \
         did the file get truncated or path change?",
        non_ws_len
    );
}

#[test]
fn invert_classes_are_paired() {
    let white = THEME_CSS.contains(".logo-white-invert");
    let black = THEME_CSS.contains(".logo-black-invert");
    assert!(
        white && black,
        "Logo invert classes missing (white: {white}, black: {black})"
    );
}
