use dioxus::logger::tracing::Level;
use dioxus::prelude::*;

use ui::views::Dashboard;

const MAIN_CSS_INLINE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../ui/assets/theme/main.css"
));

// Exposes `window.domtoimage`, the rasterizer behind PNG export.
const DOM_TO_IMAGE_JS: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/dom-to-image/2.6.0/dom-to-image.min.js";

fn main() {
    dioxus::logger::init(Level::INFO).expect("failed to init logger");
    dioxus::launch(App);
}

#[component]
fn App() -> Element {
    rsx! {
        document::Title { "NFL Meme War" }
        document::Style { "{MAIN_CSS_INLINE}" }
        document::Script { src: DOM_TO_IMAGE_JS }

        Dashboard {}
    }
}
