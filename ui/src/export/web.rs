//! Browser export surface: the live board DOM, rasterized by the
//! `dom-to-image` script loaded by the web shell.

use async_trait::async_trait;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Document, Element, HtmlElement, HtmlImageElement};

use super::{
    decode_data_url, non_exportable_selector, ExportError, ExportSurface, SourceLedger, BADGE_ID,
};
use crate::core::config::ExportSettings;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = domtoimage, js_name = toPng, catch)]
    fn dom_to_png(node: &web_sys::Node, options: &JsValue) -> Result<js_sys::Promise, JsValue>;
}

pub const CONTAINER_SELECTOR: &str = ".container";

const HIDDEN_SELECTORS: [&str; 2] = [".controls", "#history-controls"];
const POPOVER_ID: &str = "history-popover";

pub struct DomSurface {
    document: Document,
    container: HtmlElement,
    hidden: Vec<(HtmlElement, String)>,
    reopen_popover: Option<Element>,
    prev_position: Option<String>,
    badge: Option<Element>,
    images: Vec<HtmlImageElement>,
    rewritten: SourceLedger,
}

fn js_error(context: &str, err: JsValue) -> ExportError {
    let detail = err
        .as_string()
        .or_else(|| {
            err.dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{err:?}"));
    ExportError::Rasterize(format!("{context}: {detail}"))
}

impl DomSurface {
    pub fn attach() -> Result<Self, ExportError> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| ExportError::MissingElement("document".into()))?;
        let container = document
            .query_selector(CONTAINER_SELECTOR)
            .ok()
            .flatten()
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
            .ok_or_else(|| ExportError::MissingElement(CONTAINER_SELECTOR.into()))?;
        Ok(Self {
            document,
            container,
            hidden: Vec::new(),
            reopen_popover: None,
            prev_position: None,
            badge: None,
            images: Vec::new(),
            rewritten: SourceLedger::default(),
        })
    }

    fn hide_regions(&mut self) {
        for selector in HIDDEN_SELECTORS {
            let Ok(Some(found)) = self.document.query_selector(selector) else {
                continue;
            };
            if let Ok(el) = found.dyn_into::<HtmlElement>() {
                let style = el.style();
                let previous = style.get_property_value("display").unwrap_or_default();
                style.set_property("display", "none").ok();
                self.hidden.push((el, previous));
            }
        }
        if let Some(popover) = self.document.get_element_by_id(POPOVER_ID) {
            if popover.class_list().contains("visible") {
                popover.class_list().remove_1("visible").ok();
                self.reopen_popover = Some(popover);
            }
        }
    }

    fn add_badge(&mut self, text: &str) -> Result<(), ExportError> {
        let badge = self
            .document
            .create_element("div")
            .map_err(|err| js_error("badge", err))?;
        badge.set_id(BADGE_ID);
        badge.set_text_content(Some(text));
        if let Some(el) = badge.dyn_ref::<HtmlElement>() {
            let style = el.style();
            for (name, value) in [
                ("position", "absolute"),
                ("left", "50%"),
                ("bottom", "18px"),
                ("transform", "translateX(-50%)"),
                ("font-family", "Arial Black, Arial, sans-serif"),
                ("font-size", "24px"),
                ("font-weight", "700"),
                ("letter-spacing", "0.5px"),
                ("color", "rgba(255,255,255,0.75)"),
                ("text-shadow", "0 2px 8px rgba(0,0,0,0.55)"),
                ("pointer-events", "none"),
                ("z-index", "9999"),
            ] {
                style.set_property(name, value).ok();
            }
        }
        self.container
            .append_child(&badge)
            .map_err(|err| js_error("badge", err))?;
        self.badge = Some(badge);
        Ok(())
    }

    fn collect_images(&mut self) {
        self.images.clear();
        let Ok(list) = self.container.query_selector_all("img") else {
            return;
        };
        for idx in 0..list.length() {
            if let Some(img) = list
                .item(idx)
                .and_then(|node| node.dyn_into::<HtmlImageElement>().ok())
            {
                self.images.push(img);
            }
        }
    }
}

#[async_trait(?Send)]
impl ExportSurface for DomSurface {
    async fn prepare(&mut self, badge_text: &str) -> Result<(), ExportError> {
        self.hide_regions();
        let style = self.container.style();
        self.prev_position = Some(style.get_property_value("position").unwrap_or_default());
        style.set_property("position", "relative").ok();
        self.add_badge(badge_text)?;
        self.collect_images();
        tracing::debug!("[export] ui locked, {} image(s) to check", self.images.len());
        Ok(())
    }

    fn image_sources(&self) -> Vec<String> {
        self.images
            .iter()
            .map(|img| img.get_attribute("src").unwrap_or_default())
            .collect()
    }

    fn set_image_source(&mut self, index: usize, src: &str) {
        if let Some(img) = self.images.get(index) {
            let original = img.get_attribute("src").unwrap_or_default();
            self.rewritten.record(index, &original);
            img.set_attribute("src", src).ok();
        }
    }

    async fn await_image(&self, index: usize) -> bool {
        let Some(img) = self.images.get(index) else {
            return false;
        };
        if img.complete() && img.natural_width() > 0 {
            return true;
        }
        JsFuture::from(img.decode()).await.is_ok()
    }

    async fn rasterize(&mut self, settings: &ExportSettings) -> Result<Vec<u8>, ExportError> {
        let selector = non_exportable_selector();
        let filter = Closure::<dyn Fn(JsValue) -> bool>::new(move |node: JsValue| {
            match node.dyn_ref::<Element>() {
                Some(el) => !matches!(el.closest(&selector), Ok(Some(_))),
                None => true,
            }
        });

        let options = js_sys::Object::new();
        let style = js_sys::Object::new();
        let set = |target: &js_sys::Object, key: &str, value: &JsValue| {
            js_sys::Reflect::set(target, &JsValue::from_str(key), value).map(|_| ())
        };
        set(&style, "margin", &JsValue::from_str("0")).map_err(|e| js_error("options", e))?;
        set(&style, "padding", &JsValue::from_str("0")).map_err(|e| js_error("options", e))?;
        for (key, value) in [
            ("width", JsValue::from(settings.width)),
            ("height", JsValue::from(settings.height)),
            ("quality", JsValue::from(1.0)),
            ("cacheBust", JsValue::TRUE),
            ("imagePlaceholder", JsValue::from_str(settings.image_placeholder)),
            ("filter", filter.as_ref().clone()),
            ("style", style.into()),
        ] {
            set(&options, key, &value).map_err(|e| js_error("options", e))?;
        }

        let promise = dom_to_png(&self.container, &options).map_err(|e| js_error("toPng", e))?;
        let data_url = JsFuture::from(promise)
            .await
            .map_err(|e| js_error("toPng", e))?
            .as_string()
            .ok_or_else(|| ExportError::Rasterize("toPng returned a non-string".into()))?;
        drop(filter);

        let (_, bytes) = decode_data_url(&data_url)
            .ok_or_else(|| ExportError::Encode("malformed data URL from toPng".into()))?;
        Ok(bytes)
    }

    fn restore(&mut self) {
        if let Some(badge) = self.badge.take() {
            badge.remove();
        }
        if let Some(position) = self.prev_position.take() {
            self.container
                .style()
                .set_property("position", &position)
                .ok();
        }
        for (index, original) in self.rewritten.drain() {
            if let Some(img) = self.images.get(index) {
                img.set_attribute("src", &original).ok();
            }
        }
        for (el, previous) in self.hidden.drain(..) {
            el.style().set_property("display", &previous).ok();
        }
        if let Some(popover) = self.reopen_popover.take() {
            popover.class_list().add_1("visible").ok();
        }
        tracing::debug!("[export] ui restored");
    }
}
