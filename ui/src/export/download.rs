use super::ExportError;

/// Hands the finished file to the user. On the web this triggers a browser
/// download and returns `None`; on desktop the file is written under the
/// data directory and its path is returned.
pub async fn download_bytes(
    filename: &str,
    mime: &str,
    bytes: Vec<u8>,
) -> Result<Option<String>, ExportError> {
    #[cfg(target_arch = "wasm32")]
    {
        use wasm_bindgen::JsCast;
        use web_sys::{Blob, BlobPropertyBag, HtmlAnchorElement, Url};

        let fail = |what: &str| ExportError::Delivery(what.to_string());

        let array = js_sys::Uint8Array::from(bytes.as_slice());
        let parts = js_sys::Array::new();
        parts.push(&array.buffer());

        let opts = BlobPropertyBag::new();
        opts.set_type(mime);
        let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &opts)
            .map_err(|_| fail("failed to create blob"))?;
        let url = Url::create_object_url_with_blob(&blob)
            .map_err(|_| fail("unable to create download URL"))?;

        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| fail("document unavailable"))?;
        let anchor: HtmlAnchorElement = document
            .create_element("a")
            .map_err(|_| fail("unable to create anchor"))?
            .dyn_into()
            .map_err(|_| fail("anchor cast failed"))?;
        anchor.set_href(&url);
        anchor.set_download(filename);
        anchor.style().set_property("display", "none").ok();

        document
            .body()
            .ok_or_else(|| fail("missing body"))?
            .append_child(&anchor)
            .ok();
        anchor.click();
        anchor.remove();
        Url::revoke_object_url(&url).ok();

        Ok(None)
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        use std::fs;
        use std::io::Write;

        let _ = mime;
        let dir = desktop_export_dir()?;
        let io = |err: std::io::Error| ExportError::Delivery(err.to_string());
        fs::create_dir_all(&dir).map_err(io)?;
        let path = dir.join(filename);
        let mut file = fs::File::create(&path).map_err(io)?;
        file.write_all(&bytes).map_err(io)?;
        tracing::info!("[export] saved {}", path.display());
        Ok(Some(path.to_string_lossy().to_string()))
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn desktop_export_dir() -> Result<std::path::PathBuf, ExportError> {
    let dirs = directories::ProjectDirs::from("app", "Rprtd", "MemeWar")
        .ok_or_else(|| ExportError::Delivery("unable to determine export directory".into()))?;
    Ok(dirs.data_dir().join("exports"))
}
