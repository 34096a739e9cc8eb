use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::sources::{self, Sources};

/// Site-relative URL of a cached logo when `public/logos/{name}` exists;
/// otherwise the input unchanged.
pub fn to_local_logo_url(root: &Path, raw_url: &str) -> String {
    let Some(name) = sources::local_logo_name(raw_url) else {
        return raw_url.to_string();
    };
    if !sources::logos_dir(root).join(&name).is_file() {
        return raw_url.to_string();
    }
    format!("/logos/{}", encode_uri_component(&name))
}

/// Percent-encoding with the browser's `encodeURIComponent` alphabet:
/// `!'()*` stay literal on top of what `urlencoding` already keeps.
pub fn encode_uri_component(text: &str) -> String {
    let mut encoded = urlencoding::encode(text).into_owned();
    for (escape, literal) in [
        ("%21", "!"),
        ("%27", "'"),
        ("%28", "("),
        ("%29", ")"),
        ("%2A", "*"),
    ] {
        encoded = encoded.replace(escape, literal);
    }
    encoded
}

/// Rewrites the string field `field` of every entry through
/// [`to_local_logo_url`].
fn localize(root: &Path, map: &Map<String, Value>, field: &str) -> Map<String, Value> {
    map.iter()
        .map(|(division, list)| {
            let rewritten = match list {
                Value::Array(items) => Value::Array(
                    items
                        .iter()
                        .map(|item| {
                            let mut item = item.clone();
                            if let Some(Value::String(url)) = item.get_mut(field) {
                                *url = to_local_logo_url(root, url);
                            }
                            item
                        })
                        .collect(),
                ),
                Value::Null => Value::Array(Vec::new()),
                other => other.clone(),
            };
            (division.clone(), rewritten)
        })
        .collect()
}

pub fn build_payload(root: &Path, sources: &Sources, generated_at: &str) -> Value {
    json!({
        "generatedAt": generated_at,
        "teamsByDivision": localize(root, &sources.teams_by_division, "logo"),
        "stationsByDivision": localize(root, &sources.stations_by_division, "url"),
    })
}

pub fn default_out(root: &Path) -> PathBuf {
    root.join("public").join("data.json")
}

/// Reads the listings under `root` and writes the payload to `out`.
pub fn run_build(root: &Path, out: &Path) -> Result<()> {
    let sources = sources::load_sources(root)?;
    let generated_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("formatting timestamp")?;
    let payload = build_payload(root, &sources, &generated_at);

    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let body = serde_json::to_string(&payload)?;
    fs::write(out, body).with_context(|| format!("writing {}", out.display()))?;
    tracing::info!("wrote {}", out.display());
    Ok(())
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

/// Modification times of every source file; missing files read as `None`.
pub fn source_stamps(root: &Path) -> Vec<Option<SystemTime>> {
    sources::source_paths(root)
        .iter()
        .map(|path| modified(path))
        .collect()
}

/// Builds once, then polls the sources and rebuilds whenever one changes.
/// Build errors while watching are logged and the watch continues.
pub fn watch(root: &Path, out: &Path, interval: Duration) -> Result<()> {
    run_build(root, out)?;
    let mut last = source_stamps(root);
    tracing::info!("watching {} for changes", root.display());
    loop {
        std::thread::sleep(interval);
        let current = source_stamps(root);
        if current == last {
            continue;
        }
        last = current;
        if let Err(err) = run_build(root, out) {
            tracing::warn!("rebuild failed: {err:#}");
        }
    }
}
