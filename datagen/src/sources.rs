use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Map, Value};

/// Team listings, one YAML file per division. Each maps a division key
/// (`nfc_east`, ...) to a list of `{ team, color, logo }` entries.
pub const DIVISION_FILES: [&str; 8] = [
    "nfceast.yml",
    "nfc_north.yml",
    "nfc_south.yml",
    "nfc_west.yml",
    "afc_east.yml",
    "afc_north.yml",
    "afc_south.yml",
    "afc_west.yml",
];

/// Station listings for every division: `{ label, url, color, tint? }`.
pub const STATIONS_FILE: &str = "stations.yml";

/// Raw listings keyed by division. Entries are kept as JSON values so
/// fields the tool does not touch (including an explicit `tint: null`)
/// pass through unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sources {
    pub teams_by_division: Map<String, Value>,
    pub stations_by_division: Map<String, Value>,
}

/// Every file the payload is built from, in read order.
pub fn source_paths(root: &Path) -> Vec<PathBuf> {
    DIVISION_FILES
        .iter()
        .chain(std::iter::once(&STATIONS_FILE))
        .map(|file| root.join(file))
        .collect()
}

fn load_yaml_map(path: &Path) -> Result<Map<String, Value>> {
    let source =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    if source.trim().is_empty() {
        return Ok(Map::new());
    }
    let parsed: Value =
        serde_yaml::from_str(&source).with_context(|| format!("parsing {}", path.display()))?;
    Ok(match parsed {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => anyhow::bail!(
            "{} must map division keys to lists, found {}",
            path.display(),
            kind(&other)
        ),
    })
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a map",
    }
}

/// Reads all division files (later files win on duplicate keys) and the
/// station file.
pub fn load_sources(root: &Path) -> Result<Sources> {
    let mut teams_by_division = Map::new();
    for file in DIVISION_FILES {
        teams_by_division.extend(load_yaml_map(&root.join(file))?);
    }
    let stations_by_division = load_yaml_map(&root.join(STATIONS_FILE))?;
    tracing::debug!(
        "loaded {} team division(s), {} station division(s)",
        teams_by_division.len(),
        stations_by_division.len()
    );
    Ok(Sources {
        teams_by_division,
        stations_by_division,
    })
}

/// Entries under every division key; non-list values yield nothing.
pub fn entries(map: &Map<String, Value>) -> impl Iterator<Item = &Value> {
    map.values()
        .filter_map(Value::as_array)
        .flat_map(|list| list.iter())
}

/// Cache file name for a remote logo: the URL-decoded last path segment
/// with whitespace runs collapsed to `-`. `None` for anything that is not
/// an absolute URL.
pub fn local_logo_name(raw_url: &str) -> Option<String> {
    let parsed = url::Url::parse(raw_url).ok()?;
    let segment = parsed.path().rsplit('/').next().unwrap_or_default();
    let decoded = urlencoding::decode(segment).ok()?;
    let mut name = String::with_capacity(decoded.len());
    let mut in_gap = false;
    for ch in decoded.chars() {
        if ch.is_whitespace() {
            if !in_gap {
                name.push('-');
            }
            in_gap = true;
        } else {
            name.push(ch);
            in_gap = false;
        }
    }
    (!name.is_empty()).then_some(name)
}

pub fn logos_dir(root: &Path) -> PathBuf {
    root.join("public").join("logos")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logo_names_are_decoded_and_dashed() {
        assert_eq!(
            local_logo_name("https://cdn.example.com/art/Fox%205%20Logo.svg").as_deref(),
            Some("Fox-5-Logo.svg")
        );
        assert_eq!(
            local_logo_name("https://cdn.example.com/a/b/wnyw.svg?x=1").as_deref(),
            Some("wnyw.svg")
        );
        assert_eq!(
            local_logo_name("https://cdn.example.com/NBC%20%20%2010.svg").as_deref(),
            Some("NBC-10.svg")
        );
    }

    #[test]
    fn relative_and_bare_urls_have_no_cache_name() {
        assert_eq!(local_logo_name("/logos/already-local.svg"), None);
        assert_eq!(local_logo_name("not a url"), None);
        assert_eq!(local_logo_name("https://cdn.example.com/"), None);
    }

    #[test]
    fn entries_skip_non_lists() {
        let map: Map<String, Value> = serde_json::from_value(serde_json::json!({
            "afc_east": [{ "team": "Bills" }, { "team": "Jets" }],
            "broken": "oops"
        }))
        .unwrap();
        assert_eq!(entries(&map).count(), 2);
    }
}
