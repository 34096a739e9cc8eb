use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::sources::{self, Sources};

/// Source of logo bodies. The CLI uses [`HttpFetcher`]; tests substitute
/// canned responses.
pub trait LogoFetcher {
    fn fetch(&self, url: &str) -> Result<String>;
}

pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(20))
            .user_agent(concat!("memewar-datagen/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building HTTP client")?;
        Ok(Self { client })
    }
}

impl LogoFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url}"))?;
        response.text().with_context(|| format!("reading body of {url}"))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchReport {
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl fmt::Display for FetchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "logos: downloaded={} skipped={} failed={}",
            self.downloaded, self.skipped, self.failed
        )
    }
}

/// Every team `logo` and station `url`, deduplicated.
pub fn collect_logo_urls(sources: &Sources) -> BTreeSet<String> {
    let field = |entry: &Value, name: &str| {
        entry
            .get(name)
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
    };
    sources::entries(&sources.teams_by_division)
        .filter_map(|team| field(team, "logo"))
        .chain(sources::entries(&sources.stations_by_division).filter_map(|s| field(s, "url")))
        .collect()
}

/// Downloads each logo once into `public/logos/`. Only SVG bodies are
/// kept; cached files are skipped unless `refresh` is set.
pub fn fetch_logos(
    root: &Path,
    sources: &Sources,
    refresh: bool,
    fetcher: &dyn LogoFetcher,
) -> Result<FetchReport> {
    let dir = sources::logos_dir(root);
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut report = FetchReport::default();
    for url in collect_logo_urls(sources) {
        let Some(name) = sources::local_logo_name(&url) else {
            tracing::debug!("no cache name for {url}");
            report.failed += 1;
            continue;
        };
        let out = dir.join(&name);
        if !refresh && out.exists() {
            report.skipped += 1;
            continue;
        }
        let body = match fetcher.fetch(&url) {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!("{err:#}");
                report.failed += 1;
                continue;
            }
        };
        if !body.contains("<svg") {
            tracing::warn!("{url} is not an SVG, skipping");
            report.failed += 1;
            continue;
        }
        match fs::write(&out, body) {
            Ok(()) => report.downloaded += 1,
            Err(err) => {
                tracing::warn!("writing {}: {err}", out.display());
                report.failed += 1;
            }
        }
    }
    Ok(report)
}
