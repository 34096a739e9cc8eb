//! Offline data tooling: turns the per-division YAML listings into the
//! `data.json` payload the dashboard loads, and caches SVG logos locally.

pub mod build;
pub mod logos;
pub mod sources;
