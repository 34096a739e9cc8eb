//! Shared UI crate for the division meme board. Core logic, the export
//! pipeline and the views live here; `web` and `desktop` are thin shells.

pub mod core;
pub mod export;
pub mod views;
