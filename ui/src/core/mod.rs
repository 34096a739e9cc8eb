pub mod catalog;
pub mod color;
pub mod config;
pub mod contrast;
pub mod dedup;
pub mod format;
pub mod history;
pub mod platform;
pub mod projection;
pub mod session;
pub mod state;
pub mod storage;
pub mod timing;
