//! Dioxus components. `Dashboard` owns the session and drives everything
//! else through its coroutine; the rest are plain props-in components.

mod board;
mod controls;
mod dashboard;
mod editor;
mod history;

pub use board::Board;
pub use controls::Controls;
pub use dashboard::Dashboard;
pub use editor::EditorPanel;
pub use history::HistoryPanel;
