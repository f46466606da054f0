//! Widgets drawn by `ui::render`.

pub mod status_bar;
pub mod terminal;
