//! Local file mirror of the container's main file.

pub mod mirror;
pub mod watcher;
