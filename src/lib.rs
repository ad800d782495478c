//! Chronoxia - a chat bot whose commands live in hot-reloadable cogs

pub mod application;
pub mod cogs;
pub mod domain;
pub mod infrastructure;
