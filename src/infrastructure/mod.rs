//! Infrastructure layer - External concerns
//! 
//! This layer contains:
//! - Config: Configuration loading
//! - Storage: JSON document persistence
//! - Cogs: Module resolution and the first-run prompt
//! - Adapters: Platform integrations (Telegram, console)

pub mod adapters;
pub mod cogs;
pub mod config;
pub mod storage;
